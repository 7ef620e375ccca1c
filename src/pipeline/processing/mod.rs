pub mod derive;
pub mod matcher;
pub mod normalize;
