// Rendering of declaration blocks and import directives
pub mod block;
pub mod hcl;
pub mod import;

pub use block::BlockEmitter;
pub use import::{DuplicateImport, ImportEmitter};
