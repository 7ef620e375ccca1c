pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use config::{Config, ScriptFlavor};
pub use error::{ImporterError, Result};
pub use pipeline::{GroupPipelineResult, Pipeline, RulePaths, RulePipelineResult, RunSummary};
pub use storage::{FileSink, InMemorySink, OutputSink};
