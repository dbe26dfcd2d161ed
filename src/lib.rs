pub mod audit_builder;
pub mod batcher;
pub mod conf;
pub mod error;
pub mod es_client;
pub mod models;
pub mod pipeline;
pub mod reconciler;
pub mod reporter;
pub mod runner;
mod utils;

pub use error::{PipelineError, Result};
