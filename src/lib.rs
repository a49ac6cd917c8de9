pub mod arch;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod graph;
pub mod inference;
pub mod initialization;
pub mod optimization;
pub mod storage;
pub mod training;

pub use error::{MlErr, Result};
