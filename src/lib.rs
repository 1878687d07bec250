pub mod bench;
pub mod config;
pub mod error;
pub mod git;
pub mod harness;
pub mod history;
pub mod package;
pub mod shell_exec;
pub mod snapshot;
pub mod styling;

pub use error::BenchError;
