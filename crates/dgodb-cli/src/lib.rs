//! Library side of the `dgodb` command-line tool
//!
//! The binary parses a [`CliConfig`], sets up logging and calls [`run`].

mod app;
mod config;
mod error;

pub use app::{OBJECT_EXTENSION, OBJECTS_DIR_NAME, STATS_FILE_NAME, extract_objects, run, write_stats};
pub use config::CliConfig;
pub use error::{CliError, CliResult, ConfigError};
