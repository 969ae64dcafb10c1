//! Command-line configuration
//!
//! Options come from arguments, with the output directory also taken from
//! `DGODB_OUTPUT_DIR`.

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

/// Options for one run of `dgodb`
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dgodb",
    about = "Build a deduplicated object file database from DGO/CGO archives",
    version
)]
pub struct CliConfig {
    /// Archive files, processed in the order given
    pub archives: Vec<PathBuf>,

    /// Directory for the listing, statistics and extracted objects
    #[arg(long, short = 'o', env = "DGODB_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write the archive listing (dgo.txt)
    #[arg(long)]
    pub listing: bool,

    /// Write ingestion statistics as JSON (stats.json)
    #[arg(long)]
    pub stats_json: bool,

    /// Write every unique object to objects/<name>-v<version>.go
    #[arg(long)]
    pub extract: bool,

    /// Compare object bytes in full instead of trusting length and CRC-32
    #[arg(long)]
    pub exact_match: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl CliConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Names of the requested outputs
    pub fn requested_outputs(&self) -> Vec<&'static str> {
        [
            (self.listing, "--listing"),
            (self.stats_json, "--stats-json"),
            (self.extract, "--extract"),
        ]
        .into_iter()
        .filter_map(|(on, flag)| on.then_some(flag))
        .collect()
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no archives are given, or if an output is
    /// requested without an output directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archives.is_empty() {
            return Err(ConfigError::NoArchives);
        }

        let outputs = self.requested_outputs();
        if !outputs.is_empty() && self.output_dir.is_none() {
            return Err(ConfigError::MissingOutputDir(outputs.join(", ")));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full() {
        let config = CliConfig::try_parse_from([
            "dgodb",
            "-o",
            "out",
            "--listing",
            "--extract",
            "--exact-match",
            "DGO/KERNEL.CGO",
            "DGO/GAME.CGO",
        ])
        .unwrap();

        assert_eq!(
            config.archives,
            vec![PathBuf::from("DGO/KERNEL.CGO"), PathBuf::from("DGO/GAME.CGO")]
        );
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert!(config.exact_match);
        assert!(!config.stats_json);
        assert_eq!(config.requested_outputs(), vec!["--listing", "--extract"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate() {
        let config = CliConfig::try_parse_from(["dgodb"]).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::NoArchives));

        let mut config = CliConfig::try_parse_from(["dgodb", "--stats-json", "A.DGO"]).unwrap();
        // The environment may supply a directory
        config.output_dir = None;
        let err = config.validate().expect_err("no output dir");
        assert_eq!(
            err.to_string(),
            "--output-dir (or DGODB_OUTPUT_DIR) is required with --stats-json"
        );

        let mut config = CliConfig::try_parse_from(["dgodb", "A.DGO"]).unwrap();
        config.output_dir = None;
        config.validate().unwrap();
    }
}
