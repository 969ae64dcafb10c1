//! Building the database and writing the requested outputs

use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use dgodb_store::{ExactMatcher, IngestStats, ObjectFileDb};
use tracing::info;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Statistics file written with `--stats-json`
pub const STATS_FILE_NAME: &str = "stats.json";

/// Directory under the output directory that receives extracted objects
pub const OBJECTS_DIR_NAME: &str = "objects";

/// Extension of extracted object files
pub const OBJECT_EXTENSION: &str = "go";

/// Ingest the configured archives and write the requested outputs
pub fn run(config: &CliConfig) -> CliResult<IngestStats> {
    config.validate()?;

    let mut db: ObjectFileDb = if config.exact_match {
        ObjectFileDb::new().with_matcher(ExactMatcher)
    } else {
        ObjectFileDb::new()
    };
    db.ingest_files(&config.archives)?;

    if let Some(dir) = config.output_dir.as_deref() {
        if !config.requested_outputs().is_empty() {
            create_dir(dir)?;
        }
        if config.listing {
            db.write_dgo_listing(dir)?;
            info!("Wrote archive listing to {}", dir.display());
        }
        if config.stats_json {
            write_stats(db.stats(), &dir.join(STATS_FILE_NAME))?;
        }
        if config.extract {
            let count = extract_objects(&db, &dir.join(OBJECTS_DIR_NAME))?;
            info!("Extracted {count} objects");
        }
    }

    Ok(*db.stats())
}

/// Write ingestion statistics as pretty-printed JSON
pub fn write_stats(stats: &IngestStats, path: &Path) -> CliResult<()> {
    let json = stats.to_json()?;
    std::fs::write(path, json).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write each unique object's bytes to `<dir>/<unique name>.go`
///
/// Returns the number of files written.
pub fn extract_objects<E, S: BuildHasher>(db: &ObjectFileDb<E, S>, dir: &Path) -> CliResult<usize> {
    create_dir(dir)?;
    let mut count = 0;
    for entry in db.entries() {
        let path = dir.join(format!("{}.{OBJECT_EXTENSION}", entry.record().unique_name()));
        std::fs::write(&path, entry.data()).map_err(|source| CliError::Io { path, source })?;
        count += 1;
    }
    Ok(count)
}

fn create_dir(dir: &Path) -> CliResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| CliError::Io {
        path: PathBuf::from(dir),
        source,
    })
}
