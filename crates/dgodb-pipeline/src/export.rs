//! Text artifacts written from an analysed store
//!
//! File names are built from each object's unique name, so variants of the
//! same object never overwrite each other.

use std::hash::BuildHasher;
use std::path::{Path, PathBuf};
use std::time::Instant;

use dgodb_store::LISTING_FILE_NAME;
use serde::Serialize;
use tracing::info;

use crate::config::ExportOptions;
use crate::enrichment::Phase;
use crate::error::{PipelineError, PipelineResult};
use crate::linker::LinkedObject;
use crate::pipeline::{AnalysisDb, elapsed_ms};

/// Extension of raw word dumps
pub const WORDS_EXTENSION: &str = "txt";

/// Extension of disassembly dumps
pub const DISASSEMBLY_EXTENSION: &str = "func";

/// File collecting the scripts of all objects
pub const SCRIPTS_FILE_NAME: &str = "all_scripts.lisp";

const SCRIPT_BANNER_TOP: &str = ";--------------------------------------\n";
const SCRIPT_BANNER_BOTTOM: &str = ";---------------------------------------\n";

/// Files and bytes written by one writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Files written
    pub files: usize,
    /// Bytes written
    pub bytes: u64,
}

impl WriteSummary {
    fn add(&mut self, len: usize) {
        self.files += 1;
        self.bytes += len as u64;
    }

    fn log(&self, what: &str, start: Instant) {
        let ms = elapsed_ms(start);
        let mb = self.bytes as f64 / (1u64 << 20) as f64;
        info!(
            "Wrote {what}: {} files, {mb:.3} MB, {ms:.3} ms ({:.3} MB/sec)",
            self.files,
            mb / (ms / 1000.0).max(f64::EPSILON)
        );
    }
}

fn write_text(path: PathBuf, text: &str) -> PipelineResult<()> {
    std::fs::write(&path, text).map_err(|source| PipelineError::Io { path, source })
}

/// Write `<unique>.txt` word dumps
///
/// With `dump_v3_only`, only objects with three segments are written.
pub fn write_object_file_words<L, S>(
    db: &AnalysisDb<L, S>,
    dir: &Path,
    dump_v3_only: bool,
) -> PipelineResult<WriteSummary>
where
    L: LinkedObject,
    S: BuildHasher,
{
    if dump_v3_only {
        info!("Writing object file dumps (v3 only)");
    } else {
        info!("Writing object file dumps (all)");
    }
    let start = Instant::now();
    let mut summary = WriteSummary::default();

    for entry in db.entries() {
        let unique = entry.record().unique_name();
        let linked = entry.enrichment.linked_at(Phase::Linked, &unique)?;
        if linked.segment_count() == 3 || !dump_v3_only {
            let text = linked.print_words();
            write_text(dir.join(format!("{unique}.{WORDS_EXTENSION}")), &text)?;
            summary.add(text.len());
        }
    }

    summary.log("object file dumps", start);
    Ok(summary)
}

/// Write `<unique>.func` disassembly for objects with functions
pub fn write_disassembly<L, S>(
    db: &AnalysisDb<L, S>,
    dir: &Path,
    disassemble_objects_without_functions: bool,
) -> PipelineResult<WriteSummary>
where
    L: LinkedObject,
    S: BuildHasher,
{
    info!("Writing functions");
    let start = Instant::now();
    let mut summary = WriteSummary::default();

    for entry in db.entries() {
        let unique = entry.record().unique_name();
        let enrichment = &entry.enrichment;
        let linked = enrichment.linked_at(Phase::CodeFound, &unique)?;
        if enrichment.has_any_functions() || disassemble_objects_without_functions {
            let text = linked.print_disassembly(enrichment.functions_by_seg());
            write_text(dir.join(format!("{unique}.{DISASSEMBLY_EXTENSION}")), &text)?;
            summary.add(text.len());
        }
    }

    summary.log("function dumps", start);
    Ok(summary)
}

/// Collect the scripts of every object into `all_scripts.lisp`
///
/// The file is written even when no object has scripts.
pub fn find_and_write_scripts<L, S>(db: &AnalysisDb<L, S>, dir: &Path) -> PipelineResult<WriteSummary>
where
    L: LinkedObject,
    S: BuildHasher,
{
    info!("Finding scripts in object files");
    let start = Instant::now();
    let mut all_scripts = String::new();

    for entry in db.entries() {
        let unique = entry.record().unique_name();
        let scripts = entry
            .enrichment
            .linked_at(Phase::Linked, &unique)?
            .print_scripts();
        if !scripts.is_empty() {
            all_scripts.push_str(SCRIPT_BANNER_TOP);
            all_scripts.push_str("; ");
            all_scripts.push_str(&unique);
            all_scripts.push('\n');
            all_scripts.push_str(SCRIPT_BANNER_BOTTOM);
            all_scripts.push_str(&scripts);
        }
    }

    write_text(dir.join(SCRIPTS_FILE_NAME), &all_scripts)?;
    let mut summary = WriteSummary::default();
    summary.add(all_scripts.len());
    summary.log("scripts", start);
    Ok(summary)
}

/// Write the archive listing to `dgo.txt`
pub fn write_listing<L, S>(db: &AnalysisDb<L, S>, dir: &Path) -> PipelineResult<WriteSummary> {
    let start = Instant::now();
    let listing = db.generate_dgo_listing();
    write_text(dir.join(LISTING_FILE_NAME), &listing)?;

    let mut summary = WriteSummary::default();
    summary.add(listing.len());
    summary.log("archive listing", start);
    Ok(summary)
}

/// Run the writers selected in `options`, creating `dir` if needed
pub fn write_artifacts<L, S>(
    db: &AnalysisDb<L, S>,
    dir: &Path,
    options: &ExportOptions,
) -> PipelineResult<WriteSummary>
where
    L: LinkedObject,
    S: BuildHasher,
{
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut total = WriteSummary::default();
    let mut merge = |summary: WriteSummary| {
        total.files += summary.files;
        total.bytes += summary.bytes;
    };

    if options.write_listing {
        merge(write_listing(db, dir)?);
    }
    if options.write_words {
        merge(write_object_file_words(db, dir, options.dump_v3_only)?);
    }
    if options.write_disassembly {
        merge(write_disassembly(
            db,
            dir,
            options.disassemble_objects_without_functions,
        )?);
    }
    if options.write_scripts {
        merge(find_and_write_scripts(db, dir)?);
    }
    Ok(total)
}
