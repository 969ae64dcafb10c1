//! Phase orchestration over the object store
//!
//! Each phase visits every stored object once, in the store's traversal
//! order, and advances its [`Phase`]. Counters are summed across objects.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::time::Instant;

use dgodb_store::{ObjectFileDb, ObjectRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::enrichment::{Enrichment, Phase};
use crate::error::{PipelineError, PipelineResult};
use crate::function::{Function, TOP_LEVEL_INIT_NAME};
use crate::linker::{LinkedObject, Linker};
use crate::stats::LinkStats;

/// Object store whose entries carry analysis state for linked type `L`
pub type AnalysisDb<L, S = RandomState> = ObjectFileDb<Enrichment<L>, S>;

/// An object whose code did not fully decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteDecode {
    /// Unique name of the object
    pub object: String,
    /// Instructions decoded
    pub decoded_ops: u64,
    /// Instruction words in its code
    pub expected_ops: u64,
}

/// Result of code discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeSummary {
    /// Counters summed over all objects
    pub stats: LinkStats,
    /// Objects with undecoded instructions
    pub incomplete_decodes: Vec<IncompleteDecode>,
    /// Objects whose frame-pointer links were not resolved
    pub skipped_fp_links: Vec<String>,
}

/// Result of function analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    /// Basic blocks found
    pub basic_blocks: usize,
    /// Functions whose prologue decoded
    pub decoded_prologues: usize,
    /// Functions flagged as hand-written assembly
    pub suspected_asm: usize,
    /// Objects with a named top-level initializer
    pub top_level_functions: usize,
    /// Global function definitions found in initializers
    pub global_function_defs: usize,
}

/// Results of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Link counters
    pub link: LinkStats,
    /// Labels named
    pub labels: usize,
    /// Code discovery results
    pub code: CodeSummary,
    /// Function analysis results
    pub analysis: AnalysisSummary,
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Runs the analysis phases with a given linker
#[derive(Debug)]
pub struct Pipeline<K> {
    linker: K,
    config: PipelineConfig,
}

impl<K: Linker> Pipeline<K> {
    /// Create a pipeline
    pub const fn new(linker: K, config: PipelineConfig) -> Self {
        Self { linker, config }
    }

    /// Configuration in use
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Linker in use
    pub const fn linker(&self) -> &K {
        &self.linker
    }

    /// Run every phase in order
    pub fn run<S: BuildHasher>(&self, db: &mut AnalysisDb<K::Object, S>) -> PipelineResult<RunSummary> {
        let link = self.process_link_data(db)?;
        let labels = self.process_labels(db)?;
        let code = self.find_code(db)?;
        let analysis = self.analyze_functions(db)?;
        Ok(RunSummary {
            link,
            labels,
            code,
            analysis,
        })
    }

    /// Link every object
    pub fn process_link_data<S: BuildHasher>(
        &self,
        db: &mut AnalysisDb<K::Object, S>,
    ) -> PipelineResult<LinkStats> {
        info!("Processing link data");
        let start = Instant::now();
        let mut combined = LinkStats::default();

        db.try_for_each_obj_mut(|entry| -> PipelineResult<()> {
            let (record, data, enrichment) = entry.split_mut();
            let unique = record.unique_name();
            enrichment.require(Phase::Unlinked, &unique)?;

            debug!("Linking {unique}");
            let linked = self.linker.link(data, &record.name)?;
            combined += linked.stats();
            enrichment.set_linked(linked);
            Ok(())
        })?;

        for line in combined.render_link().lines() {
            info!("{line}");
        }
        info!("Processed link data in {:.3} ms", elapsed_ms(start));
        Ok(combined)
    }

    /// Name labels in every object; returns the total named
    pub fn process_labels<S: BuildHasher>(
        &self,
        db: &mut AnalysisDb<K::Object, S>,
    ) -> PipelineResult<usize> {
        info!("Processing labels");
        let start = Instant::now();
        let mut total = 0;

        db.try_for_each_obj_mut(|entry| -> PipelineResult<()> {
            let unique = entry.record().unique_name();
            let enrichment = &mut entry.enrichment;
            enrichment.require(Phase::Linked, &unique)?;

            total += enrichment.linked_mut(&unique)?.set_ordered_label_names();
            enrichment.advance(Phase::Labeled);
            Ok(())
        })?;

        info!("Processed {total} labels in {:.3} ms", elapsed_ms(start));
        Ok(total)
    }

    /// Find and disassemble the functions of every object
    ///
    /// Incomplete decodes and skipped frame-pointer passes are reported,
    /// not treated as errors.
    pub fn find_code<S: BuildHasher>(
        &self,
        db: &mut AnalysisDb<K::Object, S>,
    ) -> PipelineResult<CodeSummary> {
        info!("Finding code in object files");
        let start = Instant::now();
        let mut summary = CodeSummary::default();

        db.try_for_each_obj_mut(|entry| -> PipelineResult<()> {
            let unique = entry.record().unique_name();
            let enrichment = &mut entry.enrichment;
            enrichment.require(Phase::Labeled, &unique)?;

            let (linked, functions_by_seg) = enrichment.parts_mut(&unique)?;
            linked.find_code();
            let mut functions = linked.find_functions();
            linked.disassemble_functions(&mut functions);

            if self.config.resolves_fp_links(&unique) {
                linked.process_fp_relative_links(&mut functions);
            } else {
                warn!("Skipping frame-pointer-relative links in {unique}");
                summary.skipped_fp_links.push(unique.clone());
            }

            let stats = linked.stats();
            if stats.is_decode_incomplete() {
                warn!(
                    "Failed to decode all in {unique} ({} / {})",
                    stats.decoded_ops,
                    stats.expected_ops()
                );
                summary.incomplete_decodes.push(IncompleteDecode {
                    object: unique.clone(),
                    decoded_ops: stats.decoded_ops,
                    expected_ops: stats.expected_ops(),
                });
            }
            summary.stats += stats;

            *functions_by_seg = functions;
            enrichment.advance(Phase::CodeFound);
            Ok(())
        })?;

        for line in summary.stats.render_code().lines() {
            info!("{line}");
        }
        info!("Found code in {:.3} ms", elapsed_ms(start));
        Ok(summary)
    }

    /// Analyse functions and name top-level initializers
    ///
    /// Basic blocks and prologues are only computed when
    /// [`PipelineConfig::find_basic_blocks`] is set.
    pub fn analyze_functions<S: BuildHasher>(
        &self,
        db: &mut AnalysisDb<K::Object, S>,
    ) -> PipelineResult<AnalysisSummary> {
        info!("Analyzing functions");
        let start = Instant::now();
        let find_blocks = self.config.find_basic_blocks;
        let mut summary = AnalysisSummary::default();

        db.try_for_each_obj_mut(|entry| -> PipelineResult<()> {
            let unique = entry.record().unique_name();
            let enrichment = &mut entry.enrichment;
            enrichment.require(Phase::CodeFound, &unique)?;

            let (linked, functions_by_seg) = enrichment.parts_mut(&unique)?;
            if find_blocks {
                for (seg, functions) in functions_by_seg.iter_mut().enumerate() {
                    for function in functions {
                        let blocks = linked.find_basic_blocks(seg, function);
                        summary.basic_blocks += blocks.len();
                        function.basic_blocks = blocks;

                        let ops = linked.prologue_ops(seg, function);
                        function
                            .analyze_prologue(&ops)
                            .map_err(|e| e.with_context(&unique))?;
                        summary.decoded_prologues += usize::from(function.prologue.decoded);
                        summary.suspected_asm += usize::from(function.suspected_asm);
                    }
                }
            }

            if linked.segment_count() == 3 {
                summary.global_function_defs += name_top_level(linked, functions_by_seg, &unique)?;
                summary.top_level_functions += 1;
            }

            enrichment.advance(Phase::Analyzed);
            Ok(())
        })?;

        if find_blocks {
            info!(
                "Found {} basic blocks in {:.3} ms",
                summary.basic_blocks,
                elapsed_ms(start)
            );
        }
        info!(
            "Named {} top-level functions, {} global definitions",
            summary.top_level_functions, summary.global_function_defs
        );
        Ok(summary)
    }
}

/// Name the single segment-2 function of a three-segment object
fn name_top_level<L: LinkedObject>(
    linked: &mut L,
    functions_by_seg: &mut [Vec<Function>],
    unique: &str,
) -> PipelineResult<usize> {
    let count = functions_by_seg.get(2).map_or(0, Vec::len);
    let Some([function]) = functions_by_seg.get_mut(2).map(Vec::as_mut_slice) else {
        return Err(PipelineError::InvariantViolation(format!(
            "{unique}: top-level segment has {count} functions, expected 1"
        )));
    };

    if !function.guessed_name.is_empty() {
        return Err(PipelineError::InvariantViolation(format!(
            "{unique}: top-level function is already named {}",
            function.guessed_name
        )));
    }
    function.guessed_name = TOP_LEVEL_INIT_NAME.to_string();
    Ok(linked.find_global_function_defs(function))
}

/// Visit every function of every object, in traversal order
///
/// Each object must have been through code discovery.
pub fn for_each_function<L, S, F>(db: &AnalysisDb<L, S>, mut f: F) -> PipelineResult<()>
where
    S: BuildHasher,
    F: FnMut(&ObjectRecord, usize, &Function),
{
    for entry in db.entries() {
        entry
            .enrichment
            .require_at_least(Phase::CodeFound, &entry.record().unique_name())?;
        for (seg, function) in entry.enrichment.functions() {
            f(entry.record(), seg, function);
        }
    }
    Ok(())
}
