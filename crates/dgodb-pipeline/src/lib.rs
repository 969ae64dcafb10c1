//! Analysis phases over a deduplicated object store
//!
//! After [`dgodb_store::ObjectFileDb`] has ingested every archive, the
//! [`Pipeline`] walks the unique objects and enriches each in a fixed order:
//!
//! 1. link the raw bytes ([`Pipeline::process_link_data`])
//! 2. name labels ([`Pipeline::process_labels`])
//! 3. find, disassemble and resolve functions ([`Pipeline::find_code`])
//! 4. split into basic blocks, decode prologues and name the top-level
//!    initializer ([`Pipeline::analyze_functions`])
//!
//! Linking and disassembly are supplied through the [`Linker`] and
//! [`LinkedObject`] traits. Stack-frame analysis of function prologues is
//! done here, in [`Function::analyze_prologue`].
//!
//! The [`export`] module writes text artifacts from the analysed store.

#![allow(clippy::cast_possible_truncation)] // Stack offsets and counts are small
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)] // Only used for reporting
#![warn(missing_docs)]

pub mod config;
pub mod enrichment;
mod error;
pub mod export;
pub mod function;
pub mod linker;
pub mod pipeline;
pub mod prologue;
pub mod register;
pub mod stats;

pub use config::{ExportOptions, GameVersion, PipelineConfig};
pub use enrichment::{Enrichment, Phase};
pub use error::{PipelineError, PipelineResult};
pub use function::{BasicBlock, Function, TOP_LEVEL_INIT_NAME};
pub use linker::{LinkedObject, Linker};
pub use pipeline::{
    AnalysisDb, AnalysisSummary, CodeSummary, IncompleteDecode, Pipeline, RunSummary,
    for_each_function,
};
pub use prologue::{Prologue, PrologueOp};
pub use register::{Fpr, Gpr};
pub use stats::LinkStats;
