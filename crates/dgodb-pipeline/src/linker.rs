//! Interfaces to the linker and disassembler
//!
//! The pipeline only sequences work and checks invariants. Turning raw
//! object bytes into segments, instructions and text is done by an
//! implementation of these traits.

use crate::error::PipelineResult;
use crate::function::{BasicBlock, Function};
use crate::prologue::PrologueOp;
use crate::stats::LinkStats;

/// Produces the linked form of raw object bytes
pub trait Linker {
    /// Linked representation stored in each object's enrichment
    type Object: LinkedObject;

    /// Link one object. `name` is the object's name without version.
    fn link(&self, data: &[u8], name: &str) -> PipelineResult<Self::Object>;
}

/// Operations on a linked object
pub trait LinkedObject {
    /// Counters accumulated so far
    fn stats(&self) -> LinkStats;

    /// Number of segments in the link data
    fn segment_count(&self) -> usize;

    /// Name labels in address order; returns how many were named
    fn set_ordered_label_names(&mut self) -> usize;

    /// Split each segment into code and data regions
    fn find_code(&mut self);

    /// Function boundaries per segment, in address order
    fn find_functions(&mut self) -> Vec<Vec<Function>>;

    /// Decode the instructions of every function
    fn disassemble_functions(&mut self, functions_by_seg: &mut [Vec<Function>]);

    /// Resolve memory references made relative to `fp`
    fn process_fp_relative_links(&mut self, functions_by_seg: &mut [Vec<Function>]);

    /// Basic blocks of one function
    fn find_basic_blocks(&self, segment: usize, function: &Function) -> Vec<BasicBlock>;

    /// Leading instructions of a function, classified for prologue analysis
    fn prologue_ops(&self, segment: usize, function: &Function) -> Vec<PrologueOp>;

    /// Record the global functions defined by the top-level initializer;
    /// returns how many were found
    fn find_global_function_defs(&mut self, top_level: &Function) -> usize;

    /// Raw words with link annotations
    fn print_words(&self) -> String;

    /// Disassembly of all segments
    fn print_disassembly(&self, functions_by_seg: &[Vec<Function>]) -> String;

    /// Embedded script forms, empty if there are none
    fn print_scripts(&self) -> String;
}
