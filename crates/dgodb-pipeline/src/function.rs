//! Functions discovered in an object's code segments

use tracing::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::prologue::{Prologue, PrologueOp};
use crate::register::{Gpr, expected_fpr_backup, expected_gpr_backup};

/// Name given to the initializer function of a three-segment object
pub const TOP_LEVEL_INIT_NAME: &str = "(top-level-init)";

/// Range of instructions with a single entry and exit
///
/// Words are instruction indices relative to the function start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicBlock {
    /// First instruction
    pub start_word: usize,
    /// One past the last instruction
    pub end_word: usize,
}

impl BasicBlock {
    /// Create a block covering `start_word..end_word`
    pub const fn new(start_word: usize, end_word: usize) -> Self {
        Self {
            start_word,
            end_word,
        }
    }
}

/// A function and what analysis has learned about it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Function {
    /// First word within the segment
    pub start_word: usize,
    /// One past the last word within the segment
    pub end_word: usize,
    /// Name, if one could be determined
    pub guessed_name: String,
    /// Blocks in address order
    pub basic_blocks: Vec<BasicBlock>,
    /// Decoded stack frame
    pub prologue: Prologue,
    /// First prologue instruction
    pub prologue_start: usize,
    /// One past the last prologue instruction
    pub prologue_end: usize,
    /// Diagnostics collected during analysis
    pub warnings: Vec<String>,
    /// The prologue does not look compiler-generated
    pub suspected_asm: bool,
}

impl Function {
    /// Function spanning `start_word..end_word` of its segment
    pub fn new(start_word: usize, end_word: usize) -> Self {
        Self {
            start_word,
            end_word,
            ..Self::default()
        }
    }

    /// Guessed name, or the start word when there is none
    pub fn display_name(&self) -> String {
        if self.guessed_name.is_empty() {
            format!("function at word {}", self.start_word)
        } else {
            self.guessed_name.clone()
        }
    }

    /// Decode the prologue from the function's leading instructions
    ///
    /// Instruction 0 is the function's type tag, so scanning begins at 1.
    /// Basic blocks must already be set. A register saved out of the
    /// compiler's order marks the function as suspected assembly and leaves
    /// the prologue undecoded; that is a diagnostic, not an error.
    pub fn analyze_prologue(&mut self, ops: &[PrologueOp]) -> PipelineResult<()> {
        let op = |idx: usize| ops.get(idx).copied().unwrap_or(PrologueOp::Other);
        let mut prologue = Prologue::default();
        let mut idx = 1;
        let (mut start, mut end) = (0, 0);

        if let PrologueOp::AdjustSp(imm @ i32::MIN..=-1) = op(idx) {
            prologue.total_stack_usage = imm.unsigned_abs();
            idx += 1;
        }

        if prologue.total_stack_usage != 0 {
            if let PrologueOp::StoreGpr {
                src: Gpr::Ra,
                offset,
                quad: false,
            } = op(idx)
            {
                prologue.ra_backed_up = true;
                prologue.ra_backup_offset = stack_offset(offset)?;
                if prologue.ra_backup_offset != 0 {
                    return Err(self.violation(format!("ra backed up at offset {offset}")));
                }
                idx += 1;
            }

            if let PrologueOp::StoreGpr {
                src: Gpr::Fp,
                offset,
                quad: false,
            } = op(idx)
            {
                prologue.fp_backed_up = true;
                prologue.fp_backup_offset = stack_offset(offset)?;
                if prologue.fp_backup_offset != 8 {
                    return Err(self.violation(format!("fp backed up at offset {offset}")));
                }
                idx += 1;

                prologue.fp_set = op(idx)
                    == PrologueOp::Or {
                        dst: Gpr::Fp,
                        lhs: Gpr::T9,
                        rhs: Gpr::R0,
                    };
                if !prologue.fp_set {
                    return Err(self.violation(format!("fp backed up, then {}", op(idx))));
                }
                idx += 1;
            }

            let mut gpr_stores = Vec::new();
            let mut expect_nothing_after_gprs = false;
            while let PrologueOp::StoreGpr {
                src,
                offset,
                quad: true,
            } = op(idx + gpr_stores.len())
            {
                // Stack zeroing and spilled arguments look like backups
                if src == Gpr::R0 {
                    self.warn("Stack Zeroing Detected, prologue may be wrong".to_string());
                    expect_nothing_after_gprs = true;
                    break;
                }
                if src == Gpr::A0 {
                    self.warn("a0 on stack detected, prologue may be wrong".to_string());
                    expect_nothing_after_gprs = true;
                    break;
                }
                gpr_stores.push((src, offset));
            }

            if let Some(&(_, first)) = gpr_stores.first() {
                prologue.gpr_backup_offset = stack_offset(first)?;
                for (i, &(src, offset)) in gpr_stores.iter().enumerate() {
                    if i64::from(offset) != i64::from(first) + 16 * i as i64 {
                        return Err(self.violation(format!("gpr backup {i} at offset {offset}")));
                    }
                    if expected_gpr_backup(i, gpr_stores.len()) != Some(src) {
                        self.flag_asm(op(idx + i));
                        return Ok(());
                    }
                }
            }
            prologue.n_gpr_backup = gpr_stores.len();
            idx += gpr_stores.len();

            let mut fpr_stores = Vec::new();
            if !expect_nothing_after_gprs {
                while let PrologueOp::StoreFpr { src, offset } = op(idx + fpr_stores.len()) {
                    fpr_stores.push((src, offset));
                }
            }

            if let Some(&(_, first)) = fpr_stores.first() {
                prologue.fpr_backup_offset = stack_offset(first)?;
                for (i, &(src, offset)) in fpr_stores.iter().enumerate() {
                    if i64::from(offset) != i64::from(first) + 4 * i as i64 {
                        return Err(self.violation(format!("fpr backup {i} at offset {offset}")));
                    }
                    if expected_fpr_backup(i, fpr_stores.len()) != Some(src) {
                        self.flag_asm(op(idx + i));
                        return Ok(());
                    }
                }
            }
            prologue.n_fpr_backup = fpr_stores.len();
            idx += fpr_stores.len();

            start = 1;
            end = idx;

            prologue
                .compute_stack_vars()
                .and_then(|()| prologue.check_stack_layout())
                .map_err(|e| e.with_context(&self.display_name()))?;
        }

        self.apply_prologue(prologue, start, end)
    }

    /// Install a decoded prologue and remove it from the first basic block
    ///
    /// The first block may consist of nothing but the prologue, but it must
    /// cover all of it.
    pub fn apply_prologue(
        &mut self,
        mut prologue: Prologue,
        start: usize,
        end: usize,
    ) -> PipelineResult<()> {
        let Some(first) = self.basic_blocks.first_mut() else {
            return Err(self.violation("no basic blocks".to_string()));
        };
        if first.end_word < end {
            let block_end = first.end_word;
            return Err(self.violation(format!(
                "prologue ends at word {end}, past the first basic block ending at {block_end}"
            )));
        }
        first.start_word = end;

        prologue.decoded = true;
        self.prologue = prologue;
        self.prologue_start = start;
        self.prologue_end = end;
        Ok(())
    }

    fn warn(&mut self, message: String) {
        warn!("{}: {message}", self.display_name());
        self.warnings.push(message);
    }

    fn flag_asm(&mut self, store: PrologueOp) {
        self.suspected_asm = true;
        self.warn(format!("Suspected asm function due to stack store: {store}"));
    }

    fn violation(&self, message: String) -> PipelineError {
        PipelineError::InvariantViolation(format!("{}: {message}", self.display_name()))
    }
}

fn stack_offset(offset: i32) -> PipelineResult<u32> {
    u32::try_from(offset).map_err(|_| {
        PipelineError::InvariantViolation(format!("negative stack offset {offset}"))
    })
}
