//! Stack frame layout of compiled functions
//!
//! The compiler emits a fixed prologue shape:
//!
//! ```text
//! daddiu sp, sp, -total      ; allocate the frame
//! sd     ra, 0(sp)           ; optional return address backup
//! sd     fp, 8(sp)           ; optional frame pointer backup...
//! or     fp, t9, r0          ; ...always followed by setting fp
//! sq     <gpr>, off(sp)      ; callee-saved GPRs, 16 bytes apart
//! swc1   <fpr>, off(sp)      ; callee-saved FPRs, 4 bytes apart
//! ```
//!
//! Stack variables sit between the fp slot and the register backups. The
//! whole frame is 16-byte aligned.

use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::register::{FPR_BACKUPS, Fpr, GPR_BACKUPS, Gpr};

/// One instruction at the head of a function, as classified by the
/// disassembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrologueOp {
    /// `daddiu sp, sp, imm`
    AdjustSp(i32),
    /// `sd` (8 bytes) or `sq` (16 bytes, `quad`) of `src` at `offset(sp)`
    StoreGpr {
        /// Register being stored
        src: Gpr,
        /// Offset from `sp`
        offset: i32,
        /// 16-byte store
        quad: bool,
    },
    /// `swc1 src, offset(sp)`
    StoreFpr {
        /// Register being stored
        src: Fpr,
        /// Offset from `sp`
        offset: i32,
    },
    /// `or dst, lhs, rhs`
    Or {
        /// Destination
        dst: Gpr,
        /// First source
        lhs: Gpr,
        /// Second source
        rhs: Gpr,
    },
    /// Anything else
    Other,
}

impl fmt::Display for PrologueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::AdjustSp(imm) => write!(f, "daddiu sp, sp, {imm}"),
            Self::StoreGpr { src, offset, quad } => {
                let op = if quad { "sq" } else { "sd" };
                write!(f, "{op} {src}, {offset}(sp)")
            }
            Self::StoreFpr { src, offset } => write!(f, "swc1 {src}, {offset}(sp)"),
            Self::Or { dst, lhs, rhs } => write!(f, "or {dst}, {lhs}, {rhs}"),
            Self::Other => f.write_str("<other>"),
        }
    }
}

/// Decoded stack frame of one function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Prologue {
    /// The prologue matched the expected shape
    pub decoded: bool,
    /// Bytes allocated by the frame
    pub total_stack_usage: u32,
    /// `ra` is saved
    pub ra_backed_up: bool,
    /// Offset of the saved `ra`
    pub ra_backup_offset: u32,
    /// `fp` is saved
    pub fp_backed_up: bool,
    /// Offset of the saved `fp`
    pub fp_backup_offset: u32,
    /// `fp` is loaded from `t9` after being saved
    pub fp_set: bool,
    /// Number of saved GPRs
    pub n_gpr_backup: usize,
    /// Offset of the first saved GPR
    pub gpr_backup_offset: u32,
    /// Number of saved FPRs
    pub n_fpr_backup: usize,
    /// Offset of the first saved FPR
    pub fpr_backup_offset: u32,
    /// Start of the stack variable area
    pub stack_var_offset: u32,
    /// Size of the stack variable area, padding included
    pub n_stack_var_bytes: u32,
}

const fn align4(value: u32) -> u32 {
    (value + 3) & !3
}

const fn align8(value: u32) -> u32 {
    (value + 7) & !7
}

const fn align16(value: u32) -> u32 {
    (value + 15) & !15
}

fn expect_offset(what: &str, actual: u32, expected: u32) -> PipelineResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(PipelineError::InvariantViolation(format!(
            "{what} at stack offset {actual}, expected {expected}"
        )))
    }
}

impl Prologue {
    /// Derive the stack variable area from the backups
    ///
    /// Variables start after the `ra`/`fp` slots and end where the first
    /// register backup begins, or at the end of the frame if none are saved.
    pub fn compute_stack_vars(&mut self) -> PipelineResult<()> {
        self.stack_var_offset = if self.fp_backed_up {
            16
        } else if self.ra_backed_up {
            8
        } else {
            0
        };

        let end = match (self.n_gpr_backup, self.n_fpr_backup) {
            (0, 0) => self.total_stack_usage,
            (0, _) => self.fpr_backup_offset,
            (_, 0) => self.gpr_backup_offset,
            _ => {
                if self.fpr_backup_offset <= self.gpr_backup_offset {
                    return Err(PipelineError::InvariantViolation(format!(
                        "fpr backups at {} precede gpr backups at {}",
                        self.fpr_backup_offset, self.gpr_backup_offset
                    )));
                }
                self.gpr_backup_offset
            }
        };

        self.n_stack_var_bytes = end.checked_sub(self.stack_var_offset).ok_or_else(|| {
            PipelineError::InvariantViolation(format!(
                "stack variables end at {end}, before their start at {}",
                self.stack_var_offset
            ))
        })?;
        Ok(())
    }

    /// Walk the frame in slot order and verify every offset and the total
    pub fn check_stack_layout(&self) -> PipelineResult<()> {
        let mut total = 0;

        if self.ra_backed_up {
            total = align8(total);
            expect_offset("ra backup", self.ra_backup_offset, total)?;
            total += 8;
        }

        // fp without ra still skips the ra slot
        if !self.ra_backed_up && self.fp_backed_up {
            total += 8;
        }

        if self.fp_backed_up {
            total = align8(total);
            expect_offset("fp backup", self.fp_backup_offset, total)?;
            total += 8;
            if !self.fp_set {
                return Err(PipelineError::InvariantViolation(
                    "fp backed up but never set".to_string(),
                ));
            }
        }

        if self.n_stack_var_bytes != 0 {
            expect_offset("stack variables", self.stack_var_offset, total)?;
            total += self.n_stack_var_bytes;
        }

        if self.n_gpr_backup != 0 {
            total = align16(total);
            expect_offset("gpr backups", self.gpr_backup_offset, total)?;
            total += 16 * self.n_gpr_backup as u32;
        }

        if self.n_fpr_backup != 0 {
            total = align4(total);
            expect_offset("fpr backups", self.fpr_backup_offset, total)?;
            total += 4 * self.n_fpr_backup as u32;
        }

        expect_offset("end of frame", self.total_stack_usage, align16(total))
    }

    /// Text form used in disassembly listings
    pub fn render(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        if !self.decoded {
            return format!("{pad}BAD PROLOGUE");
        }

        let mut out = format!(
            "{pad}stack: total 0x{:02x}, fp? {} ra? {}",
            self.total_stack_usage,
            u8::from(self.fp_set),
            u8::from(self.ra_backed_up)
        );
        if self.n_stack_var_bytes != 0 {
            let _ = write!(
                out,
                "\n{pad}stack_vars: {} bytes at {}",
                self.n_stack_var_bytes, self.stack_var_offset
            );
        }
        if self.n_gpr_backup != 0 {
            let _ = write!(out, "\n{pad}gprs:");
            for reg in GPR_BACKUPS.iter().take(self.n_gpr_backup) {
                let _ = write!(out, " {reg}");
            }
        }
        if self.n_fpr_backup != 0 {
            let _ = write!(out, "\n{pad}fprs:");
            for reg in FPR_BACKUPS.iter().take(self.n_fpr_backup) {
                let _ = write!(out, " {reg}");
            }
        }
        out
    }
}
