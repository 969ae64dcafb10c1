//! EE register names used by prologue analysis

use std::fmt;

/// General purpose register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Gpr {
    R0,
    At,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    T8,
    T9,
    K0,
    K1,
    Gp,
    Sp,
    Fp,
    Ra,
}

impl Gpr {
    /// Assembler name
    pub const fn name(self) -> &'static str {
        match self {
            Self::R0 => "r0",
            Self::At => "at",
            Self::V0 => "v0",
            Self::V1 => "v1",
            Self::A0 => "a0",
            Self::A1 => "a1",
            Self::A2 => "a2",
            Self::A3 => "a3",
            Self::T0 => "t0",
            Self::T1 => "t1",
            Self::T2 => "t2",
            Self::T3 => "t3",
            Self::T4 => "t4",
            Self::T5 => "t5",
            Self::T6 => "t6",
            Self::T7 => "t7",
            Self::S0 => "s0",
            Self::S1 => "s1",
            Self::S2 => "s2",
            Self::S3 => "s3",
            Self::S4 => "s4",
            Self::S5 => "s5",
            Self::S6 => "s6",
            Self::S7 => "s7",
            Self::T8 => "t8",
            Self::T9 => "t9",
            Self::K0 => "k0",
            Self::K1 => "k1",
            Self::Gp => "gp",
            Self::Sp => "sp",
            Self::Fp => "fp",
            Self::Ra => "ra",
        }
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Floating point register `f0`..`f31`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fpr(pub u8);

impl fmt::Display for Fpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Callee-saved GPRs in the order the compiler assigns backup slots
pub const GPR_BACKUPS: [Gpr; 7] = [Gpr::Gp, Gpr::S5, Gpr::S4, Gpr::S3, Gpr::S2, Gpr::S1, Gpr::S0];

/// Callee-saved FPRs in the order the compiler assigns backup slots
pub const FPR_BACKUPS: [Fpr; 6] = [Fpr(30), Fpr(28), Fpr(26), Fpr(24), Fpr(22), Fpr(20)];

/// Register expected in backup slot `n` when `total` GPRs are saved
///
/// Slots are filled in reverse, so the last slot always holds `gp`.
/// Returns `None` if `n >= total` or more registers are saved than exist.
pub fn expected_gpr_backup(n: usize, total: usize) -> Option<Gpr> {
    expected_backup(&GPR_BACKUPS, n, total)
}

/// Register expected in backup slot `n` when `total` FPRs are saved
pub fn expected_fpr_backup(n: usize, total: usize) -> Option<Fpr> {
    expected_backup(&FPR_BACKUPS, n, total)
}

fn expected_backup<R: Copy>(table: &[R], n: usize, total: usize) -> Option<R> {
    if n >= total || total > table.len() {
        return None;
    }
    table.get(total - 1 - n).copied()
}
