//! Per-object analysis state
//!
//! Each stored object carries an [`Enrichment`] that moves through the
//! [`Phase`]s in order. Every pipeline step checks the phase before doing
//! anything, so running a step twice or out of order is an error instead of
//! silently working on missing data.

use std::fmt;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::function::Function;

/// How far analysis of an object has progressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Raw bytes only
    #[default]
    Unlinked,
    /// Segments, relocations and symbols are known
    Linked,
    /// Labels have names
    Labeled,
    /// Functions are found and disassembled
    CodeFound,
    /// Functions are analysed and the top-level initializer is named
    Analyzed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unlinked => "unlinked",
            Self::Linked => "linked",
            Self::Labeled => "labeled",
            Self::CodeFound => "code-found",
            Self::Analyzed => "analyzed",
        })
    }
}

/// Analysis state of one object
#[derive(Debug, Clone)]
pub struct Enrichment<L> {
    phase: Phase,
    linked: Option<L>,
    functions_by_seg: Vec<Vec<Function>>,
}

impl<L> Default for Enrichment<L> {
    fn default() -> Self {
        Self {
            phase: Phase::Unlinked,
            linked: None,
            functions_by_seg: Vec::new(),
        }
    }
}

impl<L> Enrichment<L> {
    /// Current phase
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Linked representation, once linked
    pub const fn linked(&self) -> Option<&L> {
        self.linked.as_ref()
    }

    /// Functions per segment, in discovery order
    pub fn functions_by_seg(&self) -> &[Vec<Function>] {
        &self.functions_by_seg
    }

    /// Every function with its segment index
    pub fn functions(&self) -> impl Iterator<Item = (usize, &Function)> + '_ {
        self.functions_by_seg
            .iter()
            .enumerate()
            .flat_map(|(seg, functions)| functions.iter().map(move |f| (seg, f)))
    }

    /// True if any segment has a function
    pub fn has_any_functions(&self) -> bool {
        self.functions_by_seg.iter().any(|seg| !seg.is_empty())
    }

    /// Fail unless the object is exactly at `required`
    pub fn require(&self, required: Phase, object: &str) -> PipelineResult<()> {
        if self.phase == required {
            Ok(())
        } else {
            Err(self.phase_error(required, object))
        }
    }

    /// Fail unless the object has reached at least `required`
    pub fn require_at_least(&self, required: Phase, object: &str) -> PipelineResult<()> {
        if self.phase >= required {
            Ok(())
        } else {
            Err(self.phase_error(required, object))
        }
    }

    /// Linked representation, for an object that has reached `required`
    pub fn linked_at(&self, required: Phase, object: &str) -> PipelineResult<&L> {
        self.require_at_least(required, object)?;
        self.linked
            .as_ref()
            .ok_or_else(|| self.phase_error(Phase::Linked, object))
    }

    pub(crate) fn set_linked(&mut self, linked: L) {
        self.linked = Some(linked);
        self.phase = Phase::Linked;
    }

    pub(crate) fn linked_mut(&mut self, object: &str) -> PipelineResult<&mut L> {
        let phase = self.phase;
        self.linked.as_mut().ok_or_else(|| PipelineError::PhaseOrder {
            object: object.to_string(),
            required: Phase::Linked,
            actual: phase,
        })
    }

    /// Linked object and functions, borrowed together
    pub(crate) fn parts_mut(
        &mut self,
        object: &str,
    ) -> PipelineResult<(&mut L, &mut Vec<Vec<Function>>)> {
        let phase = self.phase;
        match self.linked.as_mut() {
            Some(linked) => Ok((linked, &mut self.functions_by_seg)),
            None => Err(PipelineError::PhaseOrder {
                object: object.to_string(),
                required: Phase::Linked,
                actual: phase,
            }),
        }
    }

    pub(crate) fn advance(&mut self, phase: Phase) {
        self.phase = phase;
    }

    fn phase_error(&self, required: Phase, object: &str) -> PipelineError {
        PipelineError::PhaseOrder {
            object: object.to_string(),
            required,
            actual: self.phase,
        }
    }
}
