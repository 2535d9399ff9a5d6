//! Two-state pass/fail accumulator shared by every stage of a lint pass.
//!
//! An `Outcome` starts as success and can only move to failure: either by
//! accumulating a failed outcome or by being forced with [`Outcome::fail`].
//! Combining is associative with success as the identity, so outcomes can be
//! folded in any grouping.

use std::iter::FromIterator;
use std::ops::{BitAnd, BitAndAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Success/failure verdict for a rule, a package, a stage, or a whole pass.
pub struct Outcome {
    success: bool,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::success()
    }
}

impl Outcome {
    pub const fn success() -> Self {
        Self { success: true }
    }

    pub const fn failure() -> Self {
        Self { success: false }
    }

    /// Fold `other` into `self`; stays success only if both are success.
    pub fn accumulate(&mut self, other: Outcome) {
        self.success = self.success && other.success;
    }

    /// Force this outcome to failure.
    pub fn fail(&mut self) {
        self.success = false;
    }

    pub const fn is_success(&self) -> bool {
        self.success
    }
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        Self { success }
    }
}

impl BitAnd for Outcome {
    type Output = Outcome;

    fn bitand(mut self, rhs: Outcome) -> Outcome {
        self.accumulate(rhs);
        self
    }
}

impl BitAndAssign for Outcome {
    fn bitand_assign(&mut self, rhs: Outcome) {
        self.accumulate(rhs);
    }
}

impl FromIterator<Outcome> for Outcome {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        iter.into_iter().fold(Outcome::success(), BitAnd::bitand)
    }
}
