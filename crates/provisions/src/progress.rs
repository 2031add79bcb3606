//! Batch progress accounting.

use std::fmt;

/// Monotonic counters for one provisioning run.
///
/// Invariant: `trustlines_established <= accounts_funded <= target`. The
/// recording methods refuse increments that would break it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    target: usize,
    accounts_funded: usize,
    trustlines_established: usize,
}

impl BatchProgress {
    /// Fresh counters for a batch of `target` accounts.
    pub fn new(target: usize) -> Self {
        Self {
            target,
            accounts_funded: 0,
            trustlines_established: 0,
        }
    }

    /// Count one accepted funding. Returns false if already at target.
    pub fn record_funded(&mut self) -> bool {
        if self.accounts_funded < self.target {
            self.accounts_funded += 1;
            true
        } else {
            false
        }
    }

    /// Count one established trust line. Returns false if every funded
    /// account already has one.
    pub fn record_trustline(&mut self) -> bool {
        if self.trustlines_established < self.accounts_funded {
            self.trustlines_established += 1;
            true
        } else {
            false
        }
    }

    /// Requested batch size.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Accounts funded so far.
    pub fn accounts_funded(&self) -> usize {
        self.accounts_funded
    }

    /// Trust lines established so far.
    pub fn trustlines_established(&self) -> usize {
        self.trustlines_established
    }

    /// Both counters reached a non-zero target. Pure read.
    pub fn is_complete(&self) -> bool {
        self.target > 0
            && self.accounts_funded == self.target
            && self.trustlines_established == self.target
    }
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "funded {}/{}, trust lines {}/{}",
            self.accounts_funded, self.target, self.trustlines_established, self.target
        )
    }
}
