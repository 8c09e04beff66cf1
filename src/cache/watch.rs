//! Watched Inputs Module
//!
//! Remembers the inputs one logical subscriber last fetched with, so a
//! change can force a refetch regardless of freshness.

use super::FetchPolicy;

// == Watched Inputs ==
/// Previous watched inputs of a single subscription.
///
/// The first observation is never a change.
#[derive(Debug, Clone)]
pub struct WatchedInputs<W> {
    last: Option<Vec<W>>,
}

impl<W> Default for WatchedInputs<W> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<W: PartialEq + Clone> WatchedInputs<W> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Observe ==
    /// Records `inputs` and reports whether any element differs from the
    /// previous observation.
    pub fn observe(&mut self, inputs: &[W]) -> bool {
        match &self.last {
            Some(previous) if previous.as_slice() == inputs => false,
            Some(_) => {
                self.last = Some(inputs.to_vec());
                true
            }
            None => {
                self.last = Some(inputs.to_vec());
                false
            }
        }
    }

    /// Records `inputs` and picks the fetch policy they call for.
    pub fn policy_for(&mut self, inputs: &[W]) -> FetchPolicy {
        if self.observe(inputs) {
            FetchPolicy::Force
        } else {
            FetchPolicy::IfStale
        }
    }

    /// Inputs from the latest observation.
    pub fn current(&self) -> Option<&[W]> {
        self.last.as_deref()
    }
}
