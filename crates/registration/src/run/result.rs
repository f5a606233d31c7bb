/// Why a registration run stopped. Per-course outcomes travel on the result stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// No untried CRNs left.
    Drained,
    /// The registration window stayed closed for every transient retry.
    RetryBudgetExhausted,
    /// Cancelled by the caller, or the result sink went away.
    Cancelled,
}

/// Counters for one run, logged when it ends.
#[derive(Debug, Clone, Default)]
pub struct PickStats {
    pub batches: usize,
    pub submitted: usize,
    pub succeeded: usize,
    pub transient_retries: u32,
}

impl PickStats {
    pub fn summary(&self, outcome: PickOutcome) -> String {
        format!(
            "{:?} after {} batches: {} submitted, {} added, {} transient retries",
            outcome, self.batches, self.submitted, self.succeeded, self.transient_retries
        )
    }
}
