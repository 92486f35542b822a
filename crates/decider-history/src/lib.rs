pub mod decision;
pub mod error;
pub mod event;
pub mod snapshot;

pub use decision::{Decision, DecisionBuffer};
pub use error::FoldError;
pub use event::HistoryEvent;
pub use snapshot::Snapshot;

/// The remote service's ceiling on simultaneously in-flight scheduling
/// decisions for one execution.
pub const SERVICE_CONCURRENCY_CEILING: usize = 64;

/// `max(0, ceiling - |running|)`: the per-turn scheduling budget.
pub fn rate_budget(running_count: usize) -> usize {
    SERVICE_CONCURRENCY_CEILING.saturating_sub(running_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_budget_never_goes_negative() {
        assert_eq!(rate_budget(100), 0);
        assert_eq!(rate_budget(0), 64);
        assert_eq!(rate_budget(60), 4);
    }
}
