//! Aggregation engine.
//!
//! Turns the raw session/message corpus into the dashboard view:
//! - [`classify`]: normalizes one message and decides whether it is billable
//! - [`windows`]: today / week / month / five-hour boundaries
//! - [`session`], [`agents`], [`providers`], [`timeline`]: the folds
//! - [`tree`]: merges child sessions into their roots
//! - [`dashboard`]: runs everything in one pass
//!
//! The engine is total. Malformed input degrades to zeros and the
//! [`UNKNOWN`] label; nothing here returns an error or performs I/O.

pub mod agents;
pub mod classify;
pub mod dashboard;
pub mod detail;
pub mod providers;
pub mod session;
pub mod timeline;
pub mod tree;
pub mod windows;

use crate::catalog::BillingClassifier;
use crate::types::RawMessage;

pub use agents::{aggregate_agents, AgentAggregator, AgentSummary, PeriodStats};
pub use classify::{billable_in_order, classify, ClassifiedMessage, Contribution, TokenCounts, UNKNOWN};
pub use dashboard::{aggregate, aggregate_at, DashboardData, DashboardTotals};
pub use detail::{session_detail, AgentBreakdown, AgentUsage, ProviderBreakdown, SessionDetail};
pub use providers::{aggregate_providers, ModelStats, ProviderAggregator, ProviderSummary, ProviderWindow};
pub use session::{summarize_session, SessionAgentStats, SessionSummary, SessionTally};
pub use timeline::{TimelineBuilder, TimelineEntry};
pub use tree::build_session_forest;
pub use windows::{TimeWindows, WindowFlags};

/// Classify `messages`, keep the billable ones in fold order and tag each
/// with its billing type and window membership.
pub fn contributions<'a, C, I>(
    messages: I,
    classifier: &'a C,
    windows: &'a TimeWindows,
) -> impl Iterator<Item = Contribution<'a>> + 'a
where
    C: BillingClassifier + ?Sized,
    I: IntoIterator<Item = &'a RawMessage>,
{
    billable_in_order(messages)
        .into_iter()
        .map(move |message| Contribution {
            billing: classifier.is_billing(message.provider_id),
            windows: windows.flags(message.created_at),
            message,
        })
}
