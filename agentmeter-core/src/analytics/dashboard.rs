//! Dashboard orchestration.
//!
//! One pass over the message corpus fans each billable message out to the
//! session, agent, provider, totals and timeline folds. A second pass
//! reduces the session tree.

use std::collections::HashMap;

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::catalog::BillingClassifier;
use crate::types::{RawMessage, RawSession};
use crate::usage::UsageSnapshot;

use super::agents::{AgentAggregator, AgentSummary};
use super::classify::{Contribution, TokenCounts};
use super::contributions;
use super::providers::{ProviderAggregator, ProviderSummary};
use super::session::{SessionSummary, SessionTally};
use super::timeline::{TimelineBuilder, TimelineEntry};
use super::tree::build_session_forest;
use super::windows::{TimeWindows, DAY_MS};

/// Corpus-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub cost: f64,
    pub billing_cost: f64,
    /// Cost attributed to account-type (subscription) providers
    pub subscription_cost: f64,
    pub messages: u64,
    /// Sessions updated within the last 24 hours
    pub sessions: u64,
    pub tokens: TokenCounts,
    pub today_cost: f64,
    pub week_cost: f64,
    pub month_cost: f64,
    pub today_billing_cost: f64,
    pub week_billing_cost: f64,
    pub month_billing_cost: f64,
    pub five_hour_cost: f64,
    pub five_hour_messages: u64,
}

impl DashboardTotals {
    fn record(&mut self, c: &Contribution<'_>) {
        let cost = c.message.cost;
        let billing_cost = c.billing_cost();

        self.cost += cost;
        self.billing_cost += billing_cost;
        if !c.billing {
            self.subscription_cost += cost;
        }
        self.messages += 1;
        self.tokens.add(&c.message.tokens);

        if c.windows.today {
            self.today_cost += cost;
            self.today_billing_cost += billing_cost;
        }
        if c.windows.week {
            self.week_cost += cost;
            self.week_billing_cost += billing_cost;
        }
        if c.windows.month {
            self.month_cost += cost;
            self.month_billing_cost += billing_cost;
        }
        if c.windows.five_hour {
            self.five_hour_cost += cost;
            self.five_hour_messages += 1;
        }
    }
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    /// Root sessions, most recently updated first
    pub sessions: Vec<SessionSummary>,
    pub agents: Vec<AgentSummary>,
    pub providers: Vec<ProviderSummary>,
    pub totals: DashboardTotals,
    pub timeline: Vec<TimelineEntry>,
    /// Filled in by the caller, never by [`aggregate`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codex_usage: Option<UsageSnapshot>,
}

impl DashboardData {
    /// Attach a usage-oracle snapshot.
    pub fn with_usage(mut self, snapshot: Option<UsageSnapshot>) -> Self {
        self.codex_usage = snapshot;
        self
    }
}

/// Aggregate the corpus relative to the current local time.
pub fn aggregate<C>(sessions: &[RawSession], messages: &[RawMessage], classifier: &C) -> DashboardData
where
    C: BillingClassifier + ?Sized,
{
    aggregate_at(sessions, messages, classifier, &Local::now())
}

/// Aggregate the corpus relative to `now`, bucketing by `now`'s time zone.
pub fn aggregate_at<C, Tz>(
    sessions: &[RawSession],
    messages: &[RawMessage],
    classifier: &C,
    now: &DateTime<Tz>,
) -> DashboardData
where
    C: BillingClassifier + ?Sized,
    Tz: TimeZone,
{
    let windows = TimeWindows::at(now);

    let mut agents = AgentAggregator::new();
    let mut providers = ProviderAggregator::new();
    let mut totals = DashboardTotals::default();
    let mut timeline = TimelineBuilder::new(now.timezone());
    let mut tallies: HashMap<&str, SessionTally> = HashMap::new();

    for c in contributions(messages, classifier, &windows) {
        agents.record(&c);
        providers.record(&c);
        totals.record(&c);
        timeline.record(&c);
        tallies.entry(c.message.session_id).or_default().record(&c);
    }

    let active_since = windows.now - DAY_MS;
    totals.sessions = sessions
        .iter()
        .filter(|s| s.time.updated >= active_since)
        .count() as u64;

    let summaries: Vec<SessionSummary> = sessions
        .iter()
        .map(|s| {
            tallies
                .remove(s.id.as_str())
                .unwrap_or_default()
                .into_summary(s)
        })
        .collect();
    let roots = build_session_forest(summaries);

    tracing::debug!(
        sessions = sessions.len(),
        messages = messages.len(),
        billable = totals.messages,
        roots = roots.len(),
        unmatched_sessions = tallies.len(),
        "Aggregated dashboard"
    );

    DashboardData {
        sessions: roots,
        agents: agents.finish(),
        providers: providers.finish(),
        totals,
        timeline: timeline.finish(),
        codex_usage: None,
    }
}
