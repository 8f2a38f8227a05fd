//! Per-agent aggregation across the whole corpus.
//!
//! Session boundaries are ignored: every billable message counts toward the
//! agent that produced it.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::catalog::BillingClassifier;
use crate::types::RawMessage;

use super::classify::{by_cost_desc_unknown_last, Contribution};
use super::windows::TimeWindows;
use super::contributions;

/// Period-scoped totals (today, this week, this month).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub cost: f64,
    pub billing_cost: f64,
    pub message_count: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub tokens_reasoning: u64,
    pub cache_read: u64,
}

impl PeriodStats {
    fn record(&mut self, c: &Contribution<'_>) {
        let t = &c.message.tokens;
        self.cost += c.message.cost;
        self.billing_cost += c.billing_cost();
        self.message_count += 1;
        self.tokens_in = self.tokens_in.saturating_add(t.input);
        self.tokens_out = self.tokens_out.saturating_add(t.output);
        self.tokens_reasoning = self.tokens_reasoning.saturating_add(t.reasoning);
        self.cache_read = self.cache_read.saturating_add(t.cache_read);
    }
}

/// Global totals for one agent label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub agent: String,
    pub total_cost: f64,
    pub billing_cost: f64,
    pub message_count: u64,
    pub avg_cost_per_message: f64,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub total_tokens_reasoning: u64,
    pub total_cache_read: u64,
    /// `cache_read / (cache_read + tokens_in)`, 0 when both are 0
    pub cache_hit_rate: f64,
    /// Millis; summed over timed messages, divided by all messages
    pub avg_response_time: f64,
    pub models: Vec<String>,
    pub providers: Vec<String>,
    pub has_billing_provider: bool,
    pub today: PeriodStats,
    pub week: PeriodStats,
    pub month: PeriodStats,
}

#[derive(Debug, Default)]
struct AgentTally {
    all: PeriodStats,
    response_time_sum: u64,
    models: BTreeSet<String>,
    providers: BTreeSet<String>,
    has_billing_provider: bool,
    today: PeriodStats,
    week: PeriodStats,
    month: PeriodStats,
}

impl AgentTally {
    fn into_summary(self, agent: String) -> AgentSummary {
        let all = self.all;
        let count = all.message_count;
        let cache_denominator = all.cache_read.saturating_add(all.tokens_in);

        AgentSummary {
            agent,
            total_cost: all.cost,
            billing_cost: all.billing_cost,
            message_count: count,
            avg_cost_per_message: ratio(all.cost, count as f64),
            total_tokens_in: all.tokens_in,
            total_tokens_out: all.tokens_out,
            total_tokens_reasoning: all.tokens_reasoning,
            total_cache_read: all.cache_read,
            cache_hit_rate: ratio(all.cache_read as f64, cache_denominator as f64),
            avg_response_time: ratio(self.response_time_sum as f64, count as f64),
            models: self.models.into_iter().collect(),
            providers: self.providers.into_iter().collect(),
            has_billing_provider: self.has_billing_provider,
            today: self.today,
            week: self.week,
            month: self.month,
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Folds billable messages into per-agent summaries.
#[derive(Debug, Default)]
pub struct AgentAggregator {
    agents: HashMap<String, AgentTally>,
}

impl AgentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, c: &Contribution<'_>) {
        let tally = self.agents.entry(c.message.agent.to_string()).or_default();

        tally.all.record(c);
        if c.message.response_time_ms > 0 {
            tally.response_time_sum = tally
                .response_time_sum
                .saturating_add(c.message.response_time_ms.unsigned_abs());
        }
        if !tally.models.contains(c.message.model_id) {
            tally.models.insert(c.message.model_id.to_string());
        }
        if !tally.providers.contains(c.message.provider_id) {
            tally.providers.insert(c.message.provider_id.to_string());
        }
        tally.has_billing_provider |= c.billing;

        if c.windows.today {
            tally.today.record(c);
        }
        if c.windows.week {
            tally.week.record(c);
        }
        if c.windows.month {
            tally.month.record(c);
        }
    }

    /// Summaries sorted by total cost, highest first, `"unknown"` last.
    pub fn finish(self) -> Vec<AgentSummary> {
        let mut summaries: Vec<AgentSummary> = self
            .agents
            .into_iter()
            .map(|(agent, tally)| tally.into_summary(agent))
            .collect();
        summaries.sort_by(|a, b| {
            by_cost_desc_unknown_last((&a.agent, a.total_cost), (&b.agent, b.total_cost))
        });
        summaries
    }
}

/// Aggregate billable messages by agent.
pub fn aggregate_agents<'a, C, I>(
    messages: I,
    classifier: &'a C,
    windows: &'a TimeWindows,
) -> Vec<AgentSummary>
where
    C: BillingClassifier + ?Sized,
    I: IntoIterator<Item = &'a RawMessage>,
{
    let mut aggregator = AgentAggregator::new();
    for c in contributions(messages, classifier, windows) {
        aggregator.record(&c);
    }
    aggregator.finish()
}
