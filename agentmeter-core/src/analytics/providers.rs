//! Per-provider aggregation with a per-model breakdown.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::catalog::BillingClassifier;
use crate::types::RawMessage;

use super::classify::{by_cost_desc, Contribution};
use super::contributions;
use super::windows::TimeWindows;

/// Cost, messages and tokens for one model under a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModelStats {
    pub cost: f64,
    pub messages: u64,
    pub tokens: u64,
}

impl ModelStats {
    fn record(&mut self, c: &Contribution<'_>) {
        self.cost += c.message.cost;
        self.messages += 1;
        self.tokens = self.tokens.saturating_add(c.message.tokens.total);
    }
}

/// Windowed activity for a provider.
pub type ProviderWindow = ModelStats;

/// Global totals for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub provider: String,
    pub total_cost: f64,
    pub total_messages: u64,
    pub total_tokens: u64,
    pub models: BTreeMap<String, ModelStats>,
    pub today: ProviderWindow,
    pub week: ProviderWindow,
    pub month: ProviderWindow,
    pub five_hour: ProviderWindow,
}

impl ProviderSummary {
    /// A summary with no activity.
    pub fn empty(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            total_cost: 0.0,
            total_messages: 0,
            total_tokens: 0,
            models: BTreeMap::new(),
            today: ProviderWindow::default(),
            week: ProviderWindow::default(),
            month: ProviderWindow::default(),
            five_hour: ProviderWindow::default(),
        }
    }

    fn record(&mut self, c: &Contribution<'_>) {
        self.total_cost += c.message.cost;
        self.total_messages += 1;
        self.total_tokens = self.total_tokens.saturating_add(c.message.tokens.total);

        match self.models.get_mut(c.message.model_id) {
            Some(model) => model.record(c),
            None => {
                let mut model = ModelStats::default();
                model.record(c);
                self.models.insert(c.message.model_id.to_string(), model);
            }
        }

        if c.windows.today {
            self.today.record(c);
        }
        if c.windows.week {
            self.week.record(c);
        }
        if c.windows.month {
            self.month.record(c);
        }
        if c.windows.five_hour {
            self.five_hour.record(c);
        }
    }
}

/// Folds billable messages into per-provider summaries.
#[derive(Debug, Default)]
pub struct ProviderAggregator {
    providers: HashMap<String, ProviderSummary>,
}

impl ProviderAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, c: &Contribution<'_>) {
        let provider = c.message.provider_id;
        self.providers
            .entry(provider.to_string())
            .or_insert_with(|| ProviderSummary::empty(provider))
            .record(c);
    }

    /// Summaries sorted by total cost, highest first.
    pub fn finish(self) -> Vec<ProviderSummary> {
        let mut summaries: Vec<ProviderSummary> = self.providers.into_values().collect();
        summaries.sort_by(|a, b| by_cost_desc((&a.provider, a.total_cost), (&b.provider, b.total_cost)));
        summaries
    }
}

/// Aggregate billable messages by provider.
pub fn aggregate_providers<'a, C, I>(
    messages: I,
    classifier: &'a C,
    windows: &'a TimeWindows,
) -> Vec<ProviderSummary>
where
    C: BillingClassifier + ?Sized,
    I: IntoIterator<Item = &'a RawMessage>,
{
    let mut aggregator = ProviderAggregator::new();
    for c in contributions(messages, classifier, windows) {
        aggregator.record(&c);
    }
    aggregator.finish()
}
