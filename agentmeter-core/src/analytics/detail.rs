//! Drill-down for a single session.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::catalog::BillingClassifier;
use crate::types::{RawMessage, RawSession};

use super::classify::{billable_in_order, by_cost_desc_unknown_last};

/// Activity of one agent under one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AgentUsage {
    pub messages: u64,
    pub tokens: u64,
    pub cost: f64,
}

/// One provider's share of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderBreakdown {
    pub provider: String,
    pub billing: bool,
    pub cost: f64,
    pub messages: u64,
    pub tokens: u64,
    pub models: Vec<String>,
    pub agents: BTreeMap<String, AgentUsage>,
}

/// An agent's activity summed over every provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentBreakdown {
    pub agent: String,
    pub cost: f64,
    pub messages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub id: String,
    pub title: String,
    pub directory: String,
    pub duration: i64,
    pub billing_cost: f64,
    pub total_cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub message_count: u64,
    /// Sorted by message count, highest first
    pub providers: Vec<ProviderBreakdown>,
    /// Sorted by cost, highest first, `"unknown"` last
    pub agents: Vec<AgentBreakdown>,
}

#[derive(Default)]
struct ProviderTally {
    billing: bool,
    cost: f64,
    messages: u64,
    tokens: u64,
    models: BTreeSet<String>,
    agents: BTreeMap<String, AgentUsage>,
}

/// Break one session's billable messages down by provider and agent.
///
/// `messages` may include the messages of child sessions; no filtering by
/// session id is applied.
pub fn session_detail<'a, C, I>(session: &RawSession, messages: I, classifier: &C) -> SessionDetail
where
    C: BillingClassifier + ?Sized,
    I: IntoIterator<Item = &'a RawMessage>,
{
    let mut providers: BTreeMap<String, ProviderTally> = BTreeMap::new();
    let mut billing_cost = 0.0;
    let mut total_cost = 0.0;
    let mut input_tokens = 0u64;
    let mut output_tokens = 0u64;
    let mut message_count = 0u64;

    for m in billable_in_order(messages) {

        let tally = providers.entry(m.provider_id.to_string()).or_insert_with(|| ProviderTally {
            billing: classifier.is_billing(m.provider_id),
            ..Default::default()
        });
        tally.cost += m.cost;
        tally.messages += 1;
        tally.tokens = tally.tokens.saturating_add(m.tokens.total);
        tally.models.insert(m.model_id.to_string());

        let agent = tally.agents.entry(m.agent.to_string()).or_default();
        agent.messages += 1;
        agent.tokens = agent.tokens.saturating_add(m.tokens.total);
        agent.cost += m.cost;

        if tally.billing {
            billing_cost += m.cost;
        }
        total_cost += m.cost;
        input_tokens = input_tokens.saturating_add(m.tokens.input);
        output_tokens = output_tokens.saturating_add(m.tokens.output);
        message_count += 1;
    }

    let mut agent_totals: BTreeMap<String, AgentBreakdown> = BTreeMap::new();
    for tally in providers.values() {
        for (name, usage) in &tally.agents {
            let entry = agent_totals
                .entry(name.clone())
                .or_insert_with(|| AgentBreakdown {
                    agent: name.clone(),
                    cost: 0.0,
                    messages: 0,
                });
            entry.cost += usage.cost;
            entry.messages += usage.messages;
        }
    }
    let mut agents: Vec<AgentBreakdown> = agent_totals.into_values().collect();
    agents.sort_by(|a, b| by_cost_desc_unknown_last((&a.agent, a.cost), (&b.agent, b.cost)));

    let mut providers: Vec<ProviderBreakdown> = providers
        .into_iter()
        .map(|(provider, t)| ProviderBreakdown {
            provider,
            billing: t.billing,
            cost: t.cost,
            messages: t.messages,
            tokens: t.tokens,
            models: t.models.into_iter().collect(),
            agents: t.agents,
        })
        .collect();
    providers.sort_by(|a, b| b.messages.cmp(&a.messages).then_with(|| a.provider.cmp(&b.provider)));

    SessionDetail {
        id: session.id.clone(),
        title: session.display_title().to_string(),
        directory: session.directory.clone(),
        duration: session.time.updated.saturating_sub(session.time.created),
        billing_cost,
        total_cost,
        input_tokens,
        output_tokens,
        message_count,
        providers,
        agents,
    }
}
