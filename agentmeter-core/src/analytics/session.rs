//! Per-session aggregation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::BillingClassifier;
use crate::types::{ChangeSummary, RawMessage, RawSession};

use super::classify::{billable_in_order, by_cost_desc_unknown_last, Contribution, TokenCounts};
use super::windows::WindowFlags;

/// One agent's activity within a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAgentStats {
    pub cost: f64,
    pub messages: u64,
    /// Latest completion (else creation) timestamp seen for this agent
    pub last_active_at: i64,
    /// Provider of the most recently active message
    pub provider: String,
    /// Model of the most recently active message
    pub model: String,
}

impl SessionAgentStats {
    fn from_contribution(c: &Contribution<'_>) -> Self {
        Self {
            cost: c.message.cost,
            messages: 1,
            last_active_at: c.message.last_active_at,
            provider: c.message.provider_id.to_string(),
            model: c.message.model_id.to_string(),
        }
    }

    /// Fold another record for the same agent into this one.
    ///
    /// Provider/model follow whichever side was active last. Equal timestamps
    /// resolve to the greater (provider, model) pair so the result does not
    /// depend on fold order.
    pub fn absorb(&mut self, other: &SessionAgentStats) {
        self.cost += other.cost;
        self.messages += other.messages;

        let newer = other.last_active_at > self.last_active_at
            || (other.last_active_at == self.last_active_at
                && (other.provider.as_str(), other.model.as_str())
                    > (self.provider.as_str(), self.model.as_str()));
        if newer {
            self.last_active_at = other.last_active_at;
            self.provider.clone_from(&other.provider);
            self.model.clone_from(&other.model);
        }
    }
}

/// Aggregated view of one session.
///
/// `children` is only populated on roots, by [`super::tree::build_session_forest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// `updated_at - created_at`, in millis
    pub duration: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub total_cost: f64,
    pub billing_cost: f64,
    pub message_count: u64,
    pub agents: BTreeMap<String, SessionAgentStats>,
    pub tokens: TokenCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ChangeSummary>,
    pub children: Vec<SessionSummary>,
}

impl SessionSummary {
    /// Agent with the highest cost in this session, `"unknown"` last.
    pub fn top_agent(&self) -> Option<&str> {
        self.agents
            .iter()
            .min_by(|a, b| by_cost_desc_unknown_last((a.0, a.1.cost), (b.0, b.1.cost)))
            .map(|(name, _)| name.as_str())
    }
}

/// Running totals for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionTally {
    total_cost: f64,
    billing_cost: f64,
    messages: u64,
    tokens: TokenCounts,
    agents: BTreeMap<String, SessionAgentStats>,
}

impl SessionTally {
    /// Fold one billable message.
    pub fn record(&mut self, c: &Contribution<'_>) {
        self.total_cost += c.message.cost;
        self.billing_cost += c.billing_cost();
        self.messages += 1;
        self.tokens.add(&c.message.tokens);

        let stats = SessionAgentStats::from_contribution(c);
        match self.agents.get_mut(c.message.agent) {
            Some(existing) => existing.absorb(&stats),
            None => {
                self.agents.insert(c.message.agent.to_string(), stats);
            }
        }
    }

    /// Attach the totals to their session.
    pub fn into_summary(self, session: &RawSession) -> SessionSummary {
        SessionSummary {
            id: session.id.clone(),
            slug: session.slug.clone(),
            title: session.display_title().to_string(),
            directory: session.directory.clone(),
            parent_id: session.parent_id.clone().filter(|p| !p.is_empty()),
            duration: session.time.updated.saturating_sub(session.time.created),
            created_at: session.time.created,
            updated_at: session.time.updated,
            total_cost: self.total_cost,
            billing_cost: self.billing_cost,
            message_count: self.messages,
            agents: self.agents,
            tokens: self.tokens,
            summary: session.summary,
            children: Vec::new(),
        }
    }
}

/// Summarize one session from its own messages.
///
/// Non-billable messages are ignored. No children are attached.
pub fn summarize_session<'a, C, I>(
    session: &RawSession,
    messages: I,
    classifier: &C,
) -> SessionSummary
where
    C: BillingClassifier + ?Sized,
    I: IntoIterator<Item = &'a RawMessage>,
{
    let mut tally = SessionTally::default();
    for message in billable_in_order(messages) {
        let billing = classifier.is_billing(message.provider_id);
        tally.record(&Contribution {
            message,
            billing,
            windows: WindowFlags::default(),
        });
    }
    tally.into_summary(session)
}
