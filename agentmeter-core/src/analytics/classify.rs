//! Message classification.
//!
//! Turns a loosely-typed [`RawMessage`] into the normalized fields every
//! aggregator folds over. Classification is total: missing or malformed
//! fields resolve to `0` or [`UNKNOWN`], never to an error.

use std::cmp::Ordering;

use serde::Serialize;

use crate::types::{RawMessage, Role};

use super::windows::WindowFlags;

/// Catch-all label for a missing agent, provider or model.
pub const UNKNOWN: &str = "unknown";

/// Whether a label is the [`UNKNOWN`] catch-all.
pub fn is_unknown(label: &str) -> bool {
    label == UNKNOWN
}

/// Ranking used by every cost-sorted list: highest cost first, ties broken
/// by name so the order never depends on input order.
pub fn by_cost_desc(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Same as [`by_cost_desc`], except the [`UNKNOWN`] label always sorts last.
pub fn by_cost_desc_unknown_last(a: (&str, f64), b: (&str, f64)) -> Ordering {
    is_unknown(a.0)
        .cmp(&is_unknown(b.0))
        .then_with(|| by_cost_desc(a, b))
}

/// Normalized token counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
    pub reasoning: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub total: u64,
}

impl TokenCounts {
    /// Accumulate another breakdown into this one.
    pub fn add(&mut self, other: &TokenCounts) {
        self.input = self.input.saturating_add(other.input);
        self.output = self.output.saturating_add(other.output);
        self.reasoning = self.reasoning.saturating_add(other.reasoning);
        self.cache_read = self.cache_read.saturating_add(other.cache_read);
        self.cache_write = self.cache_write.saturating_add(other.cache_write);
        self.total = self.total.saturating_add(other.total);
    }
}

/// Normalized view of one message.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMessage<'a> {
    /// Assistant-authored with a cost field present
    pub billable: bool,
    pub id: &'a str,
    pub session_id: &'a str,
    pub agent: &'a str,
    pub provider_id: &'a str,
    pub model_id: &'a str,
    pub cost: f64,
    pub tokens: TokenCounts,
    /// Completion minus creation; 0 when unknown
    pub response_time_ms: i64,
    pub created_at: i64,
    /// Completion time, else creation time
    pub last_active_at: i64,
}

/// Classify a message. Never fails.
pub fn classify(msg: &RawMessage) -> ClassifiedMessage<'_> {
    let is_assistant = msg.role == Role::Assistant;

    let tokens = msg
        .tokens
        .map(|t| TokenCounts {
            input: t.input,
            output: t.output,
            reasoning: t.reasoning,
            cache_read: t.cache.read,
            cache_write: t.cache.write,
            total: t.total,
        })
        .unwrap_or_default();

    let response_time_ms = match msg.time.completed {
        Some(completed) if is_assistant => completed.saturating_sub(msg.time.created).max(0),
        _ => 0,
    };

    ClassifiedMessage {
        billable: is_assistant && msg.cost.is_some(),
        id: &msg.id,
        session_id: &msg.session_id,
        agent: msg.agent_label().unwrap_or(UNKNOWN),
        provider_id: msg.resolved_provider_id().unwrap_or(UNKNOWN),
        model_id: msg.resolved_model_id().unwrap_or(UNKNOWN),
        cost: msg.cost.filter(|c| c.is_finite()).unwrap_or(0.0),
        tokens,
        response_time_ms,
        created_at: msg.time.created,
        last_active_at: msg.time.completed.unwrap_or(msg.time.created),
    }
}

/// Classify `messages` and keep the billable ones, ordered by creation
/// time, then session and id. Every fold consumes messages in this order.
pub fn billable_in_order<'a, I>(messages: I) -> Vec<ClassifiedMessage<'a>>
where
    I: IntoIterator<Item = &'a RawMessage>,
{
    let mut billable: Vec<_> = messages
        .into_iter()
        .map(classify)
        .filter(|m| m.billable)
        .collect();
    billable.sort_by(fold_order);
    billable
}

fn fold_order(a: &ClassifiedMessage<'_>, b: &ClassifiedMessage<'_>) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.session_id.cmp(b.session_id))
        .then_with(|| a.id.cmp(b.id))
        .then_with(|| a.cost.total_cmp(&b.cost))
}

/// A billable message together with the facts the folds need about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution<'a> {
    pub message: ClassifiedMessage<'a>,
    /// Provider bills in dollars
    pub billing: bool,
    pub windows: WindowFlags,
}

impl Contribution<'_> {
    /// Cost that counts toward billing totals.
    pub fn billing_cost(&self) -> f64 {
        if self.billing {
            self.message.cost
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageTime, ModelRef, TokenBreakdown};

    fn assistant(cost: Option<f64>) -> RawMessage {
        RawMessage {
            id: "m1".to_string(),
            session_id: "s1".to_string(),
            role: Role::Assistant,
            time: MessageTime {
                created: 1_000,
                completed: Some(3_500),
            },
            cost,
            ..Default::default()
        }
    }

    #[test]
    fn test_billable_requires_cost_field() {
        assert!(classify(&assistant(Some(0.0))).billable);
        assert!(classify(&assistant(Some(1.5))).billable);
        assert!(!classify(&assistant(None)).billable);

        let mut user = assistant(Some(1.0));
        user.role = Role::User;
        assert!(!classify(&user).billable);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let raw = assistant(None);
        let c = classify(&raw);
        assert_eq!(c.agent, UNKNOWN);
        assert_eq!(c.provider_id, UNKNOWN);
        assert_eq!(c.model_id, UNKNOWN);
        assert_eq!(c.cost, 0.0);
        assert_eq!(c.tokens, TokenCounts::default());
    }

    #[test]
    fn test_agent_falls_back_to_mode() {
        let mut msg = assistant(Some(1.0));
        msg.mode = Some("build".to_string());
        assert_eq!(classify(&msg).agent, "build");

        msg.agent = Some("oracle".to_string());
        assert_eq!(classify(&msg).agent, "oracle");
    }

    #[test]
    fn test_provider_prefers_flat_fields() {
        let mut msg = assistant(Some(1.0));
        msg.model = Some(ModelRef {
            provider_id: Some("openai".to_string()),
            model_id: Some("gpt-5".to_string()),
        });
        let c = classify(&msg);
        assert_eq!(c.provider_id, "openai");
        assert_eq!(c.model_id, "gpt-5");

        msg.provider_id = Some("anthropic".to_string());
        let c = classify(&msg);
        assert_eq!(c.provider_id, "anthropic");
        assert_eq!(c.model_id, "gpt-5");
    }

    #[test]
    fn test_response_time() {
        assert_eq!(classify(&assistant(Some(1.0))).response_time_ms, 2_500);

        let mut incomplete = assistant(Some(1.0));
        incomplete.time.completed = None;
        assert_eq!(classify(&incomplete).response_time_ms, 0);
        assert_eq!(classify(&incomplete).last_active_at, 1_000);

        let mut user = assistant(None);
        user.role = Role::User;
        assert_eq!(classify(&user).response_time_ms, 0);

        let mut backwards = assistant(Some(1.0));
        backwards.time.completed = Some(500);
        assert_eq!(classify(&backwards).response_time_ms, 0);
    }

    #[test]
    fn test_token_breakdown() {
        let mut msg = assistant(Some(1.0));
        msg.tokens = Some(TokenBreakdown {
            total: 60,
            input: 10,
            output: 20,
            reasoning: 5,
            cache: crate::types::CacheTokens { read: 20, write: 5 },
        });
        let t = classify(&msg).tokens;
        assert_eq!(t.input, 10);
        assert_eq!(t.cache_read, 20);
        assert_eq!(t.cache_write, 5);
        assert_eq!(t.total, 60);
    }

    #[test]
    fn test_unknown_sorts_last() {
        let mut labels = vec![("unknown", 100.0), ("oracle", 1.0), ("explore", 5.0), ("atlas", 5.0)];
        labels.sort_by(|a, b| by_cost_desc_unknown_last(*a, *b));
        let order: Vec<_> = labels.iter().map(|(l, _)| *l).collect();
        assert_eq!(order, vec!["atlas", "explore", "oracle", "unknown"]);
    }

    #[test]
    fn test_billable_in_order_ignores_input_order() {
        let mut a = assistant(Some(0.1));
        a.id = "m2".to_string();
        let mut b = assistant(Some(0.2));
        b.time.created = 500;
        let c = assistant(None);
        let mut d = assistant(Some(0.3));
        d.session_id = "s0".to_string();

        let forward = [a.clone(), b.clone(), c.clone(), d.clone()];
        let backward = [d, c, b, a];
        let ids = |msgs: &[RawMessage]| -> Vec<(String, String)> {
            billable_in_order(msgs)
                .iter()
                .map(|m| (m.session_id.to_string(), m.id.to_string()))
                .collect()
        };

        let expected = vec![
            ("s1".to_string(), "m1".to_string()),
            ("s0".to_string(), "m1".to_string()),
            ("s1".to_string(), "m2".to_string()),
        ];
        assert_eq!(ids(&forward), expected);
        assert_eq!(ids(&backward), expected);
    }
}
