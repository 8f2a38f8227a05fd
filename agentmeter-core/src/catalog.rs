//! Provider and agent metadata
//!
//! The aggregation engine only needs one fact from here: whether a provider
//! bills in dollars. That classification lives behind [`BillingClassifier`] so
//! callers can supply their own; [`ProviderCatalog`] is the built-in one,
//! extended by `[providers.<id>]` sections in the config file.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::analytics::{ProviderSummary, UNKNOWN};
use crate::config::ProviderOverride;

/// How a provider charges for usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingType {
    /// Direct dollar costs per request
    #[default]
    Billing,
    /// Subscription/account metered by message quotas
    Account,
}

/// Decides whether a provider exposes direct dollar costs.
pub trait BillingClassifier {
    fn is_billing(&self, provider_id: &str) -> bool;
}

impl<F> BillingClassifier for F
where
    F: Fn(&str) -> bool,
{
    fn is_billing(&self, provider_id: &str) -> bool {
        self(provider_id)
    }
}

/// Display and quota metadata for a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderMeta {
    pub name: String,
    pub color: String,
    pub icon: String,
    pub billing_type: BillingType,
    pub daily_message_limit: Option<u64>,
    pub weekly_message_limit: Option<u64>,
    /// Known models: model id -> display name
    pub models: BTreeMap<String, String>,
}

impl ProviderMeta {
    fn new(name: &str, color: &str, icon: &str, billing_type: BillingType) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
            billing_type,
            daily_message_limit: None,
            weekly_message_limit: None,
            models: BTreeMap::new(),
        }
    }

    fn limits(mut self, daily: u64, weekly: u64) -> Self {
        self.daily_message_limit = Some(daily);
        self.weekly_message_limit = Some(weekly);
        self
    }

    fn models(mut self, models: &[(&str, &str)]) -> Self {
        self.models = models
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        self
    }

    /// Placeholder used for providers the catalog has never heard of.
    fn fallback(provider_id: &str) -> Self {
        Self::new(provider_id, "#6B7280", "\u{2753}", BillingType::Billing)
    }

    /// Display name for a model, falling back to the raw id.
    pub fn model_name<'a>(&'a self, model_id: &'a str) -> &'a str {
        self.models.get(model_id).map(String::as_str).unwrap_or(model_id)
    }
}

/// Lookup table of known providers.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    providers: HashMap<String, ProviderMeta>,
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderCatalog {
    /// The providers OpenCode ships with.
    pub fn builtin() -> Self {
        let entries = [
            (
                "amazon-bedrock",
                ProviderMeta::new(
                    "Claude Code (Bedrock)",
                    "#F97316",
                    "\u{1FAA8}",
                    BillingType::Billing,
                )
                .models(&[
                    ("anthropic.claude-opus-4-6-v1", "Claude Opus 4.6"),
                    ("anthropic.claude-opus-4-5-v1", "Claude Opus 4.5"),
                    ("anthropic.claude-sonnet-4-5-v1", "Claude Sonnet 4.5"),
                    ("anthropic.claude-sonnet-4-v1", "Claude Sonnet 4"),
                    ("anthropic.claude-haiku-4-5-v1", "Claude Haiku 4.5"),
                ]),
            ),
            (
                "openai",
                ProviderMeta::new("Codex (OpenAI)", "#10B981", "\u{1F9E0}", BillingType::Billing)
                    .models(&[
                        ("gpt-5.2", "GPT 5.2"),
                        ("gpt-5.2-codex", "GPT 5.2 Codex"),
                        ("gpt-5.1", "GPT 5.1"),
                        ("gpt-5.1-codex", "GPT 5.1 Codex"),
                        ("gpt-5.1-codex-max", "GPT 5.1 Codex Max"),
                        ("gpt-5.1-codex-mini", "GPT 5.1 Codex Mini"),
                        ("gpt-5", "GPT 5"),
                        ("gpt-5-codex", "GPT 5 Codex"),
                        ("gpt-5-nano", "GPT 5 Nano"),
                    ]),
            ),
            (
                "google",
                ProviderMeta::new(
                    "Antigravity (Google)",
                    "#8B5CF6",
                    "\u{1F680}",
                    BillingType::Account,
                )
                .limits(200, 1000)
                .models(&[
                    ("gemini-3-pro", "Gemini 3 Pro"),
                    ("gemini-3-flash", "Gemini 3 Flash"),
                ]),
            ),
            (
                "anthropic",
                ProviderMeta::new(
                    "Anthropic (Direct)",
                    "#EC4899",
                    "\u{1F4AC}",
                    BillingType::Billing,
                )
                .models(&[
                    ("claude-opus-4-6", "Claude Opus 4.6"),
                    ("claude-opus-4-5", "Claude Opus 4.5"),
                    ("claude-opus-4-1", "Claude Opus 4.1"),
                    ("claude-sonnet-4-5", "Claude Sonnet 4.5"),
                    ("claude-sonnet-4", "Claude Sonnet 4"),
                    ("claude-haiku-4-5", "Claude Haiku 4.5"),
                    ("claude-3-5-haiku", "Claude Haiku 3.5"),
                ]),
            ),
            (
                "opencode",
                ProviderMeta::new("OpenCode Zen", "#3B82F6", "\u{2728}", BillingType::Account)
                    .limits(100, 500)
                    .models(&[
                        ("gpt-5-nano", "GPT 5 Nano"),
                        ("kimi-k2.5-free", "Kimi K2.5 Free"),
                        ("minimax-m2.5-free", "MiniMax M2.5 Free"),
                        ("glm-4.7-free", "GLM 4.7 Free"),
                        ("big-pickle", "Big Pickle"),
                        ("glm-5", "GLM 5"),
                        ("kimi-k2.5", "Kimi K2.5"),
                        ("qwen3-coder", "Qwen3 Coder 480B"),
                    ]),
            ),
            (
                "copilot",
                ProviderMeta::new("GitHub Copilot", "#6366F1", "\u{1F419}", BillingType::Account)
                    .limits(300, 2100)
                    .models(&[
                        ("claude-sonnet-4", "Claude Sonnet 4"),
                        ("gpt-4o", "GPT-4o"),
                        ("gpt-5", "GPT 5"),
                    ]),
            ),
        ];

        Self {
            providers: entries
                .into_iter()
                .map(|(id, meta)| (id.to_string(), meta))
                .collect(),
        }
    }

    /// Built-in catalog with config overrides applied.
    pub fn with_overrides(overrides: &HashMap<String, ProviderOverride>) -> Self {
        let mut catalog = Self::builtin();
        for (id, over) in overrides {
            let meta = catalog
                .providers
                .entry(id.clone())
                .or_insert_with(|| ProviderMeta::fallback(id));
            if let Some(billing_type) = over.billing_type {
                meta.billing_type = billing_type;
            }
            if let Some(name) = &over.name {
                meta.name = name.clone();
            }
            if over.daily_message_limit.is_some() {
                meta.daily_message_limit = over.daily_message_limit;
            }
            if over.weekly_message_limit.is_some() {
                meta.weekly_message_limit = over.weekly_message_limit;
            }
        }
        catalog
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderMeta> {
        self.providers.get(provider_id)
    }

    /// Metadata for a provider; unknown ids get a neutral placeholder.
    pub fn meta(&self, provider_id: &str) -> ProviderMeta {
        self.get(provider_id)
            .cloned()
            .unwrap_or_else(|| ProviderMeta::fallback(provider_id))
    }

    /// Unknown providers are assumed to bill in dollars.
    pub fn billing_type(&self, provider_id: &str) -> BillingType {
        self.get(provider_id)
            .map(|meta| meta.billing_type)
            .unwrap_or_default()
    }
}

impl BillingClassifier for ProviderCatalog {
    fn is_billing(&self, provider_id: &str) -> bool {
        self.billing_type(provider_id) == BillingType::Billing
    }
}

/// Fraction of an account provider's message quota consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaUsage {
    pub daily: Option<f64>,
    pub weekly: Option<f64>,
}

/// Quota utilisation for a provider summary, clamped to `[0, 1]`.
///
/// Returns `None` for billing providers and providers without known limits.
pub fn quota_usage(catalog: &ProviderCatalog, summary: &ProviderSummary) -> Option<QuotaUsage> {
    let meta = catalog.get(&summary.provider)?;
    if meta.billing_type != BillingType::Account {
        return None;
    }
    let ratio = |used: u64, limit: Option<u64>| {
        limit
            .filter(|l| *l > 0)
            .map(|l| (used as f64 / l as f64).clamp(0.0, 1.0))
    };
    let usage = QuotaUsage {
        daily: ratio(summary.today.messages, meta.daily_message_limit),
        weekly: ratio(summary.week.messages, meta.weekly_message_limit),
    };
    if usage.daily.is_none() && usage.weekly.is_none() {
        None
    } else {
        Some(usage)
    }
}

// ============================================
// Agents
// ============================================

/// Display metadata for an agent label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentMeta {
    pub emoji: &'static str,
    pub label: String,
    pub role: &'static str,
}

const KNOWN_AGENTS: &[(&str, &str, &str, &str)] = &[
    ("sisyphus", "\u{1FAA8}", "Sisyphus", "Orchestrator"),
    ("hephaestus", "\u{1F528}", "Hephaestus", "Builder"),
    ("oracle", "\u{1F52E}", "Oracle", "Advisor"),
    ("librarian", "\u{1F4DA}", "Librarian", "Researcher"),
    ("explore", "\u{1F50D}", "Explorer", "Scout"),
    ("prometheus", "\u{1F525}", "Prometheus", "Planner"),
    ("metis", "\u{1F9E9}", "Metis", "Analyst"),
    ("momus", "\u{1F3AD}", "Momus", "Reviewer"),
    ("atlas", "\u{1F30D}", "Atlas", "Carrier"),
    ("multimodal-looker", "\u{1F441}\u{FE0F}", "Looker", "Vision"),
];

/// Metadata for an agent. Never fails: unknown labels, including the
/// `"unknown"` catch-all, get a generic icon and a capitalised label.
pub fn agent_meta(agent: &str) -> AgentMeta {
    if let Some((_, emoji, label, role)) = KNOWN_AGENTS.iter().find(|(key, ..)| *key == agent) {
        return AgentMeta {
            emoji: *emoji,
            label: label.to_string(),
            role: *role,
        };
    }

    if agent == UNKNOWN || agent.is_empty() {
        return AgentMeta {
            emoji: "\u{2754}",
            label: "Unknown".to_string(),
            role: "Unattributed",
        };
    }

    let mut chars = agent.chars();
    let label = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    AgentMeta {
        emoji: "\u{1F916}",
        label,
        role: "Agent",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_billing_types() {
        let catalog = ProviderCatalog::builtin();
        assert!(catalog.is_billing("anthropic"));
        assert!(catalog.is_billing("openai"));
        assert!(!catalog.is_billing("copilot"));
        assert!(!catalog.is_billing("google"));
        // Unknown providers default to billing
        assert!(catalog.is_billing("some-new-provider"));
        assert!(catalog.is_billing(UNKNOWN));
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "anthropic".to_string(),
            ProviderOverride {
                billing_type: Some(BillingType::Account),
                weekly_message_limit: Some(900),
                ..Default::default()
            },
        );
        overrides.insert(
            "local-llm".to_string(),
            ProviderOverride {
                billing_type: Some(BillingType::Account),
                name: Some("Local".to_string()),
                ..Default::default()
            },
        );

        let catalog = ProviderCatalog::with_overrides(&overrides);
        assert!(!catalog.is_billing("anthropic"));
        assert_eq!(
            catalog.get("anthropic").unwrap().weekly_message_limit,
            Some(900)
        );
        assert_eq!(catalog.get("local-llm").unwrap().name, "Local");
        assert!(!catalog.is_billing("local-llm"));
    }

    #[test]
    fn test_closure_classifier() {
        let only_openai = |id: &str| id == "openai";
        assert!(only_openai.is_billing("openai"));
        assert!(!only_openai.is_billing("anthropic"));
    }

    #[test]
    fn test_model_name_fallback() {
        let catalog = ProviderCatalog::builtin();
        let meta = catalog.meta("anthropic");
        assert_eq!(meta.model_name("claude-opus-4-6"), "Claude Opus 4.6");
        assert_eq!(meta.model_name("claude-next"), "claude-next");
        assert_eq!(catalog.meta("mystery").name, "mystery");
    }

    #[test]
    fn test_agent_meta_degrades() {
        assert_eq!(agent_meta("oracle").label, "Oracle");
        assert_eq!(agent_meta(UNKNOWN).label, "Unknown");
        assert_eq!(agent_meta("").label, "Unknown");

        let custom = agent_meta("build");
        assert_eq!(custom.label, "Build");
        assert_eq!(custom.role, "Agent");
    }

    #[test]
    fn test_quota_usage() {
        let catalog = ProviderCatalog::builtin();
        let mut summary = ProviderSummary::empty("copilot");
        summary.today.messages = 150;
        summary.week.messages = 4200;

        let usage = quota_usage(&catalog, &summary).unwrap();
        assert_eq!(usage.daily, Some(0.5));
        assert_eq!(usage.weekly, Some(1.0));

        let billing = ProviderSummary::empty("anthropic");
        assert!(quota_usage(&catalog, &billing).is_none());
    }
}
