//! Record types read from the OpenCode session log
//!
//! These mirror what the record store hands us: sessions and messages keyed by
//! opaque string identifiers. They are immutable once read; everything the
//! dashboard shows is derived from them by [`crate::analytics`].
//!
//! ## Loose shapes
//!
//! The message body has drifted across producer versions:
//!
//! | Field | Older producers | Newer producers |
//! |-------|-----------------|-----------------|
//! | provider/model | `model: { providerID, modelID }` | flat `providerID` / `modelID` |
//! | cost | absent on partial messages | always present, possibly `0` |
//!
//! Every field is therefore deserialized leniently: a value of the wrong
//! shape degrades to its default instead of rejecting the whole record.

use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Anything else a producer might emit
    #[default]
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other => "other",
        }
    }
}

// ============================================
// Sessions
// ============================================

/// Creation/update timestamps of a session (epoch millis).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTime {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub created: i64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub updated: i64,
}

/// Line-level change summary recorded for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub additions: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub deletions: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub files: u64,
}

/// A session as stored by OpenCode.
///
/// Nesting is one level deep: a session is either a root or a direct child of
/// a root (subagent sessions carry their parent's id in `parent_id`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "projectID", default)]
    pub project_id: String,
    #[serde(default)]
    pub directory: String,
    #[serde(
        rename = "parentID",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub time: SessionTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub summary: Option<ChangeSummary>,
}

impl RawSession {
    /// Title for display, falling back to the slug when the title is blank.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.slug
        } else {
            &self.title
        }
    }
}

// ============================================
// Messages
// ============================================

/// Creation/completion timestamps of a message (epoch millis).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTime {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub created: i64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub completed: Option<i64>,
}

/// Nested provider/model descriptor used by older producers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(
        rename = "providerID",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub provider_id: Option<String>,
    #[serde(
        rename = "modelID",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub model_id: Option<String>,
}

/// Cache token counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTokens {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub read: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub write: u64,
}

/// Token breakdown as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBreakdown {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub input: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub output: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub reasoning: u64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub cache: CacheTokens,
}

/// A message as stored by OpenCode.
///
/// The store keeps `id`/`sessionID` as columns and the rest as a JSON body;
/// [`crate::store::SqliteStore`] stitches the two together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub id: String,
    #[serde(rename = "sessionID", default, deserialize_with = "lenient::or_default")]
    pub session_id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub time: MessageTime,
    #[serde(
        rename = "parentID",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub parent_id: Option<String>,
    #[serde(
        rename = "modelID",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub model_id: Option<String>,
    #[serde(
        rename = "providerID",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub provider_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub mode: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub agent: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub model: Option<ModelRef>,
    /// Present (even as zero) on every billable assistant message.
    ///
    /// A present value of the wrong type still counts as present and reads as 0.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present_number"
    )]
    pub cost: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub tokens: Option<TokenBreakdown>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_default"
    )]
    pub finish: Option<String>,
}

impl RawMessage {
    /// Agent label: explicit agent, else mode.
    pub fn agent_label(&self) -> Option<&str> {
        non_empty(self.agent.as_deref()).or_else(|| non_empty(self.mode.as_deref()))
    }

    /// Provider id: flat field first, then the nested model descriptor.
    pub fn resolved_provider_id(&self) -> Option<&str> {
        non_empty(self.provider_id.as_deref()).or_else(|| {
            self.model
                .as_ref()
                .and_then(|m| non_empty(m.provider_id.as_deref()))
        })
    }

    /// Model id: flat field first, then the nested model descriptor.
    pub fn resolved_model_id(&self) -> Option<&str> {
        non_empty(self.model_id.as_deref()).or_else(|| {
            self.model
                .as_ref()
                .and_then(|m| non_empty(m.model_id.as_deref()))
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Deserializers that degrade malformed values instead of failing.
pub(crate) mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Deserialize `T`, or fall back to `T::default()` if the value has the wrong shape.
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Only called when the field is present, so the result is always `Some`.
    pub fn present_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Some(value.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0)))
    }
}
