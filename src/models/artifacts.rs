use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Label, LabelMeta};

/// Literal entity mentions found in the cleaned transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Raw mentions, never normalized
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    /// Raw mentions including the currency marker
    #[serde(default)]
    pub amounts: Vec<String>,
}

impl Entities {
    pub fn total(&self) -> usize {
        self.emails.len()
            + self.addresses.len()
            + self.dates.len()
            + self.urls.len()
            + self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Everything a downstream workflow needs to persist about one processed conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationArtifacts {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub lang: String,
    pub transcript_raw: String,
    pub transcript_clean: String,
    pub requests: Vec<String>,
    pub entities: Entities,
    pub labels_final: Vec<Label>,
    pub labels_meta: Vec<LabelMeta>,
    pub summary_md: String,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub agent_versions: BTreeMap<String, String>,
}
