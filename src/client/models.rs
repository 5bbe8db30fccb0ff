//! Backend record types

use serde::{Deserialize, Serialize};

use crate::cache::Keyed;

/// Reseller member as listed by the backend.
///
/// Fields the CLI does not interpret are kept in `extra` so cached records
/// round-trip without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Stable unique member code
    pub kode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saldo: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Keyed for Member {
    fn key(&self) -> &str {
        &self.kode
    }
}

/// Filters accepted by the member list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilters {
    pub search: Option<String>,
    pub status: Option<String>,
    pub level: Option<String>,
    pub verification: Option<String>,
}

impl MemberFilters {
    /// Non-empty filter values, trimmed, keyed by query parameter name
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        [
            ("search", &self.search),
            ("status", &self.status),
            ("level", &self.level),
            ("verification", &self.verification),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty()).then(|| (name, value.to_string()))
        })
        .collect()
    }
}
