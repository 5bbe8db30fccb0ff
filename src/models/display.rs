//! Display model implementations for table and JSON output

use serde::Serialize;
use tabled::Tabled;

use crate::client::Member;
use crate::output::formatters::{format_remaining, format_saldo};
use crate::throttle::ThrottleStatus;

/// Member display model for table/JSON output.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct MemberDisplay {
    /// Member code
    #[tabled(rename = "KODE")]
    pub kode: String,

    #[tabled(rename = "NAMA")]
    pub nama: String,

    #[tabled(rename = "STATUS")]
    pub status: String,

    #[tabled(rename = "LEVEL")]
    pub level: String,

    /// Verification state
    #[tabled(rename = "VERIFIED")]
    pub verified: String,

    #[tabled(rename = "SALDO")]
    pub saldo: String,
}

impl From<&Member> for MemberDisplay {
    fn from(member: &Member) -> Self {
        let dash = || "-".to_string();
        Self {
            kode: member.kode.clone(),
            nama: member.nama.clone().unwrap_or_else(dash),
            status: member.status.clone().unwrap_or_else(dash),
            level: member.level.clone().unwrap_or_else(dash),
            verified: match member.verified {
                Some(true) => "yes".to_string(),
                Some(false) => "no".to_string(),
                None => dash(),
            },
            saldo: format_saldo(member.saldo),
        }
    }
}

/// Throttle state of one scope.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct GuardDisplay {
    #[tabled(rename = "SCOPE")]
    pub scope: String,

    #[tabled(rename = "STATE")]
    pub state: String,

    /// Failed attempts currently counted
    #[tabled(rename = "ATTEMPTS")]
    pub attempts: usize,

    #[tabled(rename = "REMAINING")]
    #[serde(skip)]
    pub remaining: String,

    #[tabled(skip)]
    pub remaining_ms: u64,
}

impl GuardDisplay {
    pub fn new(scope: &str, status: &ThrottleStatus) -> Self {
        Self {
            scope: scope.to_string(),
            state: if status.blocked { "locked" } else { "open" }.to_string(),
            attempts: status.attempts,
            remaining: if status.blocked {
                format_remaining(status.remaining)
            } else {
                "-".to_string()
            },
            remaining_ms: u64::try_from(status.remaining_ms()).unwrap_or(u64::MAX),
        }
    }
}
