//! Filter signatures: deterministic cache keys for list queries

use sha2::{Digest, Sha256};

use crate::client::MemberFilters;

/// Hash a resource name and its filter fields into a signature.
///
/// Values are trimmed, empty values are dropped and fields are sorted by
/// name, so logically identical filter sets always produce the same key.
pub fn filter_signature(resource: &str, fields: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(resource.as_bytes());
    hasher.update(b"|");

    let mut normalized: Vec<(&str, &str)> = fields
        .iter()
        .map(|(k, v)| (*k, v.trim()))
        .filter(|(_, v)| !v.is_empty())
        .collect();
    normalized.sort();

    for (k, v) in normalized {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}

/// A filter set that can be reduced to a cache signature
pub trait Filters {
    fn signature(&self) -> String;
}

/// Signature of a member list query
pub fn member_signature(filters: &MemberFilters) -> String {
    let fields = filters.fields();
    let fields_ref: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    filter_signature("members", &fields_ref)
}

impl Filters for MemberFilters {
    fn signature(&self) -> String {
        member_signature(self)
    }
}
