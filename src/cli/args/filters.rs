//! Filter argument types for CLI commands

use clap::Args;

use crate::client::MemberFilters;

/// Filter arguments for the member list command.
///
/// Identical filter values (after trimming) hit the same cache entry, so
/// `--search " budi "` and `--search budi` share results.
#[derive(Args, Debug, Default, Clone)]
pub struct MemberFilterArgs {
    /// Free-text search on code or name
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Filter by member status (active, suspended, ...)
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by reseller level
    #[arg(long)]
    pub level: Option<String>,

    /// Filter by verification state (verified, unverified)
    #[arg(long)]
    pub verification: Option<String>,
}

impl MemberFilterArgs {
    pub fn to_filters(&self) -> MemberFilters {
        MemberFilters {
            search: self.search.clone(),
            status: self.status.clone(),
            level: self.level.clone(),
            verification: self.verification.clone(),
        }
    }
}
