//! Output of the `check` subcommand: tab-separated lines, JSON entries, and
//! the process exit status.

use serde::Serialize;

use crate::check::{Availability, PlatformResult};

/// Exit status when every platform reported the username available.
pub const EXIT_ALL_AVAILABLE: u8 = 0;

/// Exit status when at least one platform was taken or could not be checked.
pub const EXIT_NOT_ALL_AVAILABLE: u8 = 1;

/// Results for one username, with the display filter applied.
#[derive(Debug, Clone, Serialize)]
pub struct UsernameReport<'a> {
    /// The username as given.
    pub username: &'a str,
    /// Results that pass the filter, in platform table order.
    pub results: Vec<&'a PlatformResult>,
}

impl<'a> UsernameReport<'a> {
    /// Report for `username`, keeping only available results when
    /// `available_only` is set.
    pub fn new(username: &'a str, results: &'a [PlatformResult], available_only: bool) -> Self {
        let results = results
            .iter()
            .filter(|r| !available_only || r.availability == Availability::Available)
            .collect();
        Self { username, results }
    }

    /// One `username<TAB>platform<TAB>availability` line per shown result.
    pub fn lines(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|r| format!("{}\t{}\t{}", self.username, r.platform.id, r.availability))
            .collect()
    }
}

/// Exit status for one username's scan.
///
/// Anything short of every platform being available, including a platform
/// that could not be reached, is [`EXIT_NOT_ALL_AVAILABLE`].
pub fn exit_status(results: &[PlatformResult]) -> u8 {
    if results
        .iter()
        .all(|r| r.availability == Availability::Available)
    {
        EXIT_ALL_AVAILABLE
    } else {
        EXIT_NOT_ALL_AVAILABLE
    }
}
