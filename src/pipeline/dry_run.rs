//! Offline classification of records

use crate::config::FetchConfig;
use crate::records::Record;
use crate::url::{sanitize_identifier, HostList, ResolvedTarget, UrlResolver};
use std::fmt;

/// Which path a record would take, decided without network access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Unresolvable,
    Trusted,
    Direct,
    Viewer,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Unresolvable => "unresolvable",
            Route::Trusted => "trusted",
            Route::Direct => "direct",
            Route::Viewer => "viewer",
        };
        f.pad(name)
    }
}

/// One classified record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRecord {
    pub position: usize,
    pub part_number: String,
    pub route: Route,
    /// Resolved URL, or the reason resolution failed
    pub detail: String,
}

/// Result of a dry run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DryRunSummary {
    pub planned: Vec<PlannedRecord>,
    pub unresolvable: usize,
    pub trusted: usize,
    pub direct: usize,
    pub viewer: usize,
}

/// Classifies every record the way a real run would route it
pub fn dry_run(records: &[Record], resolver: &UrlResolver, fetch: &FetchConfig) -> DryRunSummary {
    let trusted = HostList::new(fetch.trusted_hosts.iter().cloned());
    let viewers = HostList::new(fetch.viewer_hosts.iter().cloned());
    let mut summary = DryRunSummary::default();

    for record in records {
        let part_number = sanitize_identifier(record.identifier.as_deref(), record.index);

        let (route, detail) = match resolver.resolve(record.raw_url.as_deref()) {
            ResolvedTarget::Unresolvable(reason) => (Route::Unresolvable, reason.to_string()),
            ResolvedTarget::Fetchable(url) if trusted.matches(&url) => (Route::Trusted, url.to_string()),
            ResolvedTarget::Fetchable(url) if viewers.matches(&url) => (Route::Viewer, url.to_string()),
            ResolvedTarget::Fetchable(url) => (Route::Direct, url.to_string()),
        };

        match route {
            Route::Unresolvable => summary.unresolvable += 1,
            Route::Trusted => summary.trusted += 1,
            Route::Direct => summary.direct += 1,
            Route::Viewer => summary.viewer += 1,
        }

        summary.planned.push(PlannedRecord {
            position: record.position(),
            part_number,
            route,
            detail,
        });
    }

    summary
}
