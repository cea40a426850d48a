//! Filter, sort and paginate over a result snapshot.
//!
//! [`run`] is pure: the same snapshot and criteria always give the same page.
//! [`ViewState`] keeps the criteria a caller has set between calls and clamps
//! its current page when the matches shrink.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::StatusRecord;

pub const DEFAULT_PAGE_SIZE: usize = 24;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FilterCriteria {
    /// Substring of the resolved identity.
    pub search: String,
    pub version: String,
    pub motd: String,
    /// Inclusive lower bound on players online; 0 disables it.
    pub min_players: u32,
    /// Inclusive upper bound on players online; 0 disables it.
    pub max_players: u32,
    pub hide_empty: bool,
}

impl FilterCriteria {
    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }

    fn matcher(&self) -> Matcher {
        let norm = |s: &str| s.trim().to_lowercase();
        Matcher {
            search: norm(&self.search),
            version: norm(&self.version),
            motd: norm(&self.motd),
            min_players: self.min_players,
            max_players: self.max_players,
            hide_empty: self.hide_empty,
        }
    }
}

/// Criteria with the text terms normalized once per query.
struct Matcher {
    search: String,
    version: String,
    motd: String,
    min_players: u32,
    max_players: u32,
    hide_empty: bool,
}

impl Matcher {
    fn matches(&self, r: &StatusRecord) -> bool {
        let contains = |field: Option<&str>, term: &str| {
            term.is_empty() || field.unwrap_or("").to_lowercase().contains(term)
        };
        let online = r.players_online;

        contains(r.identity(), &self.search)
            && contains(r.version.as_deref(), &self.version)
            && contains(r.motd.as_deref(), &self.motd)
            && !(self.hide_empty && online == 0)
            && (self.min_players == 0 || online >= self.min_players)
            && (self.max_players == 0 || online <= self.max_players)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    #[serde(rename = "players-desc")]
    PlayersDesc,
    #[serde(rename = "players-asc")]
    PlayersAsc,
    #[serde(rename = "ip-asc")]
    IpAsc,
    #[serde(rename = "ip-desc")]
    IpDesc,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::PlayersDesc => "players-desc",
            SortKey::PlayersAsc => "players-asc",
            SortKey::IpAsc => "ip-asc",
            SortKey::IpDesc => "ip-desc",
        }
    }

    fn compare(self, a: &StatusRecord, b: &StatusRecord) -> Ordering {
        match self {
            SortKey::PlayersDesc => b.players_online.cmp(&a.players_online),
            SortKey::PlayersAsc => a.players_online.cmp(&b.players_online),
            SortKey::IpAsc => ip_key(a).cmp(ip_key(b)),
            SortKey::IpDesc => ip_key(b).cmp(ip_key(a)),
        }
    }
}

fn ip_key(r: &StatusRecord) -> &str {
    r.identity().unwrap_or("")
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "players-desc" => Ok(SortKey::PlayersDesc),
            "players-asc" => Ok(SortKey::PlayersAsc),
            "ip-asc" => Ok(SortKey::IpAsc),
            "ip-desc" => Ok(SortKey::IpDesc),
            other => Err(format!(
                "unknown sort key {other:?} (expected players-desc, players-asc, ip-asc or ip-desc)"
            )),
        }
    }
}

/// 1-based page request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    fn effective_size(&self) -> usize {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }
}

/// One window of the filtered, sorted results.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryPage {
    pub items: Vec<StatusRecord>,
    /// Number of records passing the filter.
    pub matches: usize,
    /// The page actually returned, after clamping.
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
}

/// Number of pages for `matches` records; never less than 1.
pub fn page_count(matches: usize, page_size: usize) -> usize {
    matches.div_ceil(page_size.max(1)).max(1)
}

/// Records passing every active criterion, in snapshot order.
pub fn filter<'a>(snapshot: &'a [StatusRecord], criteria: &FilterCriteria) -> Vec<&'a StatusRecord> {
    let m = criteria.matcher();
    snapshot.iter().filter(|r| m.matches(r)).collect()
}

/// Stable sort; equal keys keep their snapshot order.
pub fn sort(records: &mut [&StatusRecord], key: SortKey) {
    records.sort_by(|a, b| key.compare(a, b));
}

pub fn run(
    snapshot: &[StatusRecord],
    criteria: &FilterCriteria,
    key: SortKey,
    page: PageRequest,
) -> QueryPage {
    let mut matched = filter(snapshot, criteria);
    sort(&mut matched, key);

    let page_size = page.effective_size();
    let matches = matched.len();
    let pages = page_count(matches, page_size);
    let current = page.page.clamp(1, pages);
    let start = (current - 1) * page_size;

    QueryPage {
        items: matched
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect(),
        matches,
        page: current,
        page_count: pages,
        page_size,
    }
}

/// The caller's current criteria, sort and page.
///
/// Changing the criteria, sort or page size returns to page 1. [`apply`]
/// clamps the stored page to the last valid page.
///
/// [`apply`]: ViewState::apply
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub criteria: FilterCriteria,
    pub sort: SortKey,
    pub page: PageRequest,
}

impl ViewState {
    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        if criteria != self.criteria {
            self.criteria = criteria;
            self.page.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if sort != self.sort {
            self.sort = sort;
            self.page.page = 1;
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size != self.page.page_size {
            self.page.page_size = page_size;
            self.page.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page.page = page.max(1);
    }

    pub fn first_page(&mut self) {
        self.page.page = 1;
    }

    pub fn prev_page(&mut self) {
        self.page.page = self.page.page.saturating_sub(1).max(1);
    }

    /// Advance one page, not past `page_count`.
    pub fn next_page(&mut self, page_count: usize) {
        self.page.page = (self.page.page + 1).min(page_count.max(1));
    }

    pub fn last_page(&mut self, page_count: usize) {
        self.page.page = page_count.max(1);
    }

    /// Evaluate against `snapshot`, storing the clamped page.
    pub fn apply(&mut self, snapshot: &[StatusRecord]) -> QueryPage {
        let out = run(snapshot, &self.criteria, self.sort, self.page);
        self.page.page = out.page;
        out
    }
}
