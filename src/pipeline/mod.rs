//! Derivation of the visible item list: status filter, search, sort and,
//! for the list view, pagination.
//!
//! Everything here is a pure function of its inputs.

use crate::models::{Item, Status};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const PAGE_SIZE: usize = 10;

/// Search sentinel selecting items without tags.
pub const NO_TAGS: &str = "_NO_TAGS_";
/// Search sentinel selecting items that carry a rating.
pub const HAS_RATING: &str = "_HAS_RATING_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => item.status == *status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

impl TryFrom<String> for StatusFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatusFilter> for String {
    fn from(filter: StatusFilter) -> Self {
        filter.to_string()
    }
}

/// The search box, with its two sentinel values decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Search {
    Any,
    NoTags,
    HasRating,
    Text(String),
}

impl Search {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => Search::Any,
            NO_TAGS => Search::NoTags,
            HAS_RATING => Search::HasRating,
            text => Search::Text(text.to_lowercase()),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Search::Any => true,
            Search::NoTags => item.tags.is_empty(),
            Search::HasRating => item.rating.is_some(),
            Search::Text(needle) => {
                item.title.to_lowercase().contains(needle.as_str())
                    || item.tags.iter().any(|t| t.to_lowercase().contains(needle.as_str()))
            }
        }
    }
}

/// Scalar fields an item list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    DateAdded,
    DateWatched,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::DateAdded,
            direction: SortDirection::Desc,
        }
    }
}

impl FromStr for SortSpec {
    type Err = String;

    /// Parses `field[:direction]`, e.g. `rating:desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s.split_once(':').unwrap_or((s, "asc"));
        let field = serde_json::from_value(serde_json::Value::String(field.to_string()))
            .map_err(|_| format!("unknown sort field '{}'", field))?;
        let direction =
            serde_json::from_value(serde_json::Value::String(direction.to_lowercase()))
                .map_err(|_| format!("unknown sort direction '{}'", direction))?;
        Ok(Self { field, direction })
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum SortKey {
    /// Folded title first, plain lowercase title to break ties.
    Text(String, String),
    Number(i64),
}

/// Lowercases and folds `ё` into `е`, so Cyrillic titles keep their
/// alphabetical order instead of sorting `ё` after `я`.
fn fold_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect()
}

fn sort_key(item: &Item, field: SortField) -> Option<SortKey> {
    match field {
        SortField::Title => Some(SortKey::Text(
            fold_title(&item.title),
            item.title.to_lowercase(),
        )),
        SortField::DateAdded => item
            .date_added
            .map(|d| SortKey::Number(d.timestamp_millis())),
        SortField::DateWatched => item
            .date_watched
            .map(|d| SortKey::Number(i64::from(d.num_days_from_ce()))),
        SortField::Rating => item.rating.map(|r| SortKey::Number(i64::from(r))),
    }
}

/// Orders two items by `spec`.
///
/// Missing values go last when ascending and first when descending.
pub fn compare_items(a: &Item, b: &Item, spec: SortSpec) -> Ordering {
    let ascending = spec.direction == SortDirection::Asc;

    match (sort_key(a, spec.field), sort_key(b, spec.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) if ascending => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) if ascending => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            let ordering = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Criteria<'a> {
    pub filter: StatusFilter,
    pub search: &'a str,
    pub sort: SortSpec,
}

pub fn visible_items<'a>(items: &'a [Item], criteria: &Criteria<'_>) -> Vec<&'a Item> {
    let search = Search::parse(criteria.search);

    let mut visible: Vec<&Item> = items
        .iter()
        .filter(|item| criteria.filter.matches(item))
        .filter(|item| search.matches(item))
        .collect();

    visible.sort_by(|a, b| compare_items(a, b, criteria.sort));
    visible
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based page number after clamping.
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn total_pages(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE)
}

/// Clamps a 1-based page number into the range that exists for `count`
/// items. An empty list has a single, empty page 1.
pub fn clamp_page(requested: usize, count: usize) -> usize {
    requested.clamp(1, total_pages(count).max(1))
}

pub fn paginate<T>(items: &[T], requested: usize) -> Page<'_, T> {
    let number = clamp_page(requested, items.len());
    let start = (number - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());

    Page {
        items: &items[start.min(end)..end],
        number,
        total_pages: total_pages(items.len()),
        total_items: items.len(),
    }
}
