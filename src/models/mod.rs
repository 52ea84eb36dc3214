mod lenient;
mod media;

pub use media::{MediaEntry, TrailerLink, TrailerProvider};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cataloged movie or series.
///
/// `id` is empty until the backend has assigned one. Optional fields are
/// serialized as `null` rather than skipped so that an update overwrites
/// (and therefore clears) them on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub poster: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rating: Option<u8>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub date_watched: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub year: Option<i32>,
    #[serde(default)]
    pub is_series: bool,
    #[serde(default, deserialize_with = "lenient::number")]
    pub seasons: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub episodes: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub episode_duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub trailer_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub images: Vec<MediaEntry>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub director: Option<String>,
}

impl Item {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            notes: String::new(),
            poster: None,
            tags: Vec::new(),
            status: Status::ToWatch,
            rating: None,
            date_added: Some(Utc::now()),
            date_watched: None,
            year: None,
            is_series: false,
            seasons: None,
            episodes: None,
            episode_duration: None,
            duration: None,
            trailer_url: None,
            images: Vec::new(),
            director: None,
        }
    }

    /// Total running time in minutes.
    ///
    /// For a series this is `episodes * episode_duration` and is `None` when
    /// either factor is missing.
    pub fn effective_duration(&self) -> Option<u32> {
        if self.is_series {
            let episodes = self.episodes?;
            let per_episode = self.episode_duration?;
            episodes.checked_mul(per_episode)
        } else {
            self.duration
        }
    }

    /// Moves the item to `status`, applying the `date_watched` side effects.
    pub fn set_status(&mut self, status: Status, today: NaiveDate, policy: DateWatchedPolicy) {
        if status == Status::Watched {
            if self.date_watched.is_none() {
                self.date_watched = Some(today);
            }
        } else if self.status == Status::Watched && policy == DateWatchedPolicy::Clear {
            self.date_watched = None;
        }
        self.status = status;
    }

    /// Rating as shown to the user: only watched items carry one.
    pub fn shown_rating(&self) -> Option<u8> {
        match self.status {
            Status::Watched => self.rating,
            _ => None,
        }
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }

    pub fn add_media(&mut self, entry: MediaEntry) {
        self.images.push(entry);
    }

    /// Removes the media entry at `index`, keeping the order of the rest.
    pub fn remove_media(&mut self, index: usize) -> Option<MediaEntry> {
        if index < self.images.len() {
            Some(self.images.remove(index))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    #[default]
    ToWatch,
    Watching,
    Watched,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::ToWatch,
        Status::Watching,
        Status::Watched,
        Status::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::ToWatch => "toWatch",
            Status::Watching => "watching",
            Status::Watched => "watched",
            Status::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// What happens to `date_watched` when an item leaves the watched status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateWatchedPolicy {
    /// Leave the date alone; only an explicit edit removes it.
    #[default]
    Keep,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingBand {
    Excellent,
    Good,
    Average,
    Below,
    Poor,
}

impl RatingBand {
    pub fn of(rating: u8) -> Self {
        match rating {
            80.. => RatingBand::Excellent,
            60..=79 => RatingBand::Good,
            40..=59 => RatingBand::Average,
            20..=39 => RatingBand::Below,
            _ => RatingBand::Poor,
        }
    }

    /// The 0-10 score printed on a rating badge.
    pub fn badge_score(rating: u8) -> u8 {
        ((rating as f32) / 10.0).round() as u8
    }
}
