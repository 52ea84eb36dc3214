//! Form-level checks run before anything is sent to the backend.

use crate::errors::ValidationError;
use crate::models::{Item, Tag, TrailerLink};

pub const MAX_NOTES_LEN: usize = 130;
pub const MAX_RATING: u8 = 100;
pub const MAX_DURATION: u32 = 999;

pub fn validate_item(item: &Item) -> Result<(), ValidationError> {
    if item.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    if let Some(rating) = item.rating {
        if rating > MAX_RATING {
            return Err(ValidationError::RatingOutOfRange(rating));
        }
    }

    let notes_len = item.notes.chars().count();
    if notes_len > MAX_NOTES_LEN {
        return Err(ValidationError::NotesTooLong {
            len: notes_len,
            max: MAX_NOTES_LEN,
        });
    }

    if item.is_series {
        if item.seasons == Some(0) {
            return Err(ValidationError::MissingSeriesField { field: "seasons" });
        }
        if item.episodes.unwrap_or(0) < 1 {
            return Err(ValidationError::MissingSeriesField { field: "episodes" });
        }
        if item.episode_duration.unwrap_or(0) < 1 {
            return Err(ValidationError::MissingSeriesField {
                field: "episodeDuration",
            });
        }
    } else {
        match item.duration {
            Some(minutes) if (1..=MAX_DURATION).contains(&minutes) => {}
            _ => return Err(ValidationError::InvalidDuration),
        }
    }

    if let Some(url) = item.trailer_url.as_deref() {
        if TrailerLink::parse(url).is_err() {
            return Err(ValidationError::InvalidTrailerUrl(url.to_string()));
        }
    }

    Ok(())
}

/// Checks a tag name for emptiness and case-insensitive uniqueness.
///
/// `except_id` skips the tag being renamed.
pub fn validate_tag_name(
    name: &str,
    tags: &[Tag],
    except_id: Option<&str>,
) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyTagName);
    }

    let lowered = name.to_lowercase();
    let taken = tags
        .iter()
        .filter(|t| Some(t.id.as_str()) != except_id)
        .any(|t| t.name.to_lowercase() == lowered);

    if taken {
        return Err(ValidationError::DuplicateTag(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie() -> Item {
        let mut item = Item::new("Stalker");
        item.duration = Some(161);
        item
    }

    #[test]
    fn accepts_a_complete_movie() {
        assert_eq!(validate_item(&movie()), Ok(()));
    }

    #[test]
    fn rejects_blank_title_and_bad_rating() {
        let mut item = movie();
        item.title = "   ".into();
        assert_eq!(validate_item(&item), Err(ValidationError::EmptyTitle));

        let mut item = movie();
        item.rating = Some(101);
        assert_eq!(
            validate_item(&item),
            Err(ValidationError::RatingOutOfRange(101))
        );
    }

    #[test]
    fn notes_are_bounded_in_characters() {
        let mut item = movie();
        item.notes = "я".repeat(MAX_NOTES_LEN);
        assert_eq!(validate_item(&item), Ok(()));

        item.notes.push('!');
        assert!(matches!(
            validate_item(&item),
            Err(ValidationError::NotesTooLong { len: 131, .. })
        ));
    }

    #[test]
    fn series_need_episode_fields() {
        let mut item = Item::new("Dark");
        item.is_series = true;
        item.episodes = Some(26);
        assert_eq!(
            validate_item(&item),
            Err(ValidationError::MissingSeriesField {
                field: "episodeDuration"
            })
        );

        item.episode_duration = Some(55);
        assert_eq!(validate_item(&item), Ok(()));
    }

    #[test]
    fn movies_need_a_duration() {
        let mut item = movie();
        item.duration = None;
        assert_eq!(validate_item(&item), Err(ValidationError::InvalidDuration));
        item.duration = Some(1000);
        assert_eq!(validate_item(&item), Err(ValidationError::InvalidDuration));
    }

    #[test]
    fn trailer_must_be_a_url() {
        let mut item = movie();
        item.trailer_url = Some("youtube dot com".into());
        assert!(matches!(
            validate_item(&item),
            Err(ValidationError::InvalidTrailerUrl(_))
        ));
    }

    #[test]
    fn tag_names_are_unique_ignoring_case() {
        let tags = vec![Tag {
            id: "t1".into(),
            name: "Sci-Fi".into(),
        }];

        assert_eq!(
            validate_tag_name(" sci-fi ", &tags, None),
            Err(ValidationError::DuplicateTag("sci-fi".into()))
        );
        assert_eq!(validate_tag_name("SCI-FI", &tags, Some("t1")), Ok(()));
        assert_eq!(validate_tag_name("  ", &tags, None), Err(ValidationError::EmptyTagName));
        assert_eq!(validate_tag_name("drama", &tags, None), Ok(()));
    }
}
