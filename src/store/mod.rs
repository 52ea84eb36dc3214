//! The application state container.
//!
//! State only changes through [`Store::dispatch`]. The async operations call
//! the gateway first and commit to the state only once the backend has
//! confirmed the change. Backend failures are logged, written to the single
//! error slot and returned to the caller.

mod state;

pub use state::{reduce, Action, ModalKind, ModalSpec, State, ViewMode};

use crate::errors::{CatalogError, GatewayError, Result};
use crate::gateway::{DocumentStore, Gateway};
use crate::models::{DateWatchedPolicy, Item, Status, Tag};
use crate::pipeline::{
    self, Criteria, SortDirection, SortField, SortSpec, StatusFilter, HAS_RATING,
};
use crate::settings::{Preferences, SettingsStore, FILTER_KEY, SORT_BY_KEY, VIEW_MODE_KEY};
use crate::validation::validate_tag_name;
use chrono::{NaiveDate, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// A tag together with the number of items that carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUsage<'a> {
    pub tag: &'a Tag,
    pub count: usize,
}

/// One page of the visible list.
#[derive(Debug, Clone, PartialEq)]
pub struct VisiblePage<'a> {
    pub items: Vec<&'a Item>,
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Sort choices offered to the user, some of which also narrow the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPreset {
    TitleAsc,
    TitleDesc,
    Newest,
    Oldest,
    RatingDesc,
    RatingAsc,
    WatchedNewest,
    WatchedOldest,
}

impl SortPreset {
    pub const ALL: [SortPreset; 8] = [
        SortPreset::TitleAsc,
        SortPreset::TitleDesc,
        SortPreset::Newest,
        SortPreset::Oldest,
        SortPreset::RatingDesc,
        SortPreset::RatingAsc,
        SortPreset::WatchedNewest,
        SortPreset::WatchedOldest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SortPreset::TitleAsc => "title-asc",
            SortPreset::TitleDesc => "title-desc",
            SortPreset::Newest => "newest",
            SortPreset::Oldest => "oldest",
            SortPreset::RatingDesc => "rating-desc",
            SortPreset::RatingAsc => "rating-asc",
            SortPreset::WatchedNewest => "watched-newest",
            SortPreset::WatchedOldest => "watched-oldest",
        }
    }

    pub fn spec(&self) -> SortSpec {
        let (field, direction) = match self {
            SortPreset::TitleAsc => (SortField::Title, SortDirection::Asc),
            SortPreset::TitleDesc => (SortField::Title, SortDirection::Desc),
            SortPreset::Newest => (SortField::DateAdded, SortDirection::Desc),
            SortPreset::Oldest => (SortField::DateAdded, SortDirection::Asc),
            SortPreset::RatingDesc => (SortField::Rating, SortDirection::Desc),
            SortPreset::RatingAsc => (SortField::Rating, SortDirection::Asc),
            SortPreset::WatchedNewest => (SortField::DateWatched, SortDirection::Desc),
            SortPreset::WatchedOldest => (SortField::DateWatched, SortDirection::Asc),
        };
        SortSpec { field, direction }
    }
}

impl FromStr for SortPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SortPreset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown sort preset '{}'", s))
    }
}

pub struct Store {
    state: State,
    items: Gateway<Item>,
    tags: Gateway<Tag>,
    settings: Option<Box<dyn SettingsStore>>,
    date_watched_policy: DateWatchedPolicy,
}

impl Store {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            state: State::default(),
            items: Gateway::new(Arc::clone(&backend)),
            tags: Gateway::new(backend),
            settings: None,
            date_watched_policy: DateWatchedPolicy::default(),
        }
    }

    /// Restores the stored preferences and keeps them up to date from now on.
    pub fn with_settings(mut self, settings: Box<dyn SettingsStore>) -> Self {
        let prefs = Preferences::load(settings.as_ref());
        debug!("Restored preferences: {:?}", prefs);

        if let Some(mode) = prefs.view_mode {
            self.state = reduce(std::mem::take(&mut self.state), Action::SetViewMode(mode));
        }
        if let Some(sort) = prefs.sort_by {
            self.state = reduce(std::mem::take(&mut self.state), Action::SetSort(sort));
        }
        if let Some(filter) = prefs.filter {
            self.state = reduce(std::mem::take(&mut self.state), Action::SetFilter(filter));
        }

        self.settings = Some(settings);
        self
    }

    pub fn with_date_watched_policy(mut self, policy: DateWatchedPolicy) -> Self {
        self.date_watched_policy = policy;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        let setting = match &action {
            Action::SetViewMode(mode) => Some((VIEW_MODE_KEY, mode.to_string())),
            Action::SetSort(sort) => serde_json::to_string(sort)
                .ok()
                .map(|json| (SORT_BY_KEY, json)),
            Action::SetFilter(filter) => Some((FILTER_KEY, filter.to_string())),
            _ => None,
        };

        self.state = reduce(std::mem::take(&mut self.state), action);

        if let (Some((key, value)), Some(settings)) = (setting, self.settings.as_mut()) {
            if let Err(e) = settings.set(key, &value) {
                warn!("Failed to save setting {}: {:#}", key, e);
            }
        }
    }

    fn fail(&mut self, what: &str, err: GatewayError) -> CatalogError {
        let message = format!("Failed to {}: {}", what, err);
        error!("{}", message);
        self.dispatch(Action::SetError(Some(message)));
        err.into()
    }

    /// Fetches both collections. Tags are best-effort.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<()> {
        self.dispatch(Action::SetLoading(true));

        let items = match self.items.list_all().await {
            Ok(items) => items,
            Err(e) => {
                self.dispatch(Action::SetLoading(false));
                return Err(self.fail("load items", e));
            }
        };
        let tags = match self.tags.list_all().await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Failed to load tags: {}", e);
                Vec::new()
            }
        };

        info!("Loaded {} items and {} tags", items.len(), tags.len());
        self.dispatch(Action::LoadTags(tags));
        self.dispatch(Action::LoadItems(items));
        Ok(())
    }

    #[instrument(skip(self, data), fields(title = %data.title))]
    pub async fn create_item(&mut self, data: Item) -> Result<Item> {
        let mut data = data;
        data.id.clear();
        if data.date_added.is_none() {
            data.date_added = Some(Utc::now());
        }

        match self.items.create(&data).await {
            Ok(saved) => {
                info!("Added item {} ({})", saved.title, saved.id);
                self.dispatch(Action::AddItem(saved.clone()));
                Ok(saved)
            }
            Err(e) => Err(self.fail("add item", e)),
        }
    }

    #[instrument(skip(self, data), fields(id = %data.id))]
    pub async fn update_item(&mut self, data: Item) -> Result<Item> {
        match self.items.update(&data.id, &data).await {
            Ok(()) => {
                debug!("Updated item {}", data.title);
                self.dispatch(Action::UpdateItem(data.clone()));
                Ok(data)
            }
            Err(e) => Err(self.fail("update item", e)),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&mut self, id: &str) -> Result<()> {
        match self.items.remove(id).await {
            Ok(()) => {
                info!("Deleted item {}", id);
                self.dispatch(Action::DeleteItem(id.to_string()));
                Ok(())
            }
            Err(e) => Err(self.fail("delete item", e)),
        }
    }

    /// Moves an item to a new status and saves it.
    pub async fn set_item_status(&mut self, id: &str, status: Status, today: NaiveDate) -> Result<Item> {
        let mut item = self.find_item(id)?.clone();
        item.set_status(status, today, self.date_watched_policy);
        self.update_item(item).await
    }

    pub fn find_item(&self, id: &str) -> Result<&Item> {
        self.state
            .items
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| CatalogError::UnknownItem(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn create_tag(&mut self, name: &str) -> Result<Tag> {
        validate_tag_name(name, &self.state.tags, None)?;

        match self.tags.create(&Tag::new(name.trim())).await {
            Ok(saved) => {
                info!("Added tag {} ({})", saved.name, saved.id);
                self.dispatch(Action::AddTag(saved.clone()));
                Ok(saved)
            }
            Err(e) => Err(self.fail("add tag", e)),
        }
    }

    #[instrument(skip(self, tag), fields(id = %tag.id))]
    pub async fn update_tag(&mut self, tag: Tag) -> Result<Tag> {
        validate_tag_name(&tag.name, &self.state.tags, Some(&tag.id))?;
        let tag = Tag {
            name: tag.name.trim().to_string(),
            ..tag
        };

        match self.tags.update(&tag.id, &tag).await {
            Ok(()) => {
                self.dispatch(Action::UpdateTag(tag.clone()));
                Ok(tag)
            }
            Err(e) => Err(self.fail("update tag", e)),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_tag(&mut self, id: &str) -> Result<()> {
        match self.tags.remove(id).await {
            Ok(()) => {
                info!("Deleted tag {}", id);
                self.dispatch(Action::DeleteTag(id.to_string()));
                Ok(())
            }
            Err(e) => Err(self.fail("delete tag", e)),
        }
    }

    fn tag_name(&self, id: &str) -> Result<String> {
        self.state
            .tags
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.clone())
            .ok_or_else(|| CatalogError::UnknownTag(id.to_string()))
    }

    fn items_tagged(&self, name: &str) -> Vec<Item> {
        self.state
            .items
            .iter()
            .filter(|i| i.has_tag(name))
            .cloned()
            .collect()
    }

    /// Renames a tag and rewrites it on every item that carries it.
    pub async fn rename_tag_everywhere(&mut self, tag: Tag) -> Result<Tag> {
        let old_name = self.tag_name(&tag.id)?;
        let renamed = self.update_tag(tag).await?;
        if renamed.name == old_name {
            return Ok(renamed);
        }

        let affected = self.items_tagged(&old_name);
        info!(
            "Renaming tag '{}' to '{}' on {} items",
            old_name,
            renamed.name,
            affected.len()
        );
        for mut item in affected {
            let already_has_new = item.has_tag(&renamed.name);
            item.tags = item
                .tags
                .into_iter()
                .filter_map(|t| {
                    if t != old_name {
                        Some(t)
                    } else if already_has_new {
                        None
                    } else {
                        Some(renamed.name.clone())
                    }
                })
                .collect();
            self.update_item(item).await?;
        }

        Ok(renamed)
    }

    /// Deletes a tag and strips it from every item that carries it.
    pub async fn delete_tag_everywhere(&mut self, id: &str) -> Result<()> {
        let name = self.tag_name(id)?;
        self.delete_tag(id).await?;

        for mut item in self.items_tagged(&name) {
            item.tags.retain(|t| *t != name);
            self.update_item(item).await?;
        }
        Ok(())
    }

    /// Every tag with its usage count, recomputed from the items.
    pub fn tag_usage(&self) -> Vec<TagUsage<'_>> {
        self.state
            .tags
            .iter()
            .map(|tag| TagUsage {
                tag,
                count: self.state.items.iter().filter(|i| i.has_tag(&tag.name)).count(),
            })
            .collect()
    }

    /// The `limit` most used tags, most used first.
    pub fn popular_tags(&self, limit: usize) -> Vec<TagUsage<'_>> {
        let mut usage = self.tag_usage();
        usage.sort_by(|a, b| b.count.cmp(&a.count));
        usage.truncate(limit);
        usage
    }

    pub fn apply_sort_preset(&mut self, preset: SortPreset) {
        self.dispatch(Action::SetSort(preset.spec()));

        match preset {
            SortPreset::WatchedNewest | SortPreset::WatchedOldest => {
                self.dispatch(Action::SetFilter(StatusFilter::Only(Status::Watched)));
            }
            SortPreset::RatingDesc | SortPreset::RatingAsc => {
                self.dispatch(Action::SetFilter(StatusFilter::All));
                self.dispatch(Action::SetSearch(HAS_RATING.to_string()));
            }
            _ if self.state.search == HAS_RATING => {
                self.dispatch(Action::SetSearch(String::new()));
            }
            _ => {}
        }
    }

    pub fn toggle_sort_direction(&mut self) {
        let sort = SortSpec {
            direction: self.state.sort_by.direction.flipped(),
            ..self.state.sort_by
        };
        self.dispatch(Action::SetSort(sort));
    }

    pub fn visible_items(&self) -> Vec<&Item> {
        let criteria = Criteria {
            filter: self.state.filter,
            search: &self.state.search,
            sort: self.state.sort_by,
        };
        pipeline::visible_items(&self.state.items, &criteria)
    }

    pub fn visible_page(&self, requested: usize) -> VisiblePage<'_> {
        let visible = self.visible_items();
        let page = pipeline::paginate(&visible, requested);

        VisiblePage {
            items: page.items.to_vec(),
            number: page.number,
            total_pages: page.total_pages,
            total_items: page.total_items,
        }
    }
}
