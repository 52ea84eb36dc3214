use crate::models::{Item, Tag};
use crate::pipeline::{SortSpec, StatusFilter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Cards,
    List,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Cards => "cards",
            ViewMode::List => "list",
        })
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cards" => Ok(ViewMode::Cards),
            "list" => Ok(ViewMode::List),
            other => Err(format!("unknown view mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalKind {
    Add,
    Edit,
    View,
    Tags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalSpec {
    #[serde(rename = "type")]
    pub kind: ModalKind,
    pub item_id: Option<String>,
}

impl ModalSpec {
    pub fn new(kind: ModalKind) -> Self {
        Self {
            kind,
            item_id: None,
        }
    }

    pub fn for_item(kind: ModalKind, item_id: impl Into<String>) -> Self {
        Self {
            kind,
            item_id: Some(item_id.into()),
        }
    }
}

/// The whole catalog UI state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub items: Vec<Item>,
    pub tags: Vec<Tag>,
    pub filter: StatusFilter,
    pub search: String,
    pub view_mode: ViewMode,
    pub sort_by: SortSpec,
    pub modal: Option<ModalSpec>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    LoadItems(Vec<Item>),
    LoadTags(Vec<Tag>),
    SetLoading(bool),
    AddItem(Item),
    UpdateItem(Item),
    DeleteItem(String),
    AddTag(Tag),
    UpdateTag(Tag),
    DeleteTag(String),
    SetFilter(StatusFilter),
    SetSearch(String),
    SetViewMode(ViewMode),
    SetSort(SortSpec),
    OpenModal(ModalSpec),
    CloseModal,
    SetError(Option<String>),
}

/// Applies `action` to `state`. Never fails: updates and deletes of ids that
/// are not present leave the collections as they were.
pub fn reduce(state: State, action: Action) -> State {
    let mut state = state;

    match action {
        Action::LoadItems(items) => {
            state.items = items;
            state.is_loading = false;
        }
        Action::LoadTags(tags) => state.tags = tags,
        Action::SetLoading(loading) => state.is_loading = loading,
        Action::AddItem(item) => state.items.push(item),
        Action::UpdateItem(item) => {
            if let Some(slot) = state.items.iter_mut().find(|i| i.id == item.id) {
                *slot = item;
            }
        }
        Action::DeleteItem(id) => state.items.retain(|i| i.id != id),
        Action::AddTag(tag) => state.tags.push(tag),
        Action::UpdateTag(tag) => {
            if let Some(slot) = state.tags.iter_mut().find(|t| t.id == tag.id) {
                *slot = tag;
            }
        }
        Action::DeleteTag(id) => state.tags.retain(|t| t.id != id),
        Action::SetFilter(filter) => state.filter = filter,
        Action::SetSearch(search) => state.search = search,
        Action::SetViewMode(mode) => state.view_mode = mode,
        Action::SetSort(sort) => state.sort_by = sort,
        Action::OpenModal(modal) => state.modal = Some(modal),
        Action::CloseModal => state.modal = None,
        Action::SetError(error) => state.error = error,
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn stored(id: &str, title: &str) -> Item {
        let mut item = Item::new(title);
        item.id = id.to_string();
        item
    }

    #[test]
    fn load_items_clears_loading() {
        let state = reduce(State::default(), Action::SetLoading(true));
        assert!(state.is_loading);

        let state = reduce(state, Action::LoadItems(vec![stored("1", "Heat")]));
        assert!(!state.is_loading);
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn item_updates_replace_by_id() {
        let state = State {
            items: vec![stored("1", "Heat"), stored("2", "Ran")],
            ..State::default()
        };

        let mut edited = stored("2", "Ran (1985)");
        edited.status = Status::Watched;
        let state = reduce(state, Action::UpdateItem(edited.clone()));
        assert_eq!(state.items[1], edited);

        let state = reduce(state, Action::DeleteItem("1".into()));
        assert_eq!(state.items, vec![edited]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let state = State {
            items: vec![stored("1", "Heat")],
            ..State::default()
        };
        let before = state.clone();

        let state = reduce(state, Action::UpdateItem(stored("9", "Ghost")));
        let state = reduce(state, Action::DeleteItem("9".into()));
        let state = reduce(state, Action::DeleteTag("9".into()));
        assert_eq!(state, before);
    }

    #[test]
    fn tag_actions_mirror_item_actions() {
        let tag = Tag {
            id: "t1".into(),
            name: "drama".into(),
        };
        let state = reduce(State::default(), Action::AddTag(tag.clone()));
        let renamed = Tag {
            name: "Drama".into(),
            ..tag
        };
        let state = reduce(state, Action::UpdateTag(renamed.clone()));
        assert_eq!(state.tags, vec![renamed]);

        let state = reduce(state, Action::DeleteTag("t1".into()));
        assert!(state.tags.is_empty());
    }

    #[test]
    fn opening_a_modal_replaces_the_current_one() {
        let state = reduce(State::default(), Action::OpenModal(ModalSpec::new(ModalKind::Tags)));
        let state = reduce(state, Action::OpenModal(ModalSpec::for_item(ModalKind::View, "1")));
        assert_eq!(state.modal, Some(ModalSpec::for_item(ModalKind::View, "1")));

        let state = reduce(state, Action::CloseModal);
        assert_eq!(state.modal, None);
    }

    #[test]
    fn error_slot_holds_latest_message() {
        let state = reduce(State::default(), Action::SetError(Some("first".into())));
        let state = reduce(state, Action::SetError(Some("second".into())));
        assert_eq!(state.error.as_deref(), Some("second"));
    }
}
