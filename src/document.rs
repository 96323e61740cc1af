// Document: the authoritative in-memory project and its single writer
//
// `DocumentStore` is the only code path that mutates a `ProjectDocument`.
// History and the save scheduler receive copies of values or snapshots and
// never hold a reference into the live document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{DraftError, FieldPath, FocusTarget, ItemId, ListKind, Result, Section};
use crate::utils::count_words;

/// One entry of an ordered project list.
///
/// Text fields are addressed by name so that the page can bind inputs
/// without knowing the concrete item type.
pub trait ListEntry: Clone + Serialize + DeserializeOwned {
    const KIND: ListKind;

    /// Field holding the display name (`title` or `name`)
    const LABEL_FIELD: &'static str;

    fn named(label: &str) -> Self;

    fn id(&self) -> &ItemId;

    fn id_mut(&mut self) -> &mut ItemId;

    fn field(&self, field: &str) -> Option<&str>;

    fn set_field(&mut self, field: &str, value: String) -> Result<()>;

    /// Whether a change to `field` alters what the list view shows
    fn is_display_field(field: &str) -> bool {
        field == Self::LABEL_FIELD || field == "status"
    }

    fn label(&self) -> &str {
        self.field(Self::LABEL_FIELD).unwrap_or_default()
    }
}

fn unknown_field(kind: ListKind, field: &str) -> DraftError {
    DraftError::Validation(format!("{} have no field '{}'", kind.as_str(), field))
}

/// Chapter of the manuscript
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub id: ItemId,
    pub title: String,
    pub content: String,
    pub status: String,
    pub notes: String,
    /// Derived from `content`; never set directly
    pub word_count: u32,
}

impl ListEntry for Chapter {
    const KIND: ListKind = ListKind::Chapters;
    const LABEL_FIELD: &'static str = "title";

    fn named(label: &str) -> Self {
        Chapter {
            id: ItemId::generate(),
            title: label.to_string(),
            status: "draft".to_string(),
            ..Default::default()
        }
    }

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn id_mut(&mut self) -> &mut ItemId {
        &mut self.id
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(&self.title),
            "content" => Some(&self.content),
            "status" => Some(&self.status),
            "notes" => Some(&self.notes),
            _ => None,
        }
    }

    fn set_field(&mut self, field: &str, value: String) -> Result<()> {
        match field {
            "title" => self.title = value,
            "content" => {
                self.word_count = count_words(&value);
                self.content = value;
            }
            "status" => self.status = value,
            "notes" => self.notes = value,
            _ => return Err(unknown_field(Self::KIND, field)),
        }
        Ok(())
    }
}

/// Character sheet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub id: ItemId,
    pub name: String,
    pub role: String,
    pub description: String,
    pub notes: String,
}

impl ListEntry for Character {
    const KIND: ListKind = ListKind::Characters;
    const LABEL_FIELD: &'static str = "name";

    fn named(label: &str) -> Self {
        Character { id: ItemId::generate(), name: label.to_string(), ..Default::default() }
    }

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn id_mut(&mut self) -> &mut ItemId {
        &mut self.id
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "role" => Some(&self.role),
            "description" => Some(&self.description),
            "notes" => Some(&self.notes),
            _ => None,
        }
    }

    fn set_field(&mut self, field: &str, value: String) -> Result<()> {
        match field {
            "name" => self.name = value,
            "role" => self.role = value,
            "description" => self.description = value,
            "notes" => self.notes = value,
            _ => return Err(unknown_field(Self::KIND, field)),
        }
        Ok(())
    }

    fn is_display_field(field: &str) -> bool {
        field == "name" || field == "role"
    }
}

/// Setting / place
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub notes: String,
}

impl ListEntry for Location {
    const KIND: ListKind = ListKind::Locations;
    const LABEL_FIELD: &'static str = "name";

    fn named(label: &str) -> Self {
        Location { id: ItemId::generate(), name: label.to_string(), ..Default::default() }
    }

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn id_mut(&mut self) -> &mut ItemId {
        &mut self.id
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "description" => Some(&self.description),
            "notes" => Some(&self.notes),
            _ => None,
        }
    }

    fn set_field(&mut self, field: &str, value: String) -> Result<()> {
        match field {
            "name" => self.name = value,
            "description" => self.description = value,
            "notes" => self.notes = value,
            _ => return Err(unknown_field(Self::KIND, field)),
        }
        Ok(())
    }
}

/// Plot thread
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Plotline {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub status: String,
}

impl ListEntry for Plotline {
    const KIND: ListKind = ListKind::Plotlines;
    const LABEL_FIELD: &'static str = "title";

    fn named(label: &str) -> Self {
        Plotline {
            id: ItemId::generate(),
            title: label.to_string(),
            status: "open".to_string(),
            ..Default::default()
        }
    }

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn id_mut(&mut self) -> &mut ItemId {
        &mut self.id
    }

    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(&self.title),
            "description" => Some(&self.description),
            "status" => Some(&self.status),
            _ => None,
        }
    }

    fn set_field(&mut self, field: &str, value: String) -> Result<()> {
        match field {
            "title" => self.title = value,
            "description" => self.description = value,
            "status" => self.status = value,
            _ => return Err(unknown_field(Self::KIND, field)),
        }
        Ok(())
    }
}

/// Runs `$body` with `$list` bound to the `Vec` of the given kind
macro_rules! with_list {
    ($content:expr, $kind:expr, |$list:ident| $body:expr) => {
        match $kind {
            ListKind::Chapters => {
                let $list = &$content.chapters;
                $body
            }
            ListKind::Characters => {
                let $list = &$content.characters;
                $body
            }
            ListKind::Locations => {
                let $list = &$content.locations;
                $body
            }
            ListKind::Plotlines => {
                let $list = &$content.plotlines;
                $body
            }
        }
    };
}

macro_rules! with_list_mut {
    ($content:expr, $kind:expr, |$list:ident| $body:expr) => {
        match $kind {
            ListKind::Chapters => {
                let $list = &mut $content.chapters;
                $body
            }
            ListKind::Characters => {
                let $list = &mut $content.characters;
                $body
            }
            ListKind::Locations => {
                let $list = &mut $content.locations;
                $body
            }
            ListKind::Plotlines => {
                let $list = &mut $content.plotlines;
                $body
            }
        }
    };
}

fn position<T: ListEntry>(list: &[T], id: &ItemId) -> Result<usize> {
    list.iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| DraftError::NotFound(format!("{} item {}", T::KIND.as_str(), id)))
}

fn entry<'a, T: ListEntry>(list: &'a [T], id: &ItemId) -> Result<&'a T> {
    position(list, id).map(|index| &list[index])
}

fn entry_mut<'a, T: ListEntry>(list: &'a mut [T], id: &ItemId) -> Result<&'a mut T> {
    let index = position(list, id)?;
    Ok(&mut list[index])
}

fn move_entry<T: ListEntry>(list: &mut Vec<T>, id: &ItemId, to_index: usize) -> Result<()> {
    if to_index >= list.len() {
        return Err(DraftError::IndexOutOfBounds(to_index));
    }
    let from = position(list, id)?;
    let item = list.remove(from);
    list.insert(to_index, item);
    Ok(())
}

fn assign_missing_ids<T: ListEntry>(list: &mut [T]) {
    for item in list.iter_mut().filter(|item| item.id().is_empty()) {
        *item.id_mut() = ItemId::generate();
    }
}

/// Named sections and ordered lists of a project
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectContent {
    pub premise: String,
    pub theme: String,
    pub main_arc: String,
    pub notes: String,
    pub research: String,
    pub word_goal: u32,
    pub chapters: Vec<Chapter>,
    pub characters: Vec<Character>,
    pub locations: Vec<Location>,
    pub plotlines: Vec<Plotline>,
}

impl ProjectContent {
    /// True when nothing at all has been written into the project
    pub fn is_empty(&self) -> bool {
        Section::ALL
            .iter()
            .filter(|section| **section != Section::WordGoal)
            .all(|section| self.section_text(*section).is_empty())
            && self.word_goal == 0
            && ListKind::ALL.iter().all(|kind| self.list_len(*kind) == 0)
    }

    /// Assign ids to items that arrived without one and recompute word counts
    pub fn normalize(&mut self) {
        assign_missing_ids(&mut self.chapters);
        assign_missing_ids(&mut self.characters);
        assign_missing_ids(&mut self.locations);
        assign_missing_ids(&mut self.plotlines);
        for chapter in &mut self.chapters {
            chapter.word_count = count_words(&chapter.content);
        }
    }

    /// Text of a section as it appears in its input
    pub fn section_text(&self, section: Section) -> String {
        match section {
            Section::Premise => self.premise.clone(),
            Section::Theme => self.theme.clone(),
            Section::MainArc => self.main_arc.clone(),
            Section::Notes => self.notes.clone(),
            Section::Research => self.research.clone(),
            Section::WordGoal => self.word_goal.to_string(),
        }
    }

    /// Validate, coerce and store a section value
    pub fn set_section(&mut self, section: Section, raw: &str) -> Result<()> {
        let slot = match section {
            Section::Premise => &mut self.premise,
            Section::Theme => &mut self.theme,
            Section::MainArc => &mut self.main_arc,
            Section::Notes => &mut self.notes,
            Section::Research => &mut self.research,
            Section::WordGoal => {
                self.word_goal = parse_word_goal(raw)?;
                return Ok(());
            }
        };
        *slot = raw.to_string();
        Ok(())
    }

    /// Current text of a focus target, if it still exists
    pub fn target_text(&self, target: &FocusTarget) -> Option<String> {
        match target {
            FocusTarget::Section { section } => Some(self.section_text(*section)),
            FocusTarget::Item { list, item, field } => with_list!(self, *list, |entries| {
                entry(entries, item)
                    .ok()
                    .and_then(|e| e.field(field))
                    .map(str::to_string)
            }),
        }
    }

    /// JSON value written to the remote store for a field-path
    pub fn field_value(&self, path: FieldPath) -> Result<Value> {
        let value = match path {
            FieldPath::Section(Section::WordGoal) => Value::from(self.word_goal),
            FieldPath::Section(section) => Value::String(self.section_text(section)),
            FieldPath::List(kind) => {
                with_list!(self, kind, |entries| serde_json::to_value(entries)?)
            }
        };
        Ok(value)
    }

    pub fn list_len(&self, kind: ListKind) -> usize {
        with_list!(self, kind, |entries| entries.len())
    }

    pub fn item_ids(&self, kind: ListKind) -> Vec<ItemId> {
        with_list!(self, kind, |entries| entries.iter().map(|e| e.id().clone()).collect())
    }

    /// Position of an item, resolved at call time
    pub fn item_index(&self, kind: ListKind, id: &ItemId) -> Result<usize> {
        with_list!(self, kind, |entries| position(entries, id))
    }

    pub fn item_label(&self, kind: ListKind, id: &ItemId) -> Result<String> {
        with_list!(self, kind, |entries| entry(entries, id).map(|e| e.label().to_string()))
    }

    /// Sum of chapter word counts
    pub fn total_words(&self) -> u64 {
        self.chapters.iter().map(|c| c.word_count as u64).sum()
    }

    /// Fraction of the word goal reached, `None` without a goal
    pub fn goal_progress(&self) -> Option<f64> {
        if self.word_goal == 0 {
            return None;
        }
        Some(self.total_words() as f64 / self.word_goal as f64)
    }
}

fn parse_word_goal(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .replace([',', '_'], "")
        .parse::<u32>()
        .map_err(|_| {
            DraftError::Validation(format!(
                "Word goal must be a non-negative whole number, got '{}'",
                trimmed
            ))
        })
}

/// The project currently open in the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub id: String,
    pub content: ProjectContent,
    #[serde(default)]
    pub has_unsaved_changes: bool,
}

impl ProjectDocument {
    pub fn new(id: &str, content: ProjectContent) -> Self {
        ProjectDocument { id: id.to_string(), content, has_unsaved_changes: false }
    }

    /// Parse a document as returned by the remote store
    pub fn from_json(json: &str) -> Result<ProjectDocument> {
        let mut document: ProjectDocument = serde_json::from_str(json)
            .map_err(|e| DraftError::Serialization(format!("Invalid project JSON: {}", e)))?;
        if document.id.is_empty() {
            return Err(DraftError::Validation("Project is missing its id".to_string()));
        }
        document.content.normalize();
        Ok(document)
    }
}

/// What a successful mutation changed, for the caller to fan out
#[derive(Debug, Clone, PartialEq)]
pub struct EditEffect {
    pub field_path: FieldPath,
    pub value: Value,
    /// Set when the list view for this kind shows something that changed
    pub refresh: Option<ListKind>,
}

/// Single writer of the active `ProjectDocument`
#[derive(Debug, Default)]
pub struct DocumentStore {
    current: Option<ProjectDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        DocumentStore { current: None }
    }

    /// Bind a freshly loaded project, replacing whatever was open
    pub fn open(&mut self, mut document: ProjectDocument) {
        document.content.normalize();
        document.has_unsaved_changes = false;
        self.current = Some(document);
    }

    pub fn close(&mut self) -> Option<ProjectDocument> {
        self.current.take()
    }

    pub fn document(&self) -> Option<&ProjectDocument> {
        self.current.as_ref()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.current.as_ref().map(|d| d.id.as_str())
    }

    pub fn content(&self) -> Result<&ProjectContent> {
        self.current.as_ref().map(|d| &d.content).ok_or(DraftError::NoProject)
    }

    fn content_mut(&mut self) -> Result<&mut ProjectContent> {
        self.current.as_mut().map(|d| &mut d.content).ok_or(DraftError::NoProject)
    }

    pub fn set_unsaved(&mut self, unsaved: bool) {
        if let Some(document) = self.current.as_mut() {
            document.has_unsaved_changes = unsaved;
        }
    }

    /// Validate and apply a user edit to one field
    pub fn apply_edit(&mut self, target: &FocusTarget, raw: &str) -> Result<EditEffect> {
        if let FocusTarget::Item { list, field, .. } = target {
            let label_field = with_list!(self.content()?, *list, |entries| label_field_of(entries));
            if field == label_field && raw.trim().is_empty() {
                return Err(DraftError::Validation(format!("{} cannot be empty", field)));
            }
        }
        self.write_target(target, raw.to_string(), true)
    }

    /// Put a field back to the value it had in `snapshot`.
    ///
    /// Bypasses validation: snapshot values were accepted once already.
    pub fn restore(
        &mut self,
        target: &FocusTarget,
        snapshot: &ProjectContent,
    ) -> Result<EditEffect> {
        let value = snapshot
            .target_text(target)
            .ok_or_else(|| DraftError::NotFound(format!("{:?} in history snapshot", target)))?;
        self.write_target(target, value, false)
    }

    fn write_target(
        &mut self,
        target: &FocusTarget,
        value: String,
        validate: bool,
    ) -> Result<EditEffect> {
        let content = self.content_mut()?;
        let refresh = match target {
            FocusTarget::Section { section } => {
                if validate {
                    content.set_section(*section, &value)?;
                } else {
                    // Stored values are already coerced
                    content.set_section(*section, &value).map_err(|e| {
                        DraftError::InvalidOperation(format!("Snapshot value rejected: {}", e))
                    })?;
                }
                None
            }
            FocusTarget::Item { list, item, field } => {
                with_list_mut!(content, *list, |entries| {
                    set_item_field(entries, item, field, value)
                })?
            }
        };
        Ok(EditEffect {
            field_path: target.field_path(),
            value: content.field_value(target.field_path())?,
            refresh,
        })
    }

    /// Append a new item and return its id
    pub fn add_item(&mut self, kind: ListKind, label: &str) -> Result<(ItemId, EditEffect)> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DraftError::Validation("A new item needs a name".to_string()));
        }
        let content = self.content_mut()?;
        let id = with_list_mut!(content, kind, |entries| push_named(entries, label));
        Ok((id, self.list_effect(kind)?))
    }

    pub fn rename_item(&mut self, kind: ListKind, id: &ItemId, label: &str) -> Result<EditEffect> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DraftError::Validation("Name cannot be empty".to_string()));
        }
        let content = self.content_mut()?;
        with_list_mut!(content, kind, |entries| rename_entry(entries, id, label))?;
        self.list_effect(kind)
    }

    pub fn move_item(
        &mut self,
        kind: ListKind,
        id: &ItemId,
        to_index: usize,
    ) -> Result<EditEffect> {
        let content = self.content_mut()?;
        with_list_mut!(content, kind, |entries| move_entry(entries, id, to_index))?;
        self.list_effect(kind)
    }

    pub fn remove_item(&mut self, kind: ListKind, id: &ItemId) -> Result<EditEffect> {
        let content = self.content_mut()?;
        with_list_mut!(content, kind, |entries| {
            let index = position(entries, id)?;
            entries.remove(index);
            Ok::<(), DraftError>(())
        })?;
        self.list_effect(kind)
    }

    fn list_effect(&self, kind: ListKind) -> Result<EditEffect> {
        let path = FieldPath::List(kind);
        Ok(EditEffect {
            field_path: path,
            value: self.content()?.field_value(path)?,
            refresh: Some(kind),
        })
    }
}

fn label_field_of<T: ListEntry>(_entries: &[T]) -> &'static str {
    T::LABEL_FIELD
}

fn set_item_field<T: ListEntry>(
    entries: &mut [T],
    id: &ItemId,
    field: &str,
    value: String,
) -> Result<Option<ListKind>> {
    let item = entry_mut(entries, id)?;
    item.set_field(field, value)?;
    Ok(T::is_display_field(field).then_some(T::KIND))
}

fn push_named<T: ListEntry>(entries: &mut Vec<T>, label: &str) -> ItemId {
    let item = T::named(label);
    let id = item.id().clone();
    entries.push(item);
    id
}

fn rename_entry<T: ListEntry>(entries: &mut [T], id: &ItemId, label: &str) -> Result<()> {
    entry_mut(entries, id)?.set_field(T::LABEL_FIELD, label.to_string())
}
