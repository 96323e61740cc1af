// Type definitions for DraftDesk Core

use serde::{Deserialize, Serialize};
use std::fmt;
use wasm_bindgen::prelude::*;

/// Timestamp in milliseconds since epoch
pub type Timestamp = i64;

/// Result type for DraftDesk operations
pub type Result<T> = std::result::Result<T, DraftError>;

/// Error types for DraftDesk operations
#[derive(Debug, thiserror::Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum DraftError {
    #[error("Invalid value: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No project is open")]
    NoProject,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    #[error("Initialization failed: {0}")]
    Init(String),
}

// Convert Rust errors to JsValue for WASM boundary
impl From<DraftError> for JsValue {
    fn from(err: DraftError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<serde_json::Error> for DraftError {
    fn from(err: serde_json::Error) -> Self {
        DraftError::Serialization(err.to_string())
    }
}

/// Stable opaque identifier of a list item (chapter, character, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn generate() -> Self {
        ItemId(crate::utils::generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

/// Top-level scalar sections of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Premise,
    Theme,
    MainArc,
    Notes,
    Research,
    WordGoal,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Premise,
        Section::Theme,
        Section::MainArc,
        Section::Notes,
        Section::Research,
        Section::WordGoal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Premise => "premise",
            Section::Theme => "theme",
            Section::MainArc => "mainArc",
            Section::Notes => "notes",
            Section::Research => "research",
            Section::WordGoal => "wordGoal",
        }
    }
}

/// The four ordered sequences of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Chapters,
    Characters,
    Locations,
    Plotlines,
}

impl ListKind {
    pub const ALL: [ListKind; 4] = [
        ListKind::Chapters,
        ListKind::Characters,
        ListKind::Locations,
        ListKind::Plotlines,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Chapters => "chapters",
            ListKind::Characters => "characters",
            ListKind::Locations => "locations",
            ListKind::Plotlines => "plotlines",
        }
    }
}

/// Addressable unit of persistence.
///
/// Scalar sections are written individually; any edit inside a list writes
/// the whole ordered sequence of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldPath {
    Section(Section),
    List(ListKind),
}

impl FieldPath {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldPath::Section(section) => section.as_str(),
            FieldPath::List(kind) => kind.as_str(),
        }
    }

    pub fn parse(s: &str) -> Result<FieldPath> {
        Section::ALL
            .iter()
            .find(|section| section.as_str() == s)
            .map(|section| FieldPath::Section(*section))
            .or_else(|| {
                ListKind::ALL
                    .iter()
                    .find(|kind| kind.as_str() == s)
                    .map(|kind| FieldPath::List(*kind))
            })
            .ok_or_else(|| DraftError::Validation(format!("Unknown field path: {}", s)))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The input field that currently holds focus.
///
/// Undo history is scoped to one focus target at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FocusTarget {
    Section { section: Section },
    Item { list: ListKind, item: ItemId, field: String },
}

impl FocusTarget {
    pub fn section(section: Section) -> Self {
        FocusTarget::Section { section }
    }

    pub fn item(list: ListKind, item: ItemId, field: &str) -> Self {
        FocusTarget::Item { list, item, field: field.to_string() }
    }

    /// The persistence unit an edit of this target schedules
    pub fn field_path(&self) -> FieldPath {
        match self {
            FocusTarget::Section { section } => FieldPath::Section(*section),
            FocusTarget::Item { list, .. } => FieldPath::List(*list),
        }
    }
}

/// Where an edit came from.
///
/// Only direct user input is captured by the undo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditOrigin {
    UserInput,
    Programmatic,
}
