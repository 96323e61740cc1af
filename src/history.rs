// Edit history: bounded linear undo/redo scoped to the focused field

use std::collections::VecDeque;

use crate::config::DEFAULT_HISTORY_DEPTH;
use crate::document::ProjectContent;
use crate::types::FocusTarget;

/// Full snapshot of the project content at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub focus: FocusTarget,
    pub content: ProjectContent,
}

/// Linear undo/redo timeline for the field that currently has focus.
///
/// The bottom of `undo` is the baseline taken when focus entered the field;
/// undo never pops it. Moving focus to another field throws the whole
/// timeline away.
#[derive(Debug)]
pub struct EditHistory {
    focus: Option<FocusTarget>,
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_depth: usize,
}

impl EditHistory {
    pub fn new(max_depth: usize) -> Self {
        EditHistory {
            focus: None,
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Focus entered `focus`: start a fresh timeline with `content` as baseline
    pub fn reset(&mut self, focus: FocusTarget, content: &ProjectContent) {
        self.undo.clear();
        self.redo.clear();
        self.undo.push_back(HistoryEntry { focus: focus.clone(), content: content.clone() });
        self.focus = Some(focus);
    }

    /// Drop the timeline without taking a baseline (project closed)
    pub fn clear(&mut self) {
        self.focus = None;
        self.undo.clear();
        self.redo.clear();
    }

    /// Capture the state after a content-changing input in the focused field
    pub fn record(&mut self, content: &ProjectContent) {
        let Some(focus) = self.focus.clone() else {
            tracing::debug!("history: record without focus ignored");
            return;
        };

        self.undo.push_back(HistoryEntry { focus, content: content.clone() });
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Step back; returns the entry to restore
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.undo.len() <= 1 {
            return None;
        }

        let top = self.undo.pop_back()?;
        self.redo.push(top);
        if self.redo.len() > self.max_depth {
            self.redo.remove(0);
        }
        self.undo.back()
    }

    /// Step forward; returns the entry to restore
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let entry = self.redo.pop()?;
        self.undo.push_back(entry);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
        self.undo.back()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn focus(&self) -> Option<&FocusTarget> {
        self.focus.as_ref()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Section;

    fn content_with_premise(premise: &str) -> ProjectContent {
        ProjectContent { premise: premise.to_string(), ..Default::default() }
    }

    fn premise_focus() -> FocusTarget {
        FocusTarget::section(Section::Premise)
    }

    #[test]
    fn test_reset_sets_baseline() {
        let mut history = EditHistory::new(50);
        history.reset(premise_focus(), &content_with_premise("a"));

        assert_eq!(history.undo_depth(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.focus(), Some(&premise_focus()));
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = EditHistory::new(50);
        history.reset(premise_focus(), &content_with_premise(""));

        for text in ["a", "ab", "abc"] {
            history.record(&content_with_premise(text));
        }

        let mut seen = Vec::new();
        while let Some(entry) = history.undo() {
            seen.push(entry.content.premise.clone());
        }
        assert_eq!(seen, vec!["ab", "a", ""]);

        let mut replay = Vec::new();
        while let Some(entry) = history.redo() {
            replay.push(entry.content.premise.clone());
        }
        assert_eq!(replay, vec!["a", "ab", "abc"]);
    }

    #[test]
    fn test_undo_stops_at_baseline() {
        let mut history = EditHistory::new(50);
        history.reset(premise_focus(), &content_with_premise("base"));
        history.record(&content_with_premise("edit"));

        assert!(history.undo().is_some());
        assert!(history.undo().is_none());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = EditHistory::new(50);
        history.reset(premise_focus(), &content_with_premise(""));
        history.record(&content_with_premise("a"));
        history.undo();
        assert!(history.can_redo());

        history.record(&content_with_premise("b"));
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_reset_on_other_field_discards_redo() {
        let mut history = EditHistory::new(50);
        history.reset(premise_focus(), &content_with_premise(""));
        history.record(&content_with_premise("a"));
        history.undo();
        assert_eq!(history.redo_depth(), 1);

        let theme = FocusTarget::section(Section::Theme);
        history.reset(theme.clone(), &content_with_premise(""));
        assert_eq!(history.redo_depth(), 0);
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.focus(), Some(&theme));
    }

    #[test]
    fn test_identical_snapshots_not_deduplicated() {
        let mut history = EditHistory::new(50);
        history.reset(premise_focus(), &content_with_premise("same"));
        history.record(&content_with_premise("same"));
        history.record(&content_with_premise("same"));

        assert_eq!(history.undo_depth(), 3);
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut history = EditHistory::new(3);
        history.reset(premise_focus(), &content_with_premise("0"));
        for i in 1..=10 {
            history.record(&content_with_premise(&i.to_string()));
        }

        assert_eq!(history.undo_depth(), 3);
        let mut seen = Vec::new();
        while let Some(entry) = history.undo() {
            seen.push(entry.content.premise.clone());
        }
        // Oldest surviving entry acts as the baseline
        assert_eq!(seen, vec!["9", "8"]);
    }

    #[test]
    fn test_record_without_focus_is_ignored() {
        let mut history = EditHistory::default();
        history.record(&content_with_premise("x"));
        assert_eq!(history.undo_depth(), 0);
        assert!(history.undo().is_none());
    }
}
