// Properties over arbitrary edit sequences

use std::collections::HashMap;

use draftdesk_core::scheduler::NullSink;
use draftdesk_core::session::NoopRenderer;
use draftdesk_core::{
    EditOrigin, EditorSession, FieldPath, FocusTarget, ManualClock, MemoryStore, ProjectContent,
    ProjectDocument, Section, SessionConfig,
};
use proptest::prelude::*;
use serde_json::Value;

const TEXT_SECTIONS: [Section; 5] =
    [Section::Premise, Section::Theme, Section::MainArc, Section::Notes, Section::Research];

fn open_session(config: SessionConfig, clock: &ManualClock) -> EditorSession<MemoryStore> {
    let mut session = EditorSession::new(
        &config,
        MemoryStore::new(),
        Box::new(clock.clone()),
        Box::new(NullSink),
        Box::new(NoopRenderer),
    );
    let content = ProjectContent { premise: "Premise".to_string(), ..Default::default() };
    session.open_fetched(ProjectDocument::new("p1", content));
    session
}

/// Distinct consecutive values: each is prefixed with its position
fn typed_values(raw: Vec<String>) -> Vec<String> {
    raw.into_iter().enumerate().map(|(i, s)| format!("{}{}", i, s)).collect()
}

proptest! {
    #[test]
    fn prop_burst_sends_last_value_once_per_field(
        edits in proptest::collection::vec((0..5usize, "[a-z ]{0,12}", 0..1_500i64), 1..40)
    ) {
        let clock = ManualClock::new(0);
        let mut session = open_session(SessionConfig::default(), &clock);

        let mut last = HashMap::new();
        for (section, text, gap) in &edits {
            let section = TEXT_SECTIONS[*section];
            let target = FocusTarget::section(section);
            session.edit(&target, text, EditOrigin::UserInput).unwrap();
            last.insert(FieldPath::Section(section), Value::from(text.as_str()));
            // No polling until the end, so fields that came due early wait too
            clock.advance(*gap);
        }

        clock.advance(1_500);
        let writes = session.poll();
        prop_assert_eq!(writes.len(), last.len());
        for write in &writes {
            prop_assert_eq!(Some(&write.value), last.get(&write.field_path));
        }
        prop_assert!(session.poll().is_empty());
    }

    #[test]
    fn prop_undo_all_then_redo_all(raw in proptest::collection::vec("[a-z]{0,8}", 1..30)) {
        let clock = ManualClock::new(0);
        let mut session = open_session(SessionConfig::default(), &clock);
        let premise = FocusTarget::section(Section::Premise);
        session.focus(premise.clone()).unwrap();

        let values = typed_values(raw);
        for value in &values {
            session.edit(&premise, value, EditOrigin::UserInput).unwrap();
        }

        for _ in 0..values.len() {
            prop_assert!(session.undo().unwrap().is_some());
        }
        prop_assert!(session.undo().unwrap().is_none());
        prop_assert_eq!(&session.content().unwrap().premise, "Premise");

        for _ in 0..values.len() {
            prop_assert!(session.redo().unwrap().is_some());
        }
        prop_assert!(session.redo().unwrap().is_none());
        let last = &values[values.len() - 1];
        prop_assert_eq!(&session.content().unwrap().premise, last);
    }

    #[test]
    fn prop_undo_depth_is_bounded(
        raw in proptest::collection::vec("[a-z]{0,8}", 1..30),
        depth in 1..10usize,
    ) {
        let clock = ManualClock::new(0);
        let config = SessionConfig { history_depth: depth, ..Default::default() };
        let mut session = open_session(config, &clock);
        let theme = FocusTarget::section(Section::Theme);
        session.focus(theme.clone()).unwrap();

        let values = typed_values(raw);
        for value in &values {
            session.edit(&theme, value, EditOrigin::UserInput).unwrap();
        }

        let mut undone = 0;
        while session.undo().unwrap().is_some() {
            undone += 1;
        }
        // The baseline occupies one of the `depth` slots
        prop_assert_eq!(undone, values.len().min(depth - 1));
    }
}
