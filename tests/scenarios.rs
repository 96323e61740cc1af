// End-to-end editing scenarios against in-memory collaborators

use std::cell::RefCell;
use std::rc::Rc;

use draftdesk_core::scheduler::NullSink;
use draftdesk_core::session::NoopRenderer;
use draftdesk_core::{
    EditOrigin, EditorSession, FieldPath, FocusTarget, ItemId, ListKind, ManualClock,
    MemoryPersistence, MemoryStore, ProjectDocument, SaveStatus, Section, SessionConfig, Workspace,
};
use futures::executor::block_on;
use serde_json::{json, Value};

fn project() -> ProjectDocument {
    ProjectDocument::from_json(
        r#"{
            "id": "P",
            "content": {
                "premise": "A lighthouse keeper finds a letter.",
                "wordGoal": 50000,
                "chapters": [
                    {"id": "ch-1", "title": "Storm", "content": "The lamp flickered."},
                    {"id": "ch-2", "title": "Shore", "content": "Morning came grey."}
                ]
            }
        }"#,
    )
    .unwrap()
}

fn session_with(config: SessionConfig, clock: &ManualClock) -> EditorSession<MemoryStore> {
    EditorSession::new(
        &config,
        MemoryStore::new(),
        Box::new(clock.clone()),
        Box::new(NullSink),
        Box::new(NoopRenderer),
    )
}

#[test]
fn test_word_goal_keystrokes_become_one_write() {
    let clock = ManualClock::new(10_000);
    let mut session = session_with(SessionConfig::default(), &clock);
    session.open_fetched(project());

    let goal = FocusTarget::section(Section::WordGoal);
    session.focus(goal.clone()).unwrap();
    session.edit(&goal, "50000", EditOrigin::UserInput).unwrap();
    clock.advance(200);
    session.edit(&goal, "52000", EditOrigin::UserInput).unwrap();

    clock.advance(1_499);
    assert!(session.poll().is_empty());

    clock.advance(1);
    let writes = session.poll();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].field_path, FieldPath::Section(Section::WordGoal));
    assert_eq!(writes[0].value, json!(52000));

    session.complete(writes[0].ticket, Ok(()));
    assert!(session.poll().is_empty());
    assert!(!session.has_unsaved_work());
}

#[test]
fn test_undo_before_quiet_period_supersedes_write() {
    let clock = ManualClock::new(0);
    let mut session = session_with(SessionConfig::default(), &clock);
    session.open_fetched(project());

    let text = FocusTarget::item(ListKind::Chapters, ItemId::from("ch-1"), "content");
    session.focus(text.clone()).unwrap();
    session.edit(&text, "The lamp flickered and died.", EditOrigin::UserInput).unwrap();

    clock.advance(800);
    let restored = session.undo().unwrap().unwrap();
    assert_eq!(restored.value, "The lamp flickered.");
    assert_eq!(session.content().unwrap().chapters[0].content, "The lamp flickered.");
    assert_eq!(session.content().unwrap().chapters[0].word_count, 3);

    // Timer restarted by the undo
    clock.advance(1_000);
    assert!(session.poll().is_empty());
    clock.advance(500);

    let writes = session.poll();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].field_path, FieldPath::List(ListKind::Chapters));
    assert_eq!(writes[0].value[0]["content"], Value::from("The lamp flickered."));
    assert_eq!(writes[0].value[1]["title"], Value::from("Shore"));
}

#[test]
fn test_max_latency_flushes_continuous_typing() {
    let clock = ManualClock::new(0);
    let config = SessionConfig { max_latency_ms: Some(5_000), ..Default::default() };
    let mut session = session_with(config, &clock);
    session.open_fetched(project());

    let premise = FocusTarget::section(Section::Premise);
    session.focus(premise.clone()).unwrap();

    let mut sent = Vec::new();
    let mut typed = String::new();
    for _ in 0..40 {
        typed.push('x');
        session.edit(&premise, &typed, EditOrigin::UserInput).unwrap();
        clock.advance(250);
        for write in session.poll() {
            session.complete(write.ticket, Ok(()));
            sent.push(write);
        }
    }

    // Ten seconds of typing without a pause: one write per five seconds
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].value, Value::from("x".repeat(20)));
    assert_eq!(sent[1].value, Value::from("x".repeat(40)));
}

#[test]
fn test_reorder_keeps_item_ids() {
    let clock = ManualClock::new(0);
    let mut session = session_with(SessionConfig::default(), &clock);
    session.open_fetched(project());

    let shore = ItemId::from("ch-2");
    session.move_item(ListKind::Chapters, &shore, 0).unwrap();

    let title = FocusTarget::item(ListKind::Chapters, shore.clone(), "title");
    session.edit(&title, "Low Tide", EditOrigin::UserInput).unwrap();

    let chapters = &session.content().unwrap().chapters;
    assert_eq!(chapters[0].id, shore);
    assert_eq!(chapters[0].title, "Low Tide");
    assert_eq!(chapters[1].title, "Storm");
}

#[test]
fn test_status_sequence_through_workspace() {
    let clock = ManualClock::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let session = EditorSession::new(
        &SessionConfig::default(),
        MemoryStore::new(),
        Box::new(clock.clone()),
        Box::new(move |status: &SaveStatus| log.borrow_mut().push(status.label())),
        Box::new(NoopRenderer),
    );
    let api = MemoryPersistence::new();
    api.insert(project());
    let workspace = Workspace::new(session, api);

    block_on(workspace.open("P")).unwrap();
    let theme = FocusTarget::section(Section::Theme);
    workspace.update(|s| s.edit(&theme, "solitude", EditOrigin::UserInput)).unwrap();
    clock.advance(1_500);
    block_on(workspace.pump());

    assert_eq!(*seen.borrow(), vec!["dirty", "saving", "clean"]);
    assert_eq!(workspace.api().document("P").unwrap().content.theme, "solitude");
}
