// Editor session: the document mutation protocol
//
// One `EditorSession` is the whole editing context of a page. It owns the
// document store, history, scheduler, cache and dialog broker, and receives
// its outward collaborators (clock, status sink, list renderer) at
// construction. Every method is synchronous; I/O is left to the caller.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::cache::SnapshotCache;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::dialog::{DialogBroker, DialogKind, DialogRequest, DialogResponse};
use crate::document::{DocumentStore, EditEffect, ProjectContent, ProjectDocument};
use crate::history::EditHistory;
use crate::notify::{Notice, Notifier, QueuedSink};
use crate::scheduler::{OutboundWrite, SaveScheduler, SaveStatus, StatusSink, WriteKey, WriteTicket};
use crate::store::SessionStore;
use crate::types::{DraftError, EditOrigin, FocusTarget, ItemId, ListKind, Result};

pub use crate::notify::{ListRenderer, NoopRenderer};

/// Value written back into the focused input after undo/redo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restored {
    pub focus: FocusTarget,
    pub value: String,
}

/// Work waiting on a dialog answer
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    AddItem { kind: ListKind },
    RenameItem { kind: ListKind, id: ItemId },
    RemoveItem { kind: ListKind, id: ItemId },
    DiscardChanges,
}

/// What answering a dialog did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DialogOutcome {
    Cancelled,
    ItemAdded { kind: ListKind, id: ItemId },
    ItemRenamed { kind: ListKind, id: ItemId },
    ItemRemoved { kind: ListKind, id: ItemId },
    ChangesDiscarded,
}

pub struct EditorSession<S: SessionStore> {
    store: DocumentStore,
    history: EditHistory,
    scheduler: SaveScheduler,
    cache: SnapshotCache<S>,
    dialogs: DialogBroker<PendingAction>,
    clock: Box<dyn Clock>,
    notifier: Rc<Notifier>,
}

impl<S: SessionStore> EditorSession<S> {
    pub fn new(
        config: &SessionConfig,
        local_store: S,
        clock: Box<dyn Clock>,
        sink: Box<dyn StatusSink>,
        renderer: Box<dyn ListRenderer>,
    ) -> Self {
        let notifier = Notifier::new(sink, renderer);
        EditorSession {
            store: DocumentStore::new(),
            history: EditHistory::new(config.history_depth),
            scheduler: SaveScheduler::new(config, Box::new(QueuedSink(notifier.clone()))),
            cache: SnapshotCache::new(local_store, config.cache_ttl_ms),
            dialogs: DialogBroker::new(),
            clock,
            notifier,
        }
    }

    /// Queue in front of the status sink and list renderer
    pub fn notifier(&self) -> &Rc<Notifier> {
        &self.notifier
    }

    fn notify(&self) {
        self.notifier.deliver_if_immediate();
    }

    // ------------------------------------------------------------------
    // Project lifecycle
    // ------------------------------------------------------------------

    /// Open `project_id` from the snapshot cache. Returns the writes flushed
    /// from the previously open project, or `None` on a cache miss (nothing
    /// changes then).
    pub fn open_cached(&mut self, project_id: &str) -> Option<Vec<OutboundWrite>> {
        let document = self.cache.get(project_id, self.clock.now_ms())?;
        tracing::info!("session: opened project {} from cache", project_id);
        Some(self.bind(document))
    }

    /// Open a project fetched from the remote store and cache it.
    ///
    /// The cached copy is the normalized one, so item ids assigned on load
    /// survive a reopen from cache.
    pub fn open_fetched(&mut self, mut document: ProjectDocument) -> Vec<OutboundWrite> {
        let flushed = self.close();
        document.content.normalize();
        document.has_unsaved_changes = false;
        self.cache.set(&document.id, &document, self.clock.now_ms());
        tracing::info!("session: opened project {} from remote", document.id);
        self.store.open(document);
        flushed
    }

    fn bind(&mut self, document: ProjectDocument) -> Vec<OutboundWrite> {
        let flushed = self.close();
        self.store.open(document);
        flushed
    }

    /// Close the open project. Pending writes are flushed and returned;
    /// writes already in flight keep running. The live document replaces
    /// the cached snapshot, so a reopen from cache shows every local edit.
    pub fn close(&mut self) -> Vec<OutboundWrite> {
        self.history.clear();
        self.dialogs.cancel_all();
        let flushed = self.scheduler.flush_all(self.clock.now_ms());
        self.cache_current();
        if let Some(document) = self.store.close() {
            tracing::debug!("session: closed project {}", document.id);
        }
        self.notify();
        flushed
    }

    /// Sign-out: close the project and drop every cached snapshot
    pub fn sign_out(&mut self) -> Vec<OutboundWrite> {
        let flushed = self.close();
        self.cache.clear_all();
        flushed
    }

    /// Store the live document as the project's snapshot. A document emptied
    /// by the user evicts its snapshot instead of leaving an older one.
    fn cache_current(&self) {
        let Some(document) = self.store.document() else {
            return;
        };
        if document.content.is_empty() {
            self.cache.clear(&document.id);
        } else {
            self.cache.set(&document.id, document, self.clock.now_ms());
        }
    }

    /// Evict one project's snapshot (deleted or renamed elsewhere)
    pub fn forget_cached(&mut self, project_id: &str) {
        self.cache.clear(project_id);
    }

    // ------------------------------------------------------------------
    // Focus, edits, undo/redo
    // ------------------------------------------------------------------

    /// Focus entered a field: start a fresh undo timeline there
    pub fn focus(&mut self, target: FocusTarget) -> Result<()> {
        let content = self.store.content()?;
        if content.target_text(&target).is_none() {
            return Err(DraftError::NotFound(format!("{:?}", target)));
        }
        self.history.reset(target, content);
        Ok(())
    }

    /// Apply an edit: validate, mutate, refresh lists, schedule, record
    pub fn edit(&mut self, target: &FocusTarget, raw: &str, origin: EditOrigin) -> Result<()> {
        let user_input = origin == EditOrigin::UserInput;
        // Input without a focus event moves the timeline, but only once the
        // edit has been accepted
        let baseline = if user_input && self.history.focus() != Some(target) {
            Some(self.store.content()?.clone())
        } else {
            None
        };

        let effect = self.store.apply_edit(target, raw)?;
        if let Some(baseline) = baseline {
            self.history.reset(target.clone(), &baseline);
        }
        self.commit(effect)?;

        if user_input {
            self.history.record(self.store.content()?);
        }
        Ok(())
    }

    /// Undo the last edit of the focused field
    pub fn undo(&mut self) -> Result<Option<Restored>> {
        let Some(entry) = self.history.undo() else {
            return Ok(None);
        };
        let (focus, snapshot) = (entry.focus.clone(), entry.content.clone());
        self.restore(focus, &snapshot).map(Some)
    }

    /// Redo the last undone edit of the focused field
    pub fn redo(&mut self) -> Result<Option<Restored>> {
        let Some(entry) = self.history.redo() else {
            return Ok(None);
        };
        let (focus, snapshot) = (entry.focus.clone(), entry.content.clone());
        self.restore(focus, &snapshot).map(Some)
    }

    // Restoration is persisted like typing but never recorded
    fn restore(&mut self, focus: FocusTarget, snapshot: &ProjectContent) -> Result<Restored> {
        let effect = self.store.restore(&focus, snapshot)?;
        self.commit(effect)?;
        let value = self
            .store
            .content()?
            .target_text(&focus)
            .ok_or_else(|| DraftError::NotFound(format!("{:?}", focus)))?;
        Ok(Restored { focus, value })
    }

    /// Fan a successful mutation out to the list view and the scheduler
    fn commit(&mut self, effect: EditEffect) -> Result<()> {
        let project_id = self.store.project_id().ok_or(DraftError::NoProject)?.to_string();
        if let Some(kind) = effect.refresh {
            self.notifier.push(Notice::Refresh(kind));
        }
        self.scheduler.schedule(
            WriteKey::new(&project_id, effect.field_path),
            effect.value,
            self.clock.now_ms(),
        );
        self.store.set_unsaved(true);
        self.notify();
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ------------------------------------------------------------------
    // List operations
    // ------------------------------------------------------------------

    pub fn add_item(&mut self, kind: ListKind, label: &str) -> Result<ItemId> {
        let (id, effect) = self.store.add_item(kind, label)?;
        self.commit(effect)?;
        Ok(id)
    }

    pub fn rename_item(&mut self, kind: ListKind, id: &ItemId, label: &str) -> Result<()> {
        let effect = self.store.rename_item(kind, id, label)?;
        self.commit(effect)
    }

    pub fn move_item(&mut self, kind: ListKind, id: &ItemId, to_index: usize) -> Result<()> {
        let effect = self.store.move_item(kind, id, to_index)?;
        self.commit(effect)
    }

    pub fn remove_item(&mut self, kind: ListKind, id: &ItemId) -> Result<()> {
        let effect = self.store.remove_item(kind, id)?;
        if matches!(self.history.focus(), Some(FocusTarget::Item { item, .. }) if item == id) {
            self.history.clear();
        }
        self.commit(effect)
    }

    // ------------------------------------------------------------------
    // Dialog-mediated operations
    // ------------------------------------------------------------------

    pub fn request_add_item(&mut self, kind: ListKind) -> Result<DialogRequest> {
        self.store.content()?;
        let kind_name = kind.as_str().trim_end_matches('s');
        Ok(self.dialogs.request(
            DialogKind::Prompt {
                message: format!("Name of the new {}", kind_name),
                default_value: String::new(),
            },
            PendingAction::AddItem { kind },
        ))
    }

    pub fn request_rename_item(&mut self, kind: ListKind, id: &ItemId) -> Result<DialogRequest> {
        let current = self.store.content()?.item_label(kind, id)?;
        Ok(self.dialogs.request(
            DialogKind::Prompt { message: "Rename".to_string(), default_value: current },
            PendingAction::RenameItem { kind, id: id.clone() },
        ))
    }

    pub fn request_remove_item(&mut self, kind: ListKind, id: &ItemId) -> Result<DialogRequest> {
        let label = self.store.content()?.item_label(kind, id)?;
        Ok(self.dialogs.request(
            DialogKind::Confirm {
                message: format!("Delete \"{}\"? This cannot be undone.", label),
            },
            PendingAction::RemoveItem { kind, id: id.clone() },
        ))
    }

    /// Ask before abandoning unsaved work
    pub fn request_discard_changes(&mut self) -> DialogRequest {
        self.dialogs.request(
            DialogKind::Confirm {
                message: "You have unsaved changes. Leave without saving?".to_string(),
            },
            PendingAction::DiscardChanges,
        )
    }

    /// Answer a dialog by its correlation id
    pub fn resolve_dialog(&mut self, id: &str, response: DialogResponse) -> Result<DialogOutcome> {
        let action = self.dialogs.resolve(id)?;
        if !response.accepted() {
            return Ok(DialogOutcome::Cancelled);
        }

        match action {
            PendingAction::AddItem { kind } => {
                let id = self.add_item(kind, text_of(&response)?)?;
                Ok(DialogOutcome::ItemAdded { kind, id })
            }
            PendingAction::RenameItem { kind, id } => {
                self.rename_item(kind, &id, text_of(&response)?)?;
                Ok(DialogOutcome::ItemRenamed { kind, id })
            }
            PendingAction::RemoveItem { kind, id } => {
                self.remove_item(kind, &id)?;
                Ok(DialogOutcome::ItemRemoved { kind, id })
            }
            PendingAction::DiscardChanges => {
                self.scheduler.discard_all();
                self.sync_unsaved();
                self.notify();
                Ok(DialogOutcome::ChangesDiscarded)
            }
        }
    }

    // ------------------------------------------------------------------
    // Persistence plumbing
    // ------------------------------------------------------------------

    /// Writes whose quiet period has elapsed
    pub fn poll(&mut self) -> Vec<OutboundWrite> {
        let writes = self.scheduler.take_due(self.clock.now_ms());
        self.notify();
        writes
    }

    /// Manual save: every pending and failed write, immediately
    pub fn save_now(&mut self) -> Vec<OutboundWrite> {
        let writes = self.scheduler.flush_all(self.clock.now_ms());
        self.notify();
        writes
    }

    /// Outcome of a write returned by `poll`/`save_now`/`close`.
    ///
    /// A successful write for the open project refreshes its cached
    /// snapshot.
    pub fn complete(&mut self, ticket: WriteTicket, outcome: std::result::Result<(), String>) {
        let saved = outcome.is_ok();
        let key = self.scheduler.complete(ticket, outcome);
        let for_open_project =
            matches!((&key, self.store.project_id()), (Some(k), Some(id)) if k.project_id == id);
        if saved && for_open_project {
            self.cache_current();
        }
        self.sync_unsaved();
        self.notify();
    }

    /// Mirror the open project's share of unsaved work onto its document
    fn sync_unsaved(&mut self) {
        let unsaved = match self.store.project_id() {
            Some(id) => self.scheduler.has_unsaved_work_for(id),
            None => false,
        };
        self.store.set_unsaved(unsaved);
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.scheduler.next_deadline()
    }

    /// Unload guard
    pub fn has_unsaved_work(&self) -> bool {
        self.scheduler.has_unsaved_work()
    }

    pub fn status(&self) -> &SaveStatus {
        self.scheduler.status()
    }

    pub fn document(&self) -> Option<&ProjectDocument> {
        self.store.document()
    }

    pub fn content(&self) -> Result<&ProjectContent> {
        self.store.content()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.store.project_id()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

fn text_of(response: &DialogResponse) -> Result<&str> {
    match response {
        DialogResponse::Text { value } => Ok(value.as_str()),
        _ => Err(DraftError::Validation("Expected a text answer".to_string())),
    }
}
