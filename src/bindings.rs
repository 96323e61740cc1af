// WASM surface: WritingSession
//
// Page-facing wrapper over `Workspace`. Structured arguments and results
// cross the boundary as JSON strings, like the rest of the core; the status
// callback receives a plain JS object.

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::clock::SystemClock;
use crate::config::SessionConfig;
use crate::diatracing::DialogResponse;
use crate::persistence::JsPersistence;
use crate::scheduler::SaveStatus;
use crate::session::{EditorSession, ListRenderer, NoopRenderer};
use crate::store::BrowserSessionStore;
use crate::types::{DraftError, EditOrigin, FocusTarget, ItemId, ListKind, Result};
use crate::workspace::{OpenSource, Workspace};

type BrowserWorkspace = Workspace<BrowserSessionStore, JsPersistence>;

fn parse_kind(kind: &str) -> Result<ListKind> {
    ListKind::ALL
        .iter()
        .copied()
        .find(|k| k.as_str() == kind)
        .ok_or_else(|| DraftError::Validation(format!("Unknown list: {}", kind)))
}

fn parse_target(target_json: &str) -> Result<FocusTarget> {
    serde_json::from_str(target_json)
        .map_err(|e| DraftError::Serialization(format!("Invalid focus target: {}", e)))
}

fn status_callback(callback: Function) -> impl Fn(&SaveStatus) {
    move |status: &SaveStatus| {
        let value = match serde_wasm_bindgen::to_value(status) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("bindings: could not convert status: {}", e);
                return;
            }
        };
        if let Err(e) = callback.call1(&JsValue::NULL, &value) {
            tracing::warn!("bindings: status callback threw: {:?}", e);
        }
    }
}

struct JsListRenderer {
    callback: Function,
}

impl ListRenderer for JsListRenderer {
    fn refresh(&self, kind: ListKind) {
        let kind = JsValue::from_str(kind.as_str());
        if let Err(e) = self.callback.call1(&JsValue::NULL, &kind) {
            tracing::warn!("bindings: list refresh callback threw: {:?}", e);
        }
    }
}

/// Editing-state controller for one page
#[wasm_bindgen]
pub struct WritingSession {
    workspace: BrowserWorkspace,
}

#[wasm_bindgen]
impl WritingSession {
    /// `persistence` must expose `write(projectId, fieldPath, value)` and
    /// `fetch(projectId)`, both returning promises. `on_status` is required;
    /// `on_list_refresh` is optional. Callbacks run after each call has
    /// finished with the session, so they may query or drive it.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: Option<String>,
        persistence: JsValue,
        on_status: Option<Function>,
        on_list_refresh: Option<Function>,
    ) -> Result<WritingSession> {
        let config = match config_json {
            Some(json) if !json.trim().is_empty() => SessionConfig::from_json(&json)?,
            _ => SessionConfig::default(),
        };
        let on_status = on_status
            .ok_or_else(|| DraftError::Init("status callback is required".to_string()))?;
        let api = JsPersistence::new(persistence)?;
        let store = BrowserSessionStore::new()?;

        let renderer: Box<dyn ListRenderer> = match on_list_refresh {
            Some(callback) => Box::new(JsListRenderer { callback }),
            None => Box::new(NoopRenderer),
        };
        let session = EditorSession::new(
            &config,
            store,
            Box::new(SystemClock),
            Box::new(status_callback(on_status)),
            renderer,
        );

        tracing::info!(
            "bindings: session ready (quiet {} ms, history {})",
            config.quiet_period_ms,
            config.history_depth
        );
        Ok(WritingSession { workspace: Workspace::new(session, api) })
    }

    // ------------------------------------------------------------------
    // Project lifecycle (async)
    // ------------------------------------------------------------------

    /// Resolves to `"cache"` or `"remote"`
    #[wasm_bindgen(js_name = openProject)]
    pub fn open_project(&self, project_id: String) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            let source = workspace.open(&project_id).await?;
            Ok(JsValue::from_str(match source {
                OpenSource::Cache => "cache",
                OpenSource::Remote => "remote",
            }))
        })
    }

    #[wasm_bindgen(js_name = closeProject)]
    pub fn close_project(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            workspace.close().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Send due writes. Call when the timer armed for `nextDeadline` fires.
    #[wasm_bindgen(js_name = tick)]
    pub fn tick(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            let sent = workspace.pump().await;
            Ok(JsValue::from_f64(sent as f64))
        })
    }

    #[wasm_bindgen(js_name = saveNow)]
    pub fn save_now(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            let sent = workspace.save_now().await;
            Ok(JsValue::from_f64(sent as f64))
        })
    }

    #[wasm_bindgen(js_name = signOut)]
    pub fn sign_out(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            workspace.sign_out().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = forgetCached)]
    pub fn forget_cached(&self, project_id: &str) {
        self.workspace.update(|s| s.forget_cached(project_id));
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// `target_json`: `{"type":"section","section":"premise"}` or
    /// `{"type":"item","list":"chapters","item":"<id>","field":"content"}`
    #[wasm_bindgen(js_name = focusField)]
    pub fn focus_field(&self, target_json: &str) -> Result<()> {
        let target = parse_target(target_json)?;
        self.workspace.update(|s| s.focus(target))
    }

    #[wasm_bindgen(js_name = editField)]
    pub fn edit_field(
        &self,
        target_json: &str,
        value: &str,
        programmatic: Option<bool>,
    ) -> Result<()> {
        let target = parse_target(target_json)?;
        let origin = if programmatic.unwrap_or(false) {
            EditOrigin::Programmatic
        } else {
            EditOrigin::UserInput
        };
        self.workspace.update(|s| s.edit(&target, value, origin))
    }

    /// JSON `{focus, value}` to write back into the input, or `undefined`
    #[wasm_bindgen(js_name = undo)]
    pub fn undo(&self) -> Result<Option<String>> {
        let restored = self.workspace.update(|s| s.undo())?;
        restored.map(|r| serde_json::to_string(&r).map_err(DraftError::from)).transpose()
    }

    #[wasm_bindgen(js_name = redo)]
    pub fn redo(&self) -> Result<Option<String>> {
        let restored = self.workspace.update(|s| s.redo())?;
        restored.map(|r| serde_json::to_string(&r).map_err(DraftError::from)).transpose()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.workspace.session().borrow().can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.workspace.session().borrow().can_redo()
    }

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    /// Returns the new item's id
    #[wasm_bindgen(js_name = addItem)]
    pub fn add_item(&self, kind: &str, label: &str) -> Result<String> {
        let kind = parse_kind(kind)?;
        let id = self.workspace.update(|s| s.add_item(kind, label))?;
        Ok(id.to_string())
    }

    #[wasm_bindgen(js_name = renameItem)]
    pub fn rename_item(&self, kind: &str, id: &str, label: &str) -> Result<()> {
        let kind = parse_kind(kind)?;
        self.workspace.update(|s| s.rename_item(kind, &ItemId::from(id), label))
    }

    #[wasm_bindgen(js_name = moveItem)]
    pub fn move_item(&self, kind: &str, id: &str, to_index: usize) -> Result<()> {
        let kind = parse_kind(kind)?;
        self.workspace.update(|s| s.move_item(kind, &ItemId::from(id), to_index))
    }

    // ------------------------------------------------------------------
    // Dialogs (JSON DialogRequest out, JSON DialogResponse in)
    // ------------------------------------------------------------------

    #[wasm_bindgen(js_name = requestAddItem)]
    pub fn request_add_item(&self, kind: &str) -> Result<String> {
        let kind = parse_kind(kind)?;
        let request = self.workspace.update(|s| s.request_add_item(kind))?;
        Ok(serde_json::to_string(&request)?)
    }

    #[wasm_bindgen(js_name = requestRenameItem)]
    pub fn request_rename_item(&self, kind: &str, id: &str) -> Result<String> {
        let kind = parse_kind(kind)?;
        let id = ItemId::from(id);
        let request = self.workspace.update(|s| s.request_rename_item(kind, &id))?;
        Ok(serde_json::to_string(&request)?)
    }

    #[wasm_bindgen(js_name = requestRemoveItem)]
    pub fn request_remove_item(&self, kind: &str, id: &str) -> Result<String> {
        let kind = parse_kind(kind)?;
        let id = ItemId::from(id);
        let request = self.workspace.update(|s| s.request_remove_item(kind, &id))?;
        Ok(serde_json::to_string(&request)?)
    }

    #[wasm_bindgen(js_name = requestDiscardChanges)]
    pub fn request_discard_changes(&self) -> Result<String> {
        let request = self.workspace.update(|s| s.request_discard_changes());
        Ok(serde_json::to_string(&request)?)
    }

    #[wasm_bindgen(js_name = resolveDialog)]
    pub fn resolve_dialog(&self, id: &str, response_json: &str) -> Result<String> {
        let response: DialogResponse = serde_json::from_str(response_json)?;
        let outcome = self.workspace.update(|s| s.resolve_dialog(id, response))?;
        Ok(serde_json::to_string(&outcome)?)
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Unload guard
    #[wasm_bindgen(js_name = hasUnsavedWork)]
    pub fn has_unsaved_work(&self) -> bool {
        self.workspace.session().borrow().has_unsaved_work()
    }

    /// Epoch milliseconds at which `tick` has work, if any
    #[wasm_bindgen(js_name = nextDeadline)]
    pub fn next_deadline(&self) -> Option<f64> {
        self.workspace.session().borrow().next_deadline().map(|t| t as f64)
    }

    #[wasm_bindgen(js_name = status)]
    pub fn status(&self) -> Result<JsValue> {
        serde_wasm_bindgen::to_value(self.workspace.session().borrow().status())
            .map_err(|e| DraftError::Serialization(e.to_string()))
    }

    #[wasm_bindgen(js_name = documentJson)]
    pub fn document_json(&self) -> Result<Option<String>> {
        let session = self.workspace.session().borrow();
        session
            .document()
            .map(|d| serde_json::to_string(d).map_err(DraftError::from))
            .transpose()
    }

    /// Words written against the goal: `{totalWords, wordGoal, progress}`
    #[wasm_bindgen(js_name = wordProgress)]
    pub fn word_progress(&self) -> Result<String> {
        let session = self.workspace.session().borrow();
        let content = session.content()?;
        let progress = serde_json::json!({
            "totalWords": content.total_words(),
            "wordGoal": content.word_goal,
            "progress": content.goal_progress(),
        });
        Ok(progress.to_string())
    }
}
