// DraftDesk Core - Rust/WASM Implementation
// Licensed under the Apache License, Version 2.0

//! # DraftDesk Core (Rust/WASM)
//!
//! Local editing-state controller for the DraftDesk writing workspace,
//! compiled to WebAssembly.
//!
//! ## Architecture
//!
//! - **SaveScheduler**: per-field debounced writes to the remote store
//! - **EditHistory**: linear undo/redo scoped to the focused field
//! - **SnapshotCache**: short-lived project copies in session storage
//! - **EditorSession**: the document mutation protocol tying them together
//! - **Workspace**: async driver performing the I/O the session asks for
//!
//! The session itself is synchronous and never touches the network; the
//! browser-facing `WritingSession` wraps it for JavaScript.

use wasm_bindgen::prelude::*;

// Module declarations
mod types;
mod utils;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dialog;
pub mod document;
pub mod history;
pub mod logging;
pub mod notify;
pub mod persistence;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod workspace;

#[cfg(target_arch = "wasm32")]
mod bindings;

// Re-exports
pub use cache::SnapshotCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use dialog::{DialogBroker, DialogKind, DialogRequest, DialogResponse};
pub use document::{
    Chapter, Character, DocumentStore, Location, Plotline, ProjectContent, ProjectDocument,
};
pub use history::{EditHistory, HistoryEntry};
pub use notify::{Notice, Notifier};
pub use persistence::{MemoryPersistence, PersistenceApi};
pub use scheduler::{OutboundWrite, SaveScheduler, SaveStatus, StatusSink, WriteKey};
pub use session::{DialogOutcome, EditorSession, ListRenderer, Restored};
pub use store::{MemoryStore, SessionStore};
pub use types::{
    DraftError, EditOrigin, FieldPath, FocusTarget, ItemId, ListKind, Result, Section, Timestamp,
};
pub use utils::count_words;
pub use workspace::{OpenSource, Workspace};

#[cfg(target_arch = "wasm32")]
pub use bindings::WritingSession;

// WASM initialization
#[wasm_bindgen(start)]
pub fn init() {
    // Readable panics in the browser console
    console_error_panic_hook::set_once();
    logging::init(tracing::Level::INFO);
}

// Version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Health check for WASM module
#[wasm_bindgen]
pub fn health_check() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_health_check() {
        assert!(health_check());
    }
}
