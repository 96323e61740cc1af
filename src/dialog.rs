// Dialog broker: confirm/prompt requests correlated by id
//
// The core never waits on a modal. It emits a `DialogRequest`, remembers what
// to do once answered, and the page answers later with the request's id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{DraftError, Result};
use crate::utils::generate_id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DialogKind {
    Confirm {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Prompt {
        message: String,
        default_value: String,
    },
}

/// Question for the page to present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogRequest {
    pub id: String,
    #[serde(flatten)]
    pub kind: DialogKind,
}

/// The user's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DialogResponse {
    Confirmed,
    Cancelled,
    Text { value: String },
}

impl DialogResponse {
    /// Affirmative answer (confirmed, or non-empty text)
    pub fn accepted(&self) -> bool {
        match self {
            DialogResponse::Confirmed => true,
            DialogResponse::Cancelled => false,
            DialogResponse::Text { value } => !value.trim().is_empty(),
        }
    }
}

/// Outstanding dialogs, each carrying the action to run when answered
#[derive(Debug)]
pub struct DialogBroker<A> {
    pending: HashMap<String, A>,
}

impl<A> DialogBroker<A> {
    pub fn new() -> Self {
        DialogBroker { pending: HashMap::new() }
    }

    pub fn request(&mut self, kind: DialogKind, action: A) -> DialogRequest {
        let id = generate_id();
        self.pending.insert(id.clone(), action);
        DialogRequest { id, kind }
    }

    /// Claim the action for `id`. Each request resolves at most once.
    pub fn resolve(&mut self, id: &str) -> Result<A> {
        self.pending
            .remove(id)
            .ok_or_else(|| DraftError::NotFound(format!("dialog {}", id)))
    }

    /// Forget every outstanding request (project closed)
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<A> Default for DialogBroker<A> {
    fn default() -> Self {
        Self::new()
    }
}
