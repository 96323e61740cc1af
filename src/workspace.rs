// Workspace: drives an EditorSession against a PersistenceApi
//
// The session stays synchronous. The workspace performs the I/O it asks for
// and feeds the outcomes back. The session is never borrowed across an
// `.await`, so UI callbacks may edit while writes are outstanding. Status and
// list notices queue up while the session is borrowed and reach observers
// once the borrow is released.

use futures::future::join_all;
use std::cell::RefCell;
use std::rc::Rc;

use crate::notify::Notifier;
use crate::persistence::PersistenceApi;
use crate::scheduler::OutboundWrite;
use crate::session::EditorSession;
use crate::store::SessionStore;
use crate::types::{DraftError, Result};

/// Where an opened project came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenSource {
    Cache,
    Remote,
}

pub struct Workspace<S: SessionStore, P: PersistenceApi> {
    session: Rc<RefCell<EditorSession<S>>>,
    notifier: Rc<Notifier>,
    api: Rc<P>,
}

impl<S: SessionStore, P: PersistenceApi> Clone for Workspace<S, P> {
    fn clone(&self) -> Self {
        Workspace {
            session: self.session.clone(),
            notifier: self.notifier.clone(),
            api: self.api.clone(),
        }
    }
}

impl<S: SessionStore, P: PersistenceApi> Workspace<S, P> {
    pub fn new(session: EditorSession<S>, api: P) -> Self {
        let notifier = session.notifier().clone();
        notifier.set_deferred(true);
        Workspace { session: Rc::new(RefCell::new(session)), notifier, api: Rc::new(api) }
    }

    /// Shared handle for reads. Mutations made directly through it reach
    /// observers on the next `update`.
    pub fn session(&self) -> &Rc<RefCell<EditorSession<S>>> {
        &self.session
    }

    pub fn api(&self) -> &P {
        &self.api
    }

    /// Run a synchronous session operation, then deliver the notices it
    /// queued. Observers run with the session unborrowed.
    pub fn update<R>(&self, f: impl FnOnce(&mut EditorSession<S>) -> R) -> R {
        let result = {
            let mut session = self.session.borrow_mut();
            f(&mut session)
        };
        self.notifier.deliver();
        result
    }

    /// Open a project: snapshot cache first, remote fetch on a miss.
    /// Writes flushed from the previous project are sent before returning.
    pub async fn open(&self, project_id: &str) -> Result<OpenSource> {
        if let Some(flushed) = self.update(|s| s.open_cached(project_id)) {
            self.send(flushed).await;
            return Ok(OpenSource::Cache);
        }

        let document = self
            .api
            .fetch(project_id)
            .await?
            .ok_or_else(|| DraftError::NotFound(format!("project {}", project_id)))?;
        let flushed = self.update(|s| s.open_fetched(document));
        self.send(flushed).await;
        Ok(OpenSource::Remote)
    }

    /// Send whatever is due, repeating while completions release more work.
    /// Returns the number of writes attempted.
    pub async fn pump(&self) -> usize {
        let mut sent = 0;
        loop {
            let due = self.update(|s| s.poll());
            if due.is_empty() {
                return sent;
            }
            sent += due.len();
            self.send(due).await;
        }
    }

    /// Manual save, then drain anything that was waiting on in-flight writes
    pub async fn save_now(&self) -> usize {
        let flushed = self.update(|s| s.save_now());
        let sent = flushed.len();
        self.send(flushed).await;
        sent + self.pump().await
    }

    /// Close the open project, sending everything it still owes
    pub async fn close(&self) {
        let flushed = self.update(|s| s.close());
        self.send(flushed).await;
        self.pump().await;
    }

    /// Sign-out: close like `close`, then drop the snapshot cache
    pub async fn sign_out(&self) {
        let flushed = self.update(|s| s.sign_out());
        self.send(flushed).await;
        self.pump().await;
    }

    /// Writes to different fields go out concurrently
    async fn send(&self, writes: Vec<OutboundWrite>) {
        if writes.is_empty() {
            return;
        }

        let api = &self.api;
        let results = join_all(writes.iter().map(|write| async move {
            let outcome = api.write(&write.project_id, write.field_path, &write.value).await;
            if let Err(e) = &outcome {
                tracing::debug!("workspace: write of {} failed: {}", write.field_path, e);
            }
            (write.ticket, outcome.map_err(|e| e.to_string()))
        }))
        .await;

        self.update(|session| {
            for (ticket, outcome) in results {
                session.complete(ticket, outcome);
            }
        });
    }
}
