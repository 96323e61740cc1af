// Save scheduler: per-field debounced writes with dirty/clean tracking
//
// The scheduler never performs I/O. It hands out `OutboundWrite`s when their
// quiet period has elapsed (or on manual save) and is told the outcome through
// `complete`. The host arms a single timer for `next_deadline()`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::SessionConfig;
use crate::types::{FieldPath, Timestamp};

/// Correlates an outbound write with its outcome
pub type WriteTicket = u64;

/// Aggregate save state shown by the page's save indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SaveStatus {
    Clean,
    Dirty,
    Saving,
    Error { message: String },
}

impl SaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Clean => "clean",
            SaveStatus::Dirty => "dirty",
            SaveStatus::Saving => "saving",
            SaveStatus::Error { .. } => "error",
        }
    }
}

/// Receives status transitions (only actual changes are reported)
pub trait StatusSink {
    fn status_changed(&self, status: &SaveStatus);
}

impl<F: Fn(&SaveStatus)> StatusSink for F {
    fn status_changed(&self, status: &SaveStatus) {
        self(status)
    }
}

/// Sink that drops every transition
pub struct NullSink;

impl StatusSink for NullSink {
    fn status_changed(&self, _status: &SaveStatus) {}
}

/// Identifies one persistence unit of one project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteKey {
    pub project_id: String,
    pub field_path: FieldPath,
}

impl WriteKey {
    pub fn new(project_id: &str, field_path: FieldPath) -> Self {
        WriteKey { project_id: project_id.to_string(), field_path }
    }
}

impl fmt::Display for WriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.field_path)
    }
}

/// One write the host must send to the persistence API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundWrite {
    pub ticket: WriteTicket,
    pub project_id: String,
    pub field_path: FieldPath,
    pub value: Value,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    value: Value,
    due_at: Timestamp,
    first_scheduled_at: Timestamp,
}

#[derive(Debug, Clone)]
struct InFlight {
    key: WriteKey,
    value: Value,
}

/// Debounces writes per field-path.
///
/// At most one pending and at most one in-flight write exist per key. A key
/// whose write is still in flight keeps its next value pending until the
/// outcome arrives, so writes to one field never overtake each other. Keys
/// carry the project id, so writes of a project that was closed in the
/// meantime still go to the right place.
pub struct SaveScheduler {
    quiet_period_ms: i64,
    max_latency_ms: Option<i64>,
    pending: BTreeMap<WriteKey, PendingWrite>,
    in_flight: HashMap<WriteTicket, InFlight>,
    failed: BTreeMap<WriteKey, Value>,
    last_error: Option<String>,
    next_ticket: WriteTicket,
    status: SaveStatus,
    sink: Box<dyn StatusSink>,
}

impl SaveScheduler {
    pub fn new(config: &SessionConfig, sink: Box<dyn StatusSink>) -> Self {
        SaveScheduler {
            quiet_period_ms: config.quiet_period_ms,
            max_latency_ms: config.max_latency_ms,
            pending: BTreeMap::new(),
            in_flight: HashMap::new(),
            failed: BTreeMap::new(),
            last_error: None,
            next_ticket: 1,
            status: SaveStatus::Clean,
            sink,
        }
    }

    /// Record (or replace) the value to write for `key` and restart its timer
    pub fn schedule(&mut self, key: WriteKey, value: Value, now: Timestamp) {
        let first_scheduled_at = self
            .pending
            .get(&key)
            .map(|p| p.first_scheduled_at)
            .unwrap_or(now);

        let mut due_at = now + self.quiet_period_ms;
        if let Some(max) = self.max_latency_ms {
            due_at = due_at.min(first_scheduled_at + max);
        }

        // A newer value supersedes one that failed earlier
        self.failed.remove(&key);
        self.pending.insert(key, PendingWrite { value, due_at, first_scheduled_at });
        self.set_status(SaveStatus::Dirty);
    }

    /// Hand out every write whose quiet period has elapsed
    pub fn take_due(&mut self, now: Timestamp) -> Vec<OutboundWrite> {
        let busy: Vec<&WriteKey> = self.in_flight.values().map(|f| &f.key).collect();
        let due: Vec<WriteKey> = self
            .pending
            .iter()
            .filter(|(key, write)| write.due_at <= now && !busy.contains(key))
            .map(|(key, _)| key.clone())
            .collect();

        let mut writes = Vec::with_capacity(due.len());
        for key in due {
            if let Some(write) = self.pending.remove(&key) {
                let ticket = self.next_ticket;
                self.next_ticket += 1;
                writes.push(OutboundWrite {
                    ticket,
                    project_id: key.project_id.clone(),
                    field_path: key.field_path,
                    value: write.value.clone(),
                });
                self.in_flight.insert(ticket, InFlight { key, value: write.value });
            }
        }

        if !writes.is_empty() {
            tracing::debug!("scheduler: sending {} write(s)", writes.len());
            self.set_status(SaveStatus::Saving);
        }
        writes
    }

    /// Manual save: everything pending or failed goes out now, bypassing timers.
    ///
    /// Keys that still have a write in flight become due immediately and are
    /// returned by the next `take_due` after that write completes.
    pub fn flush_all(&mut self, now: Timestamp) -> Vec<OutboundWrite> {
        let failed = std::mem::take(&mut self.failed);
        for (key, value) in failed {
            self.pending.entry(key).or_insert(PendingWrite {
                value,
                due_at: now,
                first_scheduled_at: now,
            });
        }
        for write in self.pending.values_mut() {
            write.due_at = now;
        }
        self.take_due(now)
    }

    /// Report the outcome of a write handed out earlier
    pub fn complete(
        &mut self,
        ticket: WriteTicket,
        outcome: std::result::Result<(), String>,
    ) -> Option<WriteKey> {
        let Some(write) = self.in_flight.remove(&ticket) else {
            tracing::warn!("scheduler: outcome for unknown write ticket {}", ticket);
            return None;
        };

        match outcome {
            Ok(()) => {
                tracing::debug!("scheduler: saved {}", write.key);
                self.settle();
            }
            Err(reason) => {
                let message = format!("Could not save {}: {}", write.key.field_path, reason);
                tracing::warn!("scheduler: {} ({})", message, write.key.project_id);
                if !self.pending.contains_key(&write.key) {
                    self.failed.insert(write.key.clone(), write.value);
                }
                self.last_error = Some(message.clone());
                self.set_status(SaveStatus::Error { message });
            }
        }
        Some(write.key)
    }

    /// Forget everything not yet acknowledged (user chose to leave without saving).
    ///
    /// Writes already in flight cannot be recalled and still report back.
    pub fn discard_all(&mut self) {
        self.pending.clear();
        self.failed.clear();
        self.settle();
    }

    fn settle(&mut self) {
        let next = if !self.in_flight.is_empty() {
            SaveStatus::Saving
        } else if !self.pending.is_empty() {
            SaveStatus::Dirty
        } else if !self.failed.is_empty() {
            SaveStatus::Error {
                message: self
                    .last_error
                    .clone()
                    .unwrap_or_else(|| format!("{} field(s) not saved", self.failed.len())),
            }
        } else {
            self.last_error = None;
            SaveStatus::Clean
        };
        self.set_status(next);
    }

    fn set_status(&mut self, status: SaveStatus) {
        if self.status != status {
            self.status = status;
            self.sink.status_changed(&self.status);
        }
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    /// True while any write is pending, in flight or failed
    pub fn has_unsaved_work(&self) -> bool {
        !self.pending.is_empty() || !self.in_flight.is_empty() || !self.failed.is_empty()
    }

    /// Same as `has_unsaved_work`, restricted to one project
    pub fn has_unsaved_work_for(&self, project_id: &str) -> bool {
        self.pending.keys().any(|k| k.project_id == project_id)
            || self.in_flight.values().any(|f| f.key.project_id == project_id)
            || self.failed.keys().any(|k| k.project_id == project_id)
    }

    /// Earliest deadline among pending writes
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pending.values().map(|p| p.due_at).min()
    }

    pub fn pending_value(&self, key: &WriteKey) -> Option<&Value> {
        self.pending.get(key).map(|p| &p.value)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn failed_keys(&self) -> Vec<WriteKey> {
        self.failed.keys().cloned().collect()
    }
}
