// Observer notifications: save status and list refreshes
//
// The session queues what its observers should hear. A standalone session
// delivers at the end of each operation. Inside a `Workspace` delivery is
// deferred until the session is no longer borrowed, so observers may read
// (or drive) the session from their callbacks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::scheduler::{SaveStatus, StatusSink};
use crate::types::ListKind;

/// Redraws a list view after its items' labels, status or order changed
pub trait ListRenderer {
    fn refresh(&self, kind: ListKind);
}

impl<F: Fn(ListKind)> ListRenderer for F {
    fn refresh(&self, kind: ListKind) {
        self(kind)
    }
}

/// Renderer for headless sessions
pub struct NoopRenderer;

impl ListRenderer for NoopRenderer {
    fn refresh(&self, _kind: ListKind) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Status(SaveStatus),
    Refresh(ListKind),
}

/// Ordered queue of notices in front of the status sink and list renderer
pub struct Notifier {
    queue: RefCell<VecDeque<Notice>>,
    sink: Box<dyn StatusSink>,
    renderer: Box<dyn ListRenderer>,
    deferred: Cell<bool>,
    delivering: Cell<bool>,
}

impl Notifier {
    pub fn new(sink: Box<dyn StatusSink>, renderer: Box<dyn ListRenderer>) -> Rc<Self> {
        Rc::new(Notifier {
            queue: RefCell::new(VecDeque::new()),
            sink,
            renderer,
            deferred: Cell::new(false),
            delivering: Cell::new(false),
        })
    }

    pub fn push(&self, notice: Notice) {
        self.queue.borrow_mut().push_back(notice);
    }

    /// While deferred, only an explicit `deliver` reaches the observers
    pub fn set_deferred(&self, deferred: bool) {
        self.deferred.set(deferred);
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred.get()
    }

    pub fn queued(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn deliver_if_immediate(&self) {
        if !self.deferred.get() {
            self.deliver();
        }
    }

    /// Hand every queued notice to its observer, oldest first.
    ///
    /// Notices queued by an observer during delivery go out in the same pass;
    /// a nested call returns at once and leaves them to the outer loop.
    pub fn deliver(&self) {
        if self.delivering.replace(true) {
            return;
        }
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(Notice::Status(status)) => self.sink.status_changed(&status),
                Some(Notice::Refresh(kind)) => self.renderer.refresh(kind),
                None => break,
            }
        }
        self.delivering.set(false);
    }
}

/// Status sink handed to the scheduler; queues instead of calling out
pub(crate) struct QueuedSink(pub(crate) Rc<Notifier>);

impl StatusSink for QueuedSink {
    fn status_changed(&self, status: &SaveStatus) {
        self.0.push(Notice::Status(status.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (Rc<Notifier>, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let statuses = seen.clone();
        let refreshes = seen.clone();
        let notifier = Notifier::new(
            Box::new(move |status: &SaveStatus| {
                statuses.borrow_mut().push(status.label().to_string())
            }),
            Box::new(move |kind: ListKind| refreshes.borrow_mut().push(kind.as_str().to_string())),
        );
        (notifier, seen)
    }

    #[test]
    fn test_delivers_in_order() {
        let (notifier, seen) = recording();
        notifier.push(Notice::Refresh(ListKind::Chapters));
        notifier.push(Notice::Status(SaveStatus::Dirty));
        notifier.deliver_if_immediate();

        assert_eq!(*seen.borrow(), vec!["chapters", "dirty"]);
        assert_eq!(notifier.queued(), 0);
    }

    #[test]
    fn test_deferred_waits_for_deliver() {
        let (notifier, seen) = recording();
        notifier.set_deferred(true);
        QueuedSink(notifier.clone()).status_changed(&SaveStatus::Saving);
        notifier.deliver_if_immediate();
        assert!(seen.borrow().is_empty());

        notifier.deliver();
        assert_eq!(*seen.borrow(), vec!["saving"]);
    }

    #[test]
    fn test_notice_pushed_during_delivery() {
        let slot: Rc<RefCell<Option<Rc<Notifier>>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (inner, log) = (slot.clone(), seen.clone());
        let notifier = Notifier::new(
            Box::new(move |status: &SaveStatus| {
                log.borrow_mut().push(status.label());
                if let Some(n) = inner.borrow().as_ref() {
                    if *status == SaveStatus::Dirty {
                        n.push(Notice::Status(SaveStatus::Clean));
                        n.deliver();
                    }
                }
            }),
            Box::new(NoopRenderer),
        );
        *slot.borrow_mut() = Some(notifier.clone());

        notifier.push(Notice::Status(SaveStatus::Dirty));
        notifier.deliver();
        assert_eq!(*seen.borrow(), vec!["dirty", "clean"]);

        // Break the cycle
        slot.borrow_mut().take();
    }
}
