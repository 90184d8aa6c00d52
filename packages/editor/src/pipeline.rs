//! # State Transition Pipeline
//!
//! Every dispatched transaction runs through the same synchronous steps:
//!
//! ```text
//! 1. next = state.apply(tr)           rejected → nothing below runs
//! 2. view.update_state(next)
//! 3. on_change({ state, tr })         only if the transaction triggers change
//! 4. manager.on_state_update({ previous, state, tr })
//! ```
//!
//! Callbacks cannot re-enter the editor. Transactions they submit through
//! [`StateUpdate::dispatch`] or [`ChangeEvent::dispatch`] are queued and
//! processed in submission order once the current transition has finished
//! all four steps. A queued transaction that is rejected is logged and
//! skipped; the rest of the queue still runs.

use crate::error::{EditorError, EditorResult};
use crate::view::ViewAdapter;
use crate::wrapper::{EditorWrapper, LiveProps};
use quire_model::{EditorState, Transaction};
use std::cell::RefCell;
use std::collections::VecDeque;
use tracing::{debug, instrument, warn};

/// Transactions submitted from inside callbacks
#[derive(Debug, Default)]
pub struct DispatchQueue {
    pending: RefCell<VecDeque<Transaction>>,
}

impl DispatchQueue {
    pub fn push(&self, tr: Transaction) {
        self.pending.borrow_mut().push_back(tr);
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    pub(crate) fn pop(&self) -> Option<Transaction> {
        self.pending.borrow_mut().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.pending.borrow_mut().clear();
    }
}

/// Notification for a committed transition
pub struct StateUpdate<'a> {
    pub previous_state: &'a EditorState,
    pub state: &'a EditorState,
    /// `None` when a whole state was replaced
    pub tr: Option<&'a Transaction>,
    queue: &'a DispatchQueue,
}

impl<'a> StateUpdate<'a> {
    pub fn new(
        previous_state: &'a EditorState,
        state: &'a EditorState,
        tr: Option<&'a Transaction>,
        queue: &'a DispatchQueue,
    ) -> Self {
        Self {
            previous_state,
            state,
            tr,
            queue,
        }
    }

    pub fn doc_changed(&self) -> bool {
        self.tr.map(Transaction::doc_changed).unwrap_or(true)
    }

    /// Queue a follow-up transaction
    pub fn dispatch(&self, tr: Transaction) {
        self.queue.push(tr);
    }
}

/// Argument of the wrapper's `on_change` callback
pub struct ChangeEvent<'a> {
    pub state: &'a EditorState,
    pub tr: Option<&'a Transaction>,
    /// True for the notification fired when the view is created
    pub first_render: bool,
    queue: &'a DispatchQueue,
}

impl<'a> ChangeEvent<'a> {
    pub(crate) fn new(
        state: &'a EditorState,
        tr: Option<&'a Transaction>,
        first_render: bool,
        queue: &'a DispatchQueue,
    ) -> Self {
        Self {
            state,
            tr,
            first_render,
            queue,
        }
    }

    /// Queue a follow-up transaction
    pub fn dispatch(&self, tr: Transaction) {
        self.queue.push(tr);
    }
}

impl<V: ViewAdapter> EditorWrapper<V> {
    /// Apply a transaction and notify everyone; see the module docs
    #[instrument(skip(self, tr), fields(version = self.state.version(), steps = tr.steps().len()))]
    pub fn dispatch(&mut self, tr: Transaction) -> EditorResult<()> {
        self.ensure_usable()?;
        self.commit(tr)?;
        self.drain_queue();
        Ok(())
    }

    /// Process transactions queued by callbacks
    pub(crate) fn drain_queue(&mut self) {
        while let Some(tr) = self.queue.pop() {
            if self.destroyed || self.manager.is_destroyed() {
                debug!(dropped = self.queue.len() + 1, "Editor torn down, dropping queued transactions");
                self.queue.clear();
                return;
            }
            if let Err(error) = self.commit(tr) {
                warn!(error = %error, "Queued transaction rejected");
            }
        }
    }

    fn commit(&mut self, tr: Transaction) -> EditorResult<()> {
        let next = self.state.apply(&tr).map_err(|error| {
            debug!(error = %error, "Transaction rejected");
            EditorError::from(error)
        })?;
        self.commit_state(next, Some(&tr), tr.triggers_change())
    }

    /// Steps 2 to 4 for an already computed state
    pub(crate) fn commit_state(
        &mut self,
        next: EditorState,
        tr: Option<&Transaction>,
        trigger_change: bool,
    ) -> EditorResult<()> {
        let props = LiveProps::new(&self.manager, &self.props, self.editable);
        self.view.update_state(&next, &props);

        let previous = std::mem::replace(&mut self.state, next);
        debug!(from = previous.version(), to = self.state.version(), "State committed");

        if trigger_change {
            if let Some(on_change) = &self.props.on_change {
                on_change(&ChangeEvent::new(&self.state, tr, false, &self.queue));
            }
        }

        self.manager
            .on_state_update(&StateUpdate::new(&previous, &self.state, tr, &self.queue))
    }
}
