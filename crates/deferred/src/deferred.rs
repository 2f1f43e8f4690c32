// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The deferred cell: settlement slot plus callback queues.
//!
//! `Deferred` owns a single-threaded shared cell. Settlement goes through
//! the capability handles in `settle`; registration goes through `then`.
//! Every dispatch decision is taken with the cell borrowed and acted on
//! after the borrow is released, so callbacks may re-enter the same cell.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::UnhandledRejection;
use crate::settle::{Fulfill, Reject};
use crate::state::State;

/// Type-erased completion callback. Fires at most once, with its own clone
/// of the recorded result.
pub type Callback<V> = Box<dyn FnOnce(V)>;

/// Settlement slot. State and result live in one enum so a recorded result
/// cannot exist without a terminal state.
pub(crate) enum Slot<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

/// Cell shared between a `Deferred` and its settlement capabilities.
pub(crate) struct Inner<T, E> {
    pub(crate) slot: Slot<T, E>,
    /// Success callbacks queued while pending, in registration order.
    /// `None` records a registration that omitted the callback — the
    /// identity pass-through, which dispatches as a no-op.
    pub(crate) on_fulfilled: Vec<Option<Callback<T>>>,
    /// Failure callbacks queued while pending, in registration order.
    /// `None` re-raises the payload at dispatch.
    pub(crate) on_rejected: Vec<Option<Callback<E>>>,
}

pub(crate) type SharedInner<T, E> = Rc<RefCell<Inner<T, E>>>;

/// Dispatch decision taken under the cell borrow, acted on after release.
enum Dispatch<T, E> {
    Queued,
    Fulfilled(Option<Callback<T>>, T),
    Rejected(Option<Callback<E>>, E),
}

/// The eventual result of an operation that completes exactly once.
///
/// Starts pending; settles at most once to fulfilled or rejected via the
/// capabilities handed to the setup routine. Completion callbacks registered
/// with [`then`](Deferred::then) fire synchronously — inside the settlement
/// call if registered early, inside the `then` call itself if registered
/// after settlement.
pub struct Deferred<T, E> {
    shared: SharedInner<T, E>,
}

impl<T: Clone, E: Clone> Deferred<T, E> {
    /// Create a deferred and run `setup` synchronously with the two
    /// settlement capabilities bound to it.
    ///
    /// The setup routine may settle immediately, or stash clones of the
    /// handles and settle after `new` returns. Returning `Err` rejects the
    /// deferred with that error, so an erring routine still reaches a
    /// terminal state; if the routine already settled, the implied
    /// rejection is the usual silent no-op.
    pub fn new<F>(setup: F) -> Self
    where
        F: FnOnce(Fulfill<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        let shared = Rc::new(RefCell::new(Inner {
            slot: Slot::Pending,
            on_fulfilled: Vec::new(),
            on_rejected: Vec::new(),
        }));
        let fulfill = Fulfill::new(shared.clone());
        let reject = Reject::new(shared.clone());
        let fallback = reject.clone();
        if let Err(error) = setup(fulfill, reject) {
            // No registrations can exist yet, so this drain cannot surface
            // an unhandled rejection.
            let _ = fallback.settle(error);
        }
        Self { shared }
    }

    /// Register completion callbacks.
    ///
    /// While pending, both arguments are queued — an omitted side queues
    /// its pass-through default — and fire inside the eventual settlement
    /// call. Once settled, the matching callback fires synchronously inside
    /// this call with a clone of the recorded result. An omitted failure
    /// callback on a rejected cell hands the payload back as
    /// [`UnhandledRejection`] instead of dropping it.
    pub fn then(
        &self,
        on_fulfilled: Option<Callback<T>>,
        on_rejected: Option<Callback<E>>,
    ) -> Result<(), UnhandledRejection<E>> {
        let dispatch = {
            let mut guard = self.shared.borrow_mut();
            let inner = &mut *guard;
            match inner.slot {
                Slot::Pending => {
                    inner.on_fulfilled.push(on_fulfilled);
                    inner.on_rejected.push(on_rejected);
                    Dispatch::Queued
                }
                Slot::Fulfilled(ref value) => Dispatch::Fulfilled(on_fulfilled, value.clone()),
                Slot::Rejected(ref error) => Dispatch::Rejected(on_rejected, error.clone()),
            }
        };

        match dispatch {
            Dispatch::Queued => Ok(()),
            Dispatch::Fulfilled(callback, value) => {
                if let Some(callback) = callback {
                    callback(value);
                }
                Ok(())
            }
            Dispatch::Rejected(Some(callback), error) => {
                callback(error);
                Ok(())
            }
            Dispatch::Rejected(None, error) => Err(UnhandledRejection::new(error)),
        }
    }

    /// A clone of the recorded outcome, or `None` while pending.
    pub fn result(&self) -> Option<Result<T, E>> {
        match self.shared.borrow().slot {
            Slot::Pending => None,
            Slot::Fulfilled(ref value) => Some(Ok(value.clone())),
            Slot::Rejected(ref error) => Some(Err(error.clone())),
        }
    }
}

impl<T, E> Deferred<T, E> {
    /// Current settlement state.
    pub fn state(&self) -> State {
        match self.shared.borrow().slot {
            Slot::Pending => State::Pending,
            Slot::Fulfilled(_) => State::Fulfilled,
            Slot::Rejected(_) => State::Rejected,
        }
    }

    /// True while no settlement has happened.
    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    /// True once settled either way.
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }
}

// Clones share the cell: every clone observes the same settlement.
impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .finish()
    }
}
