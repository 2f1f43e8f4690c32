// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Settlement capabilities.
//!
//! The setup routine receives one `Fulfill` and one `Reject` handle, both
//! bound to the cell that created them. Handles clone freely and may
//! outlive construction; the first effective settlement wins and every
//! later call on either handle is a silent no-op.

use crate::deferred::{SharedInner, Slot};
use crate::error::UnhandledRejection;

/// Success-settlement capability.
pub struct Fulfill<T, E> {
    shared: SharedInner<T, E>,
}

impl<T: Clone, E> Fulfill<T, E> {
    pub(crate) fn new(shared: SharedInner<T, E>) -> Self {
        Self { shared }
    }

    /// Transition pending -> fulfilled, then fire the queued success
    /// callbacks in registration order, each with its own clone of the
    /// value. No-op if the cell is already settled.
    pub fn settle(&self, value: T) {
        let queue = {
            let mut guard = self.shared.borrow_mut();
            let inner = &mut *guard;
            if !matches!(inner.slot, Slot::Pending) {
                return;
            }
            inner.slot = Slot::Fulfilled(value.clone());
            // Failure callbacks can never fire now.
            inner.on_rejected.clear();
            std::mem::take(&mut inner.on_fulfilled)
        };
        // Borrow released: callbacks may re-enter the cell.
        for callback in queue.into_iter().flatten() {
            callback(value.clone());
        }
    }
}

impl<T, E> Clone for Fulfill<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Failure-settlement capability.
pub struct Reject<T, E> {
    shared: SharedInner<T, E>,
}

impl<T, E: Clone> Reject<T, E> {
    pub(crate) fn new(shared: SharedInner<T, E>) -> Self {
        Self { shared }
    }

    /// Transition pending -> rejected, then fire the queued failure
    /// callbacks in registration order, each with its own clone of the
    /// payload.
    ///
    /// A registration that omitted its failure callback re-raises here:
    /// draining stops at that entry and the payload comes back as
    /// [`UnhandledRejection`]; entries queued after it never fire. If the
    /// cell is already settled the call is a no-op and returns `Ok`.
    pub fn settle(&self, error: E) -> Result<(), UnhandledRejection<E>> {
        let queue = {
            let mut guard = self.shared.borrow_mut();
            let inner = &mut *guard;
            if !matches!(inner.slot, Slot::Pending) {
                return Ok(());
            }
            inner.slot = Slot::Rejected(error.clone());
            // Success callbacks can never fire now.
            inner.on_fulfilled.clear();
            std::mem::take(&mut inner.on_rejected)
        };
        // Borrow released: callbacks may re-enter the cell.
        for callback in queue {
            match callback {
                Some(callback) => callback(error.clone()),
                None => return Err(UnhandledRejection::new(error)),
            }
        }
        Ok(())
    }
}

impl<T, E> Clone for Reject<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Deferred;
    use crate::state::State;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pending_pair<T: Clone, E: Clone>() -> (Deferred<T, E>, Fulfill<T, E>, Reject<T, E>) {
        let stash = Rc::new(RefCell::new(None));
        let s = stash.clone();
        let d = Deferred::new(move |fulfill, reject| {
            *s.borrow_mut() = Some((fulfill, reject));
            Ok(())
        });
        let (fulfill, reject) = stash.borrow_mut().take().expect("setup ran");
        (d, fulfill, reject)
    }

    #[test]
    fn fulfill_then_reject_keeps_first() {
        let (d, fulfill, reject) = pending_pair::<i32, String>();
        fulfill.settle(1);
        assert!(reject.settle("late".to_string()).is_ok());
        assert_eq!(d.state(), State::Fulfilled);
        assert_eq!(d.result(), Some(Ok(1)));
    }

    #[test]
    fn reject_then_fulfill_keeps_first() {
        let (d, fulfill, reject) = pending_pair::<i32, String>();
        reject.settle("first".to_string()).unwrap();
        fulfill.settle(2);
        assert_eq!(d.state(), State::Rejected);
        assert_eq!(d.result(), Some(Err("first".to_string())));
    }

    #[test]
    fn double_fulfill_keeps_first_and_fires_nothing_twice() {
        let (d, fulfill, _reject) = pending_pair::<i32, String>();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let h = hits.clone();
        d.then(Some(Box::new(move |v| h.borrow_mut().push(v))), None)
            .unwrap();
        fulfill.settle(1);
        fulfill.settle(2);
        assert_eq!(d.result(), Some(Ok(1)));
        assert_eq!(*hits.borrow(), vec![1]);
    }

    #[test]
    fn rejection_with_all_handlers_drains_in_order() {
        let (d, _fulfill, reject) = pending_pair::<i32, String>();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let o = order.clone();
            d.then(None, Some(Box::new(move |e| o.borrow_mut().push((tag, e)))))
                .unwrap();
        }
        reject.settle("bad".to_string()).unwrap();
        assert_eq!(
            *order.borrow(),
            vec![
                ("a", "bad".to_string()),
                ("b", "bad".to_string()),
                ("c", "bad".to_string()),
            ]
        );
    }

    #[test]
    fn rejection_drain_stops_at_missing_handler() {
        let (d, _fulfill, reject) = pending_pair::<i32, String>();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = log.clone();
        d.then(None, Some(Box::new(move |e| first.borrow_mut().push(e))))
            .unwrap();
        d.then(None, None).unwrap();
        let third = log.clone();
        d.then(None, Some(Box::new(move |e| third.borrow_mut().push(e))))
            .unwrap();

        let err = reject.settle("bad".to_string()).unwrap_err();
        assert_eq!(err.into_inner(), "bad");
        // Only the handler registered before the re-raising entry fired.
        assert_eq!(*log.borrow(), vec!["bad".to_string()]);
        assert_eq!(d.state(), State::Rejected);
    }

    #[test]
    fn cloned_handles_share_settlement() {
        let (d, fulfill, _reject) = pending_pair::<i32, String>();
        let f2 = fulfill.clone();
        f2.settle(5);
        fulfill.settle(6);
        assert_eq!(d.result(), Some(Ok(5)));
    }

    #[test]
    fn resettling_inside_a_drain_callback_is_a_noop() {
        let (d, fulfill, _reject) = pending_pair::<i32, String>();
        let f2 = fulfill.clone();
        d.then(Some(Box::new(move |_| f2.settle(99))), None)
            .unwrap();
        fulfill.settle(1);
        assert_eq!(d.result(), Some(Ok(1)));
    }
}
