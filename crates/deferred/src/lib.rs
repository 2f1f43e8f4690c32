// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Deferred settlement primitive.
//!
//! A [`Deferred`] records the eventual outcome of an operation that
//! completes exactly once — fulfilled with a value or rejected with an
//! error. Callbacks attach before or after settlement; either way each
//! fires at most once, synchronously, on the caller's stack. There is no
//! scheduler and no chaining: this is the settlement state machine and its
//! callback fan-out, nothing more.
//!
//! Components:
//! - deferred — the settlement cell and callback registration
//! - settle — fulfill/reject capabilities handed to the setup routine
//! - state — observable settlement state
//! - error — unhandled rejection reporting

pub mod deferred;
pub mod error;
pub mod settle;
pub mod state;

pub use deferred::{Callback, Deferred};
pub use error::UnhandledRejection;
pub use settle::{Fulfill, Reject};
pub use state::State;
