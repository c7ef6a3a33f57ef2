//! Container discovery.
//!
//! [`Reconciler`] is the runtime-agnostic polling loop; [`crio`] connects it
//! to CRI-O.
pub mod crio;
mod reconcile;

pub use reconcile::{CycleOutcome, LoopState, Reconciler};
