//! Reactive State and Render Scheduling
//!
//! This module ties application state to the render pipeline: a state
//! store with batched, snapshotting writes; a pluggable frame scheduler;
//! and the [`Renderer`] that turns batches into render passes.
//!
//! # Concepts
//!
//! ## Batches
//!
//! Every write issued before the current unit of work yields belongs to one
//! batch. The first write of a batch captures a [`Snapshot`] of the store;
//! the batch produces exactly one render.
//!
//! ## Frames
//!
//! A render runs in a frame callback. Requesting a frame while one is
//! pending cancels the pending one, so renders never pile up.
//!
//! ## Side effects
//!
//! After a batch renders, side effects receive the pre-batch snapshot and
//! the current store, which is enough to compute what changed.
//!
//! # Implementation Notes
//!
//! Timing is injected through [`FrameScheduler`]. [`ManualScheduler`] runs
//! everything on explicit calls, which keeps tests deterministic.

mod registry;
mod runtime;
mod scheduler;
mod store;

pub use registry::{CallbackId, CallbackRegistry};
pub use runtime::{MountOptions, ReadyCallback, Renderer, SideEffect, View, ViewFn, WeakRenderer};
pub use scheduler::{FrameId, FrameScheduler, ManualScheduler, Task};
pub use store::{Partial, Snapshot, StateStore, StoreError};
