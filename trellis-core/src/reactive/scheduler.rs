//! Frame Scheduling
//!
//! Rendering is driven by two kinds of callbacks supplied by the embedder:
//!
//! - a *deferred task*, run once the current unit of work yields (the batch
//!   boundary), and
//! - a *frame callback*, run before the next frame is drawn; pending frames
//!   can be cancelled.
//!
//! [`ManualScheduler`] implements both as explicit queues, so tests and
//! headless embedders decide exactly when each boundary is crossed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A unit of scheduled work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Identifies a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

impl FrameId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

/// The timing services a renderer needs.
///
/// Implementations must never run a task synchronously from inside
/// `defer` or `request_frame`.
pub trait FrameScheduler: Send + Sync {
    /// Run `task` once the current unit of work yields.
    fn defer(&self, task: Task);

    /// Run `task` before the next frame.
    fn request_frame(&self, task: Task) -> FrameId;

    /// Drop a frame callback that has not run yet.
    fn cancel_frame(&self, id: FrameId);
}

#[derive(Default)]
struct Queues {
    deferred: VecDeque<Task>,
    frames: Vec<(FrameId, Task)>,
    cancelled: usize,
}

/// A [`FrameScheduler`] driven by explicit calls.
#[derive(Default)]
pub struct ManualScheduler {
    queues: Mutex<Queues>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run deferred tasks until none remain, including tasks deferred by
    /// the ones that ran. Returns how many ran.
    pub fn run_deferred(&self) -> usize {
        let mut ran = 0;
        loop {
            // The lock is released before the task runs.
            let task = self.queues.lock().deferred.pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Run every frame callback pending at the time of the call. Frames
    /// requested while they run wait for the next call.
    pub fn run_frame(&self) -> usize {
        let frames = std::mem::take(&mut self.queues.lock().frames);
        let ran = frames.len();
        for (_, task) in frames {
            task();
        }
        ran
    }

    /// Alternate deferred tasks and frames until both queues are empty.
    pub fn flush(&self) -> usize {
        let mut ran = 0;
        loop {
            let step = self.run_deferred() + self.run_frame();
            if step == 0 {
                return ran;
            }
            ran += step;
        }
    }

    pub fn pending_deferred(&self) -> usize {
        self.queues.lock().deferred.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.queues.lock().frames.len()
    }

    /// How many frame callbacks were cancelled before running.
    pub fn cancelled_frames(&self) -> usize {
        self.queues.lock().cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn defer(&self, task: Task) {
        self.queues.lock().deferred.push_back(task);
    }

    fn request_frame(&self, task: Task) -> FrameId {
        let id = FrameId::new();
        self.queues.lock().frames.push((id, task));
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        let mut queues = self.queues.lock();
        let before = queues.frames.len();
        queues.frames.retain(|(frame, _)| *frame != id);
        if queues.frames.len() < before {
            queues.cancelled += 1;
            tracing::trace!(?id, "cancelled frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| -> Task {
            let sink = sink.clone();
            Box::new(move || sink.lock().push(name))
        };
        (log, make)
    }

    #[test]
    fn nothing_runs_until_driven() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();
        scheduler.defer(task("deferred"));
        scheduler.request_frame(task("frame"));

        assert!(log.lock().is_empty());
        assert_eq!(scheduler.pending_deferred(), 1);
        assert_eq!(scheduler.pending_frames(), 1);

        assert_eq!(scheduler.run_frame(), 1);
        assert_eq!(scheduler.run_deferred(), 1);
        assert_eq!(*log.lock(), vec!["frame", "deferred"]);
    }

    #[test]
    fn cancelled_frames_never_run() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();
        let first = scheduler.request_frame(task("first"));
        scheduler.request_frame(task("second"));
        scheduler.cancel_frame(first);
        scheduler.cancel_frame(first);

        scheduler.run_frame();
        assert_eq!(*log.lock(), vec!["second"]);
        assert_eq!(scheduler.cancelled_frames(), 1);
    }

    #[test]
    fn flush_follows_tasks_scheduled_by_tasks() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (log, task) = recorder();
        let inner = scheduler.clone();
        let then = task("frame");
        scheduler.defer(Box::new(move || {
            inner.request_frame(then);
        }));

        assert_eq!(scheduler.flush(), 2);
        assert_eq!(*log.lock(), vec!["frame"]);
        assert_eq!(scheduler.pending_frames(), 0);
    }
}
