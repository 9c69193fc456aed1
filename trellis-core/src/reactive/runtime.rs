//! Renderer Runtime
//!
//! The [`Renderer`] owns the state store, the view and the mounted host
//! tree, and turns state writes into render passes.
//!
//! # How It Works
//!
//! 1. `set_state` writes every defined entry. The first write of a batch
//!    captures the pre-batch snapshot and defers a *batch task*; later
//!    writes in the same unit of work ride along.
//!
//! 2. When the batch task runs it requests a frame. A frame requested while
//!    another is still pending cancels it, so at most one render runs per
//!    frame. Each request bumps a generation counter and a frame callback
//!    whose generation is stale does nothing.
//!
//! 3. The frame renders: the view produces a fresh [`VNode`] list from the
//!    current store, and the reconciler applies it to the mount target.
//!
//! 4. If a snapshot is pending, every side effect is called with
//!    `(snapshot, current)`, and the snapshot is cleared.
//!
//! # Locking
//!
//! All state sits behind one mutex. Views run while it is held and must not
//! call back into the renderer. Side effects, ready callbacks and event
//! handlers run with no lock held and may call `set_state` freely.
//! Scheduled tasks hold a weak handle; once the last [`Renderer`] clone is
//! dropped they do nothing.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use super::registry::{CallbackId, CallbackRegistry};
use super::scheduler::{FrameId, FrameScheduler};
use super::store::{Partial, Snapshot, StateStore, StoreError};
use crate::template::Template;
use crate::vdom::{reconcile, HostTree, VNode};

/// Called after a batch renders with the pre-batch snapshot and the store
/// as it is now.
pub type SideEffect = Arc<dyn Fn(&Snapshot, &Snapshot) + Send + Sync>;

/// A one-shot startup callback.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// A view written as a Rust function.
pub type ViewFn = Arc<dyn Fn(&Snapshot) -> Vec<VNode> + Send + Sync>;

/// Produces the desired tree from the store.
#[derive(Clone)]
pub enum View {
    Function(ViewFn),
    Template(Arc<Template>),
}

impl View {
    pub fn function<F>(view: F) -> Self
    where
        F: Fn(&Snapshot) -> Vec<VNode> + Send + Sync + 'static,
    {
        View::Function(Arc::new(view))
    }

    pub fn template(template: Template) -> Self {
        View::Template(Arc::new(template))
    }

    pub fn produce(&self, snapshot: &Snapshot) -> Vec<VNode> {
        match self {
            View::Function(view) => view(snapshot),
            View::Template(template) => template.render(snapshot),
        }
    }
}

impl From<Template> for View {
    fn from(template: Template) -> Self {
        View::template(template)
    }
}

/// What to mount and where.
pub struct MountOptions {
    target: String,
    view: View,
    initial_data: IndexMap<String, Value>,
    side_effects: Vec<SideEffect>,
}

impl MountOptions {
    /// `target` is a selector resolved once through
    /// [`HostTree::query`]: `#id` or a tag name.
    pub fn new(target: impl Into<String>, view: impl Into<View>) -> Self {
        Self {
            target: target.into(),
            view: view.into(),
            initial_data: IndexMap::new(),
            side_effects: Vec::new(),
        }
    }

    /// Seed the store with the entries of a JSON object. Other values are
    /// ignored.
    pub fn initial_data(mut self, data: Value) -> Self {
        match data {
            Value::Object(map) => self.initial_data.extend(map),
            other => tracing::warn!(value = %other, "initial data is not an object; ignoring"),
        }
        self
    }

    /// Seed one store entry.
    pub fn data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.initial_data.insert(key.into(), value);
        self
    }

    pub fn side_effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&Snapshot, &Snapshot) + Send + Sync + 'static,
    {
        self.side_effects.push(Arc::new(effect));
        self
    }
}

struct Inner<H: HostTree> {
    host: H,
    target: Option<H::Node>,
    view: View,
    store: StateStore,
    side_effects: CallbackRegistry<SideEffect>,
    ready: CallbackRegistry<ReadyCallback>,
    batch_pending: bool,
    frame: Option<FrameId>,
    generation: u64,
    frames_completed: u64,
}

struct Shared<H: HostTree> {
    state: Mutex<Inner<H>>,
    scheduler: Arc<dyn FrameScheduler>,
}

/// Work collected under the lock and run after it is released.
struct AfterRender {
    effects: Option<(Snapshot, Snapshot, Vec<SideEffect>)>,
    ready: Vec<ReadyCallback>,
}

impl AfterRender {
    fn run(self) {
        if let Some((previous, current, effects)) = self.effects {
            for effect in effects {
                effect(&previous, &current);
            }
        }
        for callback in self.ready {
            callback();
        }
    }
}

/// A mounted view bound to its state store.
///
/// Cloning is cheap; clones share the same renderer.
pub struct Renderer<H: HostTree> {
    shared: Arc<Shared<H>>,
}

impl<H: HostTree> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A non-owning handle to a [`Renderer`].
pub struct WeakRenderer<H: HostTree> {
    shared: Weak<Shared<H>>,
}

impl<H: HostTree> Clone for WeakRenderer<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<H> WeakRenderer<H>
where
    H: HostTree + Send + 'static,
    H::Node: Send,
{
    pub fn upgrade(&self) -> Option<Renderer<H>> {
        self.shared.upgrade().map(|shared| Renderer { shared })
    }
}

impl<H> Renderer<H>
where
    H: HostTree + Send + 'static,
    H::Node: Send,
{
    /// Mount a view into `host` and schedule the first render.
    ///
    /// The target is resolved once, here. When it is missing a warning is
    /// logged and every render is a no-op.
    pub fn mount(options: MountOptions, host: H, scheduler: Arc<dyn FrameScheduler>) -> Self {
        let MountOptions {
            target: selector,
            view,
            initial_data,
            side_effects,
        } = options;

        let target = host.query(&selector);
        if target.is_none() {
            tracing::warn!(target = %selector, "mount target not found; rendering is disabled");
        }

        let mut registry = CallbackRegistry::new();
        for effect in side_effects {
            registry.register(effect);
        }

        let renderer = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    host,
                    target,
                    view,
                    store: StateStore::new(initial_data),
                    side_effects: registry,
                    ready: CallbackRegistry::new(),
                    batch_pending: false,
                    frame: None,
                    generation: 0,
                    frames_completed: 0,
                }),
                scheduler,
            }),
        };
        tracing::debug!(target = %selector, "mounted");
        renderer.request_frame();
        renderer
    }

    pub fn downgrade(&self) -> WeakRenderer<H> {
        WeakRenderer {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Apply a partial update. The render happens once the batch closes.
    pub fn set_state(&self, partial: Partial) {
        let written = self.shared.state.lock().store.set_state(partial);
        if written > 0 {
            self.schedule_batch();
        }
    }

    /// Write a single entry.
    pub fn write(&self, key: impl Into<String>, value: Value) {
        self.shared.state.lock().store.write(key, value);
        self.schedule_batch();
    }

    /// Delete an entry and request a frame directly.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.shared.state.lock().store.remove(key);
        self.request_frame();
        removed
    }

    pub fn read(&self, key: &str) -> Option<Value> {
        self.shared.state.lock().store.read(key).cloned()
    }

    /// A snapshot of the whole store.
    pub fn state(&self) -> Snapshot {
        self.shared.state.lock().store.snapshot()
    }

    /// Whole-store replacement is always rejected.
    pub fn replace(&self, entries: IndexMap<String, Value>) -> Result<(), StoreError> {
        self.shared.state.lock().store.replace(entries)
    }

    /// Render now, superseding any pending frame.
    ///
    /// Returns the number of host edits, or `None` when there is no mount
    /// target.
    pub fn render(&self) -> Option<usize> {
        {
            let mut inner = self.shared.state.lock();
            if let Some(id) = inner.frame.take() {
                self.shared.scheduler.cancel_frame(id);
            }
            inner.generation += 1;
        }
        let (edits, after) = self.perform_frame();
        after.run();
        edits
    }

    /// Register a callback to run after the first completed render. Once
    /// that has happened, the callback is deferred to the next batch
    /// boundary instead.
    pub fn on_ready<F>(&self, callback: F) -> Option<CallbackId>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut inner = self.shared.state.lock();
        if inner.frames_completed == 0 {
            return Some(inner.ready.register(Box::new(callback)));
        }
        drop(inner);
        self.shared.scheduler.defer(Box::new(callback));
        None
    }

    /// Unregister a ready callback that has not run yet.
    pub fn cancel_ready(&self, id: CallbackId) -> bool {
        self.shared.state.lock().ready.unregister(id).is_some()
    }

    pub fn add_side_effect<F>(&self, effect: F) -> CallbackId
    where
        F: Fn(&Snapshot, &Snapshot) + Send + Sync + 'static,
    {
        self.shared.state.lock().side_effects.register(Arc::new(effect))
    }

    pub fn remove_side_effect(&self, id: CallbackId) -> bool {
        self.shared
            .state
            .lock()
            .side_effects
            .unregister(id)
            .is_some()
    }

    /// Run `f` against the host tree. The renderer is locked meanwhile.
    pub fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.shared.state.lock().host)
    }

    /// The resolved mount target.
    pub fn target(&self) -> Option<H::Node> {
        self.shared.state.lock().target.clone()
    }

    /// How many frames have completed.
    pub fn frames_completed(&self) -> u64 {
        self.shared.state.lock().frames_completed
    }

    fn schedule_batch(&self) {
        {
            let mut inner = self.shared.state.lock();
            if inner.batch_pending {
                return;
            }
            inner.batch_pending = true;
        }
        tracing::debug!("batch opened");
        let weak = self.downgrade();
        self.shared.scheduler.defer(Box::new(move || {
            if let Some(renderer) = weak.upgrade() {
                renderer.close_batch();
            }
        }));
    }

    fn close_batch(&self) {
        self.shared.state.lock().batch_pending = false;
        tracing::debug!("batch closed");
        self.request_frame();
    }

    fn request_frame(&self) {
        let mut inner = self.shared.state.lock();
        if let Some(id) = inner.frame.take() {
            tracing::trace!(?id, "superseding pending frame");
            self.shared.scheduler.cancel_frame(id);
        }
        inner.generation += 1;
        let generation = inner.generation;

        let weak = self.downgrade();
        let id = self.shared.scheduler.request_frame(Box::new(move || {
            if let Some(renderer) = weak.upgrade() {
                renderer.run_frame(generation);
            }
        }));
        inner.frame = Some(id);
        tracing::debug!(?id, generation, "frame requested");
    }

    fn run_frame(&self, generation: u64) {
        {
            let mut inner = self.shared.state.lock();
            if inner.generation != generation {
                tracing::trace!(generation, current = inner.generation, "ignoring stale frame");
                return;
            }
            inner.frame = None;
        }
        let (_, after) = self.perform_frame();
        after.run();
    }

    /// Render under the lock and collect the callbacks owed afterwards.
    fn perform_frame(&self) -> (Option<usize>, AfterRender) {
        let mut guard = self.shared.state.lock();
        let inner = &mut *guard;

        let edits = match inner.target.clone() {
            Some(target) => {
                let snapshot = inner.store.snapshot();
                let vnodes = inner.view.produce(&snapshot);
                let edits = reconcile(&mut inner.host, &target, &vnodes);
                tracing::debug!(edits, nodes = vnodes.len(), "render complete");
                Some(edits)
            }
            None => {
                tracing::debug!("render skipped; no mount target");
                None
            }
        };

        let effects = inner.store.take_snapshot().map(|previous| {
            (previous, inner.store.snapshot(), inner.side_effects.snapshot())
        });
        inner.frames_completed += 1;
        let ready = if inner.frames_completed == 1 {
            inner.ready.drain()
        } else {
            Vec::new()
        };

        (edits, AfterRender { effects, ready })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::ManualScheduler;
    use crate::vdom::{Edit, MemoryHost};
    use serde_json::json;

    fn counter_view() -> View {
        View::function(|state| {
            let count = state.get("count").cloned().unwrap_or(Value::Null);
            vec![VNode::element("p").text(format!("count: {count}")).into()]
        })
    }

    fn mount(options: MountOptions) -> (Renderer<MemoryHost>, Arc<ManualScheduler>) {
        let mut host = MemoryHost::new();
        host.create_mount_point("app");
        let scheduler = Arc::new(ManualScheduler::new());
        let renderer = Renderer::mount(options, host, scheduler.clone());
        (renderer, scheduler)
    }

    fn html(renderer: &Renderer<MemoryHost>) -> String {
        let target = renderer.target().unwrap();
        renderer.with_host(|host| host.inner_html(target))
    }

    #[test]
    fn mount_schedules_first_render() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()).data("count", json!(0)));
        assert_eq!(html(&renderer), "");
        assert_eq!(scheduler.pending_frames(), 1);

        scheduler.flush();
        assert_eq!(html(&renderer), "<p>count: 0</p>");
        assert_eq!(renderer.frames_completed(), 1);
    }

    #[test]
    fn one_render_per_batch_with_pre_batch_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (renderer, scheduler) = mount(
            MountOptions::new("#app", counter_view())
                .data("count", json!(0))
                .side_effect(move |previous, current| {
                    sink.lock().push((previous.get("count").cloned(), current.get("count").cloned()));
                }),
        );
        scheduler.flush();
        let frames = renderer.frames_completed();

        renderer.set_state(Partial::new().set("count", json!(1)));
        renderer.set_state(Partial::new().set("count", json!(2)));
        renderer.write("count", json!(3));
        assert_eq!(scheduler.pending_deferred(), 1);

        scheduler.flush();
        assert_eq!(renderer.frames_completed(), frames + 1);
        assert_eq!(html(&renderer), "<p>count: 3</p>");
        assert_eq!(*seen.lock(), vec![(Some(json!(0)), Some(json!(3)))]);
    }

    #[test]
    fn undefined_only_update_schedules_nothing() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()));
        scheduler.flush();

        renderer.set_state(Partial::new().unset("count"));
        assert_eq!(scheduler.pending_deferred(), 0);
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn pending_frame_is_superseded() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()));
        assert_eq!(scheduler.pending_frames(), 1);

        renderer.remove("count");
        assert_eq!(scheduler.pending_frames(), 1);
        assert_eq!(scheduler.cancelled_frames(), 1);

        scheduler.flush();
        assert_eq!(renderer.frames_completed(), 1);
    }

    #[test]
    fn remove_renders_without_side_effects() {
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        let (renderer, scheduler) = mount(
            MountOptions::new("#app", counter_view())
                .data("count", json!(5))
                .side_effect(move |_, _| *sink.lock() += 1),
        );
        scheduler.flush();

        assert_eq!(renderer.remove("count"), Some(json!(5)));
        scheduler.flush();
        assert_eq!(html(&renderer), "<p>count: null</p>");
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn missing_target_makes_render_a_no_op() {
        let (renderer, scheduler) = mount(MountOptions::new("#nowhere", counter_view()));
        scheduler.flush();

        assert_eq!(renderer.target(), None);
        assert_eq!(renderer.render(), None);
        assert!(renderer.with_host(|host| host.edits().is_empty()));
    }

    #[test]
    fn synchronous_render_reports_edits() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()).data("count", json!(1)));

        assert!(renderer.render().unwrap() > 0);
        assert_eq!(scheduler.pending_frames(), 0);
        assert_eq!(renderer.render(), Some(0));
    }

    #[test]
    fn rejected_replace_leaves_store_identical() {
        let (renderer, _scheduler) = mount(MountOptions::new("#app", counter_view()).data("count", json!(1)));
        let before = serde_json::to_string(&renderer.state()).unwrap();

        let result = renderer.replace(IndexMap::from([("count".to_string(), json!(9))]));
        assert_eq!(result, Err(StoreError::ReplaceRejected));
        assert_eq!(serde_json::to_string(&renderer.state()).unwrap(), before);
    }

    #[test]
    fn ready_callbacks_drain_once() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()));
        let calls = Arc::new(Mutex::new(Vec::new()));

        let sink = calls.clone();
        renderer.on_ready(move || sink.lock().push("first"));
        let sink = calls.clone();
        let cancelled = renderer.on_ready(move || sink.lock().push("cancelled")).unwrap();
        assert!(renderer.cancel_ready(cancelled));

        scheduler.flush();
        renderer.write("count", json!(1));
        scheduler.flush();
        assert_eq!(*calls.lock(), vec!["first"]);

        let sink = calls.clone();
        assert_eq!(renderer.on_ready(move || sink.lock().push("late")), None);
        scheduler.flush();
        assert_eq!(*calls.lock(), vec!["first", "late"]);
    }

    #[test]
    fn side_effects_can_be_removed() {
        let calls = Arc::new(Mutex::new(0));
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()));
        let sink = calls.clone();
        let id = renderer.add_side_effect(move |_, _| *sink.lock() += 1);

        renderer.write("count", json!(1));
        scheduler.flush();
        assert!(renderer.remove_side_effect(id));
        renderer.write("count", json!(2));
        scheduler.flush();

        assert_eq!(*calls.lock(), 1);
        assert!(!renderer.remove_side_effect(id));
    }

    #[test]
    fn side_effects_may_write_back() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()).data("count", json!(0)));
        let weak = renderer.downgrade();
        renderer.add_side_effect(move |_, current| {
            if current.get("count") == Some(&json!(1)) {
                if let Some(renderer) = weak.upgrade() {
                    renderer.write("count", json!(2));
                }
            }
        });

        renderer.write("count", json!(1));
        scheduler.flush();
        assert_eq!(html(&renderer), "<p>count: 2</p>");
    }

    #[test]
    fn dropped_renderer_makes_tasks_no_ops() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()));
        renderer.write("count", json!(1));
        drop(renderer);
        assert!(scheduler.flush() > 0);
    }

    #[test]
    fn patches_in_place_across_renders() {
        let (renderer, scheduler) = mount(MountOptions::new("#app", counter_view()).data("count", json!(0)));
        scheduler.flush();
        renderer.with_host(|host| host.take_edits());

        renderer.write("count", json!(7));
        scheduler.flush();
        let edits = renderer.with_host(|host| host.take_edits());
        assert_eq!(edits.len(), 1);
        assert!(matches!(&edits[0], Edit::SetText { text, .. } if text == "count: 7"));
    }
}
