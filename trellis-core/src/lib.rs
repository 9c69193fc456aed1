//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis rendering engine.
//! It implements:
//!
//! - A state store with batched, snapshotting writes
//! - Frame-coalesced render scheduling over an injected scheduler
//! - Textual templates with loop, class, style and event directives
//! - A virtual node tree and a positional reconciler over a host tree
//!
//! The crate is designed to be used both as a native Rust library and, with
//! the `python` feature, as a Python extension module via PyO3.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: state store, callback registries, scheduler, renderer
//! - `template`: markup parser, expression language, directive expansion
//! - `vdom`: virtual nodes, host tree abstraction, reconciliation
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use trellis_core::reactive::{ManualScheduler, MountOptions, Partial, Renderer};
//! use trellis_core::template::{Ambient, Template};
//! use trellis_core::vdom::MemoryHost;
//!
//! let template = Template::compile(
//!     r#"<ul><li dr:for="(item, i) in items">{{ i }}: {{ item }}</li></ul>"#,
//!     Ambient::standard(),
//! )?;
//!
//! let mut host = MemoryHost::new();
//! let target = host.create_mount_point("app");
//! let scheduler = Arc::new(ManualScheduler::new());
//!
//! let renderer = Renderer::mount(
//!     MountOptions::new("#app", template).initial_data(json!({"items": ["a"]})),
//!     host,
//!     scheduler.clone(),
//! );
//!
//! renderer.set_state(Partial::new().set("items", json!(["a", "b"])));
//! scheduler.flush();
//!
//! let html = renderer.with_host(|host| host.inner_html(target));
//! assert_eq!(html, "<ul><li>0: a</li><li>1: b</li></ul>");
//! # Ok::<(), trellis_core::Error>(())
//! ```

pub mod error;
pub mod reactive;
pub mod template;
pub mod vdom;

#[cfg(feature = "python")]
mod python;

pub use error::{Error, Result};
