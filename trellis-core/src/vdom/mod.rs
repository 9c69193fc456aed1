//! Virtual DOM
//!
//! Node descriptions ([`VNode`]), the [`HostTree`] abstraction over a live
//! tree, and the positional [`reconcile`] pass that brings one in line with
//! the other.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::vdom::{reconcile, MemoryHost, VNode};
//!
//! let mut host = MemoryHost::new();
//! let target = host.create_mount_point("app");
//!
//! let view: VNode = VNode::element("p").class("greeting").text("hello").into();
//! reconcile(&mut host, &target, &[view]);
//!
//! assert_eq!(host.inner_html(target), r#"<p class="greeting">hello</p>"#);
//! ```

mod diff;
mod host;
mod html;
mod memory;
mod node;

pub use diff::reconcile;
pub use host::HostTree;
pub use html::to_html;
pub use memory::{Edit, HostNodeId, MemoryHost};
pub use node::{parse_style, style_text, EventHandler, NodeKind, VElement, VNode};
