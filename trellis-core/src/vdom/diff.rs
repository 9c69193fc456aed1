//! Reconciliation
//!
//! Compares a freshly produced [`VNode`] list against the live children of a
//! host node and applies the edits needed to make them match.
//!
//! # Algorithm
//!
//! Comparison is positional (no keys):
//!
//! 1. Surplus trailing live nodes are removed first.
//! 2. For each index:
//!    - no live node: build the virtual node and append it
//!    - different type: build the virtual node and replace the live one
//!    - same type: patch `class` and `style`, overwrite leaf text when the
//!      new text is non-empty and differs, then settle children (clear,
//!      build, or recurse)
//!
//! Plain attributes and event listeners are only written when a node is
//! built, so reconciling the same tree twice issues no edits.

use indexmap::IndexMap;

use super::host::HostTree;
use super::node::VNode;

/// Reconcile the children of `parent` against `vnodes`.
///
/// Returns the number of host edits issued.
pub fn reconcile<H: HostTree>(host: &mut H, parent: &H::Node, vnodes: &[VNode]) -> usize {
    let mut reconciler = Reconciler { host, edits: 0 };
    reconciler.children(parent, vnodes);
    reconciler.edits
}

struct Reconciler<'h, H: HostTree> {
    host: &'h mut H,
    edits: usize,
}

impl<H: HostTree> Reconciler<'_, H> {
    fn children(&mut self, parent: &H::Node, vnodes: &[VNode]) {
        let mut live = self.host.children(parent);

        while live.len() > vnodes.len() {
            if let Some(surplus) = live.pop() {
                self.host.remove_child(parent, &surplus);
                self.edits += 1;
            }
        }

        for (i, vnode) in vnodes.iter().enumerate() {
            match live.get(i) {
                None => {
                    let built = self.build(vnode);
                    self.host.append_child(parent, &built);
                    self.edits += 1;
                }
                Some(node) if !self.host.kind(node).same_type(&vnode.kind()) => {
                    let built = self.build(vnode);
                    self.host.replace_child(parent, node, &built);
                    self.edits += 1;
                }
                Some(node) => self.patch(node, vnode),
            }
        }
    }

    fn patch(&mut self, node: &H::Node, vnode: &VNode) {
        match vnode {
            VNode::Element(el) => {
                let class = self.host.attribute(node, "class");
                if class != el.class {
                    match &el.class {
                        Some(class) => self.host.set_attribute(node, "class", class),
                        None => self.host.remove_attribute(node, "class"),
                    }
                    self.edits += 1;
                }
                self.patch_style(node, &el.style);

                let live_children = self.host.children(node).len();
                match (live_children, el.children.len()) {
                    (0, 0) => {}
                    (_, 0) => {
                        self.host.clear_children(node);
                        self.edits += live_children;
                    }
                    (0, _) => {
                        for child in &el.children {
                            let built = self.build(child);
                            self.host.append_child(node, &built);
                            self.edits += 1;
                        }
                    }
                    _ => self.children(node, &el.children),
                }
            }
            VNode::Text(text) | VNode::Comment(text) => {
                if !text.is_empty() && self.host.text_content(node).as_deref() != Some(text.as_str()) {
                    self.host.set_text(node, text);
                    self.edits += 1;
                }
            }
        }
    }

    fn patch_style(&mut self, node: &H::Node, style: &IndexMap<String, String>) {
        let live = self.host.style(node);
        if &live == style {
            return;
        }
        for property in live.keys().filter(|p| !style.contains_key(*p)) {
            self.host.set_style(node, property, None);
            self.edits += 1;
        }
        for (property, value) in style {
            if live.get(property) != Some(value) {
                self.host.set_style(node, property, Some(value.as_str()));
                self.edits += 1;
            }
        }
    }

    /// Create a live node for `vnode`, with its whole subtree.
    fn build(&mut self, vnode: &VNode) -> H::Node {
        self.edits += 1;
        match vnode {
            VNode::Text(text) => self.host.create_text(text),
            VNode::Comment(text) => self.host.create_comment(text),
            VNode::Element(el) => {
                let node = self.host.create_element(&el.tag);
                for (name, value) in &el.attrs {
                    self.host.set_attribute(&node, name, value);
                    self.edits += 1;
                }
                if let Some(class) = &el.class {
                    self.host.set_attribute(&node, "class", class);
                    self.edits += 1;
                }
                for (property, value) in &el.style {
                    self.host.set_style(&node, property, Some(value.as_str()));
                    self.edits += 1;
                }
                for (event, handler) in &el.events {
                    self.host.add_event_listener(&node, event, handler.clone());
                    self.edits += 1;
                }
                for child in &el.children {
                    let built = self.build(child);
                    self.host.append_child(&node, &built);
                    self.edits += 1;
                }
                node
            }
        }
    }
}
