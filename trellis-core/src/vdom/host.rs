//! Host Tree
//!
//! The live node tree the reconciler writes into. A browser DOM, a native
//! widget tree or the in-memory [`MemoryHost`](super::MemoryHost) can all
//! sit behind this trait.

use std::fmt::Debug;

use indexmap::IndexMap;

use super::node::{parse_style, EventHandler, NodeKind};

/// Operations the reconciler needs from a live tree.
///
/// Node handles are cheap to clone and compare by identity.
pub trait HostTree {
    type Node: Clone + PartialEq + Debug;

    fn create_element(&mut self, tag: &str) -> Self::Node;
    fn create_text(&mut self, text: &str) -> Self::Node;
    fn create_comment(&mut self, text: &str) -> Self::Node;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    /// Current children, in order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Current attribute value. `class` and `style` are readable here too.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Current style properties, in declaration order.
    fn style(&self, node: &Self::Node) -> IndexMap<String, String> {
        self.attribute(node, "style")
            .map(|text| parse_style(&text))
            .unwrap_or_default()
    }

    /// Text of a text or comment node.
    fn text_content(&self, node: &Self::Node) -> Option<String>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    /// Set or clear (`None`) one style property.
    fn set_style(&mut self, node: &Self::Node, property: &str, value: Option<&str>);

    fn set_text(&mut self, node: &Self::Node, text: &str);

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);
    fn insert_child(&mut self, parent: &Self::Node, index: usize, child: &Self::Node);
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);
    fn replace_child(&mut self, parent: &Self::Node, old: &Self::Node, new: &Self::Node);

    /// Remove every child of `node`.
    fn clear_children(&mut self, node: &Self::Node) {
        for child in self.children(node) {
            self.remove_child(node, &child);
        }
    }

    fn add_event_listener(&mut self, node: &Self::Node, event: &str, handler: EventHandler);
    fn remove_event_listener(&mut self, node: &Self::Node, event: &str);

    /// Find the first node matching `selector`: `#id` or a tag name.
    fn query(&self, selector: &str) -> Option<Self::Node>;
}
