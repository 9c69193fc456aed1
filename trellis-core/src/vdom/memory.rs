//! In-memory host tree.
//!
//! [`MemoryHost`] stores nodes in an arena and records every mutation in an
//! [`Edit`] log, which makes reconciliation observable in tests and in
//! headless rendering.

use std::fmt::Write;

use indexmap::IndexMap;
use serde::Serialize;

use super::host::HostTree;
use super::html::{escape_text, write_tag};
use super::node::{parse_style, style_text, EventHandler, NodeKind};

/// Handle to a node in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HostNodeId(usize);

impl HostNodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One recorded host mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    Create { node: HostNodeId, kind: String },
    SetAttribute { node: HostNodeId, name: String, value: String },
    RemoveAttribute { node: HostNodeId, name: String },
    SetStyle { node: HostNodeId, property: String, value: Option<String> },
    SetText { node: HostNodeId, text: String },
    Append { parent: HostNodeId, child: HostNodeId },
    Insert { parent: HostNodeId, index: usize, child: HostNodeId },
    Remove { parent: HostNodeId, child: HostNodeId },
    Replace { parent: HostNodeId, old: HostNodeId, new: HostNodeId },
    Listen { node: HostNodeId, event: String },
    Unlisten { node: HostNodeId, event: String },
}

struct Slot {
    kind: NodeKind,
    text: String,
    attrs: IndexMap<String, String>,
    style: IndexMap<String, String>,
    listeners: IndexMap<String, EventHandler>,
    children: Vec<HostNodeId>,
    parent: Option<HostNodeId>,
}

impl Slot {
    fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            attrs: IndexMap::new(),
            style: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Arena-backed host tree with an edit log.
///
/// Node `0` is a `body` root; [`query`](HostTree::query) searches below it.
pub struct MemoryHost {
    slots: Vec<Slot>,
    edits: Vec<Edit>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::new(NodeKind::Element("body".to_string()), "")],
            edits: Vec::new(),
        }
    }

    pub fn root(&self) -> HostNodeId {
        HostNodeId(0)
    }

    /// Append a `<div id="...">` under the root, without logging edits.
    pub fn create_mount_point(&mut self, id: &str) -> HostNodeId {
        let node = self.alloc(Slot::new(NodeKind::Element("div".to_string()), ""));
        self.slots[node.0].attrs.insert("id".to_string(), id.to_string());
        self.slots[node.0].parent = Some(self.root());
        self.slots[0].children.push(node);
        node
    }

    /// Edits recorded since the last [`take_edits`](Self::take_edits).
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn take_edits(&mut self) -> Vec<Edit> {
        std::mem::take(&mut self.edits)
    }

    pub fn parent(&self, node: HostNodeId) -> Option<HostNodeId> {
        self.slots.get(node.0).and_then(|slot| slot.parent)
    }

    /// The handler bound to `event` on `node`.
    pub fn listener(&self, node: HostNodeId, event: &str) -> Option<EventHandler> {
        self.slots.get(node.0)?.listeners.get(event).cloned()
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: HostNodeId) -> String {
        let mut out = String::new();
        if let Some(slot) = self.slots.get(node.0) {
            for child in &slot.children {
                self.write_html(&mut out, *child);
            }
        }
        out
    }

    /// Serialized `node` itself.
    pub fn outer_html(&self, node: HostNodeId) -> String {
        let mut out = String::new();
        self.write_html(&mut out, node);
        out
    }

    fn write_html(&self, out: &mut String, node: HostNodeId) {
        let Some(slot) = self.slots.get(node.0) else { return };
        match &slot.kind {
            NodeKind::Text => out.push_str(&escape_text(&slot.text)),
            NodeKind::Comment => {
                let _ = write!(out, "<!--{}-->", slot.text);
            }
            NodeKind::Element(tag) => {
                let style = style_text(&slot.style);
                let attrs = slot
                    .attrs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .chain(style.as_deref().map(|s| ("style", s)));
                write_tag(out, tag, attrs, &self.inner_html(node));
            }
        }
    }

    fn alloc(&mut self, slot: Slot) -> HostNodeId {
        self.slots.push(slot);
        HostNodeId(self.slots.len() - 1)
    }

    fn slot_mut(&mut self, node: &HostNodeId) -> Option<&mut Slot> {
        self.slots.get_mut(node.0)
    }

    fn create(&mut self, kind: NodeKind, text: &str) -> HostNodeId {
        let label = match &kind {
            NodeKind::Element(tag) => tag.clone(),
            NodeKind::Text => "#text".to_string(),
            NodeKind::Comment => "#comment".to_string(),
        };
        let node = self.alloc(Slot::new(kind, text));
        self.edits.push(Edit::Create { node, kind: label });
        node
    }

    fn detach(&mut self, child: HostNodeId) {
        if let Some(parent) = self.parent(child) {
            if let Some(slot) = self.slot_mut(&parent) {
                slot.children.retain(|c| *c != child);
            }
            if let Some(slot) = self.slot_mut(&child) {
                slot.parent = None;
            }
        }
    }

    fn find(&self, node: HostNodeId, matches: &dyn Fn(&Slot) -> bool) -> Option<HostNodeId> {
        let slot = self.slots.get(node.0)?;
        if node != self.root() && matches(slot) {
            return Some(node);
        }
        slot.children.iter().find_map(|child| self.find(*child, matches))
    }
}

impl HostTree for MemoryHost {
    type Node = HostNodeId;

    fn create_element(&mut self, tag: &str) -> HostNodeId {
        self.create(NodeKind::Element(tag.to_ascii_lowercase()), "")
    }

    fn create_text(&mut self, text: &str) -> HostNodeId {
        self.create(NodeKind::Text, text)
    }

    fn create_comment(&mut self, text: &str) -> HostNodeId {
        self.create(NodeKind::Comment, text)
    }

    fn kind(&self, node: &HostNodeId) -> NodeKind {
        self.slots
            .get(node.0)
            .map(|slot| slot.kind.clone())
            .unwrap_or(NodeKind::Comment)
    }

    fn children(&self, node: &HostNodeId) -> Vec<HostNodeId> {
        self.slots
            .get(node.0)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, node: &HostNodeId, name: &str) -> Option<String> {
        let slot = self.slots.get(node.0)?;
        if name == "style" {
            return style_text(&slot.style);
        }
        slot.attrs.get(name).cloned()
    }

    fn style(&self, node: &HostNodeId) -> IndexMap<String, String> {
        self.slots
            .get(node.0)
            .map(|slot| slot.style.clone())
            .unwrap_or_default()
    }

    fn text_content(&self, node: &HostNodeId) -> Option<String> {
        let slot = self.slots.get(node.0)?;
        match slot.kind {
            NodeKind::Element(_) => None,
            _ => Some(slot.text.clone()),
        }
    }

    fn set_attribute(&mut self, node: &HostNodeId, name: &str, value: &str) {
        let Some(slot) = self.slot_mut(node) else { return };
        if name == "style" {
            slot.style = parse_style(value);
        } else {
            slot.attrs.insert(name.to_string(), value.to_string());
        }
        self.edits.push(Edit::SetAttribute {
            node: *node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&mut self, node: &HostNodeId, name: &str) {
        let Some(slot) = self.slot_mut(node) else { return };
        if name == "style" {
            slot.style.clear();
        } else {
            slot.attrs.shift_remove(name);
        }
        self.edits.push(Edit::RemoveAttribute {
            node: *node,
            name: name.to_string(),
        });
    }

    fn set_style(&mut self, node: &HostNodeId, property: &str, value: Option<&str>) {
        let Some(slot) = self.slot_mut(node) else { return };
        match value {
            Some(v) => {
                slot.style.insert(property.to_string(), v.to_string());
            }
            None => {
                slot.style.shift_remove(property);
            }
        }
        self.edits.push(Edit::SetStyle {
            node: *node,
            property: property.to_string(),
            value: value.map(str::to_string),
        });
    }

    fn set_text(&mut self, node: &HostNodeId, text: &str) {
        let Some(slot) = self.slot_mut(node) else { return };
        slot.text = text.to_string();
        self.edits.push(Edit::SetText {
            node: *node,
            text: text.to_string(),
        });
    }

    fn append_child(&mut self, parent: &HostNodeId, child: &HostNodeId) {
        if self.slots.get(parent.0).is_none() || self.slots.get(child.0).is_none() {
            return;
        }
        self.detach(*child);
        self.slots[parent.0].children.push(*child);
        self.slots[child.0].parent = Some(*parent);
        self.edits.push(Edit::Append {
            parent: *parent,
            child: *child,
        });
    }

    fn insert_child(&mut self, parent: &HostNodeId, index: usize, child: &HostNodeId) {
        if self.slots.get(parent.0).is_none() || self.slots.get(child.0).is_none() {
            return;
        }
        self.detach(*child);
        let children = &mut self.slots[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, *child);
        self.slots[child.0].parent = Some(*parent);
        self.edits.push(Edit::Insert {
            parent: *parent,
            index,
            child: *child,
        });
    }

    fn remove_child(&mut self, parent: &HostNodeId, child: &HostNodeId) {
        if self.parent(*child) != Some(*parent) {
            return;
        }
        self.detach(*child);
        self.edits.push(Edit::Remove {
            parent: *parent,
            child: *child,
        });
    }

    fn replace_child(&mut self, parent: &HostNodeId, old: &HostNodeId, new: &HostNodeId) {
        if self.parent(*old) != Some(*parent) || self.slots.get(new.0).is_none() {
            return;
        }
        self.detach(*new);
        let children = &mut self.slots[parent.0].children;
        if let Some(position) = children.iter().position(|c| c == old) {
            children[position] = *new;
        }
        self.slots[old.0].parent = None;
        self.slots[new.0].parent = Some(*parent);
        self.edits.push(Edit::Replace {
            parent: *parent,
            old: *old,
            new: *new,
        });
    }

    fn add_event_listener(&mut self, node: &HostNodeId, event: &str, handler: EventHandler) {
        let Some(slot) = self.slot_mut(node) else { return };
        slot.listeners.insert(event.to_string(), handler);
        self.edits.push(Edit::Listen {
            node: *node,
            event: event.to_string(),
        });
    }

    fn remove_event_listener(&mut self, node: &HostNodeId, event: &str) {
        let Some(slot) = self.slot_mut(node) else { return };
        if slot.listeners.shift_remove(event).is_some() {
            self.edits.push(Edit::Unlisten {
                node: *node,
                event: event.to_string(),
            });
        }
    }

    fn query(&self, selector: &str) -> Option<HostNodeId> {
        match selector.strip_prefix('#') {
            Some(id) => self.find(self.root(), &|slot: &Slot| {
                slot.attrs.get("id").map(String::as_str) == Some(id)
            }),
            None => self.find(self.root(), &|slot: &Slot| {
                matches!(&slot.kind, NodeKind::Element(tag) if tag.eq_ignore_ascii_case(selector))
            }),
        }
    }
}
