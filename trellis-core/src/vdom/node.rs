//! Virtual Nodes
//!
//! A [`VNode`] tree is the description of the desired UI for one render
//! pass. It is produced fresh every pass (by a view function or by template
//! expansion), handed to the reconciler and then dropped.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

/// The type of a node, as compared by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with its tag name.
    Element(String),
    Text,
    Comment,
}

impl NodeKind {
    /// Whether two nodes have the same type. Tags compare case-insensitively.
    pub fn same_type(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Element(a), NodeKind::Element(b)) => a.eq_ignore_ascii_case(b),
            (NodeKind::Text, NodeKind::Text) | (NodeKind::Comment, NodeKind::Comment) => true,
            _ => false,
        }
    }
}

/// An event listener attached to a node.
///
/// The payload is whatever the host dispatches with the event.
#[derive(Clone)]
pub struct EventHandler(Arc<dyn Fn(&Value) + Send + Sync>);

impl EventHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    /// Invoke the handler.
    pub fn call(&self, payload: &Value) {
        (self.0)(payload)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

/// An element description.
///
/// `class`, `style` and `events` are the reserved attributes; everything
/// else lives in `attrs` in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub attrs: IndexMap<String, String>,
    pub class: Option<String>,
    pub style: IndexMap<String, String>,
    pub events: IndexMap<String, EventHandler>,
    pub children: Vec<VNode>,
}

impl VElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set a plain attribute. `class` and `style` are routed to their
    /// reserved slots.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == "class" {
            return self.class(value);
        }
        if name == "style" {
            self.style.extend(parse_style(&value));
        } else {
            self.attrs.insert(name, value);
        }
        self
    }

    /// Append a class name.
    pub fn class(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            return self;
        }
        self.class = Some(match self.class.take() {
            Some(existing) if !existing.is_empty() => format!("{existing} {name}"),
            _ => name,
        });
        self
    }

    /// Set one style property.
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    /// Attach an event handler.
    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.events.insert(event.into(), EventHandler::new(handler));
        self
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Append a text child.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(VNode::Text(text.into()))
    }

    /// The `style` attribute text for this element, if it has any style.
    pub fn style_text(&self) -> Option<String> {
        style_text(&self.style)
    }
}

/// A virtual node.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Text(String),
    Comment(String),
    Element(VElement),
}

impl VNode {
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    pub fn comment(text: impl Into<String>) -> Self {
        VNode::Comment(text.into())
    }

    /// Start building an element.
    pub fn element(tag: impl Into<String>) -> VElement {
        VElement::new(tag)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            VNode::Text(_) => NodeKind::Text,
            VNode::Comment(_) => NodeKind::Comment,
            VNode::Element(el) => NodeKind::Element(el.tag.clone()),
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Text carried by a childless leaf. Elements carry none.
    pub fn leaf_text(&self) -> Option<&str> {
        match self {
            VNode::Text(text) | VNode::Comment(text) => Some(text),
            VNode::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VNode::Element(el) => Some(el),
            _ => None,
        }
    }
}

impl From<VElement> for VNode {
    fn from(el: VElement) -> Self {
        VNode::Element(el)
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::Text(text.to_string())
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::Text(text)
    }
}

/// Serialize style properties as `prop: value; prop: value`.
pub fn style_text(style: &IndexMap<String, String>) -> Option<String> {
    if style.is_empty() {
        return None;
    }
    Some(
        style
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Parse `prop: value; prop: value` style text.
///
/// A `;` inside parentheses or quotes (`url(data:image/png;base64,..)`)
/// does not end a declaration.
pub fn parse_style(text: &str) -> IndexMap<String, String> {
    split_declarations(text)
        .into_iter()
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim();
            let value = value.trim();
            (!prop.is_empty()).then(|| (prop.to_string(), value.to_string()))
        })
        .collect()
}

fn split_declarations(text: &str) -> Vec<&str> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                declarations.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&text[start..]);
    declarations
}
