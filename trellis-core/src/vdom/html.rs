//! HTML serialization of virtual nodes.

use std::fmt::Write;

use super::node::{VElement, VNode};

/// Serialize a node list to HTML.
///
/// Attributes are written in order: plain attributes, `class`, `style`.
/// Event handlers have no textual form and are omitted.
pub fn to_html(nodes: &[VNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &VNode) {
    match node {
        VNode::Text(text) => out.push_str(&escape_text(text)),
        VNode::Comment(text) => {
            let _ = write!(out, "<!--{text}-->");
        }
        VNode::Element(el) => write_element(out, el),
    }
}

fn write_element(out: &mut String, el: &VElement) {
    let mut attrs: Vec<(&str, String)> = el
        .attrs
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    if let Some(class) = &el.class {
        attrs.push(("class", class.clone()));
    }
    if let Some(style) = el.style_text() {
        attrs.push(("style", style));
    }
    let children = el.children.iter().fold(String::new(), |mut acc, child| {
        write_node(&mut acc, child);
        acc
    });
    write_tag(out, &el.tag, attrs.iter().map(|(k, v)| (*k, v.as_str())), &children);
}

/// Write `<tag attrs>children</tag>`.
pub(crate) fn write_tag<'a>(
    out: &mut String,
    tag: &str,
    attrs: impl Iterator<Item = (&'a str, &'a str)>,
    children: &str,
) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
    }
    out.push('>');
    out.push_str(children);
    let _ = write!(out, "</{tag}>");
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
