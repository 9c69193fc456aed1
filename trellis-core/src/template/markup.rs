//! Markup Parser
//!
//! Parses the HTML-like template text into a [`MarkupNode`] tree. The
//! parser is deliberately small: it knows elements, attributes, text,
//! comments, self-closing syntax and the HTML void elements. Directive
//! attributes are kept as ordinary attributes here and interpreted by the
//! compiler in `expand`.
//!
//! Two template-specific rules apply:
//!
//! - Text inside an interpolation (between the configured open and close
//!   delimiters) is never scanned for tags, so `{{ a < b }}` is text.
//! - Whitespace-only text between tags is dropped.

use thiserror::Error;

/// Errors raised while parsing or compiling template markup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("unexpected end of template inside <{tag}>")]
    Unclosed { tag: String },

    #[error("closing tag </{found}> at offset {offset} does not match <{expected}>")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("closing tag </{found}> at offset {offset} has no matching open tag")]
    UnexpectedClose { found: String, offset: usize },

    #[error("malformed tag at offset {offset}")]
    MalformedTag { offset: usize },

    #[error("invalid loop directive `{directive}`: expected `(item, index) in collection`")]
    InvalidLoop { directive: String },
}

/// A parsed markup node.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
    Comment(String),
}

/// A parsed element with its attributes in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Parse `source` into a list of top-level nodes.
///
/// `interpolation` is the open/close delimiter pair protected from tag
/// scanning.
pub fn parse(source: &str, interpolation: (&str, &str)) -> Result<Vec<MarkupNode>, TemplateError> {
    let mut parser = MarkupParser {
        src: source,
        pos: 0,
        open: interpolation.0,
        close: interpolation.1,
    };
    let mut stack: Vec<MarkupElement> = Vec::new();
    let mut roots: Vec<MarkupNode> = Vec::new();

    fn push(stack: &mut [MarkupElement], roots: &mut Vec<MarkupNode>, node: MarkupNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    while parser.pos < source.len() {
        let rest = parser.rest();
        if rest.starts_with("<!--") {
            let body_start = parser.pos + 4;
            let end = source[body_start..]
                .find("-->")
                .map(|i| body_start + i)
                .ok_or_else(|| TemplateError::MalformedTag { offset: parser.pos })?;
            push(
                &mut stack,
                &mut roots,
                MarkupNode::Comment(source[body_start..end].to_string()),
            );
            parser.pos = end + 3;
        } else if rest.starts_with("</") {
            let offset = parser.pos;
            let found = parser.close_tag()?;
            let Some(element) = stack.pop() else {
                return Err(TemplateError::UnexpectedClose { found, offset });
            };
            if element.tag != found {
                return Err(TemplateError::MismatchedClose {
                    expected: element.tag,
                    found,
                    offset,
                });
            }
            push(&mut stack, &mut roots, MarkupNode::Element(element));
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (element, self_closing) = parser.open_tag()?;
            if self_closing || VOID_ELEMENTS.contains(&element.tag.as_str()) {
                push(&mut stack, &mut roots, MarkupNode::Element(element));
            } else {
                stack.push(element);
            }
        } else {
            let text = parser.text();
            if !text.trim().is_empty() {
                push(&mut stack, &mut roots, MarkupNode::Text(decode_entities(text)));
            }
        }
    }

    match stack.pop() {
        Some(open) => Err(TemplateError::Unclosed { tag: open.tag }),
        None => Ok(roots),
    }
}

struct MarkupParser<'a> {
    src: &'a str,
    pos: usize,
    open: &'a str,
    close: &'a str,
}

impl<'a> MarkupParser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Consume text up to the next tag, skipping over interpolations.
    fn text(&mut self) -> &'a str {
        let start = self.pos;
        // A stray `<` that does not start a tag is plain text.
        if self.rest().starts_with('<') {
            self.pos += 1;
        }
        loop {
            let rest = self.rest();
            let next_tag = rest.find('<');
            let next_interp = if self.open.is_empty() {
                None
            } else {
                rest.find(self.open)
            };
            match (next_tag, next_interp) {
                (Some(tag), Some(interp)) if interp < tag => {
                    let after_open = self.pos + interp + self.open.len();
                    match self.src[after_open..].find(self.close) {
                        Some(end) => self.pos = after_open + end + self.close.len(),
                        None => {
                            self.pos = self.src.len();
                            break;
                        }
                    }
                }
                (Some(tag), _) => {
                    self.pos += tag;
                    break;
                }
                (None, _) => {
                    self.pos = self.src.len();
                    break;
                }
            }
        }
        &self.src[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '=' | '"' | '\''))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn close_tag(&mut self) -> Result<String, TemplateError> {
        let offset = self.pos;
        self.pos += 2;
        let name = self.name().to_ascii_lowercase();
        self.skip_whitespace();
        if name.is_empty() || !self.rest().starts_with('>') {
            return Err(TemplateError::MalformedTag { offset });
        }
        self.pos += 1;
        Ok(name)
    }

    /// Parse `<tag attr="v" ...>` or `<tag ... />`.
    fn open_tag(&mut self) -> Result<(MarkupElement, bool), TemplateError> {
        let offset = self.pos;
        self.pos += 1;
        let tag = self.name().to_ascii_lowercase();
        let mut attrs = Vec::new();

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok((element(tag, attrs), true));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok((element(tag, attrs), false));
            }
            if rest.is_empty() {
                return Err(TemplateError::MalformedTag { offset });
            }

            let name = self.name();
            if name.is_empty() {
                return Err(TemplateError::MalformedTag { offset: self.pos });
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attr_value(offset)?
            } else {
                String::new()
            };
            attrs.push((name.to_string(), value));
        }
    }

    fn attr_value(&mut self, tag_offset: usize) -> Result<String, TemplateError> {
        let rest = self.rest();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            Some(_) => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                let raw = &rest[..len];
                let raw = raw.strip_suffix('/').filter(|_| rest[len..].starts_with('>')).unwrap_or(raw);
                self.pos += raw.len();
                return Ok(decode_entities(raw));
            }
            None => return Err(TemplateError::MalformedTag { offset: tag_offset }),
        };
        let end = rest[1..]
            .find(quote)
            .ok_or(TemplateError::MalformedTag { offset: tag_offset })?;
        self.pos += end + 2;
        Ok(decode_entities(&rest[1..=end]))
    }
}

fn element(tag: String, attrs: Vec<(String, String)>) -> MarkupElement {
    MarkupElement {
        tag,
        attrs,
        children: Vec::new(),
    }
}

/// Decode the five predefined XML entities.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIMS: (&str, &str) = ("{{", "}}");

    fn el(node: &MarkupNode) -> &MarkupElement {
        match node {
            MarkupNode::Element(e) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let nodes = parse(
            r#"<div class="a" dr:for="(x, i) in items"><span data-x='1' hidden>hi</span></div>"#,
            DELIMS,
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        let div = el(&nodes[0]);
        assert_eq!(div.tag, "div");
        assert_eq!(
            div.attrs,
            vec![
                ("class".to_string(), "a".to_string()),
                ("dr:for".to_string(), "(x, i) in items".to_string()),
            ]
        );
        let span = el(&div.children[0]);
        assert_eq!(span.attrs[1], ("hidden".to_string(), String::new()));
        assert_eq!(span.children, vec![MarkupNode::Text("hi".into())]);
    }

    #[test]
    fn multi_line_attribute_values() {
        let nodes = parse(
            "<div dr:style=\"{\n  color: 'red'\n}\"></div>",
            DELIMS,
        )
        .unwrap();
        assert_eq!(el(&nodes[0]).attrs[0].1, "{\n  color: 'red'\n}");
    }

    #[test]
    fn drops_whitespace_text_and_keeps_comments() {
        let nodes = parse("\n  <p>a</p>\n  <!-- note -->\n", DELIMS).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1], MarkupNode::Comment(" note ".into()));
    }

    #[test]
    fn void_and_self_closing_elements() {
        let nodes = parse("<br><img src=a.png/><input type=text /><p>x</p>", DELIMS).unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(el(&nodes[1]).attrs[0], ("src".into(), "a.png".into()));
        assert_eq!(el(&nodes[2]).attrs[0], ("type".into(), "text".into()));
    }

    #[test]
    fn interpolation_is_not_scanned_for_tags() {
        let nodes = parse("<p>{{ a < b }} and {{ c }}</p>", DELIMS).unwrap();
        assert_eq!(
            el(&nodes[0]).children,
            vec![MarkupNode::Text("{{ a < b }} and {{ c }}".into())]
        );
    }

    #[test]
    fn decodes_entities() {
        let nodes = parse("<p title=\"&quot;x&quot;\">a &amp; b &lt;c&gt;</p>", DELIMS).unwrap();
        let p = el(&nodes[0]);
        assert_eq!(p.attrs[0].1, "\"x\"");
        assert_eq!(p.children, vec![MarkupNode::Text("a & b <c>".into())]);
    }

    #[test]
    fn tag_names_are_lowercased() {
        let nodes = parse("<DIV></div>", DELIMS).unwrap();
        assert_eq!(el(&nodes[0]).tag, "div");
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(
            parse("<div><span></div>", DELIMS),
            Err(TemplateError::MismatchedClose {
                expected: "span".into(),
                found: "div".into(),
                offset: 11,
            })
        );
        assert_eq!(
            parse("<div>", DELIMS),
            Err(TemplateError::Unclosed { tag: "div".into() })
        );
        assert_eq!(
            parse("</p>", DELIMS),
            Err(TemplateError::UnexpectedClose {
                found: "p".into(),
                offset: 0
            })
        );
        assert!(matches!(
            parse("<div class=\"open>", DELIMS),
            Err(TemplateError::MalformedTag { .. })
        ));
    }
}
