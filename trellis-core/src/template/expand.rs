//! Directive Expansion
//!
//! A [`Template`] is compiled once from markup: the tree is parsed, every
//! directive attribute is classified and its expression parsed. Expansion
//! then walks the compiled tree depth-first with an immutable [`Scope`],
//! producing a fresh [`VNode`] list:
//!
//! - An element carrying a loop directive evaluates its collection once in
//!   the enclosing scope and is replaced by one clone per item, each
//!   expanded in a child scope binding the loop variables. Loops nested in
//!   the clone are resolved by the same recursion, one level at a time.
//!   Siblings keep the enclosing scope.
//! - Every other element is finished in place: class map, style map,
//!   attribute bindings and event bindings are evaluated, `{{ }}` markers in
//!   text are replaced, and children are expanded with the same scope.
//!
//! An expression that fails to parse or refers to a name neither in scope
//! nor in the ambient whitelist is left in place as literal text.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use super::eval::Evaluator;
use super::expr::Expr;
use super::markup::{self, MarkupElement, MarkupNode, TemplateError};
use super::scope::{Ambient, Scope};
use super::value;
use crate::reactive::Snapshot;
use crate::vdom::{parse_style, EventHandler, VElement, VNode};

/// Directive and interpolation spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSyntax {
    /// Prefix marking directive attributes (`dr:for`, `dr:class`, ...).
    pub prefix: String,
    /// Opening interpolation delimiter.
    pub open: String,
    /// Closing interpolation delimiter.
    pub close: String,
}

impl Default for TemplateSyntax {
    fn default() -> Self {
        Self {
            prefix: "dr:".to_string(),
            open: "{{".to_string(),
            close: "}}".to_string(),
        }
    }
}

/// An expression attached to a directive, with its source kept for the
/// literal fallback.
#[derive(Debug, Clone)]
struct Directive {
    source: String,
    expr: Option<Arc<Expr>>,
}

impl Directive {
    fn compile(source: &str) -> Self {
        let source = source.trim();
        let expr = match Expr::parse(source) {
            Ok(expr) => Some(Arc::new(expr)),
            Err(err) => {
                tracing::warn!(expression = source, error = %err, "unparsable template expression");
                None
            }
        };
        Self {
            source: source.to_string(),
            expr,
        }
    }
}

#[derive(Debug, Clone)]
struct Repeat {
    item: String,
    index: Option<String>,
    collection: Directive,
}

#[derive(Debug, Clone)]
struct EventBinding {
    event: String,
    /// The attribute as written, restored verbatim when the binding fails.
    attr: String,
    directive: Directive,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Interpolation { marker: String, directive: Directive },
}

#[derive(Debug, Clone)]
struct CompiledElement {
    tag: String,
    attrs: Vec<(String, String)>,
    repeat: Option<Repeat>,
    class_map: Option<(String, Directive)>,
    style_map: Option<(String, Directive)>,
    bindings: Vec<(String, String, Directive)>,
    events: Vec<EventBinding>,
    children: Vec<Compiled>,
}

#[derive(Debug, Clone)]
enum Compiled {
    Element(CompiledElement),
    Text(Vec<Segment>),
    Comment(String),
}

/// A compiled textual template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Compiled>,
    ambient: Arc<Ambient>,
    syntax: TemplateSyntax,
}

impl Template {
    /// Compile `source` with the default directive syntax.
    pub fn compile(source: &str, ambient: Ambient) -> Result<Self, TemplateError> {
        Self::compile_with(source, ambient, TemplateSyntax::default())
    }

    /// Compile `source` with a custom directive syntax.
    pub fn compile_with(
        source: &str,
        ambient: Ambient,
        syntax: TemplateSyntax,
    ) -> Result<Self, TemplateError> {
        let parsed = markup::parse(source, (&syntax.open, &syntax.close))?;
        let nodes = parsed
            .iter()
            .map(|node| compile_node(node, &syntax))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            nodes,
            ambient: Arc::new(ambient),
            syntax,
        })
    }

    pub fn syntax(&self) -> &TemplateSyntax {
        &self.syntax
    }

    pub fn ambient(&self) -> &Ambient {
        &self.ambient
    }

    /// Expand against a store snapshot: every store entry is bound in the
    /// root scope.
    pub fn render(&self, snapshot: &Snapshot) -> Vec<VNode> {
        let scope = Scope::root(snapshot.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.expand(&scope)
    }

    /// Expand against an explicit scope.
    pub fn expand(&self, scope: &Scope) -> Vec<VNode> {
        let expander = Expander {
            ambient: &self.ambient,
        };
        let mut out = Vec::new();
        expander.nodes(&self.nodes, scope, &mut out);
        out
    }
}

fn compile_node(node: &MarkupNode, syntax: &TemplateSyntax) -> Result<Compiled, TemplateError> {
    Ok(match node {
        MarkupNode::Element(el) => Compiled::Element(compile_element(el, syntax)?),
        MarkupNode::Text(text) => Compiled::Text(compile_text(&normalize_text(text), syntax)),
        MarkupNode::Comment(text) => Compiled::Comment(text.clone()),
    })
}

fn compile_element(el: &MarkupElement, syntax: &TemplateSyntax) -> Result<CompiledElement, TemplateError> {
    let mut compiled = CompiledElement {
        tag: el.tag.clone(),
        attrs: Vec::new(),
        repeat: None,
        class_map: None,
        style_map: None,
        bindings: Vec::new(),
        events: Vec::new(),
        children: Vec::new(),
    };

    for (name, source) in &el.attrs {
        let directive = if syntax.prefix.is_empty() {
            None
        } else {
            name.strip_prefix(syntax.prefix.as_str())
        };
        match directive {
            Some("for") => compiled.repeat = Some(parse_loop(source)?),
            Some("key") => {}
            Some("class") => compiled.class_map = Some((name.clone(), Directive::compile(source))),
            Some("style") => compiled.style_map = Some((name.clone(), Directive::compile(source))),
            Some(other) => match event_name(other) {
                Some(event) => compiled.events.push(EventBinding {
                    event,
                    attr: name.clone(),
                    directive: Directive::compile(source),
                }),
                None => compiled.bindings.push((
                    other.to_string(),
                    name.clone(),
                    Directive::compile(source),
                )),
            },
            None => match event_name(name).filter(|event| DOM_EVENTS.contains(&event.as_str())) {
                Some(event) => compiled.events.push(EventBinding {
                    event,
                    attr: name.clone(),
                    directive: Directive::compile(source),
                }),
                None => compiled.attrs.push((name.clone(), source.clone())),
            },
        }
    }

    compiled.children = el
        .children
        .iter()
        .map(|child| compile_node(child, syntax))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(compiled)
}

/// Event names an unprefixed `on<event>` attribute may bind. Anything else
/// starting with `on` (`one`, `only`) stays a plain attribute.
const DOM_EVENTS: &[&str] = &[
    "abort", "blur", "change", "click", "contextmenu", "dblclick", "drag", "dragend",
    "dragenter", "dragleave", "dragover", "dragstart", "drop", "error", "focus", "focusin",
    "focusout", "input", "keydown", "keypress", "keyup", "load", "mousedown", "mouseenter",
    "mouseleave", "mousemove", "mouseout", "mouseover", "mouseup", "pointerdown",
    "pointermove", "pointerup", "reset", "resize", "scroll", "select", "submit",
    "touchend", "touchmove", "touchstart", "wheel",
];

/// The lowercased event of an `on<event>` name. Safe on non-ASCII names.
fn event_name(name: &str) -> Option<String> {
    let event = name.get(2..).filter(|rest| !rest.is_empty())?;
    name.get(..2)?
        .eq_ignore_ascii_case("on")
        .then(|| event.to_ascii_lowercase())
}

/// Parse `(item, index) in collection`. Parentheses and the index are
/// optional.
fn parse_loop(source: &str) -> Result<Repeat, TemplateError> {
    let invalid = || TemplateError::InvalidLoop {
        directive: source.to_string(),
    };
    let (vars, collection) = split_in(source).ok_or_else(invalid)?;

    let vars = vars.trim();
    let vars = vars
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(vars);
    let mut names = vars.split(',').map(str::trim);

    let item = names.next().filter(|n| is_identifier(n)).ok_or_else(invalid)?;
    let index = match names.next() {
        Some(n) if is_identifier(n) => Some(n.to_string()),
        Some(_) => return Err(invalid()),
        None => None,
    };
    if names.next().is_some() || collection.trim().is_empty() {
        return Err(invalid());
    }

    Ok(Repeat {
        item: item.to_string(),
        index,
        collection: Directive::compile(collection),
    })
}

/// Split at the first ` in ` keyword surrounded by whitespace or a closing
/// parenthesis.
fn split_in(source: &str) -> Option<(&str, &str)> {
    source.match_indices("in").find_map(|(i, _)| {
        let before = source[..i].chars().next_back()?;
        let after = source[i + 2..].chars().next()?;
        ((before.is_whitespace() || before == ')') && after.is_whitespace())
            .then(|| (&source[..i], &source[i + 2..]))
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Text spanning several source lines is joined into one line; single-line
/// text is kept verbatim.
fn normalize_text(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn compile_text(text: &str, syntax: &TemplateSyntax) -> Vec<Segment> {
    let (open, close) = (syntax.open.as_str(), syntax.close.as_str());
    let mut segments = Vec::new();
    let mut rest = text;

    while !open.is_empty() {
        let Some(start) = rest.find(open) else { break };
        let after_open = &rest[start + open.len()..];
        let Some(end) = after_open.find(close) else { break };

        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let marker_len = open.len() + end + close.len();
        segments.push(Segment::Interpolation {
            marker: rest[start..start + marker_len].to_string(),
            directive: Directive::compile(&after_open[..end]),
        });
        rest = &rest[start + marker_len..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    segments
}

/// Converts `backgroundColor` to `background-color`.
fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

struct Expander<'t> {
    ambient: &'t Arc<Ambient>,
}

impl Expander<'_> {
    fn nodes(&self, nodes: &[Compiled], scope: &Scope, out: &mut Vec<VNode>) {
        for node in nodes {
            match node {
                Compiled::Text(segments) => out.push(VNode::Text(self.interpolate(segments, scope))),
                Compiled::Comment(text) => out.push(VNode::Comment(text.clone())),
                Compiled::Element(el) => match &el.repeat {
                    Some(repeat) => self.repeat(el, repeat, scope, out),
                    None => out.push(self.element(el, scope).into()),
                },
            }
        }
    }

    fn repeat(&self, el: &CompiledElement, repeat: &Repeat, scope: &Scope, out: &mut Vec<VNode>) {
        let items: Vec<(Value, Value)> = match self.evaluate(&repeat.collection, scope) {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (item, Value::from(i)))
                .collect(),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(key, item)| (item, Value::String(key)))
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                tracing::warn!(
                    expression = %repeat.collection.source,
                    value = %other,
                    "loop collection is not iterable"
                );
                Vec::new()
            }
        };

        tracing::trace!(tag = %el.tag, count = items.len(), "expanding loop");
        for (item, index) in items {
            let mut bindings: SmallVec<[(String, Value); 2]> = SmallVec::new();
            bindings.push((repeat.item.clone(), item));
            if let Some(name) = &repeat.index {
                bindings.push((name.clone(), index));
            }
            let child = scope.child(bindings);
            out.push(self.element(el, &child).into());
        }
    }

    fn element(&self, compiled: &CompiledElement, scope: &Scope) -> VElement {
        let mut el = VElement::new(compiled.tag.clone());
        for (name, value) in &compiled.attrs {
            el = el.attr(name.clone(), value.clone());
        }

        for (target, attr, directive) in &compiled.bindings {
            match self.evaluate(directive, scope) {
                Some(v) => el = el.attr(target.clone(), value::to_display(&v)),
                None => {
                    el.attrs.insert(attr.clone(), directive.source.clone());
                }
            }
        }

        if let Some((attr, directive)) = &compiled.class_map {
            match self.evaluate(directive, scope) {
                Some(Value::Object(map)) => {
                    for (name, enabled) in map {
                        if value::truthy(&enabled) {
                            el = el.class(name);
                        }
                    }
                }
                Some(Value::Array(names)) => {
                    for name in names.iter().filter(|n| value::truthy(n)) {
                        el = el.class(value::to_display(name));
                    }
                }
                Some(other) => el = el.class(value::to_display(&other)),
                None => {
                    el.attrs.insert(attr.clone(), directive.source.clone());
                }
            }
        }

        if let Some((attr, directive)) = &compiled.style_map {
            match self.evaluate(directive, scope) {
                Some(Value::Object(map)) => {
                    for (property, v) in map {
                        if !v.is_null() {
                            el.style.insert(kebab_case(&property), value::to_display(&v));
                        }
                    }
                }
                Some(Value::String(text)) => el.style.extend(parse_style(&text)),
                Some(_) => {}
                None => {
                    el.attrs.insert(attr.clone(), directive.source.clone());
                }
            }
        }

        for binding in &compiled.events {
            match self.bind_event(&binding.directive, scope) {
                Some(handler) => {
                    el.events.insert(binding.event.clone(), handler);
                }
                None => {
                    el.attrs
                        .insert(binding.attr.clone(), binding.directive.source.clone());
                }
            }
        }

        self.nodes(&compiled.children, scope, &mut el.children);
        el
    }

    fn interpolate(&self, segments: &[Segment], scope: &Scope) -> String {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Interpolation { marker, directive } => {
                    match self.evaluate(directive, scope) {
                        Some(v) => out.push_str(&value::to_display(&v)),
                        None => out.push_str(marker),
                    }
                }
            }
        }
        out
    }

    fn evaluate(&self, directive: &Directive, scope: &Scope) -> Option<Value> {
        let expr = directive.expr.as_ref()?;
        match Evaluator::new(scope, self.ambient).eval(expr) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(
                    expression = %directive.source,
                    error = %err,
                    "leaving template expression unresolved"
                );
                None
            }
        }
    }

    /// Compile an event binding into a handler closed over `scope`.
    ///
    /// Every free identifier must resolve now; the handler itself runs
    /// later, when the host dispatches the event.
    fn bind_event(&self, directive: &Directive, scope: &Scope) -> Option<EventHandler> {
        let expr = Arc::clone(directive.expr.as_ref()?);
        if let Err(err) = Evaluator::new(scope, self.ambient).check_resolved(&expr) {
            tracing::warn!(
                expression = %directive.source,
                error = %err,
                "leaving event binding unresolved"
            );
            return None;
        }

        let scope = scope.clone();
        let ambient = Arc::clone(self.ambient);
        let source = directive.source.clone();
        Some(EventHandler::new(move |payload| {
            let evaluator = Evaluator::new(&scope, &ambient);
            let result = match &*expr {
                Expr::Lambda { params, body } => {
                    evaluator.apply(params, body, vec![payload.clone()])
                }
                Expr::Ident(name) if scope.lookup(name).is_none() => match ambient.helper(name) {
                    Some(helper) => Ok(helper(std::slice::from_ref(payload))),
                    None => evaluator.eval(&expr),
                },
                other => evaluator.eval(other),
            };
            if let Err(err) = result {
                tracing::warn!(expression = %source, error = %err, "event handler failed");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::to_html;
    use parking_lot::Mutex;
    use serde_json::json;

    fn render(source: &str, scope: &Scope) -> String {
        let template = Template::compile(source, Ambient::standard()).unwrap();
        to_html(&template.expand(scope))
    }

    #[test]
    fn loop_binds_item_and_index_in_order() {
        let html = render(
            r#"<ul><li dr:for="(i, idx) in [10, 20, 30]">{{ idx }}:{{ i }}</li></ul>"#,
            &Scope::empty(),
        );
        assert_eq!(html, "<ul><li>0:10</li><li>1:20</li><li>2:30</li></ul>");
    }

    #[test]
    fn empty_or_missing_collection_removes_element() {
        let scope = Scope::root([("items", json!([]))]);
        let source = r#"<ul><li dr:for="x in items">{{ x }}</li><li>tail</li></ul>"#;
        assert_eq!(render(source, &scope), "<ul><li>tail</li></ul>");

        let source = r#"<ul><li dr:for="x in nothing">{{ x }}</li></ul>"#;
        assert_eq!(render(source, &Scope::empty()), "<ul></ul>");
    }

    #[test]
    fn nested_loops_see_outer_variables() {
        let scope = Scope::root([
            ("selectedArr", json!([1, 2])),
            ("optionArr", json!({"1": ["op1", "op2"], "2": ["op3"]})),
        ]);
        let html = render(
            r#"<div dr:for="(selected, index1) in selectedArr" dr:key="index1">
                 <span dr:for="(op, index2) in optionArr[selected]">{{ selected }}-{{ op }}-{{ index2 }}</span>
               </div>"#,
            &scope,
        );
        assert_eq!(
            html,
            "<div><span>1-op1-0</span><span>1-op2-1</span></div><div><span>2-op3-0</span></div>"
        );
    }

    #[test]
    fn siblings_keep_the_enclosing_scope() {
        let scope = Scope::root([("x", json!("outer")), ("items", json!(["a"]))]);
        let html = render(
            r#"<p dr:for="x in items">{{ x }}</p><p>{{ x }}</p>"#,
            &scope,
        );
        assert_eq!(html, "<p>a</p><p>outer</p>");
    }

    #[test]
    fn object_collections_bind_keys() {
        let scope = Scope::root([("prices", json!({"tea": 2, "cake": 5}))]);
        let html = render(r#"<i dr:for="(price, name) in prices">{{ name }}={{ price }}</i>"#, &scope);
        assert_eq!(html, "<i>tea=2</i><i>cake=5</i>");
    }

    #[test]
    fn class_map_joins_truthy_keys_after_static_class() {
        let scope = Scope::root([("op", json!("op1")), ("n", json!(0))]);
        let html = render(
            r#"<div class="right-badge" dr:class="{ 'test-class': op === 'op1', zero: n, on: true }"></div>"#,
            &scope,
        );
        assert_eq!(html, r#"<div class="right-badge test-class on"></div>"#);
    }

    #[test]
    fn style_map_sets_each_property() {
        let html = render(
            r#"<b dr:for="(v, index2) in [1, 2]" style="margin: 0" dr:style="{ backgroundColor: index2 % 2 === 0 ? 'lightgray' : 'lightsteelblue', width: v * 10 + 'px', hidden: null }"></b>"#,
            &Scope::empty(),
        );
        assert_eq!(
            html,
            concat!(
                r#"<b style="margin: 0; background-color: lightgray; width: 10px"></b>"#,
                r#"<b style="margin: 0; background-color: lightsteelblue; width: 20px"></b>"#
            )
        );
    }

    #[test]
    fn attribute_bindings_evaluate() {
        let scope = Scope::root([("id", json!(7))]);
        let html = render(r#"<a dr:href="'/item/' + id">x</a>"#, &scope);
        assert_eq!(html, r#"<a href="/item/7">x</a>"#);
    }

    #[test]
    fn interpolation_keeps_surrounding_text() {
        let scope = Scope::root([("name", json!("Ada")), ("items", json!([1, 2, 3]))]);
        let html = render(
            "<p>Hello, {{ name }}! You have {{ len(items) }} items.</p>",
            &scope,
        );
        assert_eq!(html, "<p>Hello, Ada! You have 3 items.</p>");
    }

    #[test]
    fn multi_line_text_is_joined() {
        let html = render("<p>\n    first\n    {{ 1 + 1 }}\n</p>", &Scope::empty());
        assert_eq!(html, "<p>first 2</p>");
    }

    #[test]
    fn unresolved_interpolation_keeps_marker() {
        let html = render("<p>a {{ helperOutside(x) }} b</p>", &Scope::empty());
        assert_eq!(html, "<p>a {{ helperOutside(x) }} b</p>");
    }

    #[test]
    fn unresolved_event_binding_stays_literal_and_does_not_raise() {
        let template = Template::compile(
            r#"<button dr:onclick="() => { alert(selected) }">go</button>"#,
            Ambient::standard(),
        )
        .unwrap();
        let nodes = template.expand(&Scope::root([("selected", json!(1))]));
        let button = nodes[0].as_element().unwrap();

        assert!(button.events.is_empty());
        assert_eq!(
            button.attrs.get("dr:onclick").map(String::as_str),
            Some("() => { alert(selected) }")
        );
    }

    #[test]
    fn unresolved_class_map_stays_literal() {
        let html = render(r#"<p dr:class="{ a: missing }"></p>"#, &Scope::empty());
        assert_eq!(html, r#"<p dr:class="{ a: missing }"></p>"#);
    }

    #[test]
    fn event_bindings_close_over_loop_scope() {
        let picked = Arc::new(Mutex::new(Vec::new()));
        let sink = picked.clone();
        let ambient = Ambient::standard().with_helper("pick", move |args| {
            sink.lock().push(args.to_vec());
            Value::Null
        });
        let template = Template::compile(
            r#"<i dr:for="(op, n) in ['a', 'b']" dr:onclick="(e) => pick(op, n, e)"></i><u onClick="pick"></u>"#,
            ambient,
        )
        .unwrap();
        let nodes = template.expand(&Scope::empty());

        nodes[1].as_element().unwrap().events["click"].call(&json!("evt"));
        nodes[2].as_element().unwrap().events["click"].call(&json!("raw"));

        assert_eq!(
            *picked.lock(),
            vec![vec![json!("b"), json!(1), json!("evt")], vec![json!("raw")]]
        );
    }

    #[test]
    fn non_ascii_attribute_names_compile() {
        let template = Template::compile(
            r#"<p ✓="x" o€="y" dr:€x="1 + 1">hi</p>"#,
            Ambient::standard(),
        )
        .unwrap();
        let nodes = template.expand(&Scope::empty());
        let p = nodes[0].as_element().unwrap();

        assert!(p.events.is_empty());
        assert_eq!(p.attrs.get("✓").map(String::as_str), Some("x"));
        assert_eq!(p.attrs.get("o€").map(String::as_str), Some("y"));
        assert_eq!(p.attrs.get("€x").map(String::as_str), Some("2"));
        assert_eq!(event_name("✓"), None);
        assert_eq!(event_name("o€"), None);
    }

    #[test]
    fn plain_on_prefixed_attributes_need_a_known_event() {
        let picked = Arc::new(Mutex::new(0));
        let sink = picked.clone();
        let ambient = Ambient::standard().with_helper("log", move |_| {
            *sink.lock() += 1;
            Value::Null
        });
        let template = Template::compile(
            r#"<p one="1" only onclick="log" dr:oncustom="log">hi</p>"#,
            ambient,
        )
        .unwrap();
        let nodes = template.expand(&Scope::empty());
        let p = nodes[0].as_element().unwrap();

        assert_eq!(p.attrs.get("one").map(String::as_str), Some("1"));
        assert_eq!(p.attrs.get("only").map(String::as_str), Some(""));
        assert_eq!(p.events.keys().collect::<Vec<_>>(), ["click", "custom"]);
        p.events["click"].call(&Value::Null);
        p.events["custom"].call(&Value::Null);
        assert_eq!(*picked.lock(), 2);
    }

    #[test]
    fn renders_from_snapshot() {
        let snapshot = Snapshot::from_value(json!({"title": "Hi"}));
        let template = Template::compile("<h1>{{ title }}</h1>", Ambient::new()).unwrap();
        assert_eq!(to_html(&template.render(&snapshot)), "<h1>Hi</h1>");
    }

    #[test]
    fn custom_syntax() {
        let syntax = TemplateSyntax {
            prefix: "x-".into(),
            open: "[[".into(),
            close: "]]".into(),
        };
        let template = Template::compile_with(
            r#"<p x-for="n in range(2)">[[ n ]]{{ n }}</p>"#,
            Ambient::standard(),
            syntax,
        )
        .unwrap();
        assert_eq!(
            to_html(&template.expand(&Scope::empty())),
            "<p>0{{ n }}</p><p>1{{ n }}</p>"
        );
    }

    #[test]
    fn rejects_malformed_loops() {
        for bad in ["items", "(a, b, c) in items", "(1x) in items", "x in  "] {
            let source = format!(r#"<p dr:for="{bad}"></p>"#);
            assert!(
                matches!(
                    Template::compile(&source, Ambient::new()),
                    Err(TemplateError::InvalidLoop { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn split_in_requires_keyword_boundaries() {
        assert_eq!(split_in("item in items"), Some(("item ", " items")));
        assert_eq!(split_in("(a,b) in list"), Some(("(a,b) ", " list")));
        assert_eq!(split_in("index in inbox"), Some(("index ", " inbox")));
        assert_eq!(split_in("inbox"), None);
    }

    #[test]
    fn kebab_case_conversion() {
        assert_eq!(kebab_case("backgroundColor"), "background-color");
        assert_eq!(kebab_case("margin-top"), "margin-top");
    }
}
