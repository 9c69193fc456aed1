//! Scope Chain and Ambient Bindings
//!
//! Expressions resolve names against two things only:
//!
//! 1. The [`Scope`] chain: loop variables, event parameters and, at the
//!    root, the store snapshot being rendered. Entering a loop creates a
//!    child scope that shadows its parent; the parent is never mutated.
//! 2. The [`Ambient`] whitelist: constants and helper functions registered
//!    by the embedder when a template is compiled.
//!
//! Nothing else is reachable from an expression.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use smallvec::SmallVec;

use super::value;

/// A single link in the scope chain.
struct Frame {
    bindings: SmallVec<[(String, Value); 2]>,
    parent: Scope,
}

/// An immutable chain of name bindings.
///
/// Cloning is cheap: frames are shared, so event handlers can capture the
/// scope they were created in.
#[derive(Clone, Default)]
pub struct Scope(Option<Arc<Frame>>);

impl Scope {
    /// An empty scope.
    pub fn empty() -> Self {
        Self(None)
    }

    /// A root scope holding `bindings`.
    pub fn root<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::empty().child(bindings)
    }

    /// A new scope whose bindings shadow this one.
    pub fn child<I, K>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self(Some(Arc::new(Frame {
            bindings: bindings.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            parent: self.clone(),
        })))
    }

    /// Resolve a name, innermost binding first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut current = self;
        while let Some(frame) = &current.0 {
            if let Some((_, value)) = frame.bindings.iter().rev().find(|(k, _)| k == name) {
                return Some(value);
            }
            current = &frame.parent;
        }
        None
    }

    /// Number of frames in the chain.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(frame) = &current.0 {
            depth += 1;
            current = &frame.parent;
        }
        depth
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        let mut current = self;
        while let Some(frame) = &current.0 {
            let names: Vec<&str> = frame.bindings.iter().map(|(k, _)| k.as_str()).collect();
            list.entry(&names);
            current = &frame.parent;
        }
        list.finish()
    }
}

/// A helper function callable from expressions.
pub type Helper = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Names available to every expression regardless of scope.
#[derive(Clone, Default)]
pub struct Ambient {
    values: IndexMap<String, Value>,
    helpers: IndexMap<String, Helper>,
}

impl Ambient {
    /// An empty whitelist.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in helpers.
    ///
    /// - `len(x)`: length of an array, string or object
    /// - `upper(s)`, `lower(s)`, `trim(s)`
    /// - `join(array, sep)`: `sep` defaults to `,`
    /// - `string(x)`, `number(x)`: conversions
    /// - `range(n)` / `range(start, end)`: integer arrays for loops
    /// - `keys(object)`
    /// - `log(...)`: emits its arguments at `info` level, returns `null`
    pub fn standard() -> Self {
        Self::new()
            .with_helper("len", |args| {
                let len = match args.first() {
                    Some(Value::Array(items)) => items.len(),
                    Some(Value::String(s)) => s.chars().count(),
                    Some(Value::Object(map)) => map.len(),
                    _ => 0,
                };
                Value::from(len)
            })
            .with_helper("upper", |args| {
                Value::String(arg_text(args, 0).to_uppercase())
            })
            .with_helper("lower", |args| {
                Value::String(arg_text(args, 0).to_lowercase())
            })
            .with_helper("trim", |args| {
                Value::String(arg_text(args, 0).trim().to_string())
            })
            .with_helper("join", |args| {
                let sep = args
                    .get(1)
                    .map(value::to_display)
                    .unwrap_or_else(|| ",".to_string());
                match args.first() {
                    Some(Value::Array(items)) => Value::String(
                        items
                            .iter()
                            .map(value::to_display)
                            .collect::<Vec<_>>()
                            .join(&sep),
                    ),
                    Some(other) => Value::String(value::to_display(other)),
                    None => Value::String(String::new()),
                }
            })
            .with_helper("string", |args| Value::String(arg_text(args, 0)))
            .with_helper("number", |args| {
                args.first()
                    .and_then(value::to_number)
                    .map(value::number)
                    .unwrap_or(Value::Null)
            })
            .with_helper("range", |args| {
                let bound = |i: usize| args.get(i).and_then(value::to_number).map(|n| n as i64);
                let (start, end) = match (bound(0), bound(1)) {
                    (Some(start), Some(end)) => (start, end),
                    (Some(end), None) => (0, end),
                    _ => (0, 0),
                };
                Value::Array((start..end).map(Value::from).collect())
            })
            .with_helper("keys", |args| match args.first() {
                Some(Value::Object(map)) => {
                    Value::Array(map.keys().cloned().map(Value::String).collect())
                }
                _ => Value::Array(Vec::new()),
            })
            .with_helper("log", |args| {
                let parts: Vec<String> = args.iter().map(value::to_display).collect();
                tracing::info!(target: "trellis::template", "{}", parts.join(" "));
                Value::Null
            })
    }

    /// Register a constant.
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Register a helper function.
    pub fn with_helper<F>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));
        self
    }

    /// Look up a constant.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Look up a helper.
    pub fn helper(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    /// Whether `name` is a constant or a helper.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.helpers.contains_key(name)
    }
}

impl fmt::Debug for Ambient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ambient")
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn arg_text(args: &[Value], index: usize) -> String {
    args.get(index).map(value::to_display).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_scope_shadows_without_mutating_parent() {
        let root = Scope::root([("item", json!("outer")), ("keep", json!(1))]);
        let child = root.child([("item", json!("inner"))]);

        assert_eq!(child.lookup("item"), Some(&json!("inner")));
        assert_eq!(child.lookup("keep"), Some(&json!(1)));
        assert_eq!(root.lookup("item"), Some(&json!("outer")));
        assert_eq!(child.depth(), 2);
        assert_eq!(root.lookup("missing"), None);
    }

    #[test]
    fn standard_helpers() {
        let ambient = Ambient::standard();
        let call = |name: &str, args: &[Value]| (ambient.helper(name).unwrap())(args);

        assert_eq!(call("len", &[json!([1, 2, 3])]), json!(3));
        assert_eq!(call("upper", &[json!("ab")]), json!("AB"));
        assert_eq!(call("join", &[json!(["a", "b"]), json!(" | ")]), json!("a | b"));
        assert_eq!(call("range", &[json!(3)]), json!([0, 1, 2]));
        assert_eq!(call("range", &[json!(2), json!(4)]), json!([2, 3]));
        assert_eq!(call("number", &[json!("4.5")]), json!(4.5));
        assert_eq!(call("keys", &[json!({"a": 1, "b": 2})]), json!(["a", "b"]));
    }

    #[test]
    fn ambient_registration() {
        let ambient = Ambient::new()
            .with_value("title", json!("Hello"))
            .with_helper("twice", |args| {
                value::number(args.first().and_then(value::to_number).unwrap_or(0.0) * 2.0)
            });

        assert!(ambient.contains("title"));
        assert!(ambient.contains("twice"));
        assert!(!ambient.contains("other"));
        assert_eq!((ambient.helper("twice").unwrap())(&[json!(4)]), json!(8));
    }
}
