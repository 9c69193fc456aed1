//! Textual Templates
//!
//! Templates are markup with directive attributes and `{{ }}` interpolation,
//! compiled once and expanded against the store on every render.
//!
//! # Directives
//!
//! | Attribute                  | Effect                                          |
//! |----------------------------|-------------------------------------------------|
//! | `dr:for="(item, i) in xs"` | one clone of the element per item               |
//! | `dr:key="..."`             | accepted and discarded                          |
//! | `dr:class="{ a: cond }"`   | appends every key whose value is truthy         |
//! | `dr:style="{ prop: v }"`   | sets each style property (camelCase allowed)    |
//! | `dr:onclick="(e) => ..."`  | event binding; plain `onclick` works as well    |
//! | `dr:<attr>="expr"`         | attribute set to the displayed value of `expr`  |
//!
//! # Expressions
//!
//! Expressions are a small JavaScript-like language: literals, arrays,
//! objects, member and index access, arithmetic, comparison, logical and
//! conditional operators, arrow lambdas and calls to helpers registered on
//! the [`Ambient`] whitelist. Nothing else is reachable from a template.
//!
//! An expression referring to a name that resolves neither in scope nor in
//! the whitelist does not fail the render: the directive is left in place as
//! literal text and a warning is logged.

mod eval;
mod expand;
mod expr;
mod lexer;
mod markup;
mod scope;
pub mod value;

pub use eval::{EvalError, Evaluator};
pub use expand::{Template, TemplateSyntax};
pub use expr::{BinaryOp, Expr, ExprError, UnaryOp};
pub use markup::{decode_entities, parse as parse_markup, MarkupElement, MarkupNode, TemplateError};
pub use scope::{Ambient, Helper, Scope};
