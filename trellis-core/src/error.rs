//! Crate-level error type.

use thiserror::Error;

use crate::reactive::StoreError;
use crate::template::{EvalError, ExprError, TemplateError};

/// Any error raised by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid JSON data: {0}")]
    Json(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
