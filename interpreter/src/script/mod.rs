//! The small statement language code fragments are written in.

pub mod ast;
pub mod error;
mod lexer;
mod parser;

pub use ast::{Expr, Position, Statement};
pub use error::{FragmentError, ScriptError};
pub use parser::parse_fragment;
