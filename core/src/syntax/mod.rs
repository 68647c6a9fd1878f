//! Source language front end
//!
//! - `ast`: syntax node types
//! - `walk`: child order and subtree sizes shared by every consumer of position indices
//! - `parser`: PEST grammar and AST builder
//! - `printer`: source printer

pub mod ast;
pub mod parser;
pub mod printer;
pub mod walk;

#[cfg(test)]
mod tests;

pub use ast::{Expr, Function, Program, Stmt};
pub use parser::{parse_expression, parse_function, parse_program, ParseError, ParseResult};
pub use printer::{print_expression, print_program};
pub use walk::NodeRef;
