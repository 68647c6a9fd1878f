//! Tests for the AST registry

mod declaration_tests;
mod index_tests;
