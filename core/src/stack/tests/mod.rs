//! Tests for stack reification and continuations

mod continuation_tests;
mod helpers;
mod unwind_tests;
