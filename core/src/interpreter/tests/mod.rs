//! Tests for the stepping interpreter

mod halt_tests;
mod helpers;
