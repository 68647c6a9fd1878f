//! Tests for the host engine

mod equivalence_tests;
mod helpers;
mod pause_tests;
