//! Tests for the rewriter
//!
//! Organized by property: structure, recording, scoping

mod helpers;
mod recording_tests;
mod structure_tests;
