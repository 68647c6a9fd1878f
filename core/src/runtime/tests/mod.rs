//! Tests for the host runtime

mod helpers;
mod object_tests;
mod ops_tests;
