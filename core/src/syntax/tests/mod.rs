//! Tests for the source front end

mod parser_tests;
mod printer_tests;
mod walk_tests;
