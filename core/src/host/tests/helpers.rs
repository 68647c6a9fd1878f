//! Test helpers for host engine tests

use crate::interpreter::Mode;
use crate::registry::AstRegistry;
use crate::runtime::{ops, Runtime};
use crate::stack::Outcome;
use crate::syntax::parse_program;

fn render(outcome: Outcome) -> String {
    match outcome {
        Outcome::Completed(value) => ops::inspect(&value),
        Outcome::Failed(failure) => format!("threw {}", ops::to_string(&failure.error)),
        Outcome::Paused(_) => "paused".to_string(),
    }
}

/// Result of the instrumented run
pub fn run_instrumented(source: &str) -> String {
    let program = parse_program(source).expect("Parse program failed");
    let mut rt = Runtime::default();
    let outcome = rt
        .run_program(&program, &AstRegistry::handle())
        .expect("Run program failed");
    render(outcome)
}

/// Result of the uninstrumented reference run
pub fn run_plain(source: &str) -> String {
    let program = parse_program(source).expect("Parse program failed");
    let mut rt = Runtime::default();
    let outcome = rt
        .interpret(&program, &AstRegistry::handle(), Mode::Plain)
        .expect("Interpret program failed");
    render(outcome)
}

/// Run both ways, assert they agree and return the shared result
pub fn run_both(source: &str) -> String {
    let instrumented = run_instrumented(source);
    let plain = run_plain(source);
    assert_eq!(instrumented, plain, "engines disagree on:\n{}", source);
    instrumented
}
