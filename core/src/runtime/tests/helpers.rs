//! Test helpers for runtime tests

use crate::config::Config;
use crate::registry::AstRegistry;
use crate::runtime::{ops, Runtime};
use crate::stack::Outcome;
use crate::syntax::parse_program;

/// Instrument and run a program on a fresh runtime
pub fn run_with(config: Config, source: &str) -> (Runtime, Outcome) {
    let program = parse_program(source).expect("Parse program failed");
    let mut rt = Runtime::new(config);
    let registry = AstRegistry::handle();
    let outcome = rt.run_program(&program, &registry).expect("Run program failed");
    (rt, outcome)
}

/// Program's return value, in inspect form
pub fn eval(source: &str) -> String {
    match run_with(Config::default(), source).1 {
        Outcome::Completed(value) => ops::inspect(&value),
        other => panic!("expected completion, got {:?}", other),
    }
}

/// String form of the error a program throws
pub fn thrown(source: &str) -> String {
    match run_with(Config::default(), source).1 {
        Outcome::Failed(failure) => ops::to_string(&failure.error),
        other => panic!("expected failure, got {:?}", other),
    }
}
