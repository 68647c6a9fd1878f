//! Test helpers for continuation tests

use crate::registry::AstRegistry;
use crate::runtime::Runtime;
use crate::stack::{Continuation, Outcome};
use crate::syntax::parse_program;

/// Run `source` instrumented, expecting it to pause
pub fn run_until_pause(source: &str) -> (Runtime, Continuation) {
    let program = parse_program(source).expect("Parse program failed");
    let mut rt = Runtime::default();
    let outcome = rt
        .run_program(&program, &AstRegistry::handle())
        .expect("Run program failed");
    match outcome {
        Outcome::Paused(continuation) => (rt, continuation),
        other => panic!("expected a pause, got {:?}", other),
    }
}
