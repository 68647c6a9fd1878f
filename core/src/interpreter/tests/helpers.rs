//! Test helpers for interpreter tests

use crate::interpreter::{HaltHook, Mode};
use crate::registry::AstRegistry;
use crate::runtime::Runtime;
use crate::stack::Outcome;
use crate::syntax::parse_program;

/// Namespace `Runtime::default()` registers programs in
pub const NS: &str = "default";

/// Interpret `source` in recording mode with `hook` installed
pub fn interpret_with(hook: Option<Box<dyn HaltHook>>, source: &str, mode: Mode) -> (Runtime, Outcome) {
    let program = parse_program(source).expect("Parse program failed");
    let mut rt = Runtime::default();
    rt.set_halt_hook(hook);
    let outcome = rt
        .interpret(&program, &AstRegistry::handle(), mode)
        .expect("Interpret program failed");
    (rt, outcome)
}
