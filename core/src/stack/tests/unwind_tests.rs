use crate::registry::AstRegistry;
use crate::runtime::scope::{new_cache, new_record, Link};
use crate::runtime::Value;
use crate::stack::{FrameInfo, Unwind};
use crate::syntax::parse_program;

fn info(last: usize, registry: &crate::registry::RegistryHandle, index: usize) -> FrameInfo {
    FrameInfo {
        this: Value::Undefined,
        args: vec![],
        chain: Link::function(new_record(), new_cache(), None),
        last,
        namespace: "test".to_string(),
        index,
        registry: registry.clone(),
    }
}

#[test]
fn test_recreate_frames_is_idempotent() {
    let registry = AstRegistry::handle();
    let mut unwind = Unwind::pause(3);
    unwind.store_frame_info(info(3, &registry, 0));
    unwind.store_frame_info(info(7, &registry, 0));
    assert_eq!(unwind.pending_frame_info(), 2);

    unwind.recreate_frames();
    assert_eq!(unwind.pending_frame_info(), 0);
    let top = unwind.top().unwrap();
    let last = unwind.last().unwrap();
    assert_ne!(top, last);

    unwind.recreate_frames();
    assert_eq!(unwind.top(), Some(top));
    assert_eq!(unwind.last(), Some(last));
    assert_eq!(unwind.frame(top).unwrap().parent, Some(last));
}

#[test]
fn test_innermost_pc_comes_from_the_signal() {
    let registry = AstRegistry::handle();
    let mut unwind = Unwind::pause(5);
    unwind.store_frame_info(info(2, &registry, 0));
    unwind.recreate_frames();
    let top = unwind.top().unwrap();
    assert_eq!(unwind.frame(top).unwrap().pc, Some(5));

    let mut error = Unwind::error(Value::str("e"));
    error.store_frame_info(info(2, &registry, 0));
    error.recreate_frames();
    let top = error.top().unwrap();
    assert_eq!(error.frame(top).unwrap().pc, Some(2));
}

#[test]
fn test_outer_pc_skips_finished_operation() {
    // 0 function, 1 expression statement, 2 call, 3 callee, 4 statement after
    let program = parse_program("f(); g();").unwrap();
    let root = crate::syntax::ast::Function {
        name: None,
        params: vec![],
        body: program.body,
    };
    let registry = AstRegistry::handle();
    registry.borrow_mut().assign(&root, "test", true);

    let mut unwind = Unwind::pause(9);
    unwind.store_frame_info(info(9, &registry, 0));
    let outer = info(2, &registry, 0);
    outer.chain.cache.borrow_mut().insert(2, Value::Num(1.0));
    unwind.store_frame_info(outer);
    unwind.recreate_frames();

    let last = unwind.last().unwrap();
    let frame = unwind.frame(last).unwrap();
    assert_eq!(frame.pc, Some(4));
    assert!(frame.is_resumable());
}

#[test]
fn test_frame_without_registered_function_is_not_resumable() {
    let registry = AstRegistry::handle();
    let mut unwind = Unwind::pause(1);
    unwind.store_frame_info(info(1, &registry, 0));
    unwind.recreate_frames();
    let frame = unwind.frame(unwind.top().unwrap()).unwrap();
    assert!(frame.origin.is_none());
    assert!(!frame.is_resumable());
    assert!(frame.describe().starts_with("<unknown>"));
}

#[test]
fn test_shift_and_unshift_frames() {
    let registry = AstRegistry::handle();
    let mut unwind = Unwind::pause(1);
    unwind.store_frame_info(info(1, &registry, 0));

    let mut source = Unwind::pause(2);
    source.store_frame_info(info(2, &registry, 0));
    source.recreate_frames();
    let extra = source.frame(source.top().unwrap()).unwrap().clone();

    let shifted = unwind.shift_frame(extra);
    assert_eq!(unwind.last(), Some(shifted));
    let top = unwind.top().unwrap();
    assert_eq!(unwind.frame(top).unwrap().parent, Some(shifted));

    assert_eq!(unwind.unshift_frame(), Some(shifted));
    assert_eq!(unwind.last(), Some(top));
    assert_eq!(unwind.frame(top).unwrap().parent, None);

    assert_eq!(unwind.unshift_frame(), Some(top));
    assert_eq!(unwind.top(), None);
    assert_eq!(unwind.unshift_frame(), None);
}
