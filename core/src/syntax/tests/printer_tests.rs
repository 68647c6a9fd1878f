use crate::syntax::{parse_expression, parse_program, print_expression, print_program};

fn reparses_equal(source: &str) {
    let program = parse_program(source).unwrap();
    let printed = print_program(&program.body);
    let reparsed = parse_program(&printed)
        .unwrap_or_else(|e| panic!("printed output failed to parse: {}\n{}", e, printed));
    assert_eq!(program, reparsed, "printed:\n{}", printed);
}

#[test]
fn test_print_statements_reparse() {
    reparses_equal(
        r#"
        var total = 0;
        function add(a, b) { return a + b; }
        for (var i = 0; i < 10; i++) { if (i % 2) continue; total = add(total, i); }
        for (k in { a: 1 }) { total += 1; }
        try { throw new Error("x"); } catch (e) { total = -1; } finally { total *= 2; }
        switch (total) { case 1: break; default: total = 0; }
        with (o) { q = p; }
        do { total--; } while (total > 0);
        debugger;
        "#,
    );
}

#[test]
fn test_print_preserves_grouping() {
    let expr = parse_expression("(a + b) * c").unwrap();
    let printed = print_expression(&expr);
    assert_eq!(parse_expression(&printed).unwrap(), expr);
}

#[test]
fn test_print_function_expressions_and_accessors() {
    reparses_equal(
        r#"
        var f = function self(n) { return n ? self(n - 1) : 0; };
        var o = { get v() { return 1; }, set v(x) { this.w = x; }, "quoted key": [1, 2, 3] };
        x = typeof y === "undefined" ? void 0 : delete o.v;
        "#,
    );
}

#[test]
fn test_print_unbraced_bodies_reparse() {
    reparses_equal(
        r#"
        for (var i = 0; i < 3; i++) if (i == 1) continue; else x = i;
        while (n--) n = n - 1;
        for (k in o) if (k) y = k;
        with (o) q = p;
        do n++; while (n < 3);
        if (a) b = 1; else if (c) b = 2; else b = 3;
        "#,
    );
}

#[test]
fn test_print_keeps_else_on_outer_if() {
    reparses_equal("if (a) { if (b) x = 1; } else y = 2;");
    reparses_equal("if (a) { while (c) if (b) x = 1; } else y = 2;");

    let program = parse_program("if (c) continue;").unwrap();
    assert!(!print_program(&program.body).contains('{'));
}
