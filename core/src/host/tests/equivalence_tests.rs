use super::helpers::run_both;

#[test]
fn test_loops() {
    let source = r#"
        var out = [];
        for (var i = 0; i < 10; i++) {
            if (i % 2) continue;
            if (i > 6) break;
            out.push(i);
        }
        var n = 0;
        while (n < 3) n++;
        do { n += 10; } while (n < 20);
        out.push(n);
        return out;
    "#;
    assert_eq!(run_both(source), "[0, 2, 4, 6, 23]");
}

#[test]
fn test_redeclared_vars_and_functions() {
    assert_eq!(run_both("var a = 1; var a; return a;"), "1");
    assert_eq!(
        run_both("function f() { return 1; } function f() { return 2; } return f();"),
        "2"
    );
    assert_eq!(run_both("function p(x) { var x; return x; } return p(5);"), "5");
}

#[test]
fn test_hoisting() {
    let source = r#"
        var before = typeof later;
        var result = g();
        function g() { return typeof h; }
        var h = 1;
        function later() {}
        return [before, result, h];
    "#;
    assert_eq!(run_both(source), "[\"function\", \"undefined\", 1]");
}

#[test]
fn test_throw_across_functions() {
    let source = r#"
        function thrower(code) { throw { code: code }; }
        function middle() { thrower(7); return 'unreached'; }
        try { middle(); } catch (e) { return e.code; }
    "#;
    assert_eq!(run_both(source), "7");
}

#[test]
fn test_finally_runs_on_every_exit() {
    let source = r#"
        var log = [];
        function f() {
            try { return 'try'; } finally { log.push('fin'); }
        }
        function g() {
            try { throw 'x'; } catch (e) { log.push('caught ' + e); } finally { log.push('fin2'); }
        }
        log.push(f());
        g();
        return log;
    "#;
    assert_eq!(run_both(source), "[\"fin\", \"try\", \"caught x\", \"fin2\"]");
}

#[test]
fn test_uncaught_errors_agree() {
    assert_eq!(run_both("var o = null; return o.x;"), "threw TypeError: Cannot read property 'x' of null");
    assert_eq!(run_both("throw new Error('plain');"), "threw Error: plain");
}

#[test]
fn test_catch_binding_is_scoped() {
    let source = r#"
        var e = 'outer';
        try { throw 'inner'; } catch (e) { var seen = e; }
        return [e, seen];
    "#;
    assert_eq!(run_both(source), "[\"outer\", \"inner\"]");
}

#[test]
fn test_nested_with() {
    let source = r#"
        var o = { a: 1 };
        var p = { b: 2, a: 10 };
        var a = 100, b = 200, c = 300;
        with (o) {
            with (p) {
                return [a, b, c];
            }
        }
    "#;
    assert_eq!(run_both(source), "[10, 2, 300]");
}

#[test]
fn test_with_writes_go_to_the_object() {
    let source = r#"
        var o = { x: 1 };
        var y = 0;
        with (o) { x = 5; y = 6; }
        return [o.x, y, o.y];
    "#;
    assert_eq!(run_both(source), "[5, 6, undefined]");
}

#[test]
fn test_closure_over_with_binding() {
    let source = r#"
        var o = { v: 1 };
        var get;
        with (o) { get = function () { return v; }; }
        o.v = 5;
        return get();
    "#;
    assert_eq!(run_both(source), "5");
}

#[test]
fn test_closures_keep_their_own_state() {
    let source = r#"
        function counter() {
            var n = 0;
            return function () { n += 1; return n; };
        }
        var a = counter(), b = counter();
        a(); a();
        return [a(), b()];
    "#;
    assert_eq!(run_both(source), "[3, 1]");
}

#[test]
fn test_named_function_expression_recursion() {
    let source = r#"
        var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); };
        return [fact(5), typeof f];
    "#;
    assert_eq!(run_both(source), "[120, \"undefined\"]");
}

#[test]
fn test_switch_fallthrough() {
    let source = r#"
        function classify(n) {
            var out = [];
            switch (n) {
                case 1: out.push('one');
                case 2: out.push('two'); break;
                default: out.push('other');
                case 3: out.push('three');
            }
            return out.join(',');
        }
        return [classify(1), classify(2), classify(3), classify(9)];
    "#;
    assert_eq!(run_both(source), "[\"one,two\", \"two\", \"three\", \"other,three\"]");
}

#[test]
fn test_enumeration_order() {
    let source = r#"
        function Thing() { this.z = 1; this.a = 2; }
        Thing.prototype.m = 3;
        var o = new Thing();
        o[1] = 'one';
        var keys = [];
        for (var k in o) keys.push(k);
        var arr = [5, 6];
        arr.extra = true;
        for (var j in arr) keys.push(j);
        return keys;
    "#;
    assert_eq!(
        run_both(source),
        "[\"z\", \"a\", \"1\", \"m\", \"0\", \"1\", \"extra\"]"
    );
}

#[test]
fn test_for_in_with_member_target() {
    let source = r#"
        var holder = {};
        var last = [];
        for (holder.key in { p: 1, q: 2 }) last.push(holder.key);
        return last;
    "#;
    assert_eq!(run_both(source), "[\"p\", \"q\"]");
}

#[test]
fn test_this_and_arguments() {
    let source = r#"
        var o = {
            base: 10,
            add: function () {
                var total = this.base;
                for (var i = 0; i < arguments.length; i++) total += arguments[i];
                return total;
            }
        };
        return o.add(1, 2, 3);
    "#;
    assert_eq!(run_both(source), "16");
}

#[test]
fn test_assignment_operators() {
    let source = r#"
        var o = { n: 1 }, a = [1, 2];
        o.n += 4;
        a[1] *= 10;
        var i = 0;
        var post = i++, pre = ++i;
        o.n--;
        return [o.n, a[1], post, pre, i];
    "#;
    assert_eq!(run_both(source), "[4, 20, 0, 2, 2]");
}
