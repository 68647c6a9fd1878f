//! Debug-aware array methods, written in the scripting language.
//!
//! These are instrumented like any other code, so a pause inside a callback
//! leaves a resumable frame for the method itself and the remaining
//! iterations run after resume.

pub const SOURCE: &str = r#"
function forEach(callback, thisArg) {
    if (typeof callback != "function") throw new TypeError(callback + " is not a function");
    var arr = this;
    for (var i = 0; i < arr.length; i++) {
        if (i in arr) callback.call(thisArg, arr[i], i, arr);
    }
}

function map(callback, thisArg) {
    if (typeof callback != "function") throw new TypeError(callback + " is not a function");
    var arr = this, out = [];
    for (var i = 0; i < arr.length; i++) {
        out[i] = callback.call(thisArg, arr[i], i, arr);
    }
    return out;
}

function filter(callback, thisArg) {
    if (typeof callback != "function") throw new TypeError(callback + " is not a function");
    var arr = this, out = [];
    for (var i = 0; i < arr.length; i++) {
        var value = arr[i];
        if (callback.call(thisArg, value, i, arr)) out.push(value);
    }
    return out;
}

function reduce(callback, initial) {
    if (typeof callback != "function") throw new TypeError(callback + " is not a function");
    var arr = this, i = 0, acc;
    if (arguments.length > 1) {
        acc = initial;
    } else {
        if (arr.length == 0) throw new TypeError("Reduce of empty array with no initial value");
        acc = arr[0];
        i = 1;
    }
    for (; i < arr.length; i++) {
        acc = callback(acc, arr[i], i, arr);
    }
    return acc;
}
"#;
