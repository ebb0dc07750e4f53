use std::collections::BTreeSet;

use crate::frontend::parse_module;
use crate::ir::{Function, Module};

// Parse a module and panic on any error; test inputs are known-good.
pub fn module(source: &str) -> Module {
    parse_module(source).unwrap_or_else(|err| panic!("bad test IR: {err}"))
}

// Parse a module holding exactly one function and return it.
pub fn function(source: &str) -> Function {
    let mut module = module(source);
    assert_eq!(module.functions.len(), 1, "expected a single function");
    module.functions.remove(0)
}

pub fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Straight-line function where every temporary in `names` is defined up
/// front and all of them are read by one final call, so each pair of them
/// interferes.
pub fn clique_source(names: &[&str]) -> String {
    let mut body = String::new();
    for (i, name) in names.iter().enumerate() {
        body.push_str(&format!("  %{name} = add i64 {i}, 1\n"));
    }
    let args: Vec<String> = names.iter().map(|n| format!("i64 %{n}")).collect();
    body.push_str(&format!("  call void @sink({})\n", args.join(", ")));
    body.push_str("  ret void\n");
    format!("define void @clique() {{\n{body}}}\n")
}
