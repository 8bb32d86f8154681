//! Console output for loaded scenes

use scene_core::foundation::collections::NodeId;
use scene_core::graph::{Graph, LoadReport};
use scene_core::mutate::{Mutable, Mutator, MutatorValue};
use scene_core::serialize::Serializable;

/// Print each node's components with their mutators, optionally typed
pub fn print_mutators(graph: &Graph, root: NodeId, with_types: bool) {
    for node in graph.iter_graph(root) {
        let Some(name) = graph.name(node) else {
            continue;
        };
        println!("{name}");
        for id in graph.all_components(node) {
            let Some(component) = graph.component(id) else {
                continue;
            };
            let mutator = component.mutator_for_user_interface();
            println!("  {}", component.type_name());
            let types = with_types.then(|| component.mutator_attribute_types(&mutator));
            print_entries(&mutator, 2, &|key: &str| {
                types
                    .as_ref()
                    .and_then(|types| types.get(key))
                    .map(|attribute| format!(" : {attribute:?}"))
            });
        }
    }
}

fn print_entries(mutator: &Mutator, depth: usize, type_of: &dyn Fn(&str) -> Option<String>) {
    let indent = "  ".repeat(depth);
    for (key, value) in mutator {
        let annotation = type_of(key).filter(|_| depth == 2).unwrap_or_default();
        match value {
            MutatorValue::Mutator(nested) => {
                println!("{indent}{key}{annotation}");
                print_entries(nested, depth + 1, type_of);
            }
            MutatorValue::Array(items) => println!("{indent}{key} = [{} items]{annotation}", items.len()),
            MutatorValue::Number(number) => println!("{indent}{key} = {number}{annotation}"),
            MutatorValue::Boolean(flag) => println!("{indent}{key} = {flag}{annotation}"),
            MutatorValue::String(text) => println!("{indent}{key} = {text:?}{annotation}"),
        }
    }
}

/// Print what the loader could not restore
pub fn print_load_report(report: &LoadReport) {
    if report.is_clean() {
        return;
    }
    println!();
    for error in &report.field_errors {
        println!("warning: {error}");
    }
    for error in &report.subtree_errors {
        println!("dropped: {error}");
    }
}
