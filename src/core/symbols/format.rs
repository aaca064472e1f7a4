//! Display formatting of resolved names.
//!
//! Nested types are joined with dots, arity markers are replaced by their
//! arguments in angle brackets: `MyApp.Outer+Inner`1[System.String]` becomes
//! `MyApp.Outer.Inner<System.String>`.

use super::type_name::{push_modifiers, split_arity, TypeName};

/// Formats a type name for display; parameter types pass `with_namespace = false`.
pub fn format_type_name(name: &TypeName, with_namespace: bool) -> String {
    let mut out = String::new();

    if with_namespace {
        if let Some(namespace) = &name.namespace {
            out.push_str(namespace);
            out.push('.');
        }
    }

    let mut arguments = name.generic_arguments.iter();
    let last = name.nesting.len().saturating_sub(1);

    for (index, segment) in name.nesting.iter().enumerate() {
        if index > 0 {
            out.push('.');
        }

        let (base, arity) = split_arity(segment);
        out.push_str(base);

        let mut own: Vec<&TypeName> = arguments.by_ref().take(arity).collect();
        if index == last {
            // arguments without a matching arity marker belong to the innermost type
            own.extend(arguments.by_ref());
        }
        push_generic_arguments(&mut out, own, with_namespace);
    }

    push_modifiers(&mut out, &name.modifiers);
    out
}

/// Formats a method name, spelling out its generic arguments: `Map<TIn, TOut>`
pub fn format_method_name(name: &str, generic_arguments: &[String]) -> String {
    let (base, _) = split_arity(name);
    let mut out = base.to_string();
    if !generic_arguments.is_empty() {
        out.push('<');
        out.push_str(&generic_arguments.join(", "));
        out.push('>');
    }
    out
}

fn push_generic_arguments(out: &mut String, arguments: Vec<&TypeName>, with_namespace: bool) {
    if arguments.is_empty() {
        return;
    }

    let formatted: Vec<String> = arguments
        .into_iter()
        .map(|argument| format_type_name(argument, with_namespace))
        .collect();

    out.push('<');
    out.push_str(&formatted.join(", "));
    out.push('>');
}
