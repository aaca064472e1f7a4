//! Compiled regex patterns for the stack-trace grammar.
//!
//! The building blocks below describe how the runtime spells identifiers in a
//! serialized trace. A literal is any run of characters that cannot start a new
//! segment; a member may carry a generic arity marker, a bracketed generic
//! instantiation (whose arguments may be full type names) and array brackets.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

const LITERAL: &str = r"[^\s.+`\[]+";

/// `[]`, `[,]`, `[T]`, `[System.String]`, `[String,List`1[Int32]]`: one level of nesting
const BRACKETS: &str = r"\[(?:[^\[\]\s()]|,\s+|\[[^\[\]()]*\])*\]";

fn member_name() -> String {
    format!(r"{LITERAL}(?:`\d+)?(?:{BRACKETS})*")
}

fn full_type_name() -> String {
    let member = member_name();
    format!(r"(?:{LITERAL}\.)*{member}(?:\.{member})*")
}

fn method_parameter() -> String {
    format!(r"{}\s+{LITERAL}", full_type_name())
}

fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .size_limit(1 << 26)
        .build()
        .expect("stack trace grammar pattern is valid and should always compile")
}

/// A complete frame line: prefix, type, method, parameter list and suffix.
///
/// Mono puts a single space between the method and its parameter list.
pub(super) fn re_frame_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let param = method_parameter();
        compile(&format!(
            r"^(?P<prefix>\s*(?P<lead>\w+)\s+)(?P<type>{})\.(?P<method>{}) ?\((?P<params>{param}(?:,\s*{param})*)?\)(?P<suffix>\s+.+)?\s*$",
            full_type_name(),
            member_name(),
        ))
    })
}

/// Peels the first parameter off a parameter list, leaving the rest for the next round.
pub(super) fn re_parameter_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let param = method_parameter();
        compile(&format!(
            r"^(?P<type>{})\s+(?P<name>{LITERAL})(?:,\s*(?P<rest>{param}(?:,\s*{param})*))?$",
            full_type_name(),
        ))
    })
}

/// `<OriginalName>d__12`-style names emitted for compiler-generated members.
pub(super) fn re_compiler_generated_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(&format!(r"^<(?P<name>{LITERAL})>{}$", member_name())))
}

/// Chain delimiter between concatenated exception headers.
pub(super) fn re_chain_delimiter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"\s--->\s"))
}

/// What must follow a chain delimiter for it to count: `Type.Name: `.
pub(super) fn re_chained_header_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(&format!(r"^{}:\s", full_type_name())))
}

/// `   in C:\src\File.cs:line 42`
pub(super) fn re_dotnet_location() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"^\s+(?P<lead>\w+)\s+(?P<file>.+):\w+\s+(?P<line>\d+)\s*$"))
}

/// `   [0x00012] in <3f5a...>:0` or `   in /src/File.cs:42`
pub(super) fn re_mono_location() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(r"^\s+(?:\[(?P<addr>.+)\]\s+)?(?P<lead>\w+)\s+<(?P<file>.+)>:(?P<line>\d+)\s*$")
    })
}

/// Builds a location pattern from a `{0}`/`{1}` file-line template such as `in {0}:line {1}`.
///
/// Returns `None` when the template does not mention the file before the line.
pub(super) fn location_from_template(template: &str) -> Option<Regex> {
    let (before, rest) = template.split_once("{0}")?;
    let (between, after) = rest.split_once("{1}")?;
    if between.is_empty() {
        return None;
    }

    let lead = before.trim();
    let mut pattern = String::from(r"^\s+");
    if !lead.is_empty() {
        pattern.push_str(&format!(r"(?P<lead>{})\s+", regex::escape(lead)));
    }
    pattern.push_str(r"(?P<file>.+)");
    pattern.push_str(&regex::escape(between));
    pattern.push_str(r"(?P<line>\d+)");
    pattern.push_str(&regex::escape(after.trim_end()));
    pattern.push_str(r"\s*$");

    RegexBuilder::new(&pattern).build().ok()
}
