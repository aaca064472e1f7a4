use serde::{Deserialize, Serialize};

use super::patterns::{
    re_chain_delimiter, re_chained_header_start, re_compiler_generated_name, re_frame_line,
    re_parameter_list,
};

/// Method parameter as it appeared in the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub type_name: String,
    pub name: String,
}

impl Parameter {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

/// One call-site line of a stack trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Leading whitespace and lead-in word, e.g. `"   at "`
    pub prefix: String,

    /// Dotted type name, possibly with arity markers and brackets
    pub type_name: String,

    /// Called method name
    pub method_name: String,

    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,

    /// Whatever follows the parameter list, e.g. `" in Worker.cs:line 42"`
    pub suffix: String,
}

#[cfg(test)]
impl StackFrame {
    /// Parse a line with the default grammar, accepting any lead-in word.
    pub fn parse(line: &str) -> Option<Self> {
        FrameGrammar::default().parse(line)
    }
}

/// Classifies trace lines into frames and opaque text
#[derive(Debug, Clone, Default)]
pub struct FrameGrammar {
    lead_in: Option<String>,
}

impl FrameGrammar {
    /// A grammar that only accepts frames introduced by `lead_in`, when given.
    pub fn new(lead_in: Option<&str>) -> Self {
        Self {
            lead_in: lead_in
                .map(str::trim)
                .filter(|word| !word.is_empty())
                .map(str::to_string),
        }
    }

    /// Returns `None` for lines that are not frames: exception messages,
    /// boundary banners, blank lines. That is a classification, not an error.
    pub fn parse(&self, line: &str) -> Option<StackFrame> {
        if line.is_empty() {
            return None;
        }

        let caps = re_frame_line().captures(line)?;

        if let Some(expected) = &self.lead_in {
            if caps.name("lead").map(|m| m.as_str()) != Some(expected.as_str()) {
                return None;
            }
        }

        let text = |group: &str| caps.name(group).map(|m| m.as_str()).unwrap_or_default();

        Some(StackFrame {
            prefix: text("prefix").to_string(),
            type_name: text("type").to_string(),
            method_name: text("method").to_string(),
            parameters: caps
                .name("params")
                .map(|m| parse_parameters(m.as_str()))
                .unwrap_or_default(),
            suffix: text("suffix").to_string(),
        })
    }
}

fn parse_parameters(list: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut remaining = Some(list);

    while let Some(current) = remaining.take() {
        let Some(caps) = re_parameter_list().captures(current) else {
            break;
        };

        let type_name = caps.name("type").map(|m| m.as_str()).unwrap_or_default();
        let name = caps.name("name").map(|m| m.as_str()).unwrap_or_default();
        parameters.push(Parameter::new(type_name, name));

        remaining = caps.name("rest").map(|m| m.as_str());
    }

    parameters
}

/// Recovers `OriginalName` from a compiler-generated `<OriginalName>d__12` name.
pub fn decode_compiler_generated_name(name: &str) -> Option<&str> {
    re_compiler_generated_name()
        .captures(name)
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
}

/// Splits `Type1: msg ---> Type2: msg` into its segments, outermost first.
///
/// A delimiter only counts when a `Type.Name: ` follows it, so arrows inside
/// a message body stay put.
pub fn split_chained_message(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut start = 0;

    for delimiter in re_chain_delimiter().find_iter(text) {
        if re_chained_header_start().is_match(&text[delimiter.end()..]) {
            segments.push(&text[start..delimiter.start()]);
            start = delimiter.end();
        }
    }

    segments.push(&text[start..]);
    segments
}

/// Member name without generic arity or bracketed instantiation: `Get[T]` -> `Get`.
pub fn base_member_name(name: &str) -> &str {
    match name.find(['`', '[']) {
        Some(0) | None => name,
        Some(end) => &name[..end],
    }
}
