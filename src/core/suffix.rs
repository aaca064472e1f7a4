//! Parsing of the text after a frame's parameter list.

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use super::patterns::{location_from_template, re_dotnet_location, re_mono_location};

/// File and line a frame points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLocation {
    /// Native offset Mono prints before the location, e.g. `0x0001c`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// The word introducing the file, usually `in`
    pub lead: String,

    pub file: String,

    pub line: u64,
}

/// Recognizes both suffix dialects plus an optional locale template
#[derive(Debug, Clone, Default)]
pub struct SuffixGrammar {
    template: Option<Regex>,
}

impl SuffixGrammar {
    pub fn new(file_line_template: Option<&str>) -> Self {
        let template = file_line_template.and_then(|template| {
            let compiled = location_from_template(template);
            if compiled.is_none() {
                warn!("Ignoring file/line template {:?}: expected {{0}} before {{1}}", template);
            }
            compiled
        });

        Self { template }
    }

    pub fn parse(&self, suffix: &str) -> Option<FileLocation> {
        let patterns = self
            .template
            .iter()
            .chain([re_dotnet_location(), re_mono_location()]);

        for pattern in patterns {
            let Some(caps) = pattern.captures(suffix) else {
                continue;
            };
            let Some(line) = caps.name("line").and_then(|m| m.as_str().parse().ok()) else {
                continue;
            };

            return Some(FileLocation {
                address: caps.name("addr").map(|m| m.as_str().to_string()),
                lead: caps.name("lead").map(|m| m.as_str().to_string()).unwrap_or_default(),
                file: caps.name("file").map(|m| m.as_str().to_string()).unwrap_or_default(),
                line,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotnet_dialect() {
        let location = SuffixGrammar::default().parse(" in /src/Worker.cs:line 42").unwrap();
        assert_eq!(location, FileLocation {
            address: None,
            lead: "in".to_string(),
            file: "/src/Worker.cs".to_string(),
            line: 42,
        });

        let windows = SuffixGrammar::default()
            .parse(" in C:\\build\\src\\Worker.cs:line 7 ")
            .unwrap();
        assert_eq!(windows.file, "C:\\build\\src\\Worker.cs");
        assert_eq!(windows.line, 7);
    }

    #[test]
    fn test_mono_dialect() {
        let location = SuffixGrammar::default().parse(" [0x0001c] in <4c1a2b9e>:0").unwrap();
        assert_eq!(location.address.as_deref(), Some("0x0001c"));
        assert_eq!(location.file, "4c1a2b9e");
        assert_eq!(location.line, 0);

        let location = SuffixGrammar::default().parse(" in <filename unknown>:0").unwrap();
        assert_eq!(location.address, None);
        assert_eq!(location.file, "filename unknown");
    }

    #[test]
    fn test_line_numbers_beyond_u32() {
        let location = SuffixGrammar::default().parse(" in /src/Gen.cs:line 4294967296").unwrap();
        assert_eq!(location.line, 4_294_967_296);
    }

    #[test]
    fn test_unmatched_suffixes() {
        let grammar = SuffixGrammar::default();
        assert!(grammar.parse("").is_none());
        assert!(grammar.parse(" <0x00042>").is_none());
        assert!(grammar.parse(" in /src/Worker.cs").is_none());
    }

    #[test]
    fn test_locale_template() {
        let grammar = SuffixGrammar::new(Some("in {0}:Zeile {1}"));
        let location = grammar.parse(" in /src/Worker.cs:Zeile 12").unwrap();
        assert_eq!(location.lead, "in");
        assert_eq!(location.file, "/src/Worker.cs");
        assert_eq!(location.line, 12);

        let leadless = SuffixGrammar::new(Some("{0}({1})"));
        let location = leadless.parse("   Worker.cs(12)").unwrap();
        assert_eq!(location.lead, "");
        assert_eq!(location.file, "Worker.cs");

        let broken = SuffixGrammar::new(Some("line {1} of {0}"));
        assert!(broken.parse(" line 3 of x.cs").is_none());
    }
}
