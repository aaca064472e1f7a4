use chrono::{DateTime, Utc};
use tera::{Context, Tera};

use crate::error::Result;

/// Escape HTML special characters for safe embedding in HTML documents.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Append-only markup buffer. Text goes through [`escape_html`]; tags do not.
#[derive(Debug, Default)]
pub struct MarkupWriter {
    buffer: String,
}

impl MarkupWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    /// Generated markup, written as is
    pub fn raw(&mut self, markup: &str) -> &mut Self {
        self.buffer.push_str(markup);
        self
    }

    /// Literal content, escaped
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.buffer.push_str(&escape_html(text));
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buffer.push('\n');
        self
    }

    /// Drops everything written so far
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; }
.text-muted { color: #777; }
pre.stack-trace { background: #f5f5f5; padding: 10px; font-weight: bold; white-space: pre-wrap; }
.st-type { color: #0a7e07; }
.st-method { color: #00008b; }
.st-param-type { color: #0a7e07; }
.st-param-name { color: #555; }
.st-file { color: #8b008b; }
.st-line { color: #8b0000; }
</style>
</head>
<body>
{{ body | safe }}
{% if failed_at %}<p class="text-muted">Failed at {{ failed_at }}</p>
{% endif %}</body>
</html>
"#;

/// Wraps a rendered fragment into a complete HTML page
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("page.html", PAGE_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, title: &str, body: &str, failed_at: Option<DateTime<Utc>>) -> Result<String> {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("body", body);
        context.insert(
            "failed_at",
            &failed_at.map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        );

        Ok(self.tera.render("page.html", &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("\"quoted\" 'single'"), "&quot;quoted&quot; &#39;single&#39;");
        assert_eq!(escape_html("/src/Worker.cs"), "/src/Worker.cs");
    }

    #[test]
    fn test_writer_escapes_text_only() {
        let mut writer = MarkupWriter::default();
        writer.raw("<b>").text("1 < 2").raw("</b>").newline();
        assert_eq!(writer.into_string(), "<b>1 &lt; 2</b>\n");
    }

    #[test]
    fn test_page_escapes_title_but_not_body() {
        let pages = PageRenderer::new().unwrap();
        let failed_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let page = pages
            .render("Boom <at> job", "<pre class=\"stack-trace\">x</pre>", Some(failed_at))
            .unwrap();

        assert!(page.contains("<title>Boom &lt;at&gt; job</title>"));
        assert!(page.contains("<pre class=\"stack-trace\">x</pre>"));
        assert!(page.contains("Failed at 2024-03-01 12:30:00 UTC"));

        let page = pages.render("t", "", None).unwrap();
        assert!(!page.contains("Failed at"));
    }
}
