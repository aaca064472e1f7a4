//! Streaming HTML rendering of a raw stack trace.

use tracing::debug;

use super::chain::{ExceptionChain, ExceptionHeader};
use super::grammar::{FrameGrammar, StackFrame};
use super::job::JobRecord;
use super::markup::MarkupWriter;
use super::resolver::{FrameResolver, Resolution, ResolvedFrame};
use super::suffix::SuffixGrammar;
use crate::config::{MarkerTokens, RenderConfig};
use crate::error::Result;

const TRACE_OPEN: &str = r#"<pre class="stack-trace">"#;
const SECTION_OPEN: &str = r#"<pre class="stack-trace" style="font-weight:normal !important">"#;
const SECTION_RULE: &str = r#"<hr style="border-top:1px dashed #999; margin:10px 0"/>"#;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub separate_stack_traces: bool,
    pub rethrow_helper: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderConfig::default().into()
    }
}

impl From<RenderConfig> for RenderOptions {
    fn from(config: RenderConfig) -> Self {
        Self {
            separate_stack_traces: config.separate_stack_traces,
            rethrow_helper: config.rethrow_helper,
        }
    }
}

/// Renders trace text written under one set of marker tokens
pub struct Renderer {
    markers: MarkerTokens,
    grammar: FrameGrammar,
    suffixes: SuffixGrammar,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(markers: &MarkerTokens, options: RenderOptions) -> Self {
        Self {
            grammar: FrameGrammar::new(markers.lead_in.as_deref()),
            suffixes: SuffixGrammar::new(markers.file_line_template.as_deref()),
            markers: markers.clone(),
            options,
        }
    }

    /// Exception type and message of a failed job followed by its rendered trace
    pub fn render_failed_state(&self, job: &JobRecord, resolver: Option<&FrameResolver<'_>>) -> Result<String> {
        let trace = self.render(&job.exception_details, resolver)?;

        let mut out = MarkupWriter::with_capacity(trace.len() + 256);
        out.raw(r#"<h4 class="exception-type">"#)
            .text(&job.exception_type)
            .raw("</h4>")
            .raw(r#"<p class="text-muted">"#)
            .text(&job.exception_message)
            .raw("</p>")
            .raw(&trace);

        Ok(out.into_string())
    }

    /// Renders `text` to markup. Without a resolver every frame keeps its parsed text.
    pub fn render(&self, text: &str, resolver: Option<&FrameResolver<'_>>) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let lines: Vec<&str> = text.lines().collect();
        let mut out = MarkupWriter::with_capacity(text.len() * 3);
        out.raw(TRACE_OPEN).newline();

        let mut header: Vec<&str> = Vec::new();
        let mut in_header = true;
        let mut chain: Option<ExceptionChain> = None;
        let mut skip_rethrow = false;
        let mut frames = 0usize;

        for (index, line) in lines.iter().enumerate() {
            let Some(frame) = self.grammar.parse(line) else {
                if in_header {
                    header.push(line);
                    continue;
                }

                let trimmed = line.trim();
                if trimmed == self.markers.inner_boundary {
                    match chain.as_mut().and_then(|chain| chain.next_header()) {
                        Some((position, next)) => write_exception_header(&mut out, position, next),
                        None => {
                            out.raw(r#"<i class="text-muted">"#).text(line).raw("</i>").newline();
                        }
                    }
                } else if trimmed == self.markers.rethrow_boundary {
                    skip_rethrow = true;
                } else {
                    out.text(line).newline();
                }
                continue;
            };

            if in_header {
                in_header = false;
                chain = self.write_header(&mut out, &header, &lines[index..])?;
            }

            if std::mem::take(&mut skip_rethrow) && self.is_rethrow_helper(&frame) {
                continue;
            }

            let resolved = match resolver {
                Some(resolver) => match resolver.resolve(frame) {
                    Resolution::Hidden => continue,
                    Resolution::Frame(resolved) => resolved,
                },
                None => ResolvedFrame::unresolved(frame),
            };

            self.write_frame(&mut out, &resolved);
            frames += 1;
        }

        if in_header && !header.is_empty() {
            out.text(joined_header(&header).as_str()).newline();
        }

        out.raw("</pre>").newline();
        debug!(lines = lines.len(), frames, "Rendered stack trace");

        Ok(out.into_string())
    }

    /// Writes the lines before the first frame, split per exception when the
    /// boundary count allows it.
    fn write_header(
        &self,
        out: &mut MarkupWriter,
        header: &[&str],
        body: &[&str],
    ) -> Result<Option<ExceptionChain>> {
        if header.is_empty() {
            return Ok(None);
        }

        let text = joined_header(header);

        if self.options.separate_stack_traces {
            if let Some(mut chain) = ExceptionChain::split(&text, body, &self.markers.inner_boundary)? {
                out.clear();
                if let Some((position, first)) = chain.next_header() {
                    write_exception_header(out, position, first);
                }
                return Ok(Some(chain));
            }
        }

        out.text(&text).newline();
        Ok(None)
    }

    fn is_rethrow_helper(&self, frame: &StackFrame) -> bool {
        let helper = self.options.rethrow_helper.as_str();
        helper
            .strip_prefix(frame.type_name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|method| method == frame.method_name)
    }

    fn write_frame(&self, out: &mut MarkupWriter, resolved: &ResolvedFrame) {
        let frame = &resolved.frame;

        out.text(&frame.prefix);
        if let Some(kind) = resolved.state_machine {
            out.raw(r#"<span style="color:#00f">"#).raw(kind.keyword()).raw("</span> ");
        }

        out.raw(r#"<span class="st-type">"#)
            .text(&frame.type_name)
            .raw(r#"</span>.<span class="st-method">"#)
            .text(&frame.method_name)
            .raw("</span>(");

        for (i, parameter) in frame.parameters.iter().enumerate() {
            if i > 0 {
                out.raw(", ");
            }
            out.raw(r#"<span class="st-param"><span class="st-param-type">"#)
                .text(&parameter.type_name)
                .raw(r#"</span>&nbsp;<span class="st-param-name">"#)
                .text(&parameter.name)
                .raw("</span></span>");
        }
        out.raw(")");

        self.write_suffix(out, &frame.suffix);
    }

    fn write_suffix(&self, out: &mut MarkupWriter, suffix: &str) {
        let Some(location) = self.suffixes.parse(suffix) else {
            out.text(suffix).newline();
            return;
        };

        if let Some(address) = &location.address {
            out.raw(" [").text(address).raw("]");
        }

        out.raw(" ")
            .text(&location.lead)
            .raw(r#" <span class="st-file">"#)
            .text(&location.file)
            .raw(r#"</span>:<span class="st-line">"#)
            .raw(&location.line.to_string())
            .raw("</span>")
            .newline();
    }
}

fn joined_header(header: &[&str]) -> String {
    header.join("\n").trim_end_matches(&['\r', '\n'][..]).to_string()
}

fn write_exception_header(out: &mut MarkupWriter, position: usize, header: &ExceptionHeader) {
    if position > 0 {
        out.raw("</pre>").newline();
    }

    out.raw(SECTION_RULE).newline();
    out.raw("<p>").newline();
    out.raw(r#"<span class="st-type">"#)
        .text(&header.type_name)
        .raw("</span>: ")
        .newline();
    out.raw(r#"<span class="text-muted">"#)
        .text(&header.message)
        .raw("</span>")
        .newline();
    out.raw("</p>").newline();
    out.raw(SECTION_OPEN).newline();
}
