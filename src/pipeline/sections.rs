//! Section parsing: turn the model's tagged response into labelled sections.
//!
//! The model is asked to wrap each part of its answer in a tag such as
//! `<objective>…</objective>`, but nothing guarantees it does so. Instead of
//! blind find-and-replace, the response is scanned once for the known open
//! and close markers and split into [`Segment`]s: untagged text is kept
//! verbatim, tagged regions become sections. Structural problems (a tag that
//! never closes, a close tag with no opener, a new section opened inside
//! another) are collected as [`SectionWarning`]s rather than silently folded
//! into the output.
//!
//! [`ParsedResponse::render`] emits each open marker as a `### Heading` line
//! and drops close markers, keeping every other byte in place. This matches
//! replacing the markers literally, in order, except in one case: a marker
//! that only comes into being once a close marker inside it is deleted (for
//! example `<obj</summary>ective>`). Markers are recognised in the response
//! as written, so that text stays as it is minus the close marker.

use crate::output::PaperRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The labelled regions the model may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Summary,
    Objective,
    Implementation,
    Insights,
    Results,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Summary,
        SectionKind::Objective,
        SectionKind::Implementation,
        SectionKind::Insights,
        SectionKind::Results,
    ];

    /// Bare tag name, e.g. `objective`.
    pub fn tag_name(self) -> &'static str {
        match self {
            SectionKind::Summary => "summary",
            SectionKind::Objective => "objective",
            SectionKind::Implementation => "implementation",
            SectionKind::Insights => "insights",
            SectionKind::Results => "results",
        }
    }

    /// Human-readable heading text, e.g. `Objective`.
    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::Summary => "Summary",
            SectionKind::Objective => "Objective",
            SectionKind::Implementation => "Implementation",
            SectionKind::Insights => "Insights",
            SectionKind::Results => "Results",
        }
    }

    fn open_marker(self) -> String {
        format!("<{}>", self.tag_name())
    }

    fn close_marker(self) -> String {
        format!("</{}>", self.tag_name())
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// A structural problem found while scanning the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionWarning {
    /// The section was still open at the end of the response.
    Unclosed { kind: SectionKind },
    /// A new section opened before this one was closed.
    Interrupted { kind: SectionKind, by: SectionKind },
    /// A close marker appeared with no matching open section.
    UnexpectedClose { kind: SectionKind },
    /// The same section appeared more than once.
    Duplicate { kind: SectionKind },
}

impl fmt::Display for SectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionWarning::Unclosed { kind } => write!(f, "<{kind}> is never closed"),
            SectionWarning::Interrupted { kind, by } => {
                write!(f, "<{kind}> was interrupted by <{by}> before </{kind}>")
            }
            SectionWarning::UnexpectedClose { kind } => {
                write!(f, "</{kind}> has no matching <{kind}>")
            }
            SectionWarning::Duplicate { kind } => write!(f, "<{kind}> appears more than once"),
        }
    }
}

/// One piece of the scanned response, in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text outside any section, kept verbatim.
    Text(String),
    /// Text that followed an open marker.
    Section { kind: SectionKind, body: String },
}

/// The scanned response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub segments: Vec<Segment>,
    pub warnings: Vec<SectionWarning>,
}

enum Marker {
    Open(SectionKind),
    Close(SectionKind),
}

fn match_marker(at: &str) -> Option<(Marker, usize)> {
    for kind in SectionKind::ALL {
        let open = kind.open_marker();
        if at.starts_with(&open) {
            return Some((Marker::Open(kind), open.len()));
        }
        let close = kind.close_marker();
        if at.starts_with(&close) {
            return Some((Marker::Close(kind), close.len()));
        }
    }
    None
}

/// Scan a model response into segments and warnings.
pub fn parse_sections(response: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();
    let mut seen: Vec<SectionKind> = Vec::new();
    let mut current: Option<(SectionKind, String)> = None;
    let mut text = String::new();
    let mut rest = response;

    while let Some(idx) = rest.find('<') {
        let (before, at) = rest.split_at(idx);
        match current.as_mut() {
            Some((_, body)) => body.push_str(before),
            None => text.push_str(before),
        }

        match match_marker(at) {
            Some((Marker::Open(kind), len)) => {
                if let Some((open, body)) = current.take() {
                    parsed.warnings.push(SectionWarning::Interrupted { kind: open, by: kind });
                    parsed.segments.push(Segment::Section { kind: open, body });
                } else if !text.is_empty() {
                    parsed.segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                if seen.contains(&kind) {
                    parsed.warnings.push(SectionWarning::Duplicate { kind });
                } else {
                    seen.push(kind);
                }
                current = Some((kind, String::new()));
                rest = &at[len..];
            }
            Some((Marker::Close(kind), len)) => {
                match current.take() {
                    Some((open, body)) if open == kind => {
                        parsed.segments.push(Segment::Section { kind, body });
                    }
                    other => {
                        current = other;
                        parsed.warnings.push(SectionWarning::UnexpectedClose { kind });
                    }
                }
                rest = &at[len..];
            }
            None => {
                match current.as_mut() {
                    Some((_, body)) => body.push('<'),
                    None => text.push('<'),
                }
                rest = &at[1..];
            }
        }
    }

    match current {
        Some((kind, mut body)) => {
            body.push_str(rest);
            parsed.warnings.push(SectionWarning::Unclosed { kind });
            parsed.segments.push(Segment::Section { kind, body });
        }
        None => {
            text.push_str(rest);
            if !text.is_empty() {
                parsed.segments.push(Segment::Text(text));
            }
        }
    }

    parsed
}

impl ParsedResponse {
    /// True when every section opened and closed cleanly, exactly once.
    pub fn is_well_formed(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Trimmed body of the first section of `kind`.
    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::Section { kind: k, body } if *k == kind => Some(body.trim()),
            _ => None,
        })
    }

    /// All sections in order, bodies trimmed.
    pub fn sections(&self) -> Vec<(SectionKind, String)> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Section { kind, body } => Some((*kind, body.trim().to_string())),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Render segments back to text with headings in place of open markers.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Section { kind, body } => {
                    out.push_str("### ");
                    out.push_str(kind.heading());
                    out.push('\n');
                    out.push_str(body);
                }
            }
        }
        out
    }
}

/// Produce the final Markdown document for a paper.
///
/// `front_matter` adds a YAML block describing the paper before the title.
pub fn render_markdown(
    title: &str,
    parsed: &ParsedResponse,
    front_matter: Option<&PaperRecord>,
) -> String {
    let mut md = String::new();
    if let Some(record) = front_matter {
        md.push_str(&format_yaml_front_matter(record));
    }
    md.push_str(&format!("# {}\n\n", title));
    md.push_str(&parsed.render());
    md
}

fn format_yaml_front_matter(record: &PaperRecord) -> String {
    let quote = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");

    let mut yaml = String::from("---\n");
    yaml.push_str(&format!("id: \"{}\"\n", quote(&record.id)));
    yaml.push_str(&format!("title: \"{}\"\n", quote(&record.title)));
    if !record.authors.is_empty() {
        yaml.push_str("authors:\n");
        for a in &record.authors {
            yaml.push_str(&format!("  - \"{}\"\n", quote(a)));
        }
    }
    if let Some(ref p) = record.published {
        yaml.push_str(&format!("published: \"{}\"\n", quote(p)));
    }
    yaml.push_str(&format!("pdf: \"{}\"\n", quote(&record.pdf_url)));
    yaml.push_str("---\n\n");
    yaml
}
