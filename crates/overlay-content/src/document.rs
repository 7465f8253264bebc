//! Region-structured view of a managed text document
//!
//! A single forward scan turns the document into managed regions and free
//! text, so balance checking and anchored insertion are structural operations
//! rather than string splicing. Byte spans into the original source make
//! every rewrite surgical: content outside the targeted markers is
//! reproduced exactly, whitespace included.

use std::ops::Range;

use semver::Version;

use crate::error::{Error, Result};
use crate::markers::{MarkerLine, Markers};
use crate::section::{Anchor, Section, SectionOutcome};

/// A managed region located in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ManagedRegion {
    name: String,
    version: Version,
    /// Whole block: begin line through end line, terminator included
    span: Range<usize>,
    /// Bytes between the begin line and the end marker line
    body_span: Range<usize>,
    /// The begin marker line, excluding its line terminator
    begin_span: Range<usize>,
}

/// A section begin marker whose end has not been seen yet.
struct OpenRegion {
    name: String,
    version: Version,
    begin_start: usize,
    begin_end: usize,
    content_start: usize,
}

/// A text document parsed into managed and free regions.
///
/// Parsing validates the marker invariants up front: one begin and one end
/// per section, never nested, at most one section per name. Every mutating
/// operation returns a complete new string; the parsed document itself is
/// immutable.
#[derive(Debug, Clone)]
pub struct SectionDocument {
    source: String,
    sections: Vec<ManagedRegion>,
    markers: Markers,
    /// Byte offset of the user-customization marker line, if present
    user_anchor: Option<usize>,
}

impl SectionDocument {
    /// Parse with the default marker prefix.
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        Self::parse_with(source, Markers::default())
    }

    /// Parse with an explicit marker dialect.
    pub fn parse_with(source: impl Into<String>, markers: Markers) -> Result<Self> {
        let source = source.into();
        let mut sections: Vec<ManagedRegion> = Vec::new();
        let mut open: Option<OpenRegion> = None;
        let mut user_anchor = None;
        let mut offset = 0;

        for line in source.split_inclusive('\n') {
            match markers.classify(line) {
                MarkerLine::Begin { name, version } => {
                    if let Some(outer) = &open {
                        return Err(Error::UnbalancedMarkers {
                            name: outer.name.clone(),
                            detail: format!("'{name}' begins before '{}' ends", outer.name),
                        });
                    }
                    if sections.iter().any(|s| s.name == name) {
                        return Err(Error::DuplicateSection {
                            name: name.to_string(),
                        });
                    }
                    let parsed = Version::parse(version).map_err(|e| Error::InvalidVersion {
                        name: name.to_string(),
                        version: version.to_string(),
                        source: e,
                    })?;
                    let line_body_len = line.trim_end_matches(['\r', '\n']).len();
                    open = Some(OpenRegion {
                        name: name.to_string(),
                        version: parsed,
                        begin_start: offset,
                        begin_end: offset + line_body_len,
                        content_start: offset + line.len(),
                    });
                }
                MarkerLine::End { name } => {
                    let Some(region) = open.take() else {
                        return Err(Error::UnbalancedMarkers {
                            name: name.to_string(),
                            detail: "end marker without a matching begin".to_string(),
                        });
                    };
                    if region.name != name {
                        return Err(Error::UnbalancedMarkers {
                            name: region.name.clone(),
                            detail: format!("closed by end marker for '{name}'"),
                        });
                    }
                    sections.push(ManagedRegion {
                        name: region.name,
                        version: region.version,
                        span: region.begin_start..offset + line.len(),
                        body_span: region.content_start..offset,
                        begin_span: region.begin_start..region.begin_end,
                    });
                }
                MarkerLine::User => {
                    if open.is_none() && user_anchor.is_none() {
                        user_anchor = Some(offset);
                    }
                }
                MarkerLine::Text => {}
            }
            offset += line.len();
        }

        if let Some(region) = open {
            return Err(Error::UnbalancedMarkers {
                name: region.name,
                detail: "begin marker without a matching end".to_string(),
            });
        }

        Ok(Self {
            source,
            sections,
            markers,
            user_anchor,
        })
    }

    /// The document source as parsed.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of all managed sections, in document order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Whether a section with this name exists.
    pub fn has_section(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Version recorded in the begin marker of a section.
    pub fn section_version(&self, name: &str) -> Option<&Version> {
        self.find(name).map(|s| &s.version)
    }

    /// Content between a section's markers.
    pub fn section_body(&self, name: &str) -> Option<&str> {
        self.find(name).map(|s| &self.source[s.body_span.clone()])
    }

    /// Insert or update a managed section.
    ///
    /// Same version: byte-identical no-op. Different version: only the bytes
    /// between that section's markers and its version token change. Missing
    /// section: a full block is inserted at the anchor.
    pub fn upsert(&self, section: &Section, anchor: &Anchor) -> Result<(String, SectionOutcome)> {
        if let Some(existing) = self.find(&section.name) {
            if existing.version == section.version {
                return Ok((self.source.clone(), SectionOutcome::Unchanged));
            }

            let mut out = String::with_capacity(self.source.len() + section.body.len());
            out.push_str(&self.source[..existing.begin_span.start]);
            out.push_str(&self.markers.begin(&section.name, &section.version));
            // Original terminator of the begin line
            out.push_str(&self.source[existing.begin_span.end..existing.body_span.start]);
            push_body(&mut out, &section.body);
            out.push_str(&self.source[existing.body_span.end..]);

            return Ok((
                out,
                SectionOutcome::Updated {
                    previous: existing.version.clone(),
                },
            ));
        }

        let block = self.render_block(section);
        let position = match anchor {
            Anchor::Auto => self.user_anchor.unwrap_or(self.source.len()),
            Anchor::End => self.source.len(),
            Anchor::Before(text) => self.source.find(text).unwrap_or(self.source.len()),
        };

        let mut out = String::with_capacity(self.source.len() + block.len() + 1);
        out.push_str(&self.source[..position]);
        if position > 0 && !self.source[..position].ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&block);
        out.push_str(&self.source[position..]);

        Ok((out, SectionOutcome::Inserted))
    }

    /// Remove a managed section, markers included.
    pub fn remove(&self, name: &str) -> Result<String> {
        let region = self.find(name).ok_or_else(|| Error::SectionNotFound {
            name: name.to_string(),
        })?;

        let mut out = String::with_capacity(self.source.len() - region.span.len());
        out.push_str(&self.source[..region.span.start]);
        out.push_str(&self.source[region.span.end..]);
        Ok(out)
    }

    fn find(&self, name: &str) -> Option<&ManagedRegion> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn render_block(&self, section: &Section) -> String {
        let mut block = String::new();
        block.push_str(&self.markers.begin(&section.name, &section.version));
        block.push('\n');
        push_body(&mut block, &section.body);
        block.push_str(&self.markers.end(&section.name));
        block.push('\n');
        block
    }
}

/// Append a body so the end marker always starts on its own line.
fn push_body(out: &mut String, body: &str) {
    if body.is_empty() {
        return;
    }
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn section(name: &str, version: &str, body: &str) -> Section {
        Section::new(name, Version::parse(version).unwrap(), body)
    }

    #[test]
    fn parse_empty_document() {
        let doc = SectionDocument::parse("").unwrap();
        assert_eq!(doc.section_names().count(), 0);
    }

    #[test]
    fn parse_finds_sections_and_versions() {
        let doc = SectionDocument::parse(
            "intro\n<!-- overlay:begin:python v0.1.0 -->\nuse uv\n<!-- overlay:end:python -->\noutro\n",
        )
        .unwrap();

        assert!(doc.has_section("python"));
        assert_eq!(
            doc.section_version("python"),
            Some(&Version::new(0, 1, 0))
        );
        assert_eq!(doc.section_body("python"), Some("use uv\n"));
    }

    #[test]
    fn begin_without_end_is_unbalanced() {
        let err = SectionDocument::parse("<!-- overlay:begin:python v0.1.0 -->\nbody\n")
            .unwrap_err();
        assert!(matches!(err, Error::UnbalancedMarkers { name, .. } if name == "python"));
    }

    #[test]
    fn end_without_begin_is_unbalanced() {
        let err = SectionDocument::parse("<!-- overlay:end:python -->\n").unwrap_err();
        assert!(matches!(err, Error::UnbalancedMarkers { name, .. } if name == "python"));
    }

    #[test]
    fn nested_sections_are_rejected() {
        let err = SectionDocument::parse(
            "<!-- overlay:begin:outer v1.0.0 -->\n<!-- overlay:begin:inner v1.0.0 -->\n<!-- overlay:end:inner -->\n<!-- overlay:end:outer -->\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnbalancedMarkers { name, .. } if name == "outer"));
    }

    #[test]
    fn mismatched_end_name_is_unbalanced() {
        let err = SectionDocument::parse(
            "<!-- overlay:begin:python v1.0.0 -->\n<!-- overlay:end:rust -->\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnbalancedMarkers { name, .. } if name == "python"));
    }

    #[test]
    fn duplicate_section_name_is_rejected() {
        let block = "<!-- overlay:begin:py v1.0.0 -->\n<!-- overlay:end:py -->\n";
        let err = SectionDocument::parse(format!("{block}{block}")).unwrap_err();
        assert!(matches!(err, Error::DuplicateSection { name } if name == "py"));
    }

    #[test]
    fn non_semver_version_is_rejected() {
        let err = SectionDocument::parse(
            "<!-- overlay:begin:py vlatest -->\n<!-- overlay:end:py -->\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidVersion { version, .. } if version == "latest"));
    }

    #[test]
    fn upsert_same_version_is_byte_identical() {
        let source = "a\n<!-- overlay:begin:py v1.0.0 -->\nold body\n<!-- overlay:end:py -->\nb\n";
        let doc = SectionDocument::parse(source).unwrap();

        let (out, outcome) = doc
            .upsert(&section("py", "1.0.0", "entirely different body"), &Anchor::Auto)
            .unwrap();

        assert_eq!(out, source);
        assert_eq!(outcome, SectionOutcome::Unchanged);
    }

    #[test]
    fn upsert_new_version_touches_only_the_block() {
        let prefix = "before text\n";
        let suffix = "after text, untouched   \n\nwith blank lines\n";
        let source = format!(
            "{prefix}<!-- overlay:begin:py v1.0.0 -->\nold\n<!-- overlay:end:py -->\n{suffix}"
        );
        let doc = SectionDocument::parse(source).unwrap();

        let (out, outcome) = doc
            .upsert(&section("py", "1.1.0", "new body"), &Anchor::Auto)
            .unwrap();

        assert_eq!(
            outcome,
            SectionOutcome::Updated {
                previous: Version::new(1, 0, 0)
            }
        );
        assert!(out.starts_with(prefix));
        assert!(out.ends_with(suffix));
        assert!(out.contains("<!-- overlay:begin:py v1.1.0 -->\nnew body\n<!-- overlay:end:py -->"));
        assert!(!out.contains("old"));
    }

    #[test]
    fn upsert_missing_section_appends_at_end() {
        let doc = SectionDocument::parse("existing content\n").unwrap();

        let (out, outcome) = doc
            .upsert(&section("python", "0.1.0", "body line"), &Anchor::End)
            .unwrap();

        assert_eq!(outcome, SectionOutcome::Inserted);
        assert_eq!(
            out,
            "existing content\n<!-- overlay:begin:python v0.1.0 -->\nbody line\n<!-- overlay:end:python -->\n"
        );
    }

    #[test]
    fn upsert_inserts_before_user_region_by_default() {
        let source = "top\n<!-- overlay:user -->\nmy own notes\n";
        let doc = SectionDocument::parse(source).unwrap();

        let (out, _) = doc
            .upsert(&section("py", "0.1.0", "body"), &Anchor::Auto)
            .unwrap();

        let user_pos = out.find("<!-- overlay:user -->").unwrap();
        let block_pos = out.find("<!-- overlay:begin:py").unwrap();
        assert!(block_pos < user_pos);
        assert!(out.ends_with("my own notes\n"));
    }

    #[test]
    fn upsert_into_document_without_trailing_newline() {
        let doc = SectionDocument::parse("no trailing newline").unwrap();

        let (out, _) = doc
            .upsert(&section("py", "0.1.0", "body"), &Anchor::End)
            .unwrap();

        assert!(out.starts_with("no trailing newline\n<!-- overlay:begin:py"));
    }

    #[test]
    fn remove_deletes_block_and_markers() {
        let source = "a\n<!-- overlay:begin:py v1.0.0 -->\nbody\n<!-- overlay:end:py -->\nb\n";
        let doc = SectionDocument::parse(source).unwrap();

        let out = doc.remove("py").unwrap();
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn remove_missing_section_fails() {
        let doc = SectionDocument::parse("nothing here\n").unwrap();
        assert!(matches!(
            doc.remove("py"),
            Err(Error::SectionNotFound { .. })
        ));
    }

    #[test]
    fn empty_body_renders_adjacent_markers() {
        let doc = SectionDocument::parse("").unwrap();
        let (out, _) = doc
            .upsert(&section("py", "0.1.0", ""), &Anchor::End)
            .unwrap();
        assert_eq!(
            out,
            "<!-- overlay:begin:py v0.1.0 -->\n<!-- overlay:end:py -->\n"
        );
        // And it parses back
        let reparsed = SectionDocument::parse(out).unwrap();
        assert_eq!(reparsed.section_body("py"), Some(""));
    }
}
