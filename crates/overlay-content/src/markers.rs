//! Marker grammar for managed sections
//!
//! A managed section is delimited by a begin line
//! `<!-- <prefix>:begin:<name> v<version> -->` and an end line
//! `<!-- <prefix>:end:<name> -->`. A standalone `<!-- <prefix>:user -->` line
//! heads the trailing user-customization region that new sections are
//! inserted before.

use regex::Regex;
use std::sync::LazyLock;

use semver::Version;

/// Marker prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "overlay";

static BEGIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*<!--\s*([A-Za-z0-9_-]+):begin:([A-Za-z0-9._-]+)\s+v(\S+)\s*-->\s*$")
        .unwrap()
});

static END_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*<!--\s*([A-Za-z0-9_-]+):end:([A-Za-z0-9._-]+)\s*-->\s*$").unwrap()
});

static USER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*<!--\s*([A-Za-z0-9_-]+):user\s*-->\s*$").unwrap());

/// Marker dialect for one document family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    prefix: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Markers {
    /// Use a custom marker prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Render a begin marker line (without line terminator).
    pub fn begin(&self, name: &str, version: &Version) -> String {
        format!("<!-- {}:begin:{} v{} -->", self.prefix, name, version)
    }

    /// Render an end marker line (without line terminator).
    pub fn end(&self, name: &str) -> String {
        format!("<!-- {}:end:{} -->", self.prefix, name)
    }

    /// Render the user-customization marker line.
    pub fn user(&self) -> String {
        format!("<!-- {}:user -->", self.prefix)
    }

    /// Classify one line of a document.
    ///
    /// Marker lines with a different prefix are treated as plain text, so two
    /// tools with distinct prefixes can own sections in the same file.
    pub(crate) fn classify<'a>(&self, line: &'a str) -> MarkerLine<'a> {
        if let Some(caps) = BEGIN_PATTERN.captures(line) {
            if &caps[1] == self.prefix {
                let (name, version) = (caps.get(2), caps.get(3));
                if let (Some(name), Some(version)) = (name, version) {
                    return MarkerLine::Begin {
                        name: name.as_str(),
                        version: version.as_str(),
                    };
                }
            }
            return MarkerLine::Text;
        }
        if let Some(caps) = END_PATTERN.captures(line) {
            if &caps[1] == self.prefix
                && let Some(name) = caps.get(2)
            {
                return MarkerLine::End {
                    name: name.as_str(),
                };
            }
            return MarkerLine::Text;
        }
        if let Some(caps) = USER_PATTERN.captures(line) {
            if &caps[1] == self.prefix {
                return MarkerLine::User;
            }
        }
        MarkerLine::Text
    }
}

/// What one scanned line is.
pub(crate) enum MarkerLine<'a> {
    Begin { name: &'a str, version: &'a str },
    End { name: &'a str },
    User,
    Text,
}
