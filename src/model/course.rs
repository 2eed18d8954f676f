use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::cinwiki::{MalformedResponse, QueryError};

/// Literal separator between name and instructor on the wire.
pub const SEPARATOR: &str = " - ";

// Codes end up as a raw URL path segment, so only URL-safe characters pass.
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9_.\-]*$").expect("course code regex"));

/// A course code typed by a user, trimmed and upper-cased.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CourseQuery {
    pub code: String,
}

impl CourseQuery {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return Err(QueryError::Empty);
        }
        if !CODE_RE.is_match(&code) {
            return Err(QueryError::InvalidCode(code));
        }
        Ok(CourseQuery { code })
    }

    /// Wiki page for this course: the base URL with the code appended, no encoding.
    pub fn page_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.code)
    }
}

impl fmt::Display for CourseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Name and instructor scraped from a course page.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct CourseRecord {
    pub name: String,
    pub instructor: String,
}

impl CourseRecord {
    pub fn new(name: impl Into<String>, instructor: impl Into<String>) -> Self {
        CourseRecord {
            name: name.into(),
            instructor: instructor.into(),
        }
    }

    pub fn empty() -> Self {
        CourseRecord::default()
    }

    /// Both fields were found.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.instructor.is_empty()
    }

    pub fn to_line(&self) -> ResponseLine {
        ResponseLine(format!("{}{}{}", self.name, SEPARATOR, self.instructor))
    }
}

/// Wire form of a [`CourseRecord`]: `"<name> - <instructor>"`, no terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseLine(String);

impl ResponseLine {
    pub fn new(line: impl Into<String>) -> Self {
        ResponseLine(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits on the last separator and trims both halves.
    ///
    /// The last occurrence is used so that a course name containing `" - "`
    /// still round-trips; instructor names are assumed not to contain it.
    pub fn split(&self) -> Result<CourseRecord, MalformedResponse> {
        let (name, instructor) = self
            .0
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| MalformedResponse(self.0.clone()))?;
        Ok(CourseRecord::new(name.trim(), instructor.trim()))
    }
}

impl fmt::Display for ResponseLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
