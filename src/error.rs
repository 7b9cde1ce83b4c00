//! Error types for the 3MF document engine
//!
//! Every failure carries a bracketed code so callers can match on messages in
//! logs, and [`Error::kind`] folds the variants into the coarse taxonomy used
//! throughout the crate.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and package container errors
//! - **E2xxx**: XML and schema errors
//! - **E3xxx**: Geometry kernel errors
//! - **E4xxx**: Resource graph integrity errors
//! - **E5xxx**: Validation outcomes

use crate::model::ResourceId;
use crate::validator::Finding;
use std::io;
use thiserror::Error;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was absent
    InvalidParameter,
    /// Triangle indices out of range or repeated
    InvalidTopology,
    /// A reference names an ID that does not exist
    UnresolvedReference,
    /// A reference names a resource of an incompatible variant
    TypeMismatch,
    /// An object contains itself through its components
    CircularReference,
    /// A resource cannot be removed while something still references it
    ResourceInUse,
    /// The ZIP container or the XML is structurally broken
    MalformedPackage,
    /// Well-formed XML that violates 3MF constraints
    SchemaViolation,
    /// Non-finite coordinates
    GeometryError,
    /// The byte source or sink failed
    Io,
    /// Validation produced findings that block the operation
    ValidationFailed,
}

/// Additional context for errors
///
/// Provides optional supplementary information to help with debugging:
/// the package part, the line and column within it, and a hint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The part where the error occurred (a path within the package)
    pub file: Option<String>,

    /// Line number where the error occurred
    pub line: Option<usize>,

    /// Column number where the error occurred
    pub column: Option<usize>,

    /// A helpful hint for resolving the error
    pub hint: Option<String>,
}

impl ErrorContext {
    /// Create a new empty error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error context with just a hint
    pub fn with_hint(hint: impl Into<String>) -> Self {
        Self {
            hint: Some(hint.into()),
            ..Self::default()
        }
    }

    /// Set the file location
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the line number
    pub fn line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the column number
    pub fn column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Set the hint
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.file.is_none() && self.line.is_none() && self.hint.is_none()
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();

        if let Some(ref file) = self.file {
            parts.push(format!("File: {}", file));
        }

        if let (Some(line), Some(column)) = (self.line, self.column) {
            parts.push(format!("Location: line {}, column {}", line, column));
        } else if let Some(line) = self.line {
            parts.push(format!("Line: {}", line));
        }

        if let Some(ref hint) = self.hint {
            parts.push(format!("Hint: {}", hint));
        }

        write!(f, "\n{}", parts.join("\n"))
    }
}

fn format_cycle(path: &[ResourceId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

fn summarize_findings(findings: &[Finding]) -> String {
    match findings.first() {
        Some(first) if findings.len() > 1 => {
            format!("{} (and {} more)", first, findings.len() - 1)
        }
        Some(first) => first.to_string(),
        None => "no findings".to_string(),
    }
}

/// Errors produced by the document engine
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on the byte source or sink
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted or truncated archive
    /// - Unsupported compression method
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required part in the package
    ///
    /// **Error Code**: E1003
    #[error("[E1003] Missing required part: {0}")]
    MissingFile(String),

    /// The package structure (content types, relationships, part names)
    /// is broken
    ///
    /// **Error Code**: E1004
    #[error("[E1004] Malformed package: {0}")]
    InvalidPackage(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Well-formed XML that breaks a 3MF rule
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Missing required attribute
    /// - Duplicate resource ID
    /// - Reference to an undeclared resource
    #[error("[E2003] Schema violation: {message}{context}")]
    SchemaViolation {
        /// What went wrong
        message: String,
        /// Where it went wrong
        context: Box<ErrorContext>,
    },

    /// Numeric attribute that could not be parsed
    ///
    /// **Error Code**: E2004
    #[error("[E2004] Parse error: {message}{context}")]
    ParseError {
        /// What went wrong
        message: String,
        /// Where it went wrong
        context: Box<ErrorContext>,
    },

    /// The model declares a required extension this reader does not support
    ///
    /// **Error Code**: E2005
    #[error("[E2005] Unsupported required extension: {0}")]
    UnsupportedExtension(String),

    /// The model part ends while an element is still open
    ///
    /// **Error Code**: E2007
    ///
    /// **Common Causes**:
    /// - Truncated download or partially written archive entry
    #[error("[E2007] Unexpected end of XML: {message}{context}")]
    UnexpectedEof {
        /// What was still open
        message: String,
        /// Where the input ended
        context: Box<ErrorContext>,
    },

    /// Writing XML failed
    ///
    /// **Error Code**: E2006
    #[error("[E2006] XML write error: {0}")]
    XmlWrite(String),

    /// A required argument was absent
    ///
    /// **Error Code**: E3001
    #[error("[E3001] Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Triangle indices out of range or not pairwise distinct
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Invalid topology: {0}")]
    InvalidTopology(String),

    /// NaN or infinite coordinate
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Geometry error: {0}")]
    GeometryError(String),

    /// A reference names an ID that does not exist
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Unresolved reference to resource {id} ({context})")]
    UnresolvedReference {
        /// The missing ID
        id: ResourceId,
        /// Who holds the reference
        context: String,
    },

    /// A reference names a resource of the wrong variant
    ///
    /// **Error Code**: E4002
    #[error("[E4002] Resource {id} is a {found}, expected {expected}")]
    TypeMismatch {
        /// The referenced ID
        id: ResourceId,
        /// The variant the reference requires
        expected: String,
        /// The variant actually stored under that ID
        found: String,
    },

    /// Object containment cycle
    ///
    /// **Error Code**: E4003
    #[error("[E4003] Circular component reference: {}", format_cycle(.path))]
    CircularReference {
        /// The containment path, ending with the repeated ID
        path: Vec<ResourceId>,
    },

    /// Removal refused because something still references the resource
    ///
    /// **Error Code**: E4004
    #[error("[E4004] Resource {id} is still referenced by {referrer}")]
    ResourceInUse {
        /// The resource that was to be removed
        id: ResourceId,
        /// The first referrer found
        referrer: String,
    },

    /// Validation produced findings that block a load or a save
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Validation failed: {}", summarize_findings(.findings))]
    ValidationFailed {
        /// The blocking findings
        findings: Vec<Finding>,
    },
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::XmlWrite(_) => ErrorKind::Io,
            Error::Zip(_)
            | Error::MissingFile(_)
            | Error::InvalidPackage(_)
            | Error::Xml(_)
            | Error::XmlAttr(_)
            | Error::UnexpectedEof { .. } => ErrorKind::MalformedPackage,
            Error::SchemaViolation { .. }
            | Error::ParseError { .. }
            | Error::UnsupportedExtension(_) => ErrorKind::SchemaViolation,
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::InvalidTopology(_) => ErrorKind::InvalidTopology,
            Error::GeometryError(_) => ErrorKind::GeometryError,
            Error::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::CircularReference { .. } => ErrorKind::CircularReference,
            Error::ResourceInUse { .. } => ErrorKind::ResourceInUse,
            Error::ValidationFailed { .. } => ErrorKind::ValidationFailed,
        }
    }

    /// Create a schema violation without location
    pub fn schema(message: impl Into<String>) -> Self {
        Error::SchemaViolation {
            message: message.into(),
            context: Box::default(),
        }
    }

    /// Create a schema violation with location
    pub fn schema_at(message: impl Into<String>, context: ErrorContext) -> Self {
        Error::SchemaViolation {
            message: message.into(),
            context: Box::new(context),
        }
    }

    /// Create an error for a missing required attribute
    pub fn missing_attribute(element: &str, attribute: &str, context: ErrorContext) -> Self {
        Error::schema_at(
            format!("<{}> is missing required attribute '{}'", element, attribute),
            context,
        )
    }

    /// Create a numeric parse error with location
    pub fn parse_error_at(message: impl Into<String>, context: ErrorContext) -> Self {
        Error::ParseError {
            message: message.into(),
            context: Box::new(context),
        }
    }

    /// Create an unexpected end-of-input error with location
    pub fn unexpected_eof(message: impl Into<String>, context: ErrorContext) -> Self {
        Error::UnexpectedEof {
            message: message.into(),
            context: Box::new(context),
        }
    }

    /// Create an XML write error
    pub fn xml_write(message: impl Into<String>) -> Self {
        Error::XmlWrite(message.into())
    }

    /// Findings attached to a [`Error::ValidationFailed`]
    pub fn findings(&self) -> &[Finding] {
        match self {
            Error::ValidationFailed { findings } => findings,
            _ => &[],
        }
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::parse_error_at(format!("invalid floating-point value: {}", err), ErrorContext::new())
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::parse_error_at(format!("invalid integer value: {}", err), ErrorContext::new())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for Error {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Error::XmlAttr(format!("bad escape sequence: {}", err))
    }
}
