//! Validation of complete documents
//!
//! Validation never stops at the first problem. Every check appends
//! [`Finding`]s to a shared list, and the caller decides what to do with
//! them: a load fails on Fatal findings, a strict load also on Errors, and
//! a save refuses to write anything with Fatal findings.
//!
//! Checks are grouped by concern:
//! - `core`: references, containment cycles, mesh topology, transforms,
//!   orphaned resources
//! - `material`: property index ranges and texture parts
//! - `volumetric`: channel selectors and image stacks
//! - `production`: UUIDs, external paths, the package thumbnail
//! - `slice`: slice stack ordering and polygon indices

mod core;
mod material;
mod production;
mod slice;
mod volumetric;

use crate::config::Strictness;
use crate::model::{Document, ResourceId};
use std::fmt;
use tracing::debug;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Worth knowing, never blocks
    Warning,
    /// Violates the format; blocks only in strict mode
    Error,
    /// The document cannot be used as is; always blocks a save
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        })
    }
}

/// Machine-readable kind of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingCode {
    /// A reference names a missing ID
    UnresolvedReference,
    /// A reference names the wrong variant
    TypeMismatch,
    /// Object containment cycle
    CircularReference,
    /// Triangle vertex index out of range
    TriangleIndexOutOfBounds,
    /// Triangle repeats a vertex index
    DegenerateTriangle,
    /// A triangle was dropped while reading
    DroppedTriangle,
    /// Resource not reachable from any build item
    OrphanedResource,
    /// Property index beyond the group size
    PropertyIndexOutOfRange,
    /// Transform with NaN or infinite values
    NonFiniteTransform,
    /// Transform with zero determinant
    SingularTransform,
    /// Transform with negative determinant
    MirroredTransform,
    /// Selector channel not declared by its image
    UnknownChannel,
    /// Empty channel name
    EmptyChannelName,
    /// Value range with `min > max` or non-finite bounds
    InvalidValueRange,
    /// Image stack without sheets or pixels
    EmptyImageStack,
    /// Referenced package part is missing
    MissingAttachment,
    /// Texture content type is not PNG or JPEG
    UnsupportedContentType,
    /// UUID not in 8-4-4-4-12 form
    InvalidUuid,
    /// UUID used twice
    DuplicateUuid,
    /// Reference into another model part
    ExternalReference,
    /// Slice heights not increasing
    SliceOrder,
    /// Slice polygon vertex index out of range
    SliceIndexOutOfBounds,
}

impl FindingCode {
    /// Stable identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCode::UnresolvedReference => "unresolved-reference",
            FindingCode::TypeMismatch => "type-mismatch",
            FindingCode::CircularReference => "circular-reference",
            FindingCode::TriangleIndexOutOfBounds => "triangle-index-out-of-bounds",
            FindingCode::DegenerateTriangle => "degenerate-triangle",
            FindingCode::DroppedTriangle => "dropped-triangle",
            FindingCode::OrphanedResource => "orphaned-resource",
            FindingCode::PropertyIndexOutOfRange => "property-index-out-of-range",
            FindingCode::NonFiniteTransform => "non-finite-transform",
            FindingCode::SingularTransform => "singular-transform",
            FindingCode::MirroredTransform => "mirrored-transform",
            FindingCode::UnknownChannel => "unknown-channel",
            FindingCode::EmptyChannelName => "empty-channel-name",
            FindingCode::InvalidValueRange => "invalid-value-range",
            FindingCode::EmptyImageStack => "empty-image-stack",
            FindingCode::MissingAttachment => "missing-attachment",
            FindingCode::UnsupportedContentType => "unsupported-content-type",
            FindingCode::InvalidUuid => "invalid-uuid",
            FindingCode::DuplicateUuid => "duplicate-uuid",
            FindingCode::ExternalReference => "external-reference",
            FindingCode::SliceOrder => "slice-order",
            FindingCode::SliceIndexOutOfBounds => "slice-index-out-of-bounds",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a finding applies
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// Resource ID
    pub resource: Option<ResourceId>,
    /// Build item position
    pub build_item: Option<usize>,
    /// Component position within its object
    pub component: Option<usize>,
    /// Triangle index within the mesh
    pub triangle: Option<usize>,
    /// Vertex index within the mesh
    pub vertex: Option<usize>,
    /// Package part
    pub part: Option<String>,
}

impl Location {
    /// The document as a whole
    pub fn document() -> Self {
        Self::default()
    }

    /// A resource
    pub fn resource(id: ResourceId) -> Self {
        Self {
            resource: Some(id),
            ..Self::default()
        }
    }

    /// A build item
    pub fn build_item(index: usize) -> Self {
        Self {
            build_item: Some(index),
            ..Self::default()
        }
    }

    /// Narrow to a triangle
    pub fn triangle(mut self, index: usize) -> Self {
        self.triangle = Some(index);
        self
    }

    /// Narrow to a vertex
    pub fn vertex(mut self, index: usize) -> Self {
        self.vertex = Some(index);
        self
    }

    /// Narrow to a component
    pub fn component(mut self, index: usize) -> Self {
        self.component = Some(index);
        self
    }

    /// Attach a package part
    pub fn part(mut self, part: impl Into<String>) -> Self {
        self.part = Some(part.into());
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(id) = self.resource {
            parts.push(format!("resource {}", id));
        }
        if let Some(index) = self.build_item {
            parts.push(format!("build item {}", index));
        }
        if let Some(index) = self.component {
            parts.push(format!("component {}", index));
        }
        if let Some(index) = self.triangle {
            parts.push(format!("triangle {}", index));
        }
        if let Some(index) = self.vertex {
            parts.push(format!("vertex {}", index));
        }
        if let Some(ref part) = self.part {
            parts.push(format!("part {}", part));
        }
        if parts.is_empty() {
            f.write_str("document")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// One validation result
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// How serious it is
    pub severity: Severity,
    /// What kind of problem
    pub code: FindingCode,
    /// Where
    pub location: Location,
    /// Human-readable detail
    pub message: String,
}

impl Finding {
    /// Create a finding
    pub fn new(
        severity: Severity,
        code: FindingCode,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at {}: {}",
            self.severity, self.code, self.location, self.message
        )
    }
}

/// All findings of one validation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    findings: Vec<Finding>,
}

impl ValidationReport {
    /// Findings in check order
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Take the findings
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    /// Whether nothing was found
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Number of findings at `severity`
    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Whether any finding is Fatal
    pub fn has_fatal(&self) -> bool {
        self.count(Severity::Fatal) > 0
    }

    /// Findings with a given code
    pub fn with_code(&self, code: FindingCode) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.code == code)
    }

    /// Findings that block an operation at `strictness`
    ///
    /// Fatal findings always block; Error findings block in strict mode.
    pub fn blocking(&self, strictness: Strictness) -> Vec<Finding> {
        self.findings
            .iter()
            .filter(|f| {
                f.severity == Severity::Fatal
                    || (strictness == Strictness::Strict && f.severity == Severity::Error)
            })
            .cloned()
            .collect()
    }
}

impl IntoIterator for ValidationReport {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}

/// Warnings strict mode treats as errors
///
/// Only unused objects count as orphans there. Property resources such as
/// images, selectors and materials may be used from content kept as
/// pass-through, which the reachability walk cannot see.
fn escalates_when_strict(document: &Document, finding: &Finding) -> bool {
    match finding.code {
        FindingCode::DegenerateTriangle => true,
        FindingCode::OrphanedResource => finding
            .location
            .resource
            .and_then(|id| document.resources().get(id))
            .is_some_and(|resource| resource.kind().is_object()),
        _ => false,
    }
}

/// Run every check over `document`
///
/// Findings recorded while reading the document come first. In strict mode
/// degenerate triangles and orphaned objects are raised to Error.
pub fn validate_document(document: &Document, strictness: Strictness) -> ValidationReport {
    let mut findings = document.load_findings().to_vec();

    core::check_references(document, &mut findings);
    core::check_cycles(document, &mut findings);
    core::check_meshes(document, &mut findings);
    core::check_transforms(document, &mut findings);
    core::check_orphans(document, &mut findings);
    material::check_property_indices(document, &mut findings);
    material::check_textures(document, &mut findings);
    volumetric::check_images(document, &mut findings);
    volumetric::check_channel_selectors(document, &mut findings);
    production::check_uuids(document, &mut findings);
    production::check_external_paths(document, &mut findings);
    production::check_thumbnail(document, &mut findings);
    slice::check_slice_stacks(document, &mut findings);

    if strictness == Strictness::Strict {
        for finding in &mut findings {
            if escalates_when_strict(document, finding) {
                finding.severity = Severity::Error;
            }
        }
    }

    let report = ValidationReport { findings };
    debug!(
        "validation: {} fatal, {} error, {} warning",
        report.count(Severity::Fatal),
        report.count(Severity::Error),
        report.count(Severity::Warning)
    );
    report
}
