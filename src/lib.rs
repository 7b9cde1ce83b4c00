//! # lib3mf-engine
//!
//! A pure Rust document engine for 3MF (3D Manufacturing Format) packages.
//!
//! A 3MF file is a ZIP archive following the Open Packaging Conventions. It
//! holds an XML model part describing meshes, assemblies of components,
//! materials and textures, volumetric images and slice stacks, all tied
//! together by integer resource IDs. This crate loads such a package into a
//! [`Document`], lets callers edit it through an ID-addressed
//! [`ResourceGraph`] that refuses edits leaving a reference dangling, checks
//! it with a validation engine and writes it back.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Mesh kernel with atomic edits and merge operations
//! - Resource graph with reference checks, cycle detection and flattening
//! - Package reading and writing with content types, relationships,
//!   thumbnails and arbitrary attachments
//! - Materials, production, slice and volumetric extensions; beam lattice and
//!   other recognized content preserved as pass-through
//! - Validation reporting Fatal, Error and Warning findings
//!
//! ## Example
//!
//! ```no_run
//! use lib3mf_engine::{Document, Strictness};
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Document::load(File::open("model.3mf")?)?;
//! println!("{} resources", document.resources().len());
//!
//! for finding in document.validate(Strictness::Standard).findings() {
//!     println!("{}", finding);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod mesh;
pub mod model;
mod opc;
mod parser;
pub mod validator;
mod writer;

pub use config::{ParserConfig, Strictness, UnknownNamespacePolicy, WriterConfig};
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use mesh::{BoundingBox, Mesh, MeshBuilder, Transform, Triangle, Vertex};
pub use model::{
    Attachment, BaseMaterial, BaseMaterialGroup, Build, BuildItem, Color, ColorGroup, Component,
    ComponentsObject, Document, ExpectedKind, Extension, FilterMode, Image3D,
    Image3DChannelSelector, ImageSheet, ImageStack, MeshObject, MetadataEntry, ObjectInfo,
    ObjectType, Reference, ReferenceRole, Resource, ResourceGraph, ResourceId, ResourceKind, Slice,
    SlicePolygon, SliceRef, SliceStack, Tex2Coord, Texture2D, Texture2DGroup, TileStyle, Unit,
    Vertex2D,
};
pub use opc::{MODEL_PATH, TEXTURE_REL_TYPE, THUMBNAIL_REL_TYPE};
pub use validator::{Finding, FindingCode, Location, Severity, ValidationReport};

use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::{info, warn};

impl Document {
    /// Load a 3MF package with the default configuration
    ///
    /// All known extensions are supported, unknown namespaces are ignored
    /// and the document is validated at standard strictness.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_engine::Document;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let document = Document::load(File::open("model.3mf")?)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::load_with_config(reader, ParserConfig::default())
    }

    /// Load a 3MF package with a custom configuration
    ///
    /// Parse errors abort the load unless the config is lenient. When the
    /// config validates, Fatal findings fail the load with
    /// [`Error::ValidationFailed`], and so do Error findings in strict mode.
    /// A lenient load never fails on findings; call [`Document::validate`]
    /// to see them.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_engine::{Document, ParserConfig, UnknownNamespacePolicy};
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ParserConfig::strict()
    ///     .with_unknown_namespaces(UnknownNamespacePolicy::Preserve);
    /// let document = Document::load_with_config(File::open("model.3mf")?, config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_with_config<R: Read + Seek>(reader: R, config: ParserConfig) -> Result<Self> {
        let mut package = opc::Package::open(reader)?;
        let xml = package.read_model()?;
        let mut document = parser::parse_model(&xml, package.model_path(), &config)?;
        document.model_path = Some(package.model_path().to_string());
        document.thumbnail = package.thumbnail().map(str::to_string);
        document.attachments = package.read_attachments()?;

        if config.validates() {
            let report = validator::validate_document(&document, config.strictness());
            if config.strictness() == Strictness::Lenient {
                if !report.is_empty() {
                    warn!(
                        findings = report.findings().len(),
                        fatal = report.count(Severity::Fatal),
                        "lenient load kept a document with findings"
                    );
                }
            } else {
                let blocking = report.blocking(config.strictness());
                if !blocking.is_empty() {
                    return Err(Error::ValidationFailed { findings: blocking });
                }
            }
        }

        info!(
            model = package.model_path(),
            resources = document.resources().len(),
            attachments = document.attachments.len(),
            "loaded 3MF document"
        );
        Ok(document)
    }

    /// Load a 3MF file from disk with the default configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::load(std::io::BufReader::new(file))
    }

    /// Run every validation check at `strictness`
    ///
    /// Findings recorded during a lenient load come first.
    pub fn validate(&self, strictness: Strictness) -> ValidationReport {
        validator::validate_document(self, strictness)
    }

    /// Write the document as a 3MF package with the default configuration
    ///
    /// Returns the writer after finishing the ZIP archive.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_engine::Document;
    /// use std::io::Cursor;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let document = Document::new();
    /// let bytes = document.save(Cursor::new(Vec::new()))?.into_inner();
    /// # Ok(())
    /// # }
    /// ```
    pub fn save<W: Write + Seek>(&self, writer: W) -> Result<W> {
        self.save_with_config(writer, &WriterConfig::default())
    }

    /// Write the document as a 3MF package
    ///
    /// When the config validates, Fatal findings refuse the save, and so do
    /// Error findings in strict mode. Nothing is written in that case.
    pub fn save_with_config<W: Write + Seek>(&self, writer: W, config: &WriterConfig) -> Result<W> {
        if config.validates() {
            let blocking = self.validate(config.strictness()).blocking(config.strictness());
            if !blocking.is_empty() {
                return Err(Error::ValidationFailed { findings: blocking });
            }
        }

        let model_xml = writer::write_model(self)?;
        let texture_paths = writer::texture_paths(self);
        let writer = opc::write_package(
            writer,
            opc::PackageParts {
                model_path: self.model_path.as_deref().unwrap_or(MODEL_PATH),
                model_xml: &model_xml,
                thumbnail: self.thumbnail.as_deref(),
                attachments: &self.attachments,
                texture_paths: &texture_paths,
            },
        )?;

        info!(
            resources = self.resources().len(),
            attachments = self.attachments.len(),
            bytes = model_xml.len(),
            "saved 3MF document"
        );
        Ok(writer)
    }

    /// Write the document to a file on disk
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.save(file)?;
        Ok(())
    }
}
