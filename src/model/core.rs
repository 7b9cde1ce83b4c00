//! Document-level types: units, extensions, metadata, build and attachments

use super::graph::ResourceGraph;
use super::{ExpectedKind, ResourceId};
use crate::error::{Error, Result};
use crate::mesh::{Mesh, Transform};
use crate::validator::Finding;
use std::fmt;
use std::str::FromStr;

/// Model unit of measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    /// Micrometre
    Micron,
    /// Millimetre
    #[default]
    Millimeter,
    /// Centimetre
    Centimeter,
    /// Inch
    Inch,
    /// Foot
    Foot,
    /// Metre
    Meter,
}

impl Unit {
    /// The attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Micron => "micron",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
            Unit::Meter => "meter",
        }
    }

    /// Length of one unit in millimetres
    pub fn to_millimeters(&self) -> f64 {
        match self {
            Unit::Micron => 0.001,
            Unit::Millimeter => 1.0,
            Unit::Centimeter => 10.0,
            Unit::Inch => 25.4,
            Unit::Foot => 304.8,
            Unit::Meter => 1000.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "micron" => Ok(Unit::Micron),
            "millimeter" => Ok(Unit::Millimeter),
            "centimeter" => Ok(Unit::Centimeter),
            "inch" => Ok(Unit::Inch),
            "foot" => Ok(Unit::Foot),
            "meter" => Ok(Unit::Meter),
            _ => Err(Error::schema(format!("unknown unit '{}'", s))),
        }
    }
}

/// 3MF namespaces this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Core specification
    Core,
    /// Materials and properties
    Material,
    /// Production (UUIDs, external paths)
    Production,
    /// Slices
    Slice,
    /// Beam lattice, kept as pass-through content
    BeamLattice,
    /// Volumetric images
    Volumetric,
}

impl Extension {
    /// Every known extension
    pub const ALL: [Extension; 6] = [
        Extension::Core,
        Extension::Material,
        Extension::Production,
        Extension::Slice,
        Extension::BeamLattice,
        Extension::Volumetric,
    ];

    /// Namespace URI
    pub fn namespace(&self) -> &'static str {
        match self {
            Extension::Core => "http://schemas.microsoft.com/3dmanufacturing/core/2015/02",
            Extension::Material => "http://schemas.microsoft.com/3dmanufacturing/material/2015/02",
            Extension::Production => {
                "http://schemas.microsoft.com/3dmanufacturing/production/2015/06"
            }
            Extension::Slice => "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07",
            Extension::BeamLattice => {
                "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02"
            }
            Extension::Volumetric => {
                "http://schemas.microsoft.com/3dmanufacturing/volumetric/2018/11"
            }
        }
    }

    /// Look up an extension by namespace URI
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.namespace() == namespace)
    }

    /// Prefix used when a document does not declare one
    pub fn default_prefix(&self) -> &'static str {
        match self {
            Extension::Core => "",
            Extension::Material => "m",
            Extension::Production => "p",
            Extension::Slice => "s",
            Extension::BeamLattice => "b",
            Extension::Volumetric => "v",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Extension::Core => "Core",
            Extension::Material => "Material",
            Extension::Production => "Production",
            Extension::Slice => "Slice",
            Extension::BeamLattice => "BeamLattice",
            Extension::Volumetric => "Volumetric",
        }
    }
}

/// A `<metadata>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Name, possibly namespace-prefixed
    pub name: String,
    /// Text value
    pub value: String,
    /// Whether editors should keep the entry when the model changes
    pub preserve: Option<bool>,
    /// Declared value type, for example `xs:string`
    pub value_type: Option<String>,
}

impl MetadataEntry {
    /// Create a new metadata entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            preserve: None,
            value_type: None,
        }
    }
}

/// An object instantiated in the build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildItem {
    /// The instantiated object
    pub object_id: ResourceId,
    /// Placement in build space
    pub transform: Option<Transform>,
    /// Optional part number
    pub part_number: Option<String>,
    /// Production extension UUID
    pub uuid: Option<String>,
    /// Production extension: model part holding the object
    pub path: Option<String>,
    /// Attributes from other recognized namespaces
    pub extra_attributes: Vec<(String, String)>,
}

impl BuildItem {
    /// Item without transform
    pub fn new(object_id: ResourceId) -> Self {
        Self {
            object_id,
            transform: None,
            part_number: None,
            uuid: None,
            path: None,
            extra_attributes: Vec::new(),
        }
    }

    /// Item with a placement transform
    pub fn with_transform(object_id: ResourceId, transform: Transform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::new(object_id)
        }
    }
}

/// The `<build>` section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Build {
    /// Items in document order
    pub(crate) items: Vec<BuildItem>,
    /// Production extension UUID of the build
    pub uuid: Option<String>,
}

impl Build {
    /// Items in document order
    pub fn items(&self) -> &[BuildItem] {
        &self.items
    }
}

/// A package part other than the model part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Absolute part name without the leading slash, e.g. `3D/Textures/a.png`
    pub path: String,
    /// MIME type
    pub content_type: String,
    /// Raw bytes
    pub data: Vec<u8>,
    /// Relationship type from the model part, when it has one
    pub relationship_type: Option<String>,
}

impl Attachment {
    /// Create a new attachment
    pub fn new(path: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            data,
            relationship_type: None,
        }
    }
}

/// An in-memory 3MF document
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Model unit
    pub unit: Unit,
    /// `xml:lang` of the model part
    pub language: Option<String>,
    /// Model-level metadata
    pub metadata: Vec<MetadataEntry>,
    /// Package path of the package thumbnail
    pub thumbnail: Option<String>,
    /// Namespace URIs listed in `requiredextensions`
    pub required_extensions: Vec<String>,
    /// Extra namespace declarations as `(prefix, uri)`
    pub namespaces: Vec<(String, String)>,
    /// Package path of the model part, without the leading slash
    ///
    /// Set from the root relationship on load; `None` saves to
    /// [`MODEL_PATH`](crate::MODEL_PATH).
    pub model_path: Option<String>,
    /// Non-model package parts
    pub attachments: Vec<Attachment>,
    /// Unmodeled children of `<model>`, kept verbatim
    pub pass_through: Vec<String>,
    /// Unmodeled children of `<resources>`, kept verbatim
    pub resource_pass_through: Vec<String>,
    pub(crate) resources: ResourceGraph,
    pub(crate) build: Build,
    pub(crate) load_findings: Vec<Finding>,
}

impl Document {
    /// Empty document in millimetres
    pub fn new() -> Self {
        Self::default()
    }

    /// The resource graph
    pub fn resources(&self) -> &ResourceGraph {
        &self.resources
    }

    /// The resource graph, for edits
    pub fn resources_mut(&mut self) -> &mut ResourceGraph {
        &mut self.resources
    }

    /// The build section
    pub fn build(&self) -> &Build {
        &self.build
    }

    /// Set the production UUID of the build
    pub fn set_build_uuid(&mut self, uuid: Option<String>) {
        self.build.uuid = uuid;
    }

    /// Append a build item after checking that it names an object
    pub fn add_build_item(&mut self, item: BuildItem) -> Result<usize> {
        if item.path.is_none() {
            self.resources.resolve(item.object_id, ExpectedKind::Object)?;
        }
        self.build.items.push(item);
        Ok(self.build.items.len() - 1)
    }

    /// Remove and return the build item at `index`
    pub fn remove_build_item(&mut self, index: usize) -> Option<BuildItem> {
        (index < self.build.items.len()).then(|| self.build.items.remove(index))
    }

    /// Remove a resource that neither the build nor another resource uses
    pub fn remove_resource(&mut self, id: ResourceId) -> Result<()> {
        if let Some(index) = self
            .build
            .items
            .iter()
            .position(|item| item.path.is_none() && item.object_id == id)
        {
            return Err(Error::ResourceInUse {
                id,
                referrer: format!("build item {}", index),
            });
        }
        self.resources.remove(id).map(|_| ())
    }

    /// Merged geometry of an object, components resolved
    pub fn resolve_flat_mesh(&self, id: ResourceId) -> Result<Mesh> {
        self.resources.flatten(id)
    }

    /// Findings recorded while loading in lenient mode
    pub fn load_findings(&self) -> &[Finding] {
        &self.load_findings
    }

    /// Attachment stored at `path`
    pub fn attachment(&self, path: &str) -> Option<&Attachment> {
        let path = path.trim_start_matches('/');
        self.attachments.iter().find(|a| a.path == path)
    }

    /// Add or replace an attachment
    pub fn set_attachment(&mut self, attachment: Attachment) {
        let path = attachment.path.trim_start_matches('/').to_string();
        let attachment = Attachment { path, ..attachment };
        match self.attachments.iter_mut().find(|a| a.path == attachment.path) {
            Some(existing) => *existing = attachment,
            None => self.attachments.push(attachment),
        }
    }

    /// Value of the first metadata entry named `name`
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mesh::Vertex;
    use crate::model::{MeshObject, ObjectInfo};

    fn document_with_object() -> (Document, ResourceId) {
        let mut doc = Document::new();
        let mut mesh = Mesh::new();
        for p in [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)] {
            mesh.add_vertex(Vertex::new(p.0, p.1, p.2)).unwrap();
        }
        mesh.add_triangle(0, 1, 2).unwrap();
        let id = doc
            .resources_mut()
            .create(MeshObject::new(ObjectInfo::named("tri"), mesh).into())
            .unwrap();
        (doc, id)
    }

    #[test]
    fn test_unit_round_trip() {
        for unit in [Unit::Micron, Unit::Inch, Unit::Meter] {
            assert_eq!(unit.as_str().parse::<Unit>().unwrap(), unit);
        }
        assert!("furlong".parse::<Unit>().is_err());
        assert_eq!(Unit::Inch.to_millimeters(), 25.4);
    }

    #[test]
    fn test_extension_namespaces() {
        for ext in Extension::ALL {
            assert_eq!(Extension::from_namespace(ext.namespace()), Some(ext));
        }
        assert_eq!(Extension::from_namespace("urn:unknown"), None);
    }

    #[test]
    fn test_remove_resource_used_by_build_item() {
        let (mut doc, id) = document_with_object();
        doc.add_build_item(BuildItem::new(id)).unwrap();

        let err = doc.remove_resource(id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceInUse);
        assert!(doc.resources().get(id).is_some());

        doc.remove_build_item(0).unwrap();
        doc.remove_resource(id).unwrap();
        assert!(doc.resources().get(id).is_none());
    }

    #[test]
    fn test_add_build_item_checks_reference() {
        let (mut doc, id) = document_with_object();
        let err = doc.add_build_item(BuildItem::new(id + 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
        assert!(doc.build().items().is_empty());
    }

    #[test]
    fn test_set_attachment_replaces_by_path() {
        let mut doc = Document::new();
        doc.set_attachment(Attachment::new("/Metadata/a.png", "image/png", vec![1]));
        doc.set_attachment(Attachment::new("Metadata/a.png", "image/png", vec![2]));
        assert_eq!(doc.attachments.len(), 1);
        assert_eq!(doc.attachment("/Metadata/a.png").unwrap().data, vec![2]);
    }
}
