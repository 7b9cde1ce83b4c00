//! Object resources

use super::{MetadataEntry, ResourceId};
use crate::error::{Error, Result};
use crate::mesh::{Mesh, Transform};
use std::fmt;
use std::str::FromStr;

/// Type of object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// A standard model object
    #[default]
    Model,
    /// A support structure
    Support,
    /// A solid support structure
    SolidSupport,
    /// An open surface
    Surface,
    /// Other type
    Other,
}

impl ObjectType {
    /// The attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Surface => "surface",
            ObjectType::Other => "other",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(ObjectType::Model),
            "support" => Ok(ObjectType::Support),
            "solidsupport" => Ok(ObjectType::SolidSupport),
            "surface" => Ok(ObjectType::Surface),
            "other" => Ok(ObjectType::Other),
            _ => Err(Error::schema(format!("unknown object type '{}'", s))),
        }
    }
}

/// Attributes shared by mesh and components objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectInfo {
    /// Optional object name
    pub name: Option<String>,
    /// Object type
    pub object_type: ObjectType,
    /// Optional part number
    pub part_number: Option<String>,
    /// Default property group for the object's triangles
    pub pid: Option<ResourceId>,
    /// Default index into `pid`
    pub pindex: Option<u32>,
    /// Package path of a per-object thumbnail
    pub thumbnail: Option<String>,
    /// Slice stack holding pre-sliced geometry for this object
    pub slice_stack_id: Option<ResourceId>,
    /// Production extension UUID
    pub uuid: Option<String>,
    /// `<metadatagroup>` entries
    pub metadata: Vec<MetadataEntry>,
    /// Attributes from other recognized namespaces, as qualified name and value
    pub extra_attributes: Vec<(String, String)>,
    /// Child elements kept verbatim
    pub pass_through: Vec<String>,
}

impl ObjectInfo {
    /// Info with just a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// An object whose geometry is a triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshObject {
    /// Shared object attributes
    pub info: ObjectInfo,
    /// The geometry
    pub mesh: Mesh,
    /// Children of `<mesh>` kept verbatim (for example a beam lattice)
    pub mesh_pass_through: Vec<String>,
}

impl MeshObject {
    /// Wrap a mesh
    pub fn new(info: ObjectInfo, mesh: Mesh) -> Self {
        Self {
            info,
            mesh,
            mesh_pass_through: Vec::new(),
        }
    }
}

/// A placed reference to another object
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// The referenced object
    pub object_id: ResourceId,
    /// Placement relative to the containing object
    pub transform: Option<Transform>,
    /// Production extension: model part holding the object
    pub path: Option<String>,
    /// Production extension UUID
    pub uuid: Option<String>,
}

impl Component {
    /// Component without transform
    pub fn new(object_id: ResourceId) -> Self {
        Self {
            object_id,
            transform: None,
            path: None,
            uuid: None,
        }
    }

    /// Component with a transform
    pub fn with_transform(object_id: ResourceId, transform: Transform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::new(object_id)
        }
    }
}

/// An object assembled from other objects
///
/// Components can be listed freely before the object is handed to
/// [`ResourceGraph::create`](super::ResourceGraph::create), which checks
/// every reference. Once stored, components are added through
/// [`ResourceGraph::add_component`](super::ResourceGraph::add_component).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentsObject {
    /// Shared object attributes
    pub info: ObjectInfo,
    components: Vec<Component>,
}

impl ComponentsObject {
    /// Empty assembly
    pub fn new(info: ObjectInfo) -> Self {
        Self {
            info,
            components: Vec::new(),
        }
    }

    /// Append a component, builder style
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Components in document order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub(crate) fn push_component(&mut self, component: Component) {
        self.components.push(component);
    }
}
