//! Data structures for 3MF documents
//!
//! A [`Document`] owns one [`ResourceGraph`] holding every resource under a
//! document-unique integer ID. Resources refer to one another by ID only;
//! the graph resolves those IDs and refuses edits that would leave a
//! reference dangling.

mod core;
mod graph;
mod material;
mod object;
mod slice;
mod volumetric;

pub use core::{
    Attachment, Build, BuildItem, Document, Extension, MetadataEntry, Unit,
};
pub use graph::ResourceGraph;
pub use material::{
    BaseMaterial, BaseMaterialGroup, Color, ColorGroup, FilterMode, Tex2Coord, Texture2D,
    Texture2DGroup, TileStyle,
};
pub use object::{Component, ComponentsObject, MeshObject, ObjectInfo, ObjectType};
pub use slice::{Slice, SlicePolygon, SliceRef, SliceStack, Vertex2D};
pub use volumetric::{Image3D, Image3DChannelSelector, ImageSheet, ImageStack};

use std::collections::BTreeSet;
use std::fmt;

/// Document-unique resource identifier
pub type ResourceId = u32;

/// The variant of a [`Resource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Object owning a triangle mesh
    MeshObject,
    /// Object assembled from other objects
    ComponentsObject,
    /// Base material group
    BaseMaterialGroup,
    /// sRGB color group
    ColorGroup,
    /// 2D texture image
    Texture2D,
    /// Texture coordinate group
    Texture2DGroup,
    /// Volumetric image stack
    Image3D,
    /// Channel mapping onto an [`Image3D`]
    Image3DChannelSelector,
    /// Slice stack
    SliceStack,
}

impl ResourceKind {
    /// Human-readable name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::MeshObject => "mesh object",
            ResourceKind::ComponentsObject => "components object",
            ResourceKind::BaseMaterialGroup => "base material group",
            ResourceKind::ColorGroup => "color group",
            ResourceKind::Texture2D => "texture",
            ResourceKind::Texture2DGroup => "texture coordinate group",
            ResourceKind::Image3D => "3D image",
            ResourceKind::Image3DChannelSelector => "3D image channel selector",
            ResourceKind::SliceStack => "slice stack",
        }
    }

    /// Whether this variant is an object
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            ResourceKind::MeshObject | ResourceKind::ComponentsObject
        )
    }

    /// Whether triangles may reference this variant through `pid`
    pub fn is_property_group(&self) -> bool {
        matches!(
            self,
            ResourceKind::BaseMaterialGroup | ResourceKind::ColorGroup | ResourceKind::Texture2DGroup
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a reference requires of its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedKind {
    /// Any object
    Object,
    /// Any property group
    PropertyGroup,
    /// Exactly this variant
    Exact(ResourceKind),
}

impl ExpectedKind {
    /// Whether `kind` satisfies this requirement
    pub fn accepts(&self, kind: ResourceKind) -> bool {
        match self {
            ExpectedKind::Object => kind.is_object(),
            ExpectedKind::PropertyGroup => kind.is_property_group(),
            ExpectedKind::Exact(expected) => *expected == kind,
        }
    }
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedKind::Object => f.write_str("object"),
            ExpectedKind::PropertyGroup => f.write_str("property group"),
            ExpectedKind::Exact(kind) => f.write_str(kind.name()),
        }
    }
}

/// How one resource points at another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceRole {
    /// `objectid` of a component
    Component,
    /// Object-level default `pid`
    ObjectProperty,
    /// Triangle `pid`
    TriangleProperty,
    /// Object `slicestackid`
    SliceStack,
    /// `texid` of a texture coordinate group
    Texture,
    /// `image3did` of a channel selector
    Image,
}

impl fmt::Display for ReferenceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceRole::Component => "component",
            ReferenceRole::ObjectProperty => "object property",
            ReferenceRole::TriangleProperty => "triangle property",
            ReferenceRole::SliceStack => "slice stack",
            ReferenceRole::Texture => "texture",
            ReferenceRole::Image => "3D image",
        })
    }
}

/// An outgoing ID reference held by a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    /// The referenced ID
    pub target: ResourceId,
    /// What the target must be
    pub expected: ExpectedKind,
    /// Which attribute holds the reference
    pub role: ReferenceRole,
}

impl Reference {
    fn new(target: ResourceId, expected: ExpectedKind, role: ReferenceRole) -> Self {
        Self {
            target,
            expected,
            role,
        }
    }
}

/// Any resource stored in a [`ResourceGraph`]
#[derive(Debug, Clone)]
pub enum Resource {
    /// Object owning a mesh
    MeshObject(MeshObject),
    /// Object assembled from components
    ComponentsObject(ComponentsObject),
    /// Base materials
    BaseMaterialGroup(BaseMaterialGroup),
    /// Colors
    ColorGroup(ColorGroup),
    /// Texture image
    Texture2D(Texture2D),
    /// Texture coordinates
    Texture2DGroup(Texture2DGroup),
    /// Volumetric image
    Image3D(Image3D),
    /// Channel selector
    Image3DChannelSelector(Image3DChannelSelector),
    /// Slices
    SliceStack(SliceStack),
}

impl Resource {
    /// The variant tag
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::MeshObject(_) => ResourceKind::MeshObject,
            Resource::ComponentsObject(_) => ResourceKind::ComponentsObject,
            Resource::BaseMaterialGroup(_) => ResourceKind::BaseMaterialGroup,
            Resource::ColorGroup(_) => ResourceKind::ColorGroup,
            Resource::Texture2D(_) => ResourceKind::Texture2D,
            Resource::Texture2DGroup(_) => ResourceKind::Texture2DGroup,
            Resource::Image3D(_) => ResourceKind::Image3D,
            Resource::Image3DChannelSelector(_) => ResourceKind::Image3DChannelSelector,
            Resource::SliceStack(_) => ResourceKind::SliceStack,
        }
    }

    /// Shared object attributes, for the two object variants
    pub fn object_info(&self) -> Option<&ObjectInfo> {
        match self {
            Resource::MeshObject(o) => Some(&o.info),
            Resource::ComponentsObject(o) => Some(&o.info),
            _ => None,
        }
    }

    pub(crate) fn object_info_mut(&mut self) -> Option<&mut ObjectInfo> {
        match self {
            Resource::MeshObject(o) => Some(&mut o.info),
            Resource::ComponentsObject(o) => Some(&mut o.info),
            _ => None,
        }
    }

    /// Number of entries a `pindex` may address, for property groups
    pub fn property_count(&self) -> Option<usize> {
        match self {
            Resource::BaseMaterialGroup(g) => Some(g.materials.len()),
            Resource::ColorGroup(g) => Some(g.colors.len()),
            Resource::Texture2DGroup(g) => Some(g.coords.len()),
            _ => None,
        }
    }

    /// Every ID this resource refers to within the same model part
    ///
    /// References into other parts (production `path`) are not listed.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let Some(info) = self.object_info() {
            if let Some(pid) = info.pid {
                refs.push(Reference::new(
                    pid,
                    ExpectedKind::PropertyGroup,
                    ReferenceRole::ObjectProperty,
                ));
            }
            if let Some(stack) = info.slice_stack_id {
                refs.push(Reference::new(
                    stack,
                    ExpectedKind::Exact(ResourceKind::SliceStack),
                    ReferenceRole::SliceStack,
                ));
            }
        }
        match self {
            Resource::MeshObject(object) => {
                let object_pid = object.info.pid;
                let pids: BTreeSet<u32> = object
                    .mesh
                    .triangles()
                    .iter()
                    .filter_map(|t| t.pid)
                    .filter(|pid| Some(*pid) != object_pid)
                    .collect();
                refs.extend(pids.into_iter().map(|pid| {
                    Reference::new(
                        pid,
                        ExpectedKind::PropertyGroup,
                        ReferenceRole::TriangleProperty,
                    )
                }));
            }
            Resource::ComponentsObject(object) => {
                refs.extend(
                    object
                        .components()
                        .iter()
                        .filter(|c| c.path.is_none())
                        .map(|c| {
                            Reference::new(
                                c.object_id,
                                ExpectedKind::Object,
                                ReferenceRole::Component,
                            )
                        }),
                );
            }
            Resource::Texture2DGroup(group) => refs.push(Reference::new(
                group.texture_id,
                ExpectedKind::Exact(ResourceKind::Texture2D),
                ReferenceRole::Texture,
            )),
            Resource::Image3DChannelSelector(selector) => refs.push(Reference::new(
                selector.image_id(),
                ExpectedKind::Exact(ResourceKind::Image3D),
                ReferenceRole::Image,
            )),
            _ => {}
        }
        refs
    }

    /// Access a mesh object
    pub fn as_mesh_object(&self) -> Option<&MeshObject> {
        match self {
            Resource::MeshObject(o) => Some(o),
            _ => None,
        }
    }

    /// Access a components object
    pub fn as_components_object(&self) -> Option<&ComponentsObject> {
        match self {
            Resource::ComponentsObject(o) => Some(o),
            _ => None,
        }
    }

    /// Access a 3D image
    pub fn as_image3d(&self) -> Option<&Image3D> {
        match self {
            Resource::Image3D(i) => Some(i),
            _ => None,
        }
    }

    /// Access a channel selector
    pub fn as_channel_selector(&self) -> Option<&Image3DChannelSelector> {
        match self {
            Resource::Image3DChannelSelector(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Resource {
                fn from(value: $variant) -> Self {
                    Resource::$variant(value)
                }
            }
        )*
    };
}

impl_from_variant!(
    MeshObject,
    ComponentsObject,
    BaseMaterialGroup,
    ColorGroup,
    Texture2D,
    Texture2DGroup,
    Image3D,
    Image3DChannelSelector,
    SliceStack,
);
