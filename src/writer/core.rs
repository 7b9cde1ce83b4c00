//! Core elements: metadata, objects and the build

use super::{ModelWriter, attr, extra_attrs};
use crate::error::Result;
use crate::mesh::{Mesh, Triangle, Vertex};
use crate::model::{
    Component, Document, Extension, MetadataEntry, ObjectInfo, Resource, ResourceId,
};
use quick_xml::events::BytesStart;

pub(super) fn write_metadata(writer: &mut ModelWriter, entry: &MetadataEntry) -> Result<()> {
    let mut element = BytesStart::new("metadata");
    element.push_attribute(("name", entry.name.as_str()));
    if let Some(preserve) = entry.preserve {
        element.push_attribute(("preserve", if preserve { "1" } else { "0" }));
    }
    if let Some(value_type) = &entry.value_type {
        element.push_attribute(("type", value_type.as_str()));
    }
    if entry.value.is_empty() {
        return writer.empty(element);
    }
    writer.start(element)?;
    writer.text(&entry.value)?;
    writer.end("metadata")
}

fn object_element(writer: &ModelWriter, id: ResourceId, info: &ObjectInfo) -> BytesStart<'static> {
    let mut element = BytesStart::new("object");
    attr(&mut element, "id", id);
    element.push_attribute(("type", info.object_type.as_str()));
    if let Some(name) = &info.name {
        element.push_attribute(("name", name.as_str()));
    }
    if let Some(part_number) = &info.part_number {
        element.push_attribute(("partnumber", part_number.as_str()));
    }
    if let Some(pid) = info.pid {
        attr(&mut element, "pid", pid);
    }
    if let Some(pindex) = info.pindex {
        attr(&mut element, "pindex", pindex);
    }
    if let Some(thumbnail) = &info.thumbnail {
        element.push_attribute(("thumbnail", thumbnail.as_str()));
    }
    if let Some(stack) = info.slice_stack_id {
        attr(&mut element, &writer.name(Extension::Slice, "slicestackid"), stack);
    }
    if let Some(uuid) = &info.uuid {
        attr(&mut element, &writer.name(Extension::Production, "UUID"), uuid);
    }
    extra_attrs(&mut element, &info.extra_attributes);
    element
}

pub(super) fn write_object(writer: &mut ModelWriter, id: ResourceId, resource: &Resource) -> Result<()> {
    let Some(info) = resource.object_info() else {
        return Ok(());
    };
    let element = object_element(writer, id, info);
    writer.start(element)?;

    if !info.metadata.is_empty() {
        writer.start(BytesStart::new("metadatagroup"))?;
        for entry in &info.metadata {
            write_metadata(writer, entry)?;
        }
        writer.end("metadatagroup")?;
    }

    match resource {
        Resource::MeshObject(object) => {
            write_mesh(writer, &object.mesh, &object.mesh_pass_through)?;
        }
        Resource::ComponentsObject(object) => {
            writer.container(
                BytesStart::new("components"),
                object.components(),
                write_component,
            )?;
        }
        _ => {}
    }

    for raw in &info.pass_through {
        writer.raw(raw)?;
    }
    writer.end("object")
}

fn write_mesh(writer: &mut ModelWriter, mesh: &Mesh, pass_through: &[String]) -> Result<()> {
    writer.start(BytesStart::new("mesh"))?;
    writer.container(BytesStart::new("vertices"), mesh.vertices(), write_vertex)?;
    writer.container(BytesStart::new("triangles"), mesh.triangles(), write_triangle)?;
    for raw in pass_through {
        writer.raw(raw)?;
    }
    writer.end("mesh")
}

fn write_vertex(writer: &mut ModelWriter, vertex: &Vertex) -> Result<()> {
    let mut element = BytesStart::new("vertex");
    attr(&mut element, "x", vertex.x);
    attr(&mut element, "y", vertex.y);
    attr(&mut element, "z", vertex.z);
    writer.empty(element)
}

fn write_triangle(writer: &mut ModelWriter, triangle: &Triangle) -> Result<()> {
    let mut element = BytesStart::new("triangle");
    attr(&mut element, "v1", triangle.v1);
    attr(&mut element, "v2", triangle.v2);
    attr(&mut element, "v3", triangle.v3);
    if let Some(pid) = triangle.pid {
        attr(&mut element, "pid", pid);
    }
    for (name, value) in [("p1", triangle.p1), ("p2", triangle.p2), ("p3", triangle.p3)] {
        if let Some(value) = value {
            attr(&mut element, name, value);
        }
    }
    writer.empty(element)
}

fn write_component(writer: &mut ModelWriter, component: &Component) -> Result<()> {
    let mut element = BytesStart::new("component");
    attr(&mut element, "objectid", component.object_id);
    if let Some(transform) = &component.transform {
        attr(&mut element, "transform", transform);
    }
    if let Some(path) = &component.path {
        attr(&mut element, &writer.name(Extension::Production, "path"), path);
    }
    if let Some(uuid) = &component.uuid {
        attr(&mut element, &writer.name(Extension::Production, "UUID"), uuid);
    }
    writer.empty(element)
}

pub(super) fn write_build(writer: &mut ModelWriter, document: &Document) -> Result<()> {
    let build = document.build();
    let mut element = BytesStart::new("build");
    if let Some(uuid) = &build.uuid {
        attr(&mut element, &writer.name(Extension::Production, "UUID"), uuid);
    }
    let uuid_name = writer.name(Extension::Production, "UUID");
    let path_name = writer.name(Extension::Production, "path");
    writer.container(element, build.items(), |writer, item| {
        let mut element = BytesStart::new("item");
        attr(&mut element, "objectid", item.object_id);
        if let Some(transform) = &item.transform {
            attr(&mut element, "transform", transform);
        }
        if let Some(part_number) = &item.part_number {
            element.push_attribute(("partnumber", part_number.as_str()));
        }
        if let Some(uuid) = &item.uuid {
            attr(&mut element, &uuid_name, uuid);
        }
        if let Some(path) = &item.path {
            attr(&mut element, &path_name, path);
        }
        extra_attrs(&mut element, &item.extra_attributes);
        writer.empty(element)
    })
}
