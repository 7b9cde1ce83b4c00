//! Core elements: objects, meshes, components, build items and metadata

use super::{Child, ModelReader, Namespace, RawResource, next_child, next_top_level, parse_id, parse_transform, read_text};
use crate::error::{Error, Result};
use crate::mesh::{Mesh, Triangle, Vertex};
use crate::model::{
    BuildItem, Component, ComponentsObject, Extension, MeshObject, MetadataEntry, ObjectInfo,
    ObjectType, Resource, ResourceId, ResourceKind,
};
use crate::validator::{Finding, FindingCode, Location, Severity};
use quick_xml::Reader;
use std::str::FromStr;
use tracing::warn;

const OBJECT_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "type",
    "partnumber",
    "pid",
    "pindex",
    "thumbnail",
];

/// Read a `<metadata>` element
pub(crate) fn read_metadata<'a>(
    ctx: &ModelReader<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &Child<'a>,
) -> Result<MetadataEntry> {
    let attrs = element.attrs()?;
    let name = ctx.required(&attrs, "metadata", "name", element.offset)?;
    let preserve = match attrs.get("preserve") {
        None => None,
        Some("1") | Some("true") => Some(true),
        Some("0") | Some("false") => Some(false),
        Some(other) => {
            return Err(ctx.schema(
                element.offset,
                format!("metadata preserve must be a boolean, got '{}'", other),
            ));
        }
    };
    let value = if element.empty {
        String::new()
    } else {
        read_text(reader)?
    };
    Ok(MetadataEntry {
        name: name.to_string(),
        value,
        preserve,
        value_type: attrs.get("type").map(str::to_string),
    })
}

/// Read a build `<item>`; its content, if any, is left to the caller
pub(crate) fn read_build_item(ctx: &ModelReader<'_>, element: &Child<'_>) -> Result<BuildItem> {
    let attrs = element.attrs()?;
    let object_id = parse_id(ctx, &attrs, "item", "objectid", element.offset)?;
    let transform = attrs
        .get("transform")
        .map(|t| parse_transform(ctx, t, "item", element.offset))
        .transpose()?;
    let extra_attributes = ctx.extra_attributes(
        &attrs,
        &["objectid", "transform", "partnumber"],
        &[(Extension::Production, "UUID"), (Extension::Production, "path")],
        element.offset,
    )?;
    Ok(BuildItem {
        object_id,
        transform,
        part_number: attrs.get("partnumber").map(str::to_string),
        uuid: ctx
            .extension_attr(&attrs, Extension::Production, "UUID")
            .map(str::to_string),
        path: ctx
            .extension_attr(&attrs, Extension::Production, "path")
            .map(str::to_string),
        extra_attributes,
    })
}

fn read_object_info(ctx: &ModelReader<'_>, raw: &RawResource) -> Result<ObjectInfo> {
    let attrs = &raw.attrs;
    let object_type = match attrs.get("type") {
        Some(value) => ObjectType::from_str(value).map_err(|_| {
            ctx.schema(raw.offset, format!("unknown object type '{}'", value))
        })?,
        None => ObjectType::default(),
    };
    let slice_stack_id = ctx
        .extension_attr(attrs, Extension::Slice, "slicestackid")
        .map(|v| ctx.number::<ResourceId>(v, "object", "slicestackid", raw.offset))
        .transpose()?;
    Ok(ObjectInfo {
        name: attrs.get("name").map(str::to_string),
        object_type,
        part_number: attrs.get("partnumber").map(str::to_string),
        pid: ctx.optional(attrs, "object", "pid", raw.offset)?,
        pindex: ctx.optional(attrs, "object", "pindex", raw.offset)?,
        thumbnail: attrs.get("thumbnail").map(str::to_string),
        slice_stack_id,
        uuid: ctx
            .extension_attr(attrs, Extension::Production, "UUID")
            .map(str::to_string),
        metadata: Vec::new(),
        extra_attributes: ctx.extra_attributes(
            attrs,
            OBJECT_ATTRIBUTES,
            &[
                (Extension::Slice, "slicestackid"),
                (Extension::Production, "UUID"),
            ],
            raw.offset,
        )?,
        pass_through: Vec::new(),
    })
}

/// Build a mesh or components object from its registered element
pub(crate) fn build_object(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    let mut info = read_object_info(ctx, raw)?;
    let (mut reader, src, base) = ctx.content_reader(raw);

    let mut mesh = None;
    let mut components = None;
    while let Some(child) = next_top_level(ctx, &mut reader, base)? {
        match (ctx.element_namespace(&child.name), child.local()) {
            (Namespace::Known(Extension::Core), "mesh") => {
                mesh = Some(read_mesh(ctx, &mut reader, &child, raw.id, base)?);
            }
            (Namespace::Known(Extension::Core), "components") => {
                components = Some(read_components(ctx, &mut reader, &child, base)?);
            }
            (Namespace::Known(Extension::Core), "metadatagroup") => {
                if !child.empty {
                    while let Some(entry) = next_child(ctx, &mut reader, base)? {
                        if entry.local() == "metadata" {
                            info.metadata.push(read_metadata(ctx, &mut reader, &entry)?);
                        } else {
                            entry.skip(&mut reader)?;
                        }
                    }
                }
            }
            _ => {
                if ctx.keep_element(&child.name, child.offset)? {
                    info.pass_through.push(child.capture(&mut reader, src)?);
                } else {
                    child.skip(&mut reader)?;
                }
            }
        }
    }

    match (raw.kind, mesh, components) {
        (ResourceKind::MeshObject, Some((mesh, mesh_pass_through, dropped)), _) => {
            ctx.findings.extend(dropped);
            Ok(Resource::MeshObject(MeshObject {
                info,
                mesh,
                mesh_pass_through,
            }))
        }
        (ResourceKind::ComponentsObject, _, Some(list)) => {
            let mut object = ComponentsObject::new(info);
            for component in list {
                object.push_component(component);
            }
            Ok(Resource::ComponentsObject(object))
        }
        _ => Err(ctx.schema(
            raw.offset,
            format!("object {} has neither <mesh> nor <components>", raw.id),
        )),
    }
}

type MeshContent = (Mesh, Vec<String>, Vec<Finding>);

fn read_mesh<'a>(
    ctx: &ModelReader<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &Child<'a>,
    id: ResourceId,
    base: usize,
) -> Result<MeshContent> {
    let mut mesh = Mesh::new();
    let mut pass_through = Vec::new();
    let mut dropped = Vec::new();
    if element.empty {
        return Ok((mesh, pass_through, dropped));
    }
    let src = ctx.xml.get(base..).unwrap_or_default();

    let mut triangle_index = 0usize;
    while let Some(child) = next_child(ctx, reader, base)? {
        match (ctx.element_namespace(&child.name), child.local()) {
            (Namespace::Known(Extension::Core), "vertices") if !child.empty => {
                while let Some(vertex) = next_child(ctx, reader, base)? {
                    if vertex.local() == "vertex" {
                        let v = read_vertex(ctx, &vertex, id, mesh.vertex_count())?;
                        mesh.add_vertex(v)?;
                    }
                    vertex.skip(reader)?;
                }
            }
            (Namespace::Known(Extension::Core), "triangles") if !child.empty => {
                while let Some(element) = next_child(ctx, reader, base)? {
                    if element.local() == "triangle" {
                        let triangle = read_triangle(ctx, &element)?;
                        let count = mesh.vertex_count();
                        if triangle.indices().iter().any(|&v| v >= count) {
                            if !ctx.lenient() {
                                return Err(ctx.schema(
                                    element.offset,
                                    format!(
                                        "triangle {} of object {} references a vertex outside 0..{}",
                                        triangle_index, id, count
                                    ),
                                ));
                            }
                            warn!(object = id, triangle = triangle_index, "dropping triangle with out-of-range vertex");
                            dropped.push(Finding::new(
                                Severity::Error,
                                FindingCode::DroppedTriangle,
                                Location::resource(id).triangle(triangle_index),
                                format!(
                                    "triangle {:?} references a vertex outside 0..{} and was dropped",
                                    triangle.indices(),
                                    count
                                ),
                            ));
                        } else {
                            mesh.push_triangle_allow_degenerate(triangle)?;
                        }
                        triangle_index += 1;
                    }
                    element.skip(reader)?;
                }
            }
            (Namespace::Known(Extension::Core), "vertices" | "triangles") => {}
            _ => {
                // the sub-reader's offsets are relative to `base`
                if ctx.keep_element(&child.name, child.offset)? {
                    let raw = child.capture(reader, src)?;
                    pass_through.push(raw);
                } else {
                    child.skip(reader)?;
                }
            }
        }
    }
    Ok((mesh, pass_through, dropped))
}

fn read_vertex(
    ctx: &ModelReader<'_>,
    element: &Child<'_>,
    id: ResourceId,
    index: usize,
) -> Result<Vertex> {
    let attrs = element.attrs()?;
    let coordinate = |name: &str| -> Result<f64> {
        let value = ctx.required(&attrs, "vertex", name, element.offset)?;
        ctx.number(value, "vertex", name, element.offset)
    };
    let vertex = Vertex::new(coordinate("x")?, coordinate("y")?, coordinate("z")?);
    if !vertex.is_finite() {
        return Err(Error::GeometryError(format!(
            "vertex {} of object {} has a non-finite coordinate (line {})",
            index,
            id,
            ctx.line_of(element.offset)
        )));
    }
    Ok(vertex)
}

fn read_triangle(ctx: &ModelReader<'_>, element: &Child<'_>) -> Result<Triangle> {
    let attrs = element.attrs()?;
    let index = |name: &str| -> Result<usize> {
        let value = ctx.required(&attrs, "triangle", name, element.offset)?;
        ctx.number(value, "triangle", name, element.offset)
    };
    let mut triangle = Triangle::new(index("v1")?, index("v2")?, index("v3")?);
    triangle.pid = ctx.optional(&attrs, "triangle", "pid", element.offset)?;
    triangle.p1 = ctx.optional(&attrs, "triangle", "p1", element.offset)?;
    triangle.p2 = ctx.optional(&attrs, "triangle", "p2", element.offset)?;
    triangle.p3 = ctx.optional(&attrs, "triangle", "p3", element.offset)?;
    Ok(triangle)
}

fn read_components<'a>(
    ctx: &ModelReader<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &Child<'a>,
    base: usize,
) -> Result<Vec<Component>> {
    let mut components = Vec::new();
    if element.empty {
        return Ok(components);
    }
    while let Some(child) = next_child(ctx, reader, base)? {
        if ctx.element_namespace(&child.name) == Namespace::Known(Extension::Core)
            && child.local() == "component"
        {
            let attrs = child.attrs()?;
            components.push(Component {
                object_id: parse_id(ctx, &attrs, "component", "objectid", child.offset)?,
                transform: attrs
                    .get("transform")
                    .map(|t| parse_transform(ctx, t, "component", child.offset))
                    .transpose()?,
                path: ctx
                    .extension_attr(&attrs, Extension::Production, "path")
                    .map(str::to_string),
                uuid: ctx
                    .extension_attr(&attrs, Extension::Production, "UUID")
                    .map(str::to_string),
            });
        } else if ctx.keep_element(&child.name, child.offset)? {
            warn!(element = %child.name, "dropping element inside <components>");
        }
        child.skip(reader)?;
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use crate::config::ParserConfig;
    use crate::error::ErrorKind;
    use crate::model::ObjectType;
    use crate::parser::parse_model;
    use crate::validator::FindingCode;

    const HEADER: &str = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06"
  xmlns:s="http://schemas.microsoft.com/3dmanufacturing/slice/2015/07">"#;

    fn model(body: &str) -> String {
        format!("{}\n{}\n</model>", HEADER, body)
    }

    #[test]
    fn test_object_attributes_and_metadata_group() {
        let xml = model(
            r#"<resources>
  <s:slicestack id="3" zbottom="0"/>
  <object id="1" type="support" partnumber="A-1" p:UUID="11111111-2222-3333-4444-555555555555" s:slicestackid="3" vendor="x">
    <metadatagroup><metadata name="Material" preserve="1">PLA</metadata></metadatagroup>
    <mesh><vertices/><triangles/></mesh>
  </object>
</resources>
<build><item objectid="1" partnumber="B" p:UUID="aaaaaaaa-2222-3333-4444-555555555555"/></build>"#,
        );
        let doc = parse(&xml).unwrap();
        let info = doc.resources().object_info(1).unwrap();
        assert_eq!(info.object_type, ObjectType::Support);
        assert_eq!(info.part_number.as_deref(), Some("A-1"));
        assert_eq!(info.slice_stack_id, Some(3));
        assert_eq!(info.uuid.as_deref(), Some("11111111-2222-3333-4444-555555555555"));
        assert_eq!(info.metadata[0].value, "PLA");
        assert_eq!(info.metadata[0].preserve, Some(true));
        assert_eq!(info.extra_attributes, vec![("vendor".to_string(), "x".to_string())]);

        let item = &doc.build().items()[0];
        assert_eq!(item.part_number.as_deref(), Some("B"));
        assert!(item.uuid.is_some());
        assert!(item.extra_attributes.is_empty());
    }

    #[test]
    fn test_degenerate_triangles_are_kept() {
        let xml = model(
            r#"<resources><object id="1"><mesh>
  <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
  <triangles><triangle v1="0" v2="1" v3="2"/><triangle v1="0" v2="0" v3="1"/></triangles>
</mesh></object></resources><build/>"#,
        );
        let doc = parse(&xml).unwrap();
        assert_eq!(doc.resources().mesh_object(1).unwrap().mesh.triangle_count(), 2);
    }

    const OUT_OF_RANGE: &str = r#"<resources><object id="1"><mesh>
  <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
  <triangles><triangle v1="0" v2="1" v3="7"/><triangle v1="0" v2="1" v3="2"/></triangles>
</mesh></object></resources><build/>"#;

    #[test]
    fn test_out_of_range_triangle_is_an_error() {
        let err = parse(&model(OUT_OF_RANGE)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_lenient_drops_out_of_range_triangle() {
        let doc = parse_model(&model(OUT_OF_RANGE), "3D/3dmodel.model", &ParserConfig::lenient())
            .unwrap();
        assert_eq!(doc.resources().mesh_object(1).unwrap().mesh.triangle_count(), 1);
        assert_eq!(doc.load_findings().len(), 1);
        assert_eq!(doc.load_findings()[0].code, FindingCode::DroppedTriangle);
        assert_eq!(doc.load_findings()[0].location.triangle, Some(0));
    }

    #[test]
    fn test_non_finite_vertex_rejected() {
        let xml = model(
            r#"<resources><object id="1"><mesh>
  <vertices><vertex x="NaN" y="0" z="0"/></vertices>
</mesh></object></resources><build/>"#,
        );
        let err = parse(&xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeometryError);
    }

    #[test]
    fn test_component_cycle_fails() {
        let xml = model(
            r#"<resources>
  <object id="1"><components><component objectid="2"/></components></object>
  <object id="2"><components><component objectid="1"/></components></object>
</resources><build><item objectid="1"/></build>"#,
        );
        let err = parse(&xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularReference);

        let doc = parse_model(&xml, "3D/3dmodel.model", &ParserConfig::lenient()).unwrap();
        assert_eq!(doc.resources().len(), 2);
    }

    #[test]
    fn test_external_component_is_not_resolved() {
        let xml = model(
            r#"<resources>
  <object id="1"><components><component objectid="5" p:path="/3D/other.model" transform="1 0 0 0 1 0 0 0 1 0 0 3"/></components></object>
</resources><build><item objectid="1"/></build>"#,
        );
        let doc = parse(&xml).unwrap();
        let component = &doc.resources().components_object(1).unwrap().components()[0];
        assert_eq!(component.path.as_deref(), Some("/3D/other.model"));
        assert_eq!(component.transform.unwrap().to_3mf()[11], 3.0);
    }

    #[test]
    fn test_mesh_pass_through() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:b="http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02">
<resources><object id="1"><mesh>
  <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/></vertices>
  <b:beamlattice radius="1"><b:beams><b:beam v1="0" v2="1"/></b:beams></b:beamlattice>
</mesh></object></resources><build/></model>"#;
        let doc = parse(xml).unwrap();
        let object = doc.resources().mesh_object(1).unwrap();
        assert_eq!(
            object.mesh_pass_through,
            vec![r#"<b:beamlattice radius="1"><b:beams><b:beam v1="0" v2="1"/></b:beams></b:beamlattice>"#.to_string()]
        );
    }
}
