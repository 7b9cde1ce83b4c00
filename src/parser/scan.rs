//! First pass: model element, metadata, build and the resource registry

use super::{Attrs, Child, ModelReader, Namespace, core, next_child, next_top_level, parse_id};
use crate::error::{Error, Result};
use crate::model::{Build, Document, Extension, ResourceId, ResourceKind, Unit};
use quick_xml::Reader;
use std::collections::HashMap;
use std::ops::Range;
use std::str::FromStr;
use tracing::debug;

/// A resource as registered by the first pass
#[derive(Debug)]
pub(crate) struct RawResource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub name: String,
    pub attrs: Attrs,
    /// Byte offset of the start tag
    pub offset: usize,
    /// Byte range of the element content, `None` for empty elements
    pub content: Option<Range<usize>>,
}

pub(super) struct ScannedModel {
    pub document: Document,
    pub resources: Vec<RawResource>,
    pub build: Build,
}

pub(super) fn scan_model(ctx: &mut ModelReader<'_>) -> Result<ScannedModel> {
    let mut reader = Reader::from_str(ctx.xml);
    let Some(root) = next_top_level(ctx, &mut reader, 0)? else {
        return Err(Error::schema_at("model part has no root element", ctx.context(0)));
    };
    if root.local() != "model" {
        return Err(ctx.schema(
            root.offset,
            format!("expected <model> root element, found <{}>", root.name),
        ));
    }

    let mut document = Document::new();
    read_model_attributes(ctx, &root, &mut document)?;

    let mut resources = Vec::new();
    let mut build = None;
    let mut saw_resources = false;
    if !root.empty {
        while let Some(child) = next_child(ctx, &mut reader, 0)? {
            match (ctx.element_namespace(&child.name), child.local()) {
                (Namespace::Known(Extension::Core), "metadata") => {
                    let entry = core::read_metadata(ctx, &mut reader, &child)?;
                    document.metadata.push(entry);
                }
                (Namespace::Known(Extension::Core), "resources") => {
                    if saw_resources {
                        return Err(ctx.schema(child.offset, "more than one <resources> element"));
                    }
                    saw_resources = true;
                    if !child.empty {
                        scan_resources(ctx, &mut reader, &mut document, &mut resources)?;
                    }
                }
                (Namespace::Known(Extension::Core), "build") => {
                    if build.is_some() {
                        return Err(ctx.schema(child.offset, "more than one <build> element"));
                    }
                    build = Some(scan_build(ctx, &mut reader, &child)?);
                }
                _ => {
                    if ctx.keep_element(&child.name, child.offset)? {
                        let raw = child.capture(&mut reader, ctx.xml)?;
                        document.pass_through.push(raw);
                    } else {
                        child.skip(&mut reader)?;
                    }
                }
            }
        }
    }

    if !saw_resources {
        return Err(ctx.schema(root.offset, "<model> has no <resources> element"));
    }
    let Some(build) = build else {
        return Err(ctx.schema(root.offset, "<model> has no <build> element"));
    };

    Ok(ScannedModel {
        document,
        resources,
        build,
    })
}

fn read_model_attributes(
    ctx: &mut ModelReader<'_>,
    root: &Child<'_>,
    document: &mut Document,
) -> Result<()> {
    let attrs = root.attrs()?;
    ctx.declare_namespaces(&attrs);
    if ctx.default_namespace() != Extension::Core.namespace() {
        return Err(ctx.schema(
            root.offset,
            format!(
                "<model> is in namespace {}, not the 3MF core namespace",
                ctx.default_namespace()
            ),
        ));
    }
    document.namespaces = ctx.declared_namespaces().to_vec();

    for (key, value) in attrs.iter() {
        match key.as_str() {
            "unit" => {
                document.unit = Unit::from_str(value)
                    .map_err(|_| ctx.schema(root.offset, format!("unknown unit '{}'", value)))?;
            }
            "xml:lang" => document.language = Some(value.clone()),
            "requiredextensions" => {
                for prefix in value.split_whitespace() {
                    let uri = required_extension(ctx, prefix, root.offset)?;
                    document.required_extensions.push(uri);
                }
            }
            "recommendedextensions" | "thumbnail" => {
                debug!(attribute = %key, "ignoring model attribute");
            }
            _ => {}
        }
    }
    Ok(())
}

/// Namespace URI behind a `requiredextensions` prefix, if this reader can
/// honor it
fn required_extension(ctx: &ModelReader<'_>, prefix: &str, offset: usize) -> Result<String> {
    let uri = ctx.uri_for(prefix).ok_or_else(|| {
        ctx.schema(
            offset,
            format!("requiredextensions names undeclared prefix '{}'", prefix),
        )
    })?;
    match ctx.prefix_namespace(prefix) {
        Namespace::Known(_) | Namespace::Custom => Ok(uri.to_string()),
        Namespace::Unknown(_) => Err(Error::UnsupportedExtension(uri.to_string())),
    }
}

/// Variant a resource element maps to; objects are settled by their content
fn resource_kind(ns: &Namespace, local: &str) -> Option<ResourceKind> {
    let Namespace::Known(ext) = ns else {
        return None;
    };
    match (ext, local) {
        (Extension::Core, "object") => Some(ResourceKind::MeshObject),
        (Extension::Core | Extension::Material, "basematerials") => {
            Some(ResourceKind::BaseMaterialGroup)
        }
        (Extension::Material, "colorgroup") => Some(ResourceKind::ColorGroup),
        (Extension::Material, "texture2d") => Some(ResourceKind::Texture2D),
        (Extension::Material, "texture2dgroup") => Some(ResourceKind::Texture2DGroup),
        (Extension::Volumetric, "image3d") => Some(ResourceKind::Image3D),
        (Extension::Volumetric, "image3dchannelselector") => {
            Some(ResourceKind::Image3DChannelSelector)
        }
        (Extension::Slice, "slicestack") => Some(ResourceKind::SliceStack),
        _ => None,
    }
}

fn scan_resources<'a>(
    ctx: &ModelReader<'a>,
    reader: &mut Reader<&'a [u8]>,
    document: &mut Document,
    resources: &mut Vec<RawResource>,
) -> Result<()> {
    let mut seen: HashMap<ResourceId, usize> = HashMap::new();
    while let Some(child) = next_child(ctx, reader, 0)? {
        let ns = ctx.element_namespace(&child.name);
        let Some(mut kind) = resource_kind(&ns, child.local()) else {
            if ctx.keep_element(&child.name, child.offset)? {
                let raw = child.capture(reader, ctx.xml)?;
                document.resource_pass_through.push(raw);
            } else {
                child.skip(reader)?;
            }
            continue;
        };

        let attrs = child.attrs()?;
        let id = parse_id(ctx, &attrs, child.local(), "id", child.offset)?;
        if let Some(first) = seen.insert(id, child.offset) {
            return Err(ctx.schema(
                child.offset,
                format!(
                    "duplicate resource ID {} (first declared on line {})",
                    id,
                    ctx.line_of(first)
                ),
            ));
        }

        let content = if child.empty {
            None
        } else {
            let start = reader.buffer_position() as usize;
            if kind == ResourceKind::MeshObject {
                kind = object_kind(ctx, reader, &child, id)?;
            } else {
                reader.read_to_end(child.element.name())?;
            }
            let span_end = ctx.xml[..reader.buffer_position() as usize]
                .rfind("</")
                .unwrap_or(start);
            Some(start..span_end.max(start))
        };
        if kind == ResourceKind::MeshObject && content.is_none() {
            return Err(ctx.schema(
                child.offset,
                format!("object {} has neither <mesh> nor <components>", id),
            ));
        }

        resources.push(RawResource {
            id,
            kind,
            name: child.name,
            attrs,
            offset: child.offset,
            content,
        });
    }
    Ok(())
}

/// Whether an object holds a mesh or components, consuming its content
fn object_kind<'a>(
    ctx: &ModelReader<'a>,
    reader: &mut Reader<&'a [u8]>,
    object: &Child<'a>,
    id: ResourceId,
) -> Result<ResourceKind> {
    let mut kind = None;
    while let Some(child) = next_child(ctx, reader, 0)? {
        let found = match (ctx.element_namespace(&child.name), child.local()) {
            (Namespace::Known(Extension::Core), "mesh") => Some(ResourceKind::MeshObject),
            (Namespace::Known(Extension::Core), "components") => {
                Some(ResourceKind::ComponentsObject)
            }
            _ => None,
        };
        if let Some(found) = found {
            if kind.is_some() {
                return Err(ctx.schema(
                    child.offset,
                    format!("object {} has more than one <mesh> or <components>", id),
                ));
            }
            kind = Some(found);
        }
        child.skip(reader)?;
    }
    kind.ok_or_else(|| {
        ctx.schema(
            object.offset,
            format!("object {} has neither <mesh> nor <components>", id),
        )
    })
}

fn scan_build<'a>(
    ctx: &ModelReader<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &Child<'a>,
) -> Result<Build> {
    let attrs = element.attrs()?;
    let mut build = Build {
        items: Vec::new(),
        uuid: ctx
            .extension_attr(&attrs, Extension::Production, "UUID")
            .map(str::to_string),
    };
    // only the namespace policy applies, build has no extra attributes
    ctx.extra_attributes(&attrs, &[], &[(Extension::Production, "UUID")], element.offset)?;
    if element.empty {
        return Ok(build);
    }

    while let Some(child) = next_child(ctx, reader, 0)? {
        match (ctx.element_namespace(&child.name), child.local()) {
            (Namespace::Known(Extension::Core), "item") => {
                build.items.push(core::read_build_item(ctx, &child)?);
                child.skip(reader)?;
            }
            _ => {
                // build has no slot for foreign content
                if ctx.keep_element(&child.name, child.offset)? {
                    debug!(element = %child.name, "dropping content inside <build>");
                }
                child.skip(reader)?;
            }
        }
    }
    Ok(build)
}

#[cfg(test)]
mod tests {
    use crate::config::{ParserConfig, UnknownNamespacePolicy};
    use crate::error::{Error, ErrorKind};
    use crate::parser::parse_model;

    fn parse_with(xml: &str, config: &ParserConfig) -> crate::Result<crate::Document> {
        parse_model(xml, "3D/3dmodel.model", config)
    }

    #[test]
    fn test_required_extensions_resolve_to_uris() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:m="http://schemas.microsoft.com/3dmanufacturing/material/2015/02" requiredextensions="m">
  <resources/><build/>
</model>"#;
        let doc = parse_with(xml, &ParserConfig::with_all_extensions()).unwrap();
        assert_eq!(
            doc.required_extensions,
            vec!["http://schemas.microsoft.com/3dmanufacturing/material/2015/02".to_string()]
        );
    }

    #[test]
    fn test_required_unsupported_extension() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:q="http://example.com/unknown" requiredextensions="q">
  <resources/><build/>
</model>"#;
        let err = parse_with(xml, &ParserConfig::with_all_extensions()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedExtension(_)));

        let config = ParserConfig::with_all_extensions().with_custom_namespace("http://example.com/unknown");
        assert!(parse_with(xml, &config).is_ok());
    }

    #[test]
    fn test_required_extension_not_enabled() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:s="http://schemas.microsoft.com/3dmanufacturing/slice/2015/07" requiredextensions="s">
  <resources/><build/>
</model>"#;
        let err = parse_with(xml, &ParserConfig::new()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedExtension(_)));
    }

    #[test]
    fn test_missing_build_is_schema_violation() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources/></model>"#;
        let err = parse_with(xml, &ParserConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_object_needs_mesh_or_components() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources><object id="1"><metadatagroup/></object></resources><build/>
</model>"#;
        let err = parse_with(xml, &ParserConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    const VENDOR: &str = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:v="http://vendor.example/ext">
  <v:settings mode="fast"><v:speed>3</v:speed></v:settings>
  <resources><v:profile id="8"/></resources>
  <build/>
</model>"#;

    #[test]
    fn test_unknown_namespace_policies() {
        let ignore = ParserConfig::default().with_unknown_namespaces(UnknownNamespacePolicy::Ignore);
        let doc = parse_with(VENDOR, &ignore).unwrap();
        assert!(doc.pass_through.is_empty());
        assert!(doc.resource_pass_through.is_empty());

        let preserve =
            ParserConfig::default().with_unknown_namespaces(UnknownNamespacePolicy::Preserve);
        let doc = parse_with(VENDOR, &preserve).unwrap();
        assert_eq!(
            doc.pass_through,
            vec![r#"<v:settings mode="fast"><v:speed>3</v:speed></v:settings>"#.to_string()]
        );
        assert_eq!(doc.resource_pass_through, vec![r#"<v:profile id="8"/>"#.to_string()]);

        let reject =
            ParserConfig::default().with_unknown_namespaces(UnknownNamespacePolicy::Reject);
        let err = parse_with(VENDOR, &reject).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_custom_namespace_always_kept() {
        let config = ParserConfig::default()
            .with_unknown_namespaces(UnknownNamespacePolicy::Reject)
            .with_custom_namespace("http://vendor.example/ext");
        let doc = parse_with(VENDOR, &config).unwrap();
        assert_eq!(doc.pass_through.len(), 1);
    }
}
