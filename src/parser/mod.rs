//! XML parsing for 3MF model parts
//!
//! Parsing runs in two passes. The first pass (`scan`) walks the model part
//! once: it reads the `<model>` element, metadata and build, and registers
//! every resource by ID and variant together with its attributes and the
//! byte range of its content. The second pass turns each registered
//! resource into its typed form and then checks every reference against
//! the complete registry, so forward references are legal.
//!
//! In lenient mode the second pass keeps unresolved references in the data
//! for validation to report, and drops triangles it cannot store, recording
//! each drop as a finding on the document.

mod core;
mod material;
mod scan;
mod slice;
mod volumetric;

use crate::config::{ParserConfig, Strictness, UnknownNamespacePolicy};
use crate::error::{Error, ErrorContext, Result};
use crate::model::{Document, Extension, Resource, ResourceId, ResourceKind};
use crate::opc::{element_attributes, local_name};
use crate::validator::Finding;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info};

use scan::RawResource;

/// Parse the model part `part` into a document
///
/// The document carries no attachments or thumbnail yet; those live in the
/// package and are added by the caller.
pub(crate) fn parse_model(xml: &str, part: &str, config: &ParserConfig) -> Result<Document> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut ctx = ModelReader::new(xml, part, config);
    let scanned = scan::scan_model(&mut ctx)?;
    let mut document = scanned.document;

    for raw in &scanned.resources {
        let resource = build_resource(&mut ctx, raw)?;
        document.resources.insert(raw.id, resource)?;
    }
    document.build = scanned.build;

    if config.strictness() != Strictness::Lenient {
        check_references(&ctx, &document, &scanned.resources)?;
    }
    document.load_findings = std::mem::take(&mut ctx.findings);

    info!(
        part,
        resources = document.resources().len(),
        build_items = document.build().items().len(),
        dropped = document.load_findings().len(),
        "parsed model part"
    );
    Ok(document)
}

fn build_resource(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    match raw.kind {
        ResourceKind::MeshObject | ResourceKind::ComponentsObject => core::build_object(ctx, raw),
        ResourceKind::BaseMaterialGroup => material::build_base_materials(ctx, raw),
        ResourceKind::ColorGroup => material::build_color_group(ctx, raw),
        ResourceKind::Texture2D => material::build_texture(ctx, raw),
        ResourceKind::Texture2DGroup => material::build_texture_group(ctx, raw),
        ResourceKind::Image3D => volumetric::build_image(ctx, raw),
        ResourceKind::Image3DChannelSelector => volumetric::build_channel_selector(ctx, raw),
        ResourceKind::SliceStack => slice::build_slice_stack(ctx, raw),
    }
}

/// Every reference resolves to a compatible variant and no object contains
/// itself
fn check_references(ctx: &ModelReader<'_>, document: &Document, raws: &[RawResource]) -> Result<()> {
    let graph = document.resources();
    for raw in raws {
        let Some(resource) = graph.get(raw.id) else {
            continue;
        };
        for reference in resource.references() {
            match graph.get(reference.target) {
                None => {
                    return Err(Error::UnresolvedReference {
                        id: reference.target,
                        context: format!(
                            "{} of {} {}, line {}",
                            reference.role,
                            resource.kind(),
                            raw.id,
                            ctx.line_of(raw.offset)
                        ),
                    });
                }
                Some(target) if !reference.expected.accepts(target.kind()) => {
                    return Err(Error::TypeMismatch {
                        id: reference.target,
                        expected: reference.expected.to_string(),
                        found: target.kind().to_string(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    for (index, item) in document.build().items().iter().enumerate() {
        if item.path.is_none() {
            graph
                .resolve(item.object_id, crate::model::ExpectedKind::Object)
                .map_err(|err| match err {
                    Error::UnresolvedReference { id, .. } => Error::UnresolvedReference {
                        id,
                        context: format!("build item {}", index),
                    },
                    other => other,
                })?;
        }
    }

    let mut finished = HashSet::new();
    for raw in raws {
        if raw.kind == ResourceKind::ComponentsObject {
            if let Some(path) = graph.find_cycle(raw.id, &mut finished) {
                return Err(Error::CircularReference { path });
            }
        }
    }
    Ok(())
}

/// Namespace an element or attribute belongs to, as far as this reader is
/// concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Namespace {
    /// A supported 3MF namespace
    Known(Extension),
    /// A vendor namespace registered on the config
    Custom,
    /// Anything else, by URI (or by prefix when the prefix is undeclared)
    Unknown(String),
}

/// Attributes of one element, unescaped, in document order
#[derive(Debug, Clone, Default)]
pub(crate) struct Attrs(Vec<(String, String)>);

impl Attrs {
    pub fn read(e: &BytesStart<'_>) -> Result<Self> {
        Ok(Attrs(element_attributes(e)?))
    }

    /// Value of the attribute with exactly this qualified name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }
}

/// A direct child element met while walking some element's content
pub(crate) struct Child<'a> {
    pub element: BytesStart<'a>,
    pub name: String,
    pub empty: bool,
    pub offset: usize,
}

impl<'a> Child<'a> {
    pub fn attrs(&self) -> Result<Attrs> {
        Attrs::read(&self.element)
    }

    pub fn local(&self) -> &str {
        local_name(&self.name)
    }

    /// Move past the child's content
    pub fn skip(&self, reader: &mut Reader<&'a [u8]>) -> Result<()> {
        if !self.empty {
            reader.read_to_end(self.element.name())?;
        }
        Ok(())
    }

    /// The child and its content as raw XML, consuming the content
    pub fn capture(&self, reader: &mut Reader<&'a [u8]>, src: &'a str) -> Result<String> {
        let tag = std::str::from_utf8(&self.element)
            .map_err(|e| Error::XmlAttr(e.to_string()))?;
        if self.empty {
            return Ok(format!("<{}/>", tag));
        }
        let span = reader.read_to_end(self.element.name())?;
        let inner = src
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default();
        Ok(format!("<{}>{}</{}>", tag, inner, self.name))
    }
}

/// Next direct child of the element whose content `reader` is in, or
/// `None` once that element ends
///
/// Running out of input first means the part was cut off.
pub(crate) fn next_child<'a>(
    ctx: &ModelReader<'_>,
    reader: &mut Reader<&'a [u8]>,
    base: usize,
) -> Result<Option<Child<'a>>> {
    read_child(ctx, reader, base, false)
}

/// Next element at the top level of `reader`'s input, or `None` at the end
/// of the input
///
/// Used for the part prologue and for resource content readers, whose input
/// stops where the resource element closes.
pub(crate) fn next_top_level<'a>(
    ctx: &ModelReader<'_>,
    reader: &mut Reader<&'a [u8]>,
    base: usize,
) -> Result<Option<Child<'a>>> {
    read_child(ctx, reader, base, true)
}

fn read_child<'a>(
    ctx: &ModelReader<'_>,
    reader: &mut Reader<&'a [u8]>,
    base: usize,
    eof_ends: bool,
) -> Result<Option<Child<'a>>> {
    loop {
        let offset = base + reader.buffer_position() as usize;
        let (element, empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => return Ok(None),
            Event::Eof if eof_ends => return Ok(None),
            Event::Eof => {
                return Err(Error::unexpected_eof(
                    "model part ends before its open elements are closed",
                    ctx.context(offset),
                ));
            }
            Event::DocType(_) => {
                return Err(ctx.schema(
                    offset,
                    "DTD declarations are not allowed in 3MF model parts",
                ));
            }
            _ => continue,
        };
        let name = std::str::from_utf8(element.name().as_ref())
            .map_err(|e| Error::XmlAttr(e.to_string()))?
            .to_string();
        return Ok(Some(Child {
            element,
            name,
            empty,
            offset,
        }));
    }
}

/// Text content of the element whose content `reader` is in, with entity
/// and character references resolved
pub(crate) fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => {
                let raw = std::str::from_utf8(&t).map_err(|e| Error::XmlAttr(e.to_string()))?;
                text.push_str(&quick_xml::escape::unescape(raw)?);
            }
            Event::GeneralRef(r) => {
                let name = std::str::from_utf8(&r).map_err(|e| Error::XmlAttr(e.to_string()))?;
                text.push_str(&quick_xml::escape::unescape(&format!("&{};", name))?);
            }
            Event::CData(c) => {
                text.push_str(
                    std::str::from_utf8(&c).map_err(|e| Error::XmlAttr(e.to_string()))?,
                );
            }
            Event::Start(e) => {
                reader.read_to_end(e.name())?;
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(Error::unexpected_eof(
                    "model part ends inside a text element",
                    ErrorContext::new(),
                ));
            }
            _ => {}
        }
    }
}

/// Parsing state shared by both passes
pub(crate) struct ModelReader<'a> {
    pub xml: &'a str,
    part: &'a str,
    config: &'a ParserConfig,
    default_namespace: String,
    namespaces: Vec<(String, String)>,
    pub findings: Vec<Finding>,
}

impl<'a> ModelReader<'a> {
    fn new(xml: &'a str, part: &'a str, config: &'a ParserConfig) -> Self {
        Self {
            xml,
            part,
            config,
            default_namespace: Extension::Core.namespace().to_string(),
            namespaces: Vec::new(),
            findings: Vec::new(),
        }
    }

    pub fn lenient(&self) -> bool {
        self.config.strictness() == Strictness::Lenient
    }

    pub fn line_of(&self, offset: usize) -> usize {
        let before = self.xml.get(..offset).unwrap_or(self.xml);
        before.matches('\n').count() + 1
    }

    /// Part, line and column of a byte offset
    pub fn context(&self, offset: usize) -> ErrorContext {
        let before = self.xml.get(..offset).unwrap_or(self.xml);
        let column = before.len() - before.rfind('\n').map(|p| p + 1).unwrap_or(0) + 1;
        ErrorContext::new()
            .file(self.part)
            .line(before.matches('\n').count() + 1)
            .column(column)
    }

    pub fn schema(&self, offset: usize, message: impl Into<String>) -> Error {
        Error::schema_at(message, self.context(offset))
    }

    /// A required attribute
    pub fn required<'b>(
        &self,
        attrs: &'b Attrs,
        element: &str,
        name: &str,
        offset: usize,
    ) -> Result<&'b str> {
        attrs
            .get(name)
            .ok_or_else(|| Error::missing_attribute(element, name, self.context(offset)))
    }

    /// Parse an attribute value
    pub fn number<T: FromStr>(
        &self,
        value: &str,
        element: &str,
        name: &str,
        offset: usize,
    ) -> Result<T> {
        value.trim().parse::<T>().map_err(|_| {
            Error::parse_error_at(
                format!("<{}> attribute '{}' has invalid value '{}'", element, name, value),
                self.context(offset),
            )
        })
    }

    /// Parse an optional attribute value
    pub fn optional<T: FromStr>(
        &self,
        attrs: &Attrs,
        element: &str,
        name: &str,
        offset: usize,
    ) -> Result<Option<T>> {
        attrs
            .get(name)
            .map(|value| self.number(value, element, name, offset))
            .transpose()
    }

    /// Register the namespace declarations of the `<model>` element
    pub fn declare_namespaces(&mut self, attrs: &Attrs) {
        for (key, value) in attrs.iter() {
            if key == "xmlns" {
                self.default_namespace = value.clone();
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.namespaces.push((prefix.to_string(), value.clone()));
            }
        }
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn declared_namespaces(&self) -> &[(String, String)] {
        &self.namespaces
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn classify_uri(&self, uri: &str) -> Namespace {
        match Extension::from_namespace(uri) {
            Some(ext) if ext == Extension::Core || self.config.supports(&ext) => {
                Namespace::Known(ext)
            }
            _ if self.config.has_custom_namespace(uri) => Namespace::Custom,
            _ => Namespace::Unknown(uri.to_string()),
        }
    }

    /// Namespace bound to a prefix on the `<model>` element
    pub fn prefix_namespace(&self, prefix: &str) -> Namespace {
        match self.uri_for(prefix) {
            Some(uri) => self.classify_uri(uri),
            None => Namespace::Unknown(format!("{}:", prefix)),
        }
    }

    /// Namespace of an element name; unprefixed names are in the default
    /// namespace
    pub fn element_namespace(&self, name: &str) -> Namespace {
        match name.split_once(':') {
            Some((prefix, _)) => self.prefix_namespace(prefix),
            None => self.classify_uri(&self.default_namespace),
        }
    }

    /// Namespace of an attribute name; unprefixed attributes belong to
    /// their element
    pub fn attribute_namespace(&self, name: &str) -> Namespace {
        match name.split_once(':') {
            Some(("xml", _)) | None => Namespace::Known(Extension::Core),
            Some((prefix, _)) => self.prefix_namespace(prefix),
        }
    }

    /// Value of the attribute `local` in the namespace of `extension`,
    /// whatever prefix the document chose for it
    pub fn extension_attr<'b>(
        &self,
        attrs: &'b Attrs,
        extension: Extension,
        local: &str,
    ) -> Option<&'b str> {
        attrs.iter().find_map(|(key, value)| {
            let (prefix, name) = key.split_once(':')?;
            (name == local && self.uri_for(prefix) == Some(extension.namespace()))
                .then_some(value.as_str())
        })
    }

    /// Whether content in an unsupported namespace is kept, per policy
    fn unknown_content(&self, what: &str, uri: &str, offset: usize) -> Result<bool> {
        match self.config.unknown_namespaces() {
            UnknownNamespacePolicy::Ignore => {
                debug!(what, namespace = uri, line = self.line_of(offset), "ignoring content");
                Ok(false)
            }
            UnknownNamespacePolicy::Preserve => {
                debug!(what, namespace = uri, line = self.line_of(offset), "preserving content");
                Ok(true)
            }
            UnknownNamespacePolicy::Reject => Err(self.schema(
                offset,
                format!("{} is in unsupported namespace {}", what, uri),
            )),
        }
    }

    /// Whether an element this reader does not model is kept as pass-through
    ///
    /// Elements in supported namespaces always are; the rest follow the
    /// unknown-namespace policy.
    pub fn keep_element(&self, name: &str, offset: usize) -> Result<bool> {
        match self.element_namespace(name) {
            Namespace::Known(_) | Namespace::Custom => {
                debug!(element = name, line = self.line_of(offset), "keeping unmodeled element");
                Ok(true)
            }
            Namespace::Unknown(uri) => {
                self.unknown_content(&format!("element <{}>", name), &uri, offset)
            }
        }
    }

    /// Attributes not in `consumed`, filtered by the namespace policy
    ///
    /// `consumed` lists unprefixed attribute names and `(extension, local)`
    /// pairs for namespaced ones. Namespace declarations are never kept.
    pub fn extra_attributes(
        &self,
        attrs: &Attrs,
        consumed: &[&str],
        consumed_ext: &[(Extension, &str)],
        offset: usize,
    ) -> Result<Vec<(String, String)>> {
        let mut extra = Vec::new();
        for (key, value) in attrs.iter() {
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let used = match key.split_once(':') {
                None => consumed.contains(&key.as_str()),
                Some((prefix, local)) => consumed_ext.iter().any(|(ext, name)| {
                    *name == local && self.uri_for(prefix) == Some(ext.namespace())
                }),
            };
            if used {
                continue;
            }
            let keep = match self.attribute_namespace(key) {
                Namespace::Known(_) | Namespace::Custom => true,
                Namespace::Unknown(uri) => {
                    self.unknown_content(&format!("attribute '{}'", key), &uri, offset)?
                }
            };
            if keep {
                extra.push((key.clone(), value.clone()));
            }
        }
        Ok(extra)
    }

    /// Sub-reader over a registered resource's content, with the byte
    /// offset of that content in the model part
    pub fn content_reader(&self, raw: &RawResource) -> (Reader<&'a [u8]>, &'a str, usize) {
        match &raw.content {
            Some(range) => {
                let src = self.xml.get(range.clone()).unwrap_or_default();
                (Reader::from_str(src), src, range.start)
            }
            None => (Reader::from_str(""), "", raw.offset),
        }
    }
}

/// Parse a 3MF transform attribute (twelve numbers)
pub(crate) fn parse_transform(
    ctx: &ModelReader<'_>,
    value: &str,
    element: &str,
    offset: usize,
) -> Result<crate::mesh::Transform> {
    let values = value
        .split_whitespace()
        .map(|v| ctx.number::<f64>(v, element, "transform", offset))
        .collect::<Result<Vec<_>>>()?;
    let values: [f64; 12] = values.try_into().map_err(|v: Vec<f64>| {
        Error::parse_error_at(
            format!("<{}> transform has {} values, expected 12", element, v.len()),
            ctx.context(offset),
        )
    })?;
    Ok(crate::mesh::Transform::from_3mf(values))
}

/// Checked resource ID attribute
pub(crate) fn parse_id(
    ctx: &ModelReader<'_>,
    attrs: &Attrs,
    element: &str,
    name: &str,
    offset: usize,
) -> Result<ResourceId> {
    let value = ctx.required(attrs, element, name, offset)?;
    ctx.number::<ResourceId>(value, element, name, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{ObjectType, Unit};

    pub(crate) fn parse(xml: &str) -> Result<Document> {
        parse_model(xml, "3D/3dmodel.model", &ParserConfig::with_all_extensions())
    }

    const CUBE_CORNER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="inch" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <metadata name="Title">Corner &amp; edge</metadata>
  <resources>
    <object id="1" type="model" name="corner">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
          <vertex x="0" y="0" z="10"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1"/>
          <triangle v1="0" v2="1" v3="3"/>
          <triangle v1="0" v2="3" v3="2"/>
          <triangle v1="1" v2="2" v3="3"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build>
    <item objectid="1" transform="1 0 0 0 1 0 0 0 1 5 5 0"/>
  </build>
</model>"#;

    #[test]
    fn test_parse_minimal_model() {
        let doc = parse(CUBE_CORNER).unwrap();
        assert_eq!(doc.unit, Unit::Inch);
        assert_eq!(doc.language.as_deref(), Some("en-US"));
        assert_eq!(doc.metadata_value("Title"), Some("Corner & edge"));

        let object = doc.resources().mesh_object(1).unwrap();
        assert_eq!(object.info.name.as_deref(), Some("corner"));
        assert_eq!(object.info.object_type, ObjectType::Model);
        assert_eq!(object.mesh.vertex_count(), 4);
        assert_eq!(object.mesh.triangle_count(), 4);

        let item = &doc.build().items()[0];
        assert_eq!(item.object_id, 1);
        assert_eq!(item.transform.unwrap().to_3mf()[9], 5.0);
    }

    #[test]
    fn test_forward_component_reference() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="2"><components><component objectid="1"/></components></object>
    <object id="1"><mesh><vertices/><triangles/></mesh></object>
  </resources>
  <build><item objectid="2"/></build>
</model>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.resources().components_object(2).unwrap().components().len(), 1);
        let ids: Vec<_> = doc.resources().iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_doctype_rejected() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE model [<!ENTITY boom "boom">]>
<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources/><build/></model>"#;
        let err = parse(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_part_cut_off_inside_build() {
        let end = CUBE_CORNER.find("  </build>").unwrap();
        let err = parse(&CUBE_CORNER[..end]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPackage);
        assert!(matches!(err, Error::UnexpectedEof { .. }));
        assert!(err.to_string().contains("line 24, column 1"));
    }

    #[test]
    fn test_part_cut_off_inside_metadata_text() {
        let end = CUBE_CORNER.find(" &amp; edge").unwrap();
        let err = parse(&CUBE_CORNER[..end]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPackage);
    }

    #[test]
    fn test_part_cut_off_inside_resources() {
        let end = CUBE_CORNER.find("    </object>").unwrap();
        let err = parse(&CUBE_CORNER[..end]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPackage);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let xml = r##"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <basematerials id="1"><base name="a" displaycolor="#FF0000"/></basematerials>
    <basematerials id="1"><base name="b" displaycolor="#00FF00"/></basematerials>
  </resources>
  <build/>
</model>"##;
        let err = parse(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_unresolved_build_item() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources/>
  <build><item objectid="9"/></build>
</model>"#;
        let err = parse(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn test_bad_number_reports_line() {
        let xml = "<model xmlns=\"http://schemas.microsoft.com/3dmanufacturing/core/2015/02\">\n<resources>\n<object id=\"1\"><mesh><vertices>\n<vertex x=\"abc\" y=\"0\" z=\"0\"/>\n</vertices></mesh></object>\n</resources><build/></model>";
        let err = parse(xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(err.to_string().contains("line 4"), "{}", err);
    }

    #[test]
    fn test_parse_transform_needs_twelve_values() {
        let config = ParserConfig::new();
        let ctx = ModelReader::new("", "3D/3dmodel.model", &config);
        assert!(parse_transform(&ctx, "1 0 0 0 1 0 0 0 1 0 0 0", "item", 0).is_ok());
        assert!(parse_transform(&ctx, "1 0 0", "item", 0).is_err());
        assert!(parse_transform(&ctx, "1 0 0 0 1 0 0 0 1 0 0 x", "item", 0).is_err());
    }
}
