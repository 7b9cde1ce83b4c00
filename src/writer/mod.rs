//! XML writing for 3MF model parts
//!
//! Serializes a [`Document`] back into a model part. Resources are written
//! in insertion order with their stored IDs. Namespace prefixes the
//! document was read with are kept, so pass-through content and extra
//! attributes stay valid; extensions the document uses without a declared
//! prefix get their conventional one.

mod core;
mod material;
mod slice;
mod volumetric;

use crate::error::{Error, Result};
use crate::model::{Document, Extension, Resource};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fmt::Display;
use tracing::debug;

/// Serialize the model part of `document`
pub(crate) fn write_model(document: &Document) -> Result<Vec<u8>> {
    let prefixes = Prefixes::new(document);
    let mut writer = ModelWriter {
        xml: Writer::new_with_indent(Vec::new(), b' ', 2),
        prefixes,
    };

    writer
        .xml
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("unit", document.unit.as_str()));
    if let Some(language) = &document.language {
        model.push_attribute(("xml:lang", language.as_str()));
    }
    model.push_attribute(("xmlns", Extension::Core.namespace()));
    for (prefix, uri) in &writer.prefixes.declared {
        model.push_attribute((format!("xmlns:{}", prefix).as_str(), uri.as_str()));
    }
    let required: Vec<&str> = document
        .required_extensions
        .iter()
        .filter_map(|uri| writer.prefixes.prefix_of(uri))
        .collect();
    if !required.is_empty() {
        model.push_attribute(("requiredextensions", required.join(" ").as_str()));
    }
    writer.start(model)?;

    for entry in &document.metadata {
        core::write_metadata(&mut writer, entry)?;
    }

    writer.start(BytesStart::new("resources"))?;
    for (id, resource) in document.resources().iter() {
        match resource {
            Resource::MeshObject(_) | Resource::ComponentsObject(_) => {
                core::write_object(&mut writer, id, resource)?
            }
            Resource::BaseMaterialGroup(group) => {
                material::write_base_materials(&mut writer, id, group)?
            }
            Resource::ColorGroup(group) => material::write_color_group(&mut writer, id, group)?,
            Resource::Texture2D(texture) => material::write_texture(&mut writer, id, texture)?,
            Resource::Texture2DGroup(group) => {
                material::write_texture_group(&mut writer, id, group)?
            }
            Resource::Image3D(image) => volumetric::write_image(&mut writer, id, image)?,
            Resource::Image3DChannelSelector(selector) => {
                volumetric::write_channel_selector(&mut writer, id, selector)?
            }
            Resource::SliceStack(stack) => slice::write_slice_stack(&mut writer, id, stack)?,
        }
    }
    for raw in &document.resource_pass_through {
        writer.raw(raw)?;
    }
    writer.end("resources")?;

    core::write_build(&mut writer, document)?;
    for raw in &document.pass_through {
        writer.raw(raw)?;
    }
    writer.end("model")?;

    debug!(
        resources = document.resources().len(),
        build_items = document.build().items().len(),
        "wrote model part"
    );
    Ok(writer.xml.into_inner())
}

/// Package parts the model refers to as textures or image sheets
pub(crate) fn texture_paths(document: &Document) -> Vec<String> {
    let mut paths = Vec::new();
    for (_, resource) in document.resources().iter() {
        match resource {
            Resource::Texture2D(texture) => paths.push(texture.path.clone()),
            Resource::Image3D(image) => {
                paths.extend(image.stack.sheets.iter().map(|s| s.path.clone()))
            }
            _ => {}
        }
    }
    paths
}

/// Extensions whose elements or attributes the document will emit
fn used_extensions(document: &Document) -> Vec<Extension> {
    let mut used = Vec::new();
    let mut mark = |ext: Extension| {
        if !used.contains(&ext) {
            used.push(ext);
        }
    };
    for (_, resource) in document.resources().iter() {
        match resource {
            Resource::ColorGroup(_) | Resource::Texture2D(_) | Resource::Texture2DGroup(_) => {
                mark(Extension::Material)
            }
            Resource::Image3D(_) | Resource::Image3DChannelSelector(_) => {
                mark(Extension::Volumetric)
            }
            Resource::SliceStack(_) => mark(Extension::Slice),
            Resource::ComponentsObject(object) => {
                if object
                    .components()
                    .iter()
                    .any(|c| c.path.is_some() || c.uuid.is_some())
                {
                    mark(Extension::Production);
                }
            }
            _ => {}
        }
        if let Some(info) = resource.object_info() {
            if info.slice_stack_id.is_some() {
                mark(Extension::Slice);
            }
            if info.uuid.is_some() {
                mark(Extension::Production);
            }
        }
    }
    let build = document.build();
    if build.uuid.is_some()
        || build
            .items()
            .iter()
            .any(|i| i.uuid.is_some() || i.path.is_some())
    {
        mark(Extension::Production);
    }
    used
}

/// Namespace prefixes declared on the written `<model>` element
struct Prefixes {
    declared: Vec<(String, String)>,
}

impl Prefixes {
    fn new(document: &Document) -> Self {
        let mut prefixes = Prefixes {
            declared: document
                .namespaces
                .iter()
                .filter(|(_, uri)| uri != Extension::Core.namespace())
                .cloned()
                .collect(),
        };
        for ext in used_extensions(document) {
            prefixes.declare(ext.namespace(), ext.default_prefix());
        }
        for uri in &document.required_extensions {
            let preferred = Extension::from_namespace(uri)
                .map(|ext| ext.default_prefix())
                .unwrap_or("x");
            prefixes.declare(uri, preferred);
        }
        prefixes
    }

    /// Bind `uri` unless it already has a prefix, avoiding prefixes taken
    /// by other namespaces
    fn declare(&mut self, uri: &str, preferred: &str) {
        if uri == Extension::Core.namespace() || self.prefix_of(uri).is_some() {
            return;
        }
        let mut prefix = preferred.to_string();
        let mut n = 1;
        while self.declared.iter().any(|(p, _)| *p == prefix) {
            prefix = format!("{}{}", preferred, n);
            n += 1;
        }
        self.declared.push((prefix, uri.to_string()));
    }

    fn prefix_of(&self, uri: &str) -> Option<&str> {
        self.declared
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    fn qualify(&self, ext: Extension, local: &str) -> String {
        match self.prefix_of(ext.namespace()) {
            Some(prefix) if ext != Extension::Core => format!("{}:{}", prefix, local),
            _ => local.to_string(),
        }
    }
}

/// Event sink with the document's prefixes
pub(crate) struct ModelWriter {
    xml: Writer<Vec<u8>>,
    prefixes: Prefixes,
}

impl ModelWriter {
    /// Qualified name of `local` in `ext`'s namespace
    pub fn name(&self, ext: Extension, local: &str) -> String {
        self.prefixes.qualify(ext, local)
    }

    pub fn start(&mut self, element: BytesStart<'_>) -> Result<()> {
        self.xml
            .write_event(Event::Start(element))
            .map_err(|e| Error::xml_write(format!("Failed to write start tag: {}", e)))
    }

    pub fn empty(&mut self, element: BytesStart<'_>) -> Result<()> {
        self.xml
            .write_event(Event::Empty(element))
            .map_err(|e| Error::xml_write(format!("Failed to write element: {}", e)))
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.xml
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| Error::xml_write(format!("Failed to close {}: {}", name, e)))
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        self.xml
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::xml_write(format!("Failed to write text: {}", e)))
    }

    /// Already serialized XML, written verbatim
    pub fn raw(&mut self, xml: &str) -> Result<()> {
        self.xml
            .write_event(Event::Text(BytesText::from_escaped(xml)))
            .map_err(|e| Error::xml_write(format!("Failed to write preserved content: {}", e)))
    }

    /// Element with content, or an empty element when `children` is empty
    pub fn container<T>(
        &mut self,
        element: BytesStart<'_>,
        children: &[T],
        mut write: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        if children.is_empty() {
            return self.empty(element);
        }
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        self.start(element)?;
        for child in children {
            write(self, child)?;
        }
        self.end(&name)
    }
}

/// Push an attribute rendered through `Display`
pub(crate) fn attr(element: &mut BytesStart<'_>, name: &str, value: impl Display) {
    element.push_attribute((name, value.to_string().as_str()));
}

/// Push attributes kept from reading, verbatim
pub(crate) fn extra_attrs(element: &mut BytesStart<'_>, extra: &[(String, String)]) {
    for (name, value) in extra {
        element.push_attribute((name.as_str(), value.as_str()));
    }
}
