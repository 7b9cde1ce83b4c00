//! `[Content_Types].xml` reading and writing

use super::{CONTENT_TYPES_NS, element_attributes, local_name, normalize_part_name};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

/// Parsed content type table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ContentTypes {
    /// `(extension, content type)` pairs
    pub defaults: Vec<(String, String)>,
    /// `(part name without leading slash, content type)` pairs
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut table = ContentTypes::default();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::DocType(_) => {
                    return Err(Error::InvalidPackage(
                        "DTD declarations are not allowed in [Content_Types].xml".to_string(),
                    ));
                }
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let name = std::str::from_utf8(e.name().as_ref())
                        .map_err(|e| Error::InvalidPackage(e.to_string()))?
                        .to_string();
                    let attrs = element_attributes(e)?;
                    let get = |key: &str| {
                        attrs
                            .iter()
                            .find(|(k, _)| k == key)
                            .map(|(_, v)| v.clone())
                    };
                    match local_name(&name) {
                        "Default" => match (get("Extension"), get("ContentType")) {
                            (Some(ext), Some(ct)) => table.defaults.push((ext, ct)),
                            _ => {
                                return Err(Error::InvalidPackage(
                                    "Default content type needs Extension and ContentType"
                                        .to_string(),
                                ));
                            }
                        },
                        "Override" => match (get("PartName"), get("ContentType")) {
                            (Some(part), Some(ct)) => {
                                super::validate_part_name(&part)?;
                                table
                                    .overrides
                                    .push((normalize_part_name(&part).to_string(), ct));
                            }
                            _ => {
                                return Err(Error::InvalidPackage(
                                    "Override content type needs PartName and ContentType"
                                        .to_string(),
                                ));
                            }
                        },
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(table)
    }

    /// Content type of `part`: an Override wins over the extension Default
    pub fn content_type_for(&self, part: &str) -> Option<&str> {
        let part = normalize_part_name(part);
        if let Some((_, ct)) = self
            .overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(part))
        {
            return Some(ct);
        }
        let file = part.rsplit('/').next().unwrap_or(part);
        let (_, extension) = file.rsplit_once('.')?;
        self.defaults
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, ct)| ct.as_str())
    }

    /// Content type registered for an extension
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, ct)| ct.as_str())
    }

    /// Register `content_type` for `part`, through a Default when the
    /// extension is free and through an Override otherwise
    pub fn register(&mut self, part: &str, content_type: &str) {
        let part = normalize_part_name(part);
        if self.content_type_for(part) == Some(content_type) {
            return;
        }
        let file = part.rsplit('/').next().unwrap_or(part);
        match file.rsplit_once('.') {
            Some((_, extension)) if self.default_for(extension).is_none() => {
                self.defaults
                    .push((extension.to_ascii_lowercase(), content_type.to_string()));
            }
            _ => self
                .overrides
                .push((part.to_string(), content_type.to_string())),
        }
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| Error::xml_write(format!("Failed to write declaration: {}", e)))?;

        let mut types = BytesStart::new("Types");
        types.push_attribute(("xmlns", CONTENT_TYPES_NS));
        writer
            .write_event(Event::Start(types))
            .map_err(|e| Error::xml_write(format!("Failed to write Types: {}", e)))?;

        for (extension, content_type) in &self.defaults {
            let mut elem = BytesStart::new("Default");
            elem.push_attribute(("Extension", extension.as_str()));
            elem.push_attribute(("ContentType", content_type.as_str()));
            writer
                .write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(format!("Failed to write Default: {}", e)))?;
        }
        for (part, content_type) in &self.overrides {
            let part_name = format!("/{}", part);
            let mut elem = BytesStart::new("Override");
            elem.push_attribute(("PartName", part_name.as_str()));
            elem.push_attribute(("ContentType", content_type.as_str()));
            writer
                .write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(format!("Failed to write Override: {}", e)))?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("Types")))
            .map_err(|e| Error::xml_write(format!("Failed to close Types: {}", e)))?;
        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{MODEL_CONTENT_TYPE, RELS_CONTENT_TYPE};

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/Metadata/special.png" ContentType="image/x-special"/>
</Types>"#;

    #[test]
    fn test_lookup_prefers_override() {
        let table = ContentTypes::parse(TYPES).unwrap();
        assert_eq!(table.content_type_for("/3D/3dmodel.model"), Some(MODEL_CONTENT_TYPE));
        assert_eq!(table.content_type_for("3D/Textures/a.PNG"), Some("image/png"));
        assert_eq!(
            table.content_type_for("Metadata/special.png"),
            Some("image/x-special")
        );
        assert_eq!(table.content_type_for("3D/noext"), None);
    }

    #[test]
    fn test_register_falls_back_to_override() {
        let mut table = ContentTypes::default();
        table.register("_rels/.rels", RELS_CONTENT_TYPE);
        table.register("3D/a.png", "image/png");
        table.register("3D/b.png", "image/x-other");
        assert_eq!(table.defaults.len(), 2);
        assert_eq!(table.overrides, vec![("3D/b.png".to_string(), "image/x-other".to_string())]);

        let reparsed = ContentTypes::parse(std::str::from_utf8(&table.to_xml().unwrap()).unwrap())
            .unwrap();
        assert_eq!(reparsed, table);
    }
}
