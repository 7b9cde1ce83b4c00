//! Relationships parts (`*.rels`)

use super::{RELATIONSHIPS_NS, element_attributes, local_name};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

/// One `<Relationship>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub target: String,
    pub rel_type: String,
}

impl Relationship {
    pub fn new(id: impl Into<String>, target: impl Into<String>, rel_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// Parse a relationships part
///
/// Every relationship needs `Id`, `Target` and `Type`; IDs are unique and
/// the type is a plain URI without query or fragment.
pub(crate) fn parse_relationships(xml: &str, part: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut rels: Vec<Relationship> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::DocType(_) => {
                return Err(Error::InvalidPackage(format!(
                    "DTD declarations are not allowed in {}",
                    part
                )));
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_relationship = local_name(
                    std::str::from_utf8(e.name().as_ref())
                        .map_err(|e| Error::InvalidPackage(e.to_string()))?,
                ) == "Relationship";
                if is_relationship {
                    rels.push(read_relationship(e, part, &rels)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

fn read_relationship(e: &BytesStart, part: &str, seen: &[Relationship]) -> Result<Relationship> {
    let mut id = None;
    let mut target = None;
    let mut rel_type = None;
    for (key, value) in element_attributes(e)? {
        match key.as_str() {
            "Id" => id = Some(value),
            "Target" => target = Some(value),
            "Type" => rel_type = Some(value),
            _ => {}
        }
    }
    let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) else {
        return Err(Error::InvalidPackage(format!(
            "relationship in {} needs Id, Target and Type",
            part
        )));
    };
    if rel_type.contains('?') || rel_type.contains('#') {
        return Err(Error::InvalidPackage(format!(
            "relationship type '{}' in {} contains a query or fragment",
            rel_type, part
        )));
    }
    if seen.iter().any(|r| r.id == id) {
        return Err(Error::InvalidPackage(format!(
            "duplicate relationship Id '{}' in {}",
            id, part
        )));
    }
    Ok(Relationship::new(id, target, rel_type))
}

/// Serialize a relationships part
pub(crate) fn write_relationships(rels: &[Relationship]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write declaration: {}", e)))?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIPS_NS));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| Error::xml_write(format!("Failed to write Relationships: {}", e)))?;

    for rel in rels {
        let target = encode_target(&rel.target);
        let mut elem = BytesStart::new("Relationship");
        elem.push_attribute(("Target", target.as_str()));
        elem.push_attribute(("Id", rel.id.as_str()));
        elem.push_attribute(("Type", rel.rel_type.as_str()));
        writer
            .write_event(Event::Empty(elem))
            .map_err(|e| Error::xml_write(format!("Failed to write Relationship: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Relationships")))
        .map_err(|e| Error::xml_write(format!("Failed to close Relationships: {}", e)))?;
    Ok(writer.into_inner())
}

/// Percent-encode each path segment, keeping the separators
fn encode_target(target: &str) -> String {
    target
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{MODEL_REL_TYPE, THUMBNAIL_REL_TYPE};

    #[test]
    fn test_parse_root_rels() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
  <Relationship Target="/Metadata/thumbnail.png" Id="rel1" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail"/>
</Relationships>"#;
        let rels = parse_relationships(xml, "_rels/.rels").unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].rel_type, MODEL_REL_TYPE);
        assert_eq!(rels[1].rel_type, THUMBNAIL_REL_TYPE);
    }

    #[test]
    fn test_rejects_duplicate_ids_and_fragment_types() {
        let duplicate = r#"<Relationships>
  <Relationship Target="/a" Id="r" Type="urn:a"/>
  <Relationship Target="/b" Id="r" Type="urn:b"/>
</Relationships>"#;
        assert!(parse_relationships(duplicate, "x").is_err());

        let fragment = r#"<Relationships><Relationship Target="/a" Id="r" Type="urn:a#b"/></Relationships>"#;
        assert!(parse_relationships(fragment, "x").is_err());
    }

    #[test]
    fn test_written_targets_are_encoded() {
        let rels = vec![Relationship::new("rel0", "/3D/Textures/my wood.png", "urn:t")];
        let xml = String::from_utf8(write_relationships(&rels).unwrap()).unwrap();
        assert!(xml.contains("/3D/Textures/my%20wood.png"));
        let parsed = parse_relationships(&xml, "x").unwrap();
        assert_eq!(parsed[0].target, "/3D/Textures/my%20wood.png");
    }
}
