//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard. The parts that
//! matter to the document engine are `[Content_Types].xml`, the root
//! relationships part `_rels/.rels`, the 3D model part it points at, the
//! model part's own relationships and any number of attachment parts
//! (textures, thumbnails, image sheets).

mod content_types;
mod reader;
mod relationships;
mod writer;

pub(crate) use content_types::ContentTypes;
pub(crate) use reader::Package;
pub(crate) use relationships::Relationship;
pub(crate) use writer::{PackageParts, write_package};

use crate::error::{Error, Result};
use quick_xml::events::BytesStart;

/// Default model part path
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Content types part path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Root relationships part path
pub const RELS_PATH: &str = "_rels/.rels";

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Thumbnail relationship type (OPC standard)
pub const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// Texture relationship type, used for texture images and image sheets
pub const TEXTURE_REL_TYPE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";

/// Content type of relationships parts
pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Content type of 3D model parts
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Check a part name against the OPC naming rules
///
/// A leading slash is accepted. Segments must be non-empty, must not be
/// `.` or `..`, and must not end with a dot. `#` and `?` are forbidden.
pub(crate) fn validate_part_name(name: &str) -> Result<()> {
    if name.contains('#') || name.contains('?') {
        return Err(Error::InvalidPackage(format!(
            "part name '{}' contains a fragment or query character",
            name
        )));
    }
    let trimmed = name.strip_prefix('/').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(Error::InvalidPackage("empty part name".to_string()));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return Err(Error::InvalidPackage(format!(
                "part name '{}' has an empty segment",
                name
            )));
        }
        if segment == "." || segment == ".." {
            return Err(Error::InvalidPackage(format!(
                "part name '{}' contains a relative segment",
                name
            )));
        }
        if segment.ends_with('.') {
            return Err(Error::InvalidPackage(format!(
                "part name '{}' has a segment ending with '.'",
                name
            )));
        }
    }
    Ok(())
}

/// Strip the leading slash, the form used for ZIP entry names
pub(crate) fn normalize_part_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// Relationships part belonging to `part`, e.g. `3D/_rels/3dmodel.model.rels`
pub(crate) fn rels_path_for(part: &str) -> String {
    let part = normalize_part_name(part);
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of its source part
///
/// Absolute targets start with `/`. Relative ones are joined to `base_dir`
/// and `..` segments are folded. Percent-encoded characters are decoded.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> Result<String> {
    let decoded = urlencoding::decode(target)
        .map_err(|e| Error::InvalidPackage(format!("bad relationship target '{}': {}", target, e)))?;
    let joined = if let Some(absolute) = decoded.strip_prefix('/') {
        absolute.to_string()
    } else if base_dir.is_empty() {
        decoded.into_owned()
    } else {
        format!("{}/{}", base_dir.trim_end_matches('/'), decoded)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::InvalidPackage(format!(
                        "relationship target '{}' escapes the package",
                        target
                    )));
                }
            }
            "." => {}
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

/// Collect the attributes of an element as unescaped `(name, value)` pairs
pub(crate) fn element_attributes(e: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::XmlAttr(e.to_string()))?;
        let raw = std::str::from_utf8(&attr.value).map_err(|e| Error::XmlAttr(e.to_string()))?;
        let value = quick_xml::escape::unescape(raw)?;
        attrs.push((key.to_string(), value.into_owned()));
    }
    Ok(attrs)
}

/// Local part of a possibly prefixed XML name
pub(crate) fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_constants() {
        assert_eq!(MODEL_PATH, "3D/3dmodel.model");
        assert_eq!(CONTENT_TYPES_PATH, "[Content_Types].xml");
    }

    #[test]
    fn test_part_name_rules() {
        assert!(validate_part_name("/3D/3dmodel.model").is_ok());
        assert!(validate_part_name("3D/Textures/wood.png").is_ok());
        assert!(validate_part_name("/3D//a.model").is_err());
        assert!(validate_part_name("/3D/../a.model").is_err());
        assert!(validate_part_name("/3D/a.").is_err());
        assert!(validate_part_name("/3D/a.png#frag").is_err());
        assert!(validate_part_name("/").is_err());
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("/3D/3dmodel.model"), "3D/_rels/3dmodel.model.rels");
        assert_eq!(rels_path_for("root.model"), "_rels/root.model.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("3D", "/3D/Textures/a.png").unwrap(),
            "3D/Textures/a.png"
        );
        assert_eq!(resolve_target("3D", "Textures/a.png").unwrap(), "3D/Textures/a.png");
        assert_eq!(resolve_target("3D", "../Metadata/t.png").unwrap(), "Metadata/t.png");
        assert_eq!(resolve_target("", "/a%20b.png").unwrap(), "a b.png");
        assert!(resolve_target("", "../x.png").is_err());
    }
}
