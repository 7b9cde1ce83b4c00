//! Material checks: property indices and texture parts

use super::{Finding, FindingCode, Location, Severity};
use crate::model::{Document, Resource, ResourceId};

const TEXTURE_CONTENT_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

fn group_size(document: &Document, pid: ResourceId) -> Option<usize> {
    document
        .resources()
        .get(pid)
        .and_then(|group| group.property_count())
}

/// Property indices stay inside their group
pub(crate) fn check_property_indices(document: &Document, out: &mut Vec<Finding>) {
    for (id, resource) in document.resources().iter() {
        let Resource::MeshObject(object) = resource else {
            continue;
        };
        if let (Some(pid), Some(pindex)) = (object.info.pid, object.info.pindex) {
            if let Some(size) = group_size(document, pid) {
                if pindex as usize >= size {
                    out.push(Finding::new(
                        Severity::Error,
                        FindingCode::PropertyIndexOutOfRange,
                        Location::resource(id),
                        format!(
                            "object pindex {} out of range for group {} ({} entries)",
                            pindex, pid, size
                        ),
                    ));
                }
            }
        }

        for (index, triangle) in object.mesh.triangles().iter().enumerate() {
            let Some(pid) = triangle.pid.or(object.info.pid) else {
                continue;
            };
            let Some(size) = group_size(document, pid) else {
                continue;
            };
            if let Some(bad) = triangle.property_indices().find(|&p| p as usize >= size) {
                out.push(Finding::new(
                    Severity::Error,
                    FindingCode::PropertyIndexOutOfRange,
                    Location::resource(id).triangle(index),
                    format!(
                        "property index {} out of range for group {} ({} entries)",
                        bad, pid, size
                    ),
                ));
            }
        }
    }
}

/// Texture images exist in the package with an image content type
pub(crate) fn check_textures(document: &Document, out: &mut Vec<Finding>) {
    for (id, resource) in document.resources().iter() {
        let Resource::Texture2D(texture) = resource else {
            continue;
        };
        if document.attachment(&texture.path).is_none() {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::MissingAttachment,
                Location::resource(id).part(texture.path.clone()),
                format!("texture image {} is not in the package", texture.path),
            ));
        }
        if !TEXTURE_CONTENT_TYPES.contains(&texture.content_type.as_str()) {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::UnsupportedContentType,
                Location::resource(id),
                format!(
                    "texture content type '{}' is not one of {}",
                    texture.content_type,
                    TEXTURE_CONTENT_TYPES.join(", ")
                ),
            ));
        }
    }
}
