//! Production extension checks and the package thumbnail

use super::{Finding, FindingCode, Location, Severity};
use crate::model::{Document, Resource};
use std::collections::HashMap;

/// Whether `uuid` has the 8-4-4-4-12 hexadecimal form
pub(crate) fn is_valid_uuid(uuid: &str) -> bool {
    uuid.len() == 36
        && uuid.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// UUIDs are well formed and unique across build, items, objects and
/// components
pub(crate) fn check_uuids(document: &Document, out: &mut Vec<Finding>) {
    let mut uuids: Vec<(&str, Location)> = Vec::new();
    if let Some(uuid) = &document.build().uuid {
        uuids.push((uuid.as_str(), Location::document()));
    }
    for (index, item) in document.build().items().iter().enumerate() {
        if let Some(uuid) = &item.uuid {
            uuids.push((uuid.as_str(), Location::build_item(index)));
        }
    }
    for (id, resource) in document.resources().iter() {
        if let Some(uuid) = resource.object_info().and_then(|info| info.uuid.as_deref()) {
            uuids.push((uuid, Location::resource(id)));
        }
        if let Resource::ComponentsObject(object) = resource {
            for (index, component) in object.components().iter().enumerate() {
                if let Some(uuid) = &component.uuid {
                    uuids.push((uuid.as_str(), Location::resource(id).component(index)));
                }
            }
        }
    }

    let mut seen: HashMap<String, Location> = HashMap::new();
    for (uuid, location) in uuids {
        if !is_valid_uuid(uuid) {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::InvalidUuid,
                location,
                format!("'{}' is not a UUID of the form xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx", uuid),
            ));
            continue;
        }
        let key = uuid.to_ascii_lowercase();
        if let Some(first) = seen.get(&key) {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::DuplicateUuid,
                location,
                format!("UUID {} is already used at {}", uuid, first),
            ));
        } else {
            seen.insert(key, location);
        }
    }
}

/// References into other model parts cannot be checked here
pub(crate) fn check_external_paths(document: &Document, out: &mut Vec<Finding>) {
    for (index, item) in document.build().items().iter().enumerate() {
        if let Some(path) = &item.path {
            out.push(Finding::new(
                Severity::Warning,
                FindingCode::ExternalReference,
                Location::build_item(index).part(path.clone()),
                format!("object {} lives in another model part", item.object_id),
            ));
        }
    }
    for (id, resource) in document.resources().iter() {
        if let Resource::ComponentsObject(object) = resource {
            for (index, component) in object.components().iter().enumerate() {
                if let Some(path) = &component.path {
                    out.push(Finding::new(
                        Severity::Warning,
                        FindingCode::ExternalReference,
                        Location::resource(id).component(index).part(path.clone()),
                        format!("object {} lives in another model part", component.object_id),
                    ));
                }
            }
        }
    }
}

/// The package thumbnail, when set, exists in the package
pub(crate) fn check_thumbnail(document: &Document, out: &mut Vec<Finding>) {
    let mut wanted: Vec<(&str, Location)> = Vec::new();
    if let Some(path) = &document.thumbnail {
        wanted.push((path.as_str(), Location::document()));
    }
    for (id, resource) in document.resources().iter() {
        if let Some(path) = resource.object_info().and_then(|info| info.thumbnail.as_deref()) {
            wanted.push((path, Location::resource(id)));
        }
    }
    for (path, location) in wanted {
        if document.attachment(path).is_none() {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::MissingAttachment,
                location.part(path),
                format!("thumbnail {} is not in the package", path),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::model::{BuildItem, MeshObject, ObjectInfo};

    #[test]
    fn test_uuid_format() {
        assert!(is_valid_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_uuid("550e8400e29b41d4a716446655440000"));
        assert!(!is_valid_uuid("550e8400-e29b-41d4-a716-44665544000g"));
        assert!(!is_valid_uuid("550e8400-e29b-41d4-a716_446655440000"));
    }

    #[test]
    fn test_duplicate_and_malformed_uuids() {
        let mut doc = Document::new();
        let info = ObjectInfo {
            uuid: Some("550E8400-E29B-41D4-A716-446655440000".to_string()),
            ..ObjectInfo::default()
        };
        let id = doc
            .resources_mut()
            .create(MeshObject::new(info, Mesh::new()).into())
            .unwrap();
        let mut item = BuildItem::new(id);
        item.uuid = Some("550e8400-e29b-41d4-a716-446655440000".to_string());
        doc.add_build_item(item).unwrap();
        doc.set_build_uuid(Some("not-a-uuid".to_string()));

        let mut out = Vec::new();
        check_uuids(&doc, &mut out);
        let codes: Vec<_> = out.iter().map(|f| f.code).collect();
        assert_eq!(codes, vec![FindingCode::InvalidUuid, FindingCode::DuplicateUuid]);
        assert_eq!(out[1].location, Location::resource(id));
    }

    #[test]
    fn test_missing_thumbnail() {
        let mut doc = Document::new();
        doc.thumbnail = Some("/Metadata/thumbnail.png".to_string());
        let mut out = Vec::new();
        check_thumbnail(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, FindingCode::MissingAttachment);
    }
}
