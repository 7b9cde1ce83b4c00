//! Core checks: references, cycles, mesh topology, transforms, orphans

use super::{Finding, FindingCode, Location, Severity};
use crate::mesh::Transform;
use crate::model::{
    Document, ExpectedKind, Reference, ReferenceRole, Resource, ResourceId,
};
use std::collections::{BTreeSet, HashSet};

fn reference_location(id: ResourceId, resource: &Resource, reference: &Reference) -> Location {
    let location = Location::resource(id);
    match (resource, reference.role) {
        (Resource::MeshObject(object), ReferenceRole::TriangleProperty) => {
            match object
                .mesh
                .triangles()
                .iter()
                .position(|t| t.pid == Some(reference.target))
            {
                Some(index) => location.triangle(index),
                None => location,
            }
        }
        (Resource::ComponentsObject(object), ReferenceRole::Component) => {
            match object
                .components()
                .iter()
                .position(|c| c.path.is_none() && c.object_id == reference.target)
            {
                Some(index) => location.component(index),
                None => location,
            }
        }
        _ => location,
    }
}

fn check_target(
    document: &Document,
    target: ResourceId,
    expected: ExpectedKind,
    what: &str,
    location: Location,
    out: &mut Vec<Finding>,
) {
    match document.resources().get(target) {
        None => out.push(Finding::new(
            Severity::Fatal,
            FindingCode::UnresolvedReference,
            location,
            format!("{} references missing resource {}", what, target),
        )),
        Some(resource) if !expected.accepts(resource.kind()) => out.push(Finding::new(
            Severity::Fatal,
            FindingCode::TypeMismatch,
            location,
            format!(
                "{} references resource {}, a {}, but needs a {}",
                what,
                target,
                resource.kind(),
                expected
            ),
        )),
        Some(_) => {}
    }
}

/// Every in-part reference resolves to a compatible variant
pub(crate) fn check_references(document: &Document, out: &mut Vec<Finding>) {
    for (id, resource) in document.resources().iter() {
        for reference in resource.references() {
            check_target(
                document,
                reference.target,
                reference.expected,
                &reference.role.to_string(),
                reference_location(id, resource, &reference),
                out,
            );
        }
    }
    for (index, item) in document.build().items().iter().enumerate() {
        if item.path.is_none() {
            check_target(
                document,
                item.object_id,
                ExpectedKind::Object,
                "build item",
                Location::build_item(index),
                out,
            );
        }
    }
}

/// No object contains itself
pub(crate) fn check_cycles(document: &Document, out: &mut Vec<Finding>) {
    let graph = document.resources();
    let mut finished = HashSet::new();
    let mut reported: HashSet<BTreeSet<ResourceId>> = HashSet::new();
    for (id, resource) in graph.iter() {
        if !matches!(resource, Resource::ComponentsObject(_)) {
            continue;
        }
        if let Some(cycle) = graph.find_cycle(id, &mut finished) {
            let members: BTreeSet<ResourceId> = cycle.iter().copied().collect();
            if reported.insert(members) {
                let path = cycle
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(" → ");
                out.push(Finding::new(
                    Severity::Fatal,
                    FindingCode::CircularReference,
                    Location::resource(cycle[0]),
                    format!("object contains itself: {}", path),
                ));
            }
        }
    }
}

/// Triangle bounds and degenerate faces
pub(crate) fn check_meshes(document: &Document, out: &mut Vec<Finding>) {
    for (id, resource) in document.resources().iter() {
        let Resource::MeshObject(object) = resource else {
            continue;
        };
        let mesh = &object.mesh;
        let vertex_count = mesh.vertex_count();
        for (index, triangle) in mesh.triangles().iter().enumerate() {
            if let Some(bad) = triangle.indices().into_iter().find(|&v| v >= vertex_count) {
                out.push(Finding::new(
                    Severity::Fatal,
                    FindingCode::TriangleIndexOutOfBounds,
                    Location::resource(id).triangle(index).vertex(bad),
                    format!(
                        "vertex index {} out of range (mesh has {} vertices)",
                        bad, vertex_count
                    ),
                ));
            } else if triangle.is_degenerate() {
                out.push(Finding::new(
                    Severity::Warning,
                    FindingCode::DegenerateTriangle,
                    Location::resource(id).triangle(index),
                    format!(
                        "triangle ({}, {}, {}) repeats a vertex",
                        triangle.v1, triangle.v2, triangle.v3
                    ),
                ));
            }
        }
    }
}

fn check_transform(transform: &Transform, location: Location, out: &mut Vec<Finding>) {
    if !transform.is_finite() {
        out.push(Finding::new(
            Severity::Fatal,
            FindingCode::NonFiniteTransform,
            location,
            format!("transform '{}' is not finite", transform),
        ));
        return;
    }
    let determinant = transform.determinant();
    if transform.is_singular() {
        out.push(Finding::new(
            Severity::Error,
            FindingCode::SingularTransform,
            location,
            format!("transform '{}' is singular (determinant {})", transform, determinant),
        ));
    } else if determinant < 0.0 {
        out.push(Finding::new(
            Severity::Warning,
            FindingCode::MirroredTransform,
            location,
            format!("transform '{}' mirrors geometry (determinant {})", transform, determinant),
        ));
    }
}

/// Build item and component transforms are usable
pub(crate) fn check_transforms(document: &Document, out: &mut Vec<Finding>) {
    for (index, item) in document.build().items().iter().enumerate() {
        if let Some(transform) = &item.transform {
            check_transform(transform, Location::build_item(index), out);
        }
    }
    for (id, resource) in document.resources().iter() {
        if let Resource::ComponentsObject(object) = resource {
            for (index, component) in object.components().iter().enumerate() {
                if let Some(transform) = &component.transform {
                    check_transform(transform, Location::resource(id).component(index), out);
                }
            }
        }
    }
}

/// Resources no build item reaches
pub(crate) fn check_orphans(document: &Document, out: &mut Vec<Finding>) {
    let graph = document.resources();
    let mut reachable: HashSet<ResourceId> = HashSet::new();
    let mut queue: Vec<ResourceId> = document
        .build()
        .items()
        .iter()
        .filter(|item| item.path.is_none())
        .map(|item| item.object_id)
        .collect();
    while let Some(id) = queue.pop() {
        if !reachable.insert(id) {
            continue;
        }
        if let Some(resource) = graph.get(id) {
            queue.extend(resource.references().iter().map(|r| r.target));
        }
    }
    for (id, resource) in graph.iter() {
        if !reachable.contains(&id) {
            out.push(Finding::new(
                Severity::Warning,
                FindingCode::OrphanedResource,
                Location::resource(id),
                format!("{} {} is not used by any build item", resource.kind(), id),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, Triangle, Vertex};
    use crate::model::{
        BuildItem, Component, ComponentsObject, MeshObject, ObjectInfo,
    };

    fn triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        for p in [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)] {
            mesh.add_vertex(Vertex::new(p.0, p.1, p.2)).unwrap();
        }
        mesh.add_triangle(0, 1, 2).unwrap();
        mesh
    }

    #[test]
    fn test_unresolved_triangle_property_points_at_triangle() {
        let mut doc = Document::new();
        let mut mesh = triangle_mesh();
        mesh.push_triangle(Triangle::with_property(0, 2, 1, 42, 0))
            .unwrap();
        doc.resources
            .insert(1, MeshObject::new(ObjectInfo::default(), mesh).into())
            .unwrap();

        let mut out = Vec::new();
        check_references(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, FindingCode::UnresolvedReference);
        assert_eq!(out[0].severity, Severity::Fatal);
        assert_eq!(out[0].location, Location::resource(1).triangle(1));
    }

    #[test]
    fn test_build_item_type_mismatch() {
        let mut doc = Document::new();
        doc.resources
            .insert(
                3,
                crate::model::ColorGroup::default().into(),
            )
            .unwrap();
        doc.build.items.push(BuildItem::new(3));

        let mut out = Vec::new();
        check_references(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, FindingCode::TypeMismatch);
        assert_eq!(out[0].location, Location::build_item(0));
    }

    #[test]
    fn test_cycle_reported_once() {
        let mut doc = Document::new();
        for (id, child) in [(10, 20), (20, 30), (30, 10)] {
            doc.resources
                .insert(
                    id,
                    ComponentsObject::new(ObjectInfo::default())
                        .with_component(Component::new(child))
                        .into(),
                )
                .unwrap();
        }
        let mut out = Vec::new();
        check_cycles(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].message.contains("10 → 20 → 30 → 10"));
    }

    #[test]
    fn test_degenerate_is_warning() {
        let mut doc = Document::new();
        let mut mesh = triangle_mesh();
        mesh.push_triangle_allow_degenerate(Triangle::new(0, 0, 1))
            .unwrap();
        doc.resources
            .insert(1, MeshObject::new(ObjectInfo::default(), mesh).into())
            .unwrap();
        let mut out = Vec::new();
        check_meshes(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].severity, Severity::Warning);
        assert_eq!(out[0].location.triangle, Some(1));
    }

    #[test]
    fn test_transform_checks() {
        let mut out = Vec::new();
        check_transform(&Transform::scale(1.0, 0.0, 1.0), Location::build_item(0), &mut out);
        check_transform(&Transform::scale(-1.0, 1.0, 1.0), Location::build_item(1), &mut out);
        check_transform(
            &Transform::translation(f64::NAN, 0.0, 0.0),
            Location::build_item(2),
            &mut out,
        );
        check_transform(&Transform::identity(), Location::build_item(3), &mut out);
        let codes: Vec<_> = out.iter().map(|f| f.code).collect();
        assert_eq!(
            codes,
            vec![
                FindingCode::SingularTransform,
                FindingCode::MirroredTransform,
                FindingCode::NonFiniteTransform
            ]
        );
    }

    #[test]
    fn test_orphans() {
        let mut doc = Document::new();
        let used = doc
            .resources_mut()
            .create(MeshObject::new(ObjectInfo::default(), triangle_mesh()).into())
            .unwrap();
        let unused = doc
            .resources_mut()
            .create(MeshObject::new(ObjectInfo::default(), triangle_mesh()).into())
            .unwrap();
        doc.add_build_item(BuildItem::new(used)).unwrap();

        let mut out = Vec::new();
        check_orphans(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].location, Location::resource(unused));
    }
}
