//! Property-based tests for the mesh kernel and document round trips

use lib3mf_engine::{BuildItem, Document, Mesh, MeshObject, ObjectInfo, Transform, Vertex};
use proptest::prelude::*;
use std::io::Cursor;

fn coordinate() -> impl Strategy<Value = f64> {
    -1000.0f64..1000.0
}

fn vertex() -> impl Strategy<Value = Vertex> {
    (coordinate(), coordinate(), coordinate()).prop_map(|(x, y, z)| Vertex::new(x, y, z))
}

/// A mesh with 3..24 vertices and up to 32 triangles over distinct indices
fn mesh() -> impl Strategy<Value = Mesh> {
    prop::collection::vec(vertex(), 3..24).prop_flat_map(|vertices| {
        let n = vertices.len();
        let triangle = (0..n, 0..n, 0..n).prop_filter("distinct indices", |(a, b, c)| {
            a != b && b != c && a != c
        });
        prop::collection::vec(triangle, 0..32).prop_map(move |triangles| {
            let mut mesh = Mesh::with_capacity(vertices.len(), triangles.len());
            for v in &vertices {
                mesh.add_vertex(*v).unwrap();
            }
            for (a, b, c) in triangles {
                mesh.add_triangle(a, b, c).unwrap();
            }
            mesh
        })
    })
}

proptest! {
    #[test]
    fn merge_adds_counts(a in mesh(), b in mesh()) {
        let mut merged = a.clone();
        merged.merge_mesh(Some(&b)).unwrap();
        prop_assert_eq!(merged.vertex_count(), a.vertex_count() + b.vertex_count());
        prop_assert_eq!(merged.triangle_count(), a.triangle_count() + b.triangle_count());
    }

    #[test]
    fn merge_offsets_indices(a in mesh(), b in mesh()) {
        let mut merged = a.clone();
        merged.merge_mesh(Some(&b)).unwrap();

        let offset = a.vertex_count();
        for (i, t) in b.triangles().iter().enumerate() {
            let moved = merged.triangle(a.triangle_count() + i).unwrap();
            prop_assert_eq!(moved.indices(), t.indices().map(|v| v + offset));
        }
        prop_assert_eq!(&merged.triangles()[..a.triangle_count()], a.triangles());
        prop_assert_eq!(&merged.vertices()[offset..], b.vertices());
    }

    #[test]
    fn add_to_mesh_matches_merge(a in mesh(), b in mesh()) {
        let mut merged = a.clone();
        merged.merge_mesh(Some(&b)).unwrap();
        let mut target = a.clone();
        b.add_to_mesh(Some(&mut target)).unwrap();
        prop_assert_eq!(target, merged);
    }

    #[test]
    fn every_triangle_stays_in_bounds(a in mesh(), b in mesh()) {
        let mut merged = a;
        merged.merge_mesh(Some(&b)).unwrap();
        let count = merged.vertex_count();
        prop_assert!(merged
            .triangles()
            .iter()
            .all(|t| t.indices().iter().all(|&i| i < count)));
    }

    #[test]
    fn translation_moves_every_vertex(m in mesh(), dx in coordinate(), dy in coordinate()) {
        let moved = m.transformed(&Transform::translation(dx, dy, 0.0)).unwrap();
        prop_assert_eq!(moved.triangles(), m.triangles());
        for (before, after) in m.vertices().iter().zip(moved.vertices()) {
            prop_assert!((after.x - (before.x + dx)).abs() < 1e-9);
            prop_assert!((after.y - (before.y + dy)).abs() < 1e-9);
            prop_assert_eq!(after.z, before.z);
        }
    }

    #[test]
    fn meshes_survive_save_and_load(m in mesh()) {
        let mut document = Document::new();
        let id = document
            .resources_mut()
            .create(MeshObject::new(ObjectInfo::named("random"), m.clone()).into())
            .unwrap();
        document.add_build_item(BuildItem::new(id)).unwrap();

        let bytes = document.save(Cursor::new(Vec::new())).unwrap().into_inner();
        let reloaded = Document::load(Cursor::new(bytes)).unwrap();
        prop_assert_eq!(&reloaded.resources().mesh_object(id).unwrap().mesh, &m);
    }
}
