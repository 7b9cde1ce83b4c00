#![no_main]

use lib3mf_engine::{Mesh, Transform, Vertex};
use libfuzzer_sys::arbitrary::{Arbitrary, Result, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
enum Edit {
    Vertex(f64, f64, f64),
    Triangle(usize, usize, usize),
    MergeSelf,
    Translate(f64, f64, f64),
}

impl<'a> Arbitrary<'a> for Edit {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(match u.int_in_range(0..=3)? {
            0 => Edit::Vertex(u.arbitrary()?, u.arbitrary()?, u.arbitrary()?),
            1 => Edit::Triangle(
                u.int_in_range(0..=64)?,
                u.int_in_range(0..=64)?,
                u.int_in_range(0..=64)?,
            ),
            2 => Edit::MergeSelf,
            _ => Edit::Translate(u.arbitrary()?, u.arbitrary()?, u.arbitrary()?),
        })
    }
}

fuzz_target!(|edits: Vec<Edit>| {
    let mut mesh = Mesh::new();
    for edit in edits {
        let before = (mesh.vertex_count(), mesh.triangle_count());
        match edit {
            Edit::Vertex(x, y, z) => {
                let _ = mesh.add_vertex(Vertex::new(x, y, z));
            }
            Edit::Triangle(a, b, c) => {
                if mesh.add_triangle(a, b, c).is_err() {
                    // Rejected edits leave the mesh untouched
                    assert_eq!(before, (mesh.vertex_count(), mesh.triangle_count()));
                }
            }
            Edit::MergeSelf => {
                if mesh.vertex_count() < 4096 {
                    let copy = mesh.clone();
                    mesh.merge_mesh(Some(&copy)).unwrap();
                }
            }
            Edit::Translate(x, y, z) => {
                if let Ok(moved) = mesh.transformed(&Transform::translation(x, y, z)) {
                    assert_eq!(moved.triangle_count(), mesh.triangle_count());
                    mesh = moved;
                }
            }
        }
        let count = mesh.vertex_count();
        assert!(
            mesh.triangles()
                .iter()
                .all(|t| t.indices().iter().all(|&i| i < count))
        );
    }
});
