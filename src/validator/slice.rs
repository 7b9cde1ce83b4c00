//! Slice stack checks

use super::{Finding, FindingCode, Location, Severity};
use crate::model::{Document, Resource};
use std::cmp::Ordering;

/// Slices rise above `zbottom` in strictly increasing order and polygons
/// stay inside their slice's vertex list
pub(crate) fn check_slice_stacks(document: &Document, out: &mut Vec<Finding>) {
    for (id, resource) in document.resources().iter() {
        let Resource::SliceStack(stack) = resource else {
            continue;
        };

        let mut below = stack.zbottom;
        for (index, slice) in stack.slices.iter().enumerate() {
            if slice.ztop.partial_cmp(&below) != Some(Ordering::Greater) {
                out.push(Finding::new(
                    Severity::Error,
                    FindingCode::SliceOrder,
                    Location::resource(id),
                    format!(
                        "slice {} has ztop {} which is not above {}",
                        index, slice.ztop, below
                    ),
                ));
            }
            below = slice.ztop;

            let count = slice.vertices.len();
            for (polygon_index, polygon) in slice.polygons.iter().enumerate() {
                if let Some(bad) = polygon.indices().find(|&v| v >= count) {
                    out.push(Finding::new(
                        Severity::Error,
                        FindingCode::SliceIndexOutOfBounds,
                        Location::resource(id).vertex(bad),
                        format!(
                            "slice {} polygon {} uses vertex {} but the slice has {} vertices",
                            index, polygon_index, bad, count
                        ),
                    ));
                }
            }
        }

        for slice_ref in &stack.slice_refs {
            out.push(Finding::new(
                Severity::Warning,
                FindingCode::ExternalReference,
                Location::resource(id).part(slice_ref.slice_path.clone()),
                format!(
                    "slice stack {} lives in another model part",
                    slice_ref.slice_stack_id
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Slice, SlicePolygon, SliceStack, Vertex2D};

    #[test]
    fn test_slice_order_and_bounds() {
        let mut stack = SliceStack::new(0.0);
        let mut first = Slice::new(0.5);
        first.vertices = vec![Vertex2D::new(0.0, 0.0), Vertex2D::new(1.0, 0.0)];
        let mut polygon = SlicePolygon::new(0);
        polygon.segments = vec![1, 2];
        first.polygons.push(polygon);
        stack.slices.push(first);
        stack.slices.push(Slice::new(0.5));

        let mut doc = Document::new();
        let id = doc.resources_mut().create(stack.into()).unwrap();

        let mut out = Vec::new();
        check_slice_stacks(&doc, &mut out);
        let codes: Vec<_> = out.iter().map(|f| f.code).collect();
        assert_eq!(
            codes,
            vec![FindingCode::SliceIndexOutOfBounds, FindingCode::SliceOrder]
        );
        assert_eq!(out[0].location, Location::resource(id).vertex(2));
    }
}
