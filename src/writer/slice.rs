//! Slice extension writing

use super::{ModelWriter, attr};
use crate::error::Result;
use crate::model::{Extension, ResourceId, Slice, SliceStack};
use quick_xml::events::BytesStart;

pub(super) fn write_slice_stack(
    writer: &mut ModelWriter,
    id: ResourceId,
    stack: &SliceStack,
) -> Result<()> {
    let name = writer.name(Extension::Slice, "slicestack");
    let mut element = BytesStart::new(name.as_str());
    attr(&mut element, "id", id);
    attr(&mut element, "zbottom", stack.zbottom);
    if stack.slices.is_empty() && stack.slice_refs.is_empty() {
        return writer.empty(element);
    }
    writer.start(element)?;
    for slice in &stack.slices {
        write_slice(writer, slice)?;
    }
    let ref_name = writer.name(Extension::Slice, "sliceref");
    for slice_ref in &stack.slice_refs {
        let mut child = BytesStart::new(ref_name.as_str());
        attr(&mut child, "slicestackid", slice_ref.slice_stack_id);
        child.push_attribute(("slicepath", slice_ref.slice_path.as_str()));
        writer.empty(child)?;
    }
    writer.end(&name)
}

fn write_slice(writer: &mut ModelWriter, slice: &Slice) -> Result<()> {
    let name = writer.name(Extension::Slice, "slice");
    let vertex_name = writer.name(Extension::Slice, "vertex");
    let polygon_name = writer.name(Extension::Slice, "polygon");
    let segment_name = writer.name(Extension::Slice, "segment");

    let mut element = BytesStart::new(name.as_str());
    attr(&mut element, "ztop", slice.ztop);
    if slice.vertices.is_empty() && slice.polygons.is_empty() {
        return writer.empty(element);
    }
    writer.start(element)?;

    let vertices = BytesStart::new(writer.name(Extension::Slice, "vertices"));
    writer.container(vertices, &slice.vertices, |writer, vertex| {
        let mut child = BytesStart::new(vertex_name.as_str());
        attr(&mut child, "x", vertex.x);
        attr(&mut child, "y", vertex.y);
        writer.empty(child)
    })?;

    for polygon in &slice.polygons {
        let mut element = BytesStart::new(polygon_name.as_str());
        attr(&mut element, "startv", polygon.start);
        writer.container(element, &polygon.segments, |writer, v2| {
            let mut child = BytesStart::new(segment_name.as_str());
            attr(&mut child, "v2", v2);
            writer.empty(child)
        })?;
    }
    writer.end(&name)
}
