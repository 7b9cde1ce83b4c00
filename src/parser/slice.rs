//! Slice extension parsing

use super::{ModelReader, RawResource, next_child, next_top_level, parse_id};
use crate::error::Result;
use crate::model::{Resource, Slice, SlicePolygon, SliceRef, SliceStack, Vertex2D};
use quick_xml::Reader;

pub(crate) fn build_slice_stack(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    let zbottom = ctx
        .optional(&raw.attrs, "slicestack", "zbottom", raw.offset)?
        .unwrap_or(0.0);
    let mut stack = SliceStack::new(zbottom);
    let (mut reader, _, base) = ctx.content_reader(raw);

    while let Some(child) = next_top_level(ctx, &mut reader, base)? {
        match child.local() {
            "slice" => {
                let attrs = child.attrs()?;
                let ztop = ctx.required(&attrs, "slice", "ztop", child.offset)?;
                let mut slice = Slice::new(ctx.number(ztop, "slice", "ztop", child.offset)?);
                if !child.empty {
                    read_slice(ctx, &mut reader, base, &mut slice)?;
                }
                stack.slices.push(slice);
            }
            "sliceref" => {
                let attrs = child.attrs()?;
                stack.slice_refs.push(SliceRef {
                    slice_stack_id: parse_id(ctx, &attrs, "sliceref", "slicestackid", child.offset)?,
                    slice_path: ctx
                        .required(&attrs, "sliceref", "slicepath", child.offset)?
                        .to_string(),
                });
                child.skip(&mut reader)?;
            }
            _ => child.skip(&mut reader)?,
        }
    }
    Ok(stack.into())
}

fn read_slice<'a>(
    ctx: &ModelReader<'a>,
    reader: &mut Reader<&'a [u8]>,
    base: usize,
    slice: &mut Slice,
) -> Result<()> {
    while let Some(child) = next_child(ctx, reader, base)? {
        match child.local() {
            "vertices" if !child.empty => {
                while let Some(vertex) = next_child(ctx, reader, base)? {
                    if vertex.local() == "vertex" {
                        let attrs = vertex.attrs()?;
                        let x = ctx.required(&attrs, "vertex", "x", vertex.offset)?;
                        let y = ctx.required(&attrs, "vertex", "y", vertex.offset)?;
                        slice.vertices.push(Vertex2D::new(
                            ctx.number(x, "vertex", "x", vertex.offset)?,
                            ctx.number(y, "vertex", "y", vertex.offset)?,
                        ));
                    }
                    vertex.skip(reader)?;
                }
            }
            "polygon" => {
                let attrs = child.attrs()?;
                let start = ctx.required(&attrs, "polygon", "startv", child.offset)?;
                let mut polygon =
                    SlicePolygon::new(ctx.number(start, "polygon", "startv", child.offset)?);
                if !child.empty {
                    while let Some(segment) = next_child(ctx, reader, base)? {
                        if segment.local() == "segment" {
                            let attrs = segment.attrs()?;
                            let v2 = ctx.required(&attrs, "segment", "v2", segment.offset)?;
                            polygon
                                .segments
                                .push(ctx.number(v2, "segment", "v2", segment.offset)?);
                        }
                        segment.skip(reader)?;
                    }
                }
                slice.polygons.push(polygon);
            }
            _ => child.skip(reader)?,
        }
    }
    Ok(())
}
