//! Volumetric extension writing

use super::{ModelWriter, attr};
use crate::error::Result;
use crate::model::{Extension, Image3D, Image3DChannelSelector, ResourceId};
use quick_xml::events::BytesStart;

pub(super) fn write_image(writer: &mut ModelWriter, id: ResourceId, image: &Image3D) -> Result<()> {
    let name = writer.name(Extension::Volumetric, "image3d");
    let stack_name = writer.name(Extension::Volumetric, "imagestack");
    let sheet_name = writer.name(Extension::Volumetric, "imagesheet");

    let mut element = BytesStart::new(name.as_str());
    attr(&mut element, "id", id);
    if let Some(image_name) = &image.name {
        element.push_attribute(("name", image_name.as_str()));
    }
    if !image.has_default_channels() {
        element.push_attribute(("channels", image.channels.join(" ").as_str()));
    }
    writer.start(element)?;

    let mut stack = BytesStart::new(stack_name.as_str());
    attr(&mut stack, "rowcount", image.stack.row_count);
    attr(&mut stack, "columncount", image.stack.column_count);
    attr(&mut stack, "sheetcount", image.stack.sheets.len());
    writer.container(stack, &image.stack.sheets, |writer, sheet| {
        let mut child = BytesStart::new(sheet_name.as_str());
        child.push_attribute(("path", sheet.path.as_str()));
        writer.empty(child)
    })?;
    for raw in &image.pass_through {
        writer.raw(raw)?;
    }

    writer.end(&name)
}

pub(super) fn write_channel_selector(
    writer: &mut ModelWriter,
    id: ResourceId,
    selector: &Image3DChannelSelector,
) -> Result<()> {
    let mut element = BytesStart::new(writer.name(Extension::Volumetric, "image3dchannelselector"));
    attr(&mut element, "id", id);
    attr(&mut element, "image3did", selector.image_id());
    element.push_attribute(("srcchannel", selector.source_channel()));
    element.push_attribute(("dstchannel", selector.destination_channel()));
    element.push_attribute(("filter", selector.filter().as_str()));
    let (u, v, w) = selector.tile_styles();
    element.push_attribute(("tilestyleu", u.as_str()));
    element.push_attribute(("tilestylev", v.as_str()));
    element.push_attribute(("tilestylew", w.as_str()));
    let (min, max) = selector.value_range();
    attr(&mut element, "minvalue", min);
    attr(&mut element, "maxvalue", max);
    writer.empty(element)
}
