//! Material extension writing

use super::{ModelWriter, attr};
use crate::error::Result;
use crate::model::{
    BaseMaterialGroup, ColorGroup, Extension, ResourceId, Texture2D, Texture2DGroup,
};
use quick_xml::events::BytesStart;

pub(super) fn write_base_materials(
    writer: &mut ModelWriter,
    id: ResourceId,
    group: &BaseMaterialGroup,
) -> Result<()> {
    let mut element = BytesStart::new("basematerials");
    attr(&mut element, "id", id);
    writer.container(element, &group.materials, |writer, material| {
        let mut base = BytesStart::new("base");
        base.push_attribute(("name", material.name.as_str()));
        attr(&mut base, "displaycolor", material.display_color);
        writer.empty(base)
    })
}

pub(super) fn write_color_group(
    writer: &mut ModelWriter,
    id: ResourceId,
    group: &ColorGroup,
) -> Result<()> {
    let name = writer.name(Extension::Material, "colorgroup");
    let color_name = writer.name(Extension::Material, "color");
    let mut element = BytesStart::new(name);
    attr(&mut element, "id", id);
    writer.container(element, &group.colors, |writer, color| {
        let mut child = BytesStart::new(color_name.as_str());
        attr(&mut child, "color", color);
        writer.empty(child)
    })
}

pub(super) fn write_texture(
    writer: &mut ModelWriter,
    id: ResourceId,
    texture: &Texture2D,
) -> Result<()> {
    let mut element = BytesStart::new(writer.name(Extension::Material, "texture2d"));
    attr(&mut element, "id", id);
    element.push_attribute(("path", texture.path.as_str()));
    element.push_attribute(("contenttype", texture.content_type.as_str()));
    element.push_attribute(("tilestyleu", texture.tile_style_u.as_str()));
    element.push_attribute(("tilestylev", texture.tile_style_v.as_str()));
    element.push_attribute(("filter", texture.filter.as_str()));
    writer.empty(element)
}

pub(super) fn write_texture_group(
    writer: &mut ModelWriter,
    id: ResourceId,
    group: &Texture2DGroup,
) -> Result<()> {
    let coord_name = writer.name(Extension::Material, "tex2coord");
    let mut element = BytesStart::new(writer.name(Extension::Material, "texture2dgroup"));
    attr(&mut element, "id", id);
    attr(&mut element, "texid", group.texture_id);
    writer.container(element, &group.coords, |writer, coord| {
        let mut child = BytesStart::new(coord_name.as_str());
        attr(&mut child, "u", coord.u);
        attr(&mut child, "v", coord.v);
        writer.empty(child)
    })
}
