//! Material extension parsing
//!
//! Base materials, color groups, 2D textures and texture coordinate groups.
//! Composite materials and multi-properties are not modeled and travel as
//! resource pass-through.

use super::{ModelReader, RawResource, next_top_level, parse_id};
use crate::error::Result;
use crate::model::{
    BaseMaterial, BaseMaterialGroup, Color, ColorGroup, FilterMode, Resource, Tex2Coord,
    Texture2D, Texture2DGroup, TileStyle,
};
use std::str::FromStr;

fn parse_color(ctx: &ModelReader<'_>, value: &str, element: &str, offset: usize) -> Result<Color> {
    Color::from_str(value).map_err(|_| {
        ctx.schema(
            offset,
            format!("<{}> has invalid sRGB color '{}'", element, value),
        )
    })
}

/// Parse an enumerated attribute through its `FromStr`, keeping the default
/// when absent
fn parse_keyword<T>(
    ctx: &ModelReader<'_>,
    value: Option<&str>,
    element: &str,
    name: &str,
    offset: usize,
) -> Result<T>
where
    T: FromStr + Default,
{
    match value {
        None => Ok(T::default()),
        Some(value) => T::from_str(value).map_err(|_| {
            ctx.schema(
                offset,
                format!("<{}> attribute '{}' has unknown value '{}'", element, name, value),
            )
        }),
    }
}

pub(crate) fn build_base_materials(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    let (mut reader, _, base) = ctx.content_reader(raw);
    let mut group = BaseMaterialGroup::default();
    while let Some(child) = next_top_level(ctx, &mut reader, base)? {
        if child.local() == "base" {
            let attrs = child.attrs()?;
            let name = ctx.required(&attrs, "base", "name", child.offset)?;
            let color = ctx.required(&attrs, "base", "displaycolor", child.offset)?;
            group.materials.push(BaseMaterial::new(
                name,
                parse_color(ctx, color, "base", child.offset)?,
            ));
        }
        child.skip(&mut reader)?;
    }
    Ok(group.into())
}

pub(crate) fn build_color_group(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    let (mut reader, _, base) = ctx.content_reader(raw);
    let mut group = ColorGroup::default();
    while let Some(child) = next_top_level(ctx, &mut reader, base)? {
        if child.local() == "color" {
            let attrs = child.attrs()?;
            let color = ctx.required(&attrs, "color", "color", child.offset)?;
            group.colors.push(parse_color(ctx, color, "color", child.offset)?);
        }
        child.skip(&mut reader)?;
    }
    Ok(group.into())
}

pub(crate) fn build_texture(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    let attrs = &raw.attrs;
    let path = ctx.required(attrs, "texture2d", "path", raw.offset)?;
    let content_type = ctx.required(attrs, "texture2d", "contenttype", raw.offset)?;
    let mut texture = Texture2D::new(path, content_type);
    texture.tile_style_u =
        parse_keyword::<TileStyle>(ctx, attrs.get("tilestyleu"), "texture2d", "tilestyleu", raw.offset)?;
    texture.tile_style_v =
        parse_keyword::<TileStyle>(ctx, attrs.get("tilestylev"), "texture2d", "tilestylev", raw.offset)?;
    texture.filter =
        parse_keyword::<FilterMode>(ctx, attrs.get("filter"), "texture2d", "filter", raw.offset)?;
    Ok(texture.into())
}

pub(crate) fn build_texture_group(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    let texture_id = parse_id(ctx, &raw.attrs, "texture2dgroup", "texid", raw.offset)?;
    let mut group = Texture2DGroup::new(texture_id);
    let (mut reader, _, base) = ctx.content_reader(raw);
    while let Some(child) = next_top_level(ctx, &mut reader, base)? {
        if child.local() == "tex2coord" {
            let attrs = child.attrs()?;
            let u = ctx.required(&attrs, "tex2coord", "u", child.offset)?;
            let v = ctx.required(&attrs, "tex2coord", "v", child.offset)?;
            group.coords.push(Tex2Coord::new(
                ctx.number(u, "tex2coord", "u", child.offset)?,
                ctx.number(v, "tex2coord", "v", child.offset)?,
            ));
        }
        child.skip(&mut reader)?;
    }
    Ok(group.into())
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use crate::error::ErrorKind;
    use crate::model::{Color, FilterMode, Resource, TileStyle};

    const MATERIALS: &str = r##"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:m="http://schemas.microsoft.com/3dmanufacturing/material/2015/02">
  <resources>
    <basematerials id="1">
      <base name="Red" displaycolor="#FF0000"/>
      <base name="Glass" displaycolor="#FFFFFF80"/>
    </basematerials>
    <m:colorgroup id="2"><m:color color="#00FF00"/></m:colorgroup>
    <m:texture2d id="3" path="/3D/Textures/wood.png" contenttype="image/png" tilestyleu="mirror" filter="nearest"/>
    <m:texture2dgroup id="4" texid="3">
      <m:tex2coord u="0" v="0"/>
      <m:tex2coord u="1" v="0.5"/>
    </m:texture2dgroup>
    <m:compositematerials id="5" matid="1" matindices="0 1"><m:composite values="0.5 0.5"/></m:compositematerials>
  </resources>
  <build/>
</model>"##;

    #[test]
    fn test_material_resources() {
        let doc = parse(MATERIALS).unwrap();
        let graph = doc.resources();

        let Some(Resource::BaseMaterialGroup(group)) = graph.get(1) else {
            panic!("expected base materials");
        };
        assert_eq!(group.materials[1].name, "Glass");
        assert_eq!(group.materials[1].display_color, Color::rgba(255, 255, 255, 0x80));

        assert_eq!(graph.get(2).and_then(|r| r.property_count()), Some(1));

        let Some(Resource::Texture2D(texture)) = graph.get(3) else {
            panic!("expected texture");
        };
        assert_eq!(texture.path, "/3D/Textures/wood.png");
        assert_eq!(texture.tile_style_u, TileStyle::Mirror);
        assert_eq!(texture.tile_style_v, TileStyle::Wrap);
        assert_eq!(texture.filter, FilterMode::Nearest);

        let Some(Resource::Texture2DGroup(coords)) = graph.get(4) else {
            panic!("expected texture coordinates");
        };
        assert_eq!(coords.texture_id, 3);
        assert_eq!(coords.coords[1].v, 0.5);

        assert!(graph.get(5).is_none());
        assert_eq!(doc.resource_pass_through.len(), 1);
        assert!(doc.resource_pass_through[0].starts_with("<m:compositematerials id=\"5\""));
    }

    #[test]
    fn test_bad_color_rejected() {
        let xml = MATERIALS.replace("#00FF00", "green");
        let err = parse(&xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_texture_group_must_point_at_texture() {
        let xml = MATERIALS.replace(r#"texid="3""#, r#"texid="1""#);
        let err = parse(&xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
