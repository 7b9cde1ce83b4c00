//! Volumetric extension parsing: 3D images and channel selectors

use super::{ModelReader, Namespace, RawResource, next_child, next_top_level, parse_id};
use crate::error::{Error, Result};
use crate::model::{
    Extension, FilterMode, Image3D, Image3DChannelSelector, ImageSheet, ImageStack, Resource,
    TileStyle,
};
use std::str::FromStr;

pub(crate) fn build_image(ctx: &mut ModelReader<'_>, raw: &RawResource) -> Result<Resource> {
    let mut stack = ImageStack::default();
    let (mut reader, src, base) = ctx.content_reader(raw);
    let mut seen_stack = false;
    let mut pass_through = Vec::new();
    while let Some(child) = next_top_level(ctx, &mut reader, base)? {
        let is_stack = ctx.element_namespace(&child.name) == Namespace::Known(Extension::Volumetric)
            && child.local() == "imagestack";
        if !is_stack {
            if ctx.keep_element(&child.name, child.offset)? {
                pass_through.push(child.capture(&mut reader, src)?);
            } else {
                child.skip(&mut reader)?;
            }
            continue;
        }
        if seen_stack {
            return Err(ctx.schema(
                child.offset,
                format!("3D image {} has more than one <imagestack>", raw.id),
            ));
        }
        seen_stack = true;

        let attrs = child.attrs()?;
        let rows = ctx.required(&attrs, "imagestack", "rowcount", child.offset)?;
        let columns = ctx.required(&attrs, "imagestack", "columncount", child.offset)?;
        stack.row_count = ctx.number(rows, "imagestack", "rowcount", child.offset)?;
        stack.column_count = ctx.number(columns, "imagestack", "columncount", child.offset)?;
        let declared: Option<usize> = ctx.optional(&attrs, "imagestack", "sheetcount", child.offset)?;

        if !child.empty {
            while let Some(sheet) = next_child(ctx, &mut reader, base)? {
                if sheet.local() == "imagesheet" {
                    let attrs = sheet.attrs()?;
                    let path = ctx.required(&attrs, "imagesheet", "path", sheet.offset)?;
                    stack.sheets.push(ImageSheet::new(path));
                }
                sheet.skip(&mut reader)?;
            }
        }
        if let Some(declared) = declared.filter(|&n| n != stack.sheets.len()) {
            return Err(ctx.schema(
                child.offset,
                format!(
                    "imagestack declares {} sheets but contains {}",
                    declared,
                    stack.sheets.len()
                ),
            ));
        }
    }

    let mut image = Image3D::new(stack);
    image.pass_through = pass_through;
    image.name = raw.attrs.get("name").map(str::to_string);
    if let Some(channels) = raw.attrs.get("channels") {
        image.channels = channels.split_whitespace().map(str::to_string).collect();
    }
    Ok(image.into())
}

pub(crate) fn build_channel_selector(
    ctx: &mut ModelReader<'_>,
    raw: &RawResource,
) -> Result<Resource> {
    const ELEMENT: &str = "image3dchannelselector";
    let attrs = &raw.attrs;
    let image = parse_id(ctx, attrs, ELEMENT, "image3did", raw.offset)?;
    let source = ctx.required(attrs, ELEMENT, "srcchannel", raw.offset)?;
    let destination = ctx.required(attrs, ELEMENT, "dstchannel", raw.offset)?;
    let mut selector =
        Image3DChannelSelector::new(image, source, destination).map_err(|err| match err {
            Error::InvalidParameter(message) => ctx.schema(raw.offset, message),
            other => other,
        })?;

    if let Some(filter) = attrs.get("filter") {
        selector.set_filter(FilterMode::from_str(filter).map_err(|_| {
            ctx.schema(raw.offset, format!("unknown filter mode '{}'", filter))
        })?);
    }

    let tile = |name: &str| -> Result<TileStyle> {
        match attrs.get(name) {
            None => Ok(TileStyle::Wrap),
            Some(value) => TileStyle::from_str(value).map_err(|_| {
                ctx.schema(raw.offset, format!("unknown tile style '{}' for {}", value, name))
            }),
        }
    };
    selector.set_tile_styles(tile("tilestyleu")?, tile("tilestylev")?, tile("tilestylew")?);

    let (default_min, default_max) = selector.value_range();
    let min = ctx
        .optional(attrs, ELEMENT, "minvalue", raw.offset)?
        .unwrap_or(default_min);
    let max = ctx
        .optional(attrs, ELEMENT, "maxvalue", raw.offset)?
        .unwrap_or(default_max);
    selector.set_value_range(min, max);

    Ok(selector.into())
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use crate::error::ErrorKind;
    use crate::model::{FilterMode, TileStyle};

    fn volumetric(resources: &str) -> String {
        format!(
            r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
  xmlns:v="http://schemas.microsoft.com/3dmanufacturing/volumetric/2018/11">
  <resources>{}</resources>
  <build/>
</model>"#,
            resources
        )
    }

    #[test]
    fn test_image_and_selector() {
        let xml = volumetric(
            r#"
    <v:image3dchannelselector id="2" image3did="1" srcchannel="R" dstchannel="density"
        filter="nearest" tilestylew="clamp" minvalue="0.25" maxvalue="0.75"/>
    <v:image3d id="1" name="density">
      <v:imagestack rowcount="4" columncount="8" sheetcount="2">
        <v:imagesheet path="/3D/Volume/s0.png"/>
        <v:imagesheet path="/3D/Volume/s1.png"/>
      </v:imagestack>
    </v:image3d>"#,
        );
        let doc = parse(&xml).unwrap();
        let image = doc.resources().image3d(1).unwrap();
        assert_eq!(image.name.as_deref(), Some("density"));
        assert_eq!(image.stack.row_count, 4);
        assert_eq!(image.stack.column_count, 8);
        assert_eq!(image.stack.sheets[1].path, "/3D/Volume/s1.png");
        assert!(image.has_default_channels());

        let selector = doc.resources().channel_selector(2).unwrap();
        assert_eq!(selector.image_id(), 1);
        assert_eq!(selector.source_channel(), "R");
        assert_eq!(selector.destination_channel(), "density");
        assert_eq!(selector.filter(), FilterMode::Nearest);
        assert_eq!(
            selector.tile_styles(),
            (TileStyle::Wrap, TileStyle::Wrap, TileStyle::Clamp)
        );
        assert_eq!(selector.value_range(), (0.25, 0.75));
    }

    #[test]
    fn test_declared_channels() {
        let xml = volumetric(
            r#"<v:image3d id="1" channels="Y"><v:imagestack rowcount="1" columncount="1"/></v:image3d>"#,
        );
        let doc = parse(&xml).unwrap();
        assert_eq!(doc.resources().image3d(1).unwrap().channels, vec!["Y".to_string()]);
    }

    #[test]
    fn test_unmodeled_image_children_are_kept() {
        let xml = volumetric(
            r#"<v:image3d id="1" xmlns:q="http://vendor.example/q">
  <v:imagestack rowcount="1" columncount="1"/>
  <v:preview scale="2"><v:hint/></v:preview>
  <q:dropped/>
</v:image3d>"#,
        );
        let doc = parse(&xml).unwrap();
        let image = doc.resources().image3d(1).unwrap();
        assert_eq!(
            image.pass_through,
            vec![r#"<v:preview scale="2"><v:hint/></v:preview>"#.to_string()]
        );

        let written = String::from_utf8(crate::writer::write_model(&doc).unwrap()).unwrap();
        assert!(written.contains(r#"<v:preview scale="2"><v:hint/></v:preview>"#));
        assert!(!written.contains("q:dropped"));
        let reparsed = parse(&written).unwrap();
        assert_eq!(reparsed.resources().image3d(1).unwrap(), image);
    }

    #[test]
    fn test_sheet_count_mismatch() {
        let xml = volumetric(
            r#"<v:image3d id="1"><v:imagestack rowcount="1" columncount="1" sheetcount="3">
  <v:imagesheet path="/a.png"/></v:imagestack></v:image3d>"#,
        );
        assert_eq!(parse(&xml).unwrap_err().kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_empty_channel_name_rejected() {
        let xml = volumetric(
            r#"<v:image3d id="1"/><v:image3dchannelselector id="2" image3did="1" srcchannel="" dstchannel="V"/>"#,
        );
        assert_eq!(parse(&xml).unwrap_err().kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_selector_must_point_at_image() {
        let xml = volumetric(
            r#"<v:image3d id="1"/><v:image3dchannelselector id="2" image3did="2" srcchannel="R" dstchannel="V"/>"#,
        );
        assert_eq!(parse(&xml).unwrap_err().kind(), ErrorKind::TypeMismatch);
    }
}
