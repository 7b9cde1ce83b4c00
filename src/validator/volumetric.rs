//! Volumetric checks: image stacks and channel selectors

use super::{Finding, FindingCode, Location, Severity};
use crate::model::{Document, Resource};

/// Image stacks have pixels, sheets and channel names, and every sheet is
/// in the package
pub(crate) fn check_images(document: &Document, out: &mut Vec<Finding>) {
    for (id, resource) in document.resources().iter() {
        let Resource::Image3D(image) = resource else {
            continue;
        };
        let stack = &image.stack;
        if stack.sheets.is_empty() || stack.row_count == 0 || stack.column_count == 0 {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::EmptyImageStack,
                Location::resource(id),
                format!(
                    "image stack is {}x{} with {} sheet(s)",
                    stack.row_count,
                    stack.column_count,
                    stack.sheets.len()
                ),
            ));
        }
        for sheet in &stack.sheets {
            if document.attachment(&sheet.path).is_none() {
                out.push(Finding::new(
                    Severity::Error,
                    FindingCode::MissingAttachment,
                    Location::resource(id).part(sheet.path.clone()),
                    format!("image sheet {} is not in the package", sheet.path),
                ));
            }
        }
        if image.channels.iter().any(|c| c.is_empty()) {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::EmptyChannelName,
                Location::resource(id),
                "image declares an empty channel name",
            ));
        }
    }
}

/// Selector channels exist on their image and value ranges are ordered
pub(crate) fn check_channel_selectors(document: &Document, out: &mut Vec<Finding>) {
    for (id, resource) in document.resources().iter() {
        let Resource::Image3DChannelSelector(selector) = resource else {
            continue;
        };

        for (role, name) in [
            ("source", selector.source_channel()),
            ("destination", selector.destination_channel()),
        ] {
            if name.is_empty() {
                out.push(Finding::new(
                    Severity::Error,
                    FindingCode::EmptyChannelName,
                    Location::resource(id),
                    format!("{} channel name is empty", role),
                ));
            }
        }

        // An unresolved image is already a Fatal reference finding
        if let Some(image) = document
            .resources()
            .get(selector.image_id())
            .and_then(Resource::as_image3d)
        {
            let source = selector.source_channel();
            if !source.is_empty() && !image.has_channel(source) {
                out.push(Finding::new(
                    Severity::Error,
                    FindingCode::UnknownChannel,
                    Location::resource(id),
                    format!(
                        "source channel '{}' is not declared by image {} (has {})",
                        source,
                        selector.image_id(),
                        image.channels.join(", ")
                    ),
                ));
            }
        }

        let (min, max) = selector.value_range();
        if !min.is_finite() || !max.is_finite() {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::InvalidValueRange,
                Location::resource(id),
                format!("value range [{}, {}] is not finite", min, max),
            ));
        } else if min > max {
            out.push(Finding::new(
                Severity::Error,
                FindingCode::InvalidValueRange,
                Location::resource(id),
                format!("value range is inverted: min {} > max {}", min, max),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Image3D, Image3DChannelSelector, ImageSheet, ImageStack};

    fn document_with_selector() -> (Document, u32) {
        let mut doc = Document::new();
        let image = doc
            .resources_mut()
            .create(
                Image3D::new(ImageStack {
                    row_count: 4,
                    column_count: 4,
                    sheets: vec![ImageSheet::new("/3D/volume/sheet0.png")],
                })
                .into(),
            )
            .unwrap();
        let selector = doc
            .resources_mut()
            .create(Image3DChannelSelector::new(image, "R", "density").unwrap().into())
            .unwrap();
        (doc, selector)
    }

    #[test]
    fn test_inverted_value_range() {
        let (mut doc, selector) = document_with_selector();
        doc.resources_mut()
            .channel_selector_mut(selector)
            .unwrap()
            .set_value_range(5.0, 2.0);

        let mut out = Vec::new();
        check_channel_selectors(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, FindingCode::InvalidValueRange);
        assert_eq!(out[0].severity, Severity::Error);
        assert_eq!(out[0].location, Location::resource(selector));
    }

    #[test]
    fn test_unknown_source_channel() {
        let (mut doc, selector) = document_with_selector();
        doc.resources_mut()
            .channel_selector_mut(selector)
            .unwrap()
            .set_source_channel("r")
            .unwrap();

        let mut out = Vec::new();
        check_channel_selectors(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, FindingCode::UnknownChannel);
    }

    #[test]
    fn test_missing_sheet_part() {
        let (doc, _) = document_with_selector();
        let mut out = Vec::new();
        check_images(&doc, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, FindingCode::MissingAttachment);
        assert_eq!(out[0].location.part.as_deref(), Some("/3D/volume/sheet0.png"));
    }
}
