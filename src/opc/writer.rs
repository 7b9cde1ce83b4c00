//! Package writing functionality for creating 3MF files

use super::relationships::write_relationships;
use super::{
    CONTENT_TYPES_PATH, ContentTypes, MODEL_CONTENT_TYPE, MODEL_REL_TYPE,
    RELS_CONTENT_TYPE, RELS_PATH, Relationship, TEXTURE_REL_TYPE, THUMBNAIL_REL_TYPE,
    rels_path_for,
};
use crate::error::{Error, Result};
use crate::model::Attachment;
use std::io::{Seek, Write};
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// What goes into the package besides the model part
pub(crate) struct PackageParts<'a> {
    /// Package path of the model part, without the leading slash
    pub model_path: &'a str,
    /// Serialized model part
    pub model_xml: &'a [u8],
    /// Package thumbnail path, linked from the root relationships
    pub thumbnail: Option<&'a str>,
    /// Attachment parts, written in path order
    pub attachments: &'a [Attachment],
    /// Parts the model references as textures or image sheets
    pub texture_paths: &'a [String],
}

fn write_part<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, data: &[u8]) -> Result<()> {
    zip.start_file(name, SimpleFileOptions::default())
        .map_err(|e| Error::xml_write(format!("Failed to create {}: {}", name, e)))?;
    zip.write_all(data)
        .map_err(|e| Error::xml_write(format!("Failed to write {}: {}", name, e)))?;
    Ok(())
}

/// Create a 3MF package (ZIP archive)
///
/// Writes `[Content_Types].xml`, `_rels/.rels` (model and optional
/// thumbnail), `3D/_rels/3dmodel.model.rels` when attachments carry
/// relationships, the model part and every attachment.
///
/// Returns the writer after finishing the ZIP archive.
pub(crate) fn write_package<W: Write + Seek>(writer: W, parts: PackageParts<'_>) -> Result<W> {
    let model_path = parts.model_path.trim_start_matches('/');
    let mut attachments: Vec<&Attachment> = parts.attachments.iter().collect();
    attachments.sort_by(|a, b| a.path.cmp(&b.path));
    let model_rels_path = rels_path_for(model_path);
    if let Some(clash) = attachments.iter().find(|a| {
        a.path == model_path
            || a.path == CONTENT_TYPES_PATH
            || a.path == RELS_PATH
            || a.path == model_rels_path
    }) {
        return Err(Error::InvalidParameter(format!(
            "attachment {} collides with a part the package writer generates",
            clash.path
        )));
    }

    let mut content_types = ContentTypes::default();
    content_types.register(RELS_PATH, RELS_CONTENT_TYPE);
    content_types.register(model_path, MODEL_CONTENT_TYPE);
    for attachment in &attachments {
        content_types.register(&attachment.path, &attachment.content_type);
    }

    let mut root_rels = vec![Relationship::new(
        "rel0",
        format!("/{}", model_path),
        MODEL_REL_TYPE,
    )];
    if let Some(thumbnail) = parts.thumbnail {
        root_rels.push(Relationship::new(
            "rel1",
            format!("/{}", thumbnail.trim_start_matches('/')),
            THUMBNAIL_REL_TYPE,
        ));
    }

    let mut model_rels = Vec::new();
    for attachment in &attachments {
        let is_thumbnail = parts
            .thumbnail
            .is_some_and(|t| t.trim_start_matches('/') == attachment.path);
        let rel_type = match &attachment.relationship_type {
            Some(rel_type) => Some(rel_type.as_str()),
            None if parts
                .texture_paths
                .iter()
                .any(|p| p.trim_start_matches('/') == attachment.path) =>
            {
                Some(TEXTURE_REL_TYPE)
            }
            None => None,
        };
        if let Some(rel_type) = rel_type.filter(|_| !is_thumbnail) {
            model_rels.push(Relationship::new(
                format!("rel{}", model_rels.len() + 1),
                format!("/{}", attachment.path),
                rel_type,
            ));
        }
    }

    let mut zip = ZipWriter::new(writer);
    write_part(&mut zip, CONTENT_TYPES_PATH, &content_types.to_xml()?)?;
    write_part(&mut zip, RELS_PATH, &write_relationships(&root_rels)?)?;
    if !model_rels.is_empty() {
        write_part(
            &mut zip,
            &model_rels_path,
            &write_relationships(&model_rels)?,
        )?;
    }
    write_part(&mut zip, model_path, parts.model_xml)?;
    for attachment in &attachments {
        write_part(&mut zip, &attachment.path, &attachment.data)?;
    }

    debug!(
        attachments = attachments.len(),
        model_relationships = model_rels.len(),
        "wrote 3MF package"
    );

    zip.finish()
        .map_err(|e| Error::xml_write(format!("Failed to finalize ZIP archive: {}", e)))
}
