//! Opening and reading a 3MF package

use super::relationships::parse_relationships;
use super::{
    CONTENT_TYPES_PATH, ContentTypes, MODEL_CONTENT_TYPE, MODEL_REL_TYPE, RELS_CONTENT_TYPE,
    RELS_PATH, Relationship, TEXTURE_REL_TYPE, THUMBNAIL_REL_TYPE, normalize_part_name,
    rels_path_for, resolve_target, validate_part_name,
};
use crate::error::{Error, Result};
use crate::model::Attachment;
use std::io::{Read, Seek};
use tracing::debug;
use zip::ZipArchive;

/// An opened OPC package with its structure already checked
pub(crate) struct Package<R: Read> {
    archive: ZipArchive<R>,
    content_types: ContentTypes,
    model_path: String,
    thumbnail: Option<String>,
}

impl<R: Read + Seek> Package<R> {
    /// Open a 3MF package from a reader
    ///
    /// Checks the content types table, the root relationships and every
    /// part name, and locates the model part through its relationship.
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let mut package = Self {
            archive,
            content_types: ContentTypes::default(),
            model_path: String::new(),
            thumbnail: None,
        };

        for name in package.file_names() {
            if name.ends_with('/') || name == CONTENT_TYPES_PATH {
                continue;
            }
            validate_part_name(&name)?;
        }

        if !package.has_file(CONTENT_TYPES_PATH) {
            return Err(Error::MissingFile(CONTENT_TYPES_PATH.to_string()));
        }
        if !package.has_file(RELS_PATH) {
            return Err(Error::MissingFile(RELS_PATH.to_string()));
        }

        package.content_types = ContentTypes::parse(&package.get_file(CONTENT_TYPES_PATH)?)?;
        if package.content_types.default_for("rels") != Some(RELS_CONTENT_TYPE) {
            return Err(Error::InvalidPackage(
                "[Content_Types].xml has no Default for the rels extension".to_string(),
            ));
        }

        let root_rels = parse_relationships(&package.get_file(RELS_PATH)?, RELS_PATH)?;
        package.check_targets_exist(&root_rels, "", RELS_PATH)?;

        let model_rel = root_rels
            .iter()
            .find(|r| r.rel_type == MODEL_REL_TYPE)
            .ok_or_else(|| {
                Error::InvalidPackage("_rels/.rels has no 3D model relationship".to_string())
            })?;
        package.model_path = resolve_target("", &model_rel.target)?;
        if package.content_types.content_type_for(&package.model_path) != Some(MODEL_CONTENT_TYPE)
        {
            return Err(Error::InvalidPackage(format!(
                "model part {} does not have the 3D model content type",
                package.model_path
            )));
        }

        if let Some(rel) = root_rels.iter().find(|r| r.rel_type == THUMBNAIL_REL_TYPE) {
            package.thumbnail = Some(resolve_target("", &rel.target)?);
        }

        debug!(
            model = %package.model_path,
            parts = package.archive.len(),
            "opened 3MF package"
        );
        Ok(package)
    }

    /// Model part path, without the leading slash
    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    /// Package thumbnail path from the root relationships
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    /// Read the model part as text
    pub fn read_model(&mut self) -> Result<String> {
        let path = self.model_path.clone();
        self.get_file(&path)
    }

    /// Relationships of the model part; empty when it has none
    pub fn model_relationships(&mut self) -> Result<Vec<Relationship>> {
        let rels_path = rels_path_for(&self.model_path);
        if !self.has_file(&rels_path) {
            return Ok(Vec::new());
        }
        let rels = parse_relationships(&self.get_file(&rels_path)?, &rels_path)?;
        let base = self
            .model_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();
        self.check_targets_exist(&rels, &base, &rels_path)?;
        if rels.iter().any(|r| r.rel_type == THUMBNAIL_REL_TYPE) {
            return Err(Error::InvalidPackage(
                "the package thumbnail belongs in _rels/.rels, not the model part".to_string(),
            ));
        }
        Ok(rels)
    }

    /// Every part other than the model, content types and relationships,
    /// tagged with the model part's relationship type when it has one
    pub fn read_attachments(&mut self) -> Result<Vec<Attachment>> {
        let base = self
            .model_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();
        let mut relationship_types = Vec::new();
        for rel in self.model_relationships()? {
            relationship_types.push((resolve_target(&base, &rel.target)?, rel.rel_type));
        }

        // Relationship parts of other parts are carried verbatim
        let model_rels_path = rels_path_for(&self.model_path);
        let mut attachments = Vec::new();
        for name in self.file_names() {
            let path = normalize_part_name(&name).to_string();
            if name.ends_with('/')
                || name == CONTENT_TYPES_PATH
                || path == self.model_path
                || path == RELS_PATH
                || path == model_rels_path
            {
                continue;
            }
            let content_type = match self.content_types.content_type_for(&path) {
                Some(ct) => ct.to_string(),
                None => {
                    return Err(Error::InvalidPackage(format!(
                        "no content type for part {}",
                        path
                    )));
                }
            };
            let data = self.get_file_binary(&name)?;
            let mut attachment = Attachment::new(path, content_type, data);
            attachment.relationship_type = relationship_types
                .iter()
                .find(|(target, _)| *target == attachment.path)
                .map(|(_, rel_type)| rel_type.clone());
            if attachment.relationship_type.as_deref() == Some(TEXTURE_REL_TYPE) {
                debug!(path = %attachment.path, "texture part");
            }
            attachments.push(attachment);
        }
        Ok(attachments)
    }

    fn check_targets_exist(
        &mut self,
        rels: &[Relationship],
        base_dir: &str,
        source: &str,
    ) -> Result<()> {
        for rel in rels {
            let target = resolve_target(base_dir, &rel.target)?;
            validate_part_name(&target)?;
            if !self.has_file(&target) {
                return Err(Error::InvalidPackage(format!(
                    "relationship {} in {} points to missing part {}",
                    rel.id, source, target
                )));
            }
        }
        Ok(())
    }

    /// Check if a file exists in the archive
    pub fn has_file(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    /// List all file names in the archive
    pub fn file_names(&mut self) -> Vec<String> {
        (0..self.archive.len())
            .filter_map(|i| self.archive.by_index(i).ok().map(|f| f.name().to_string()))
            .collect()
    }

    /// Get a file as UTF-8 text, without a byte order mark
    pub fn get_file(&mut self, name: &str) -> Result<String> {
        let bytes = self.get_file_binary(name)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::InvalidPackage(format!("{} is not UTF-8: {}", name, e)))?;
        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }

    /// Get a file as binary data from the archive
    pub fn get_file_binary(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::MissingFile(name.to_string()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }
}
