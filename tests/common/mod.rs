//! Shared fixtures for integration tests
//!
//! Packages are assembled in memory with `zip`, the same way a producer
//! would lay them out on disk.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Default Extension="txt" ContentType="text/plain"/>
</Types>"#;

pub const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

pub const ROOT_RELS_WITH_THUMBNAIL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
  <Relationship Target="/Metadata/thumbnail.png" Id="rel1" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail"/>
</Relationships>"#;

/// A unit cube: eight vertices, twelve triangles, one build item
pub const CUBE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <metadata name="Title">Cube</metadata>
  <resources>
    <object id="1" type="model" name="cube">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="10" y="10" z="0"/>
          <vertex x="0" y="10" z="0"/>
          <vertex x="0" y="0" z="10"/>
          <vertex x="10" y="0" z="10"/>
          <vertex x="10" y="10" z="10"/>
          <vertex x="0" y="10" z="10"/>
        </vertices>
        <triangles>
          <triangle v1="3" v2="2" v3="1"/>
          <triangle v1="1" v2="0" v3="3"/>
          <triangle v1="4" v2="5" v3="6"/>
          <triangle v1="6" v2="7" v3="4"/>
          <triangle v1="0" v2="1" v3="5"/>
          <triangle v1="5" v2="4" v3="0"/>
          <triangle v1="1" v2="2" v3="6"/>
          <triangle v1="6" v2="5" v3="1"/>
          <triangle v1="2" v2="3" v3="7"/>
          <triangle v1="7" v2="6" v3="2"/>
          <triangle v1="3" v2="0" v3="4"/>
          <triangle v1="4" v2="7" v3="3"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build>
    <item objectid="1" transform="1 0 0 0 1 0 0 0 1 5 5 0"/>
  </build>
</model>"#;

/// Wrap a model part in a minimal package
pub fn package(model: &str) -> Cursor<Vec<u8>> {
    package_with(model, ROOT_RELS, &[])
}

/// Package with custom root relationships and extra parts
pub fn package_with(model: &str, root_rels: &str, extra: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
    let mut parts: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        ("3D/3dmodel.model", model.as_bytes()),
    ];
    parts.extend_from_slice(extra);
    zip_parts(&parts)
}

/// Raw ZIP archive holding exactly `parts`
pub fn zip_parts(parts: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    let mut cursor = zip.finish().unwrap();
    cursor.set_position(0);
    cursor
}

/// A model part with `resources` and `build` spliced into the core
/// namespace plus the given extra namespace declarations
pub fn model(namespaces: &str, resources: &str, build: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" {namespaces}>
  <resources>
{resources}
  </resources>
  <build>
{build}
  </build>
</model>"#
    )
}

/// A single-triangle mesh object element
pub fn triangle_object(id: u32) -> String {
    format!(
        r#"    <object id="{id}" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="0" y="1" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
        </triangles>
      </mesh>
    </object>"#
    )
}
