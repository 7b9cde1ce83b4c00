//! Validation at load and save time

mod common;

use common::{ROOT_RELS, model, package, package_with, triangle_object};
use lib3mf_engine::{
    Document, Error, ErrorKind, FindingCode, Image3D, Image3DChannelSelector, ImageSheet,
    ImageStack, ParserConfig, Severity, Strictness, WriterConfig,
};
use std::io::Cursor;

fn cyclic_model() -> String {
    let resources = format!(
        r#"{}
    <object id="10"><components><component objectid="1"/><component objectid="20"/></components></object>
    <object id="20"><components><component objectid="10"/></components></object>"#,
        triangle_object(1)
    );
    model("", &resources, r#"    <item objectid="10"/>"#)
}

#[test]
fn test_cycle_fails_standard_load() {
    let err = Document::load(package(&cyclic_model())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    match err {
        Error::CircularReference { path } => assert_eq!(path, vec![10, 20, 10]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_cycle_kept_by_lenient_load_but_blocks_save() {
    let document =
        Document::load_with_config(package(&cyclic_model()), ParserConfig::lenient()).unwrap();

    let report = document.validate(Strictness::Standard);
    assert_eq!(report.with_code(FindingCode::CircularReference).count(), 1);
    assert!(report.has_fatal());

    let err = document.save(Cursor::new(Vec::new())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(
        err.findings()
            .iter()
            .all(|f| f.severity == Severity::Fatal)
    );
    assert!(
        err.findings()
            .iter()
            .any(|f| f.code == FindingCode::CircularReference)
    );

    let err = document.resolve_flat_mesh(10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReference);
}

#[test]
fn test_lenient_load_reports_dropped_triangles() {
    let resources = r#"    <object id="1">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="0" y="1" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
          <triangle v1="0" v2="1" v3="3"/>
        </triangles>
      </mesh>
    </object>"#;
    let xml = model("", resources, r#"    <item objectid="1"/>"#);

    let err = Document::load(package(&xml)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(err.to_string().contains("line 13"));

    let document = Document::load_with_config(package(&xml), ParserConfig::lenient()).unwrap();
    assert_eq!(document.resources().mesh_object(1).unwrap().mesh.triangle_count(), 1);
    assert_eq!(document.load_findings().len(), 1);

    let report = document.validate(Strictness::Standard);
    let dropped = &report.findings()[0];
    assert_eq!(dropped.code, FindingCode::DroppedTriangle);
    assert_eq!(dropped.severity, Severity::Error);
    assert_eq!(dropped.location.resource, Some(1));
    assert_eq!(dropped.location.triangle, Some(1));
}

#[test]
fn test_degenerate_triangle_severity_follows_strictness() {
    let resources = r#"    <object id="1">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="0" y="1" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
          <triangle v1="2" v2="2" v3="0"/>
        </triangles>
      </mesh>
    </object>"#;
    let xml = model("", resources, r#"    <item objectid="1"/>"#);

    let document = Document::load(package(&xml)).unwrap();
    let standard = document.validate(Strictness::Standard);
    assert_eq!(standard.count(Severity::Warning), 1);
    assert_eq!(
        standard.findings()[0].location.triangle,
        Some(1)
    );

    let strict = document.validate(Strictness::Strict);
    assert_eq!(strict.count(Severity::Error), 1);

    let err = Document::load_with_config(package(&xml), ParserConfig::strict()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn test_orphaned_resource_is_a_warning() {
    let resources = format!("{}\n{}", triangle_object(1), triangle_object(2));
    let xml = model("", &resources, r#"    <item objectid="1"/>"#);
    let document = Document::load(package(&xml)).unwrap();

    let report = document.validate(Strictness::Standard);
    let orphans: Vec<_> = report.with_code(FindingCode::OrphanedResource).collect();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].location.resource, Some(2));
    assert_eq!(orphans[0].severity, Severity::Warning);
}

#[test]
fn test_inverted_value_range_is_an_error() {
    let mut document = Document::new();
    document.set_attachment(lib3mf_engine::Attachment::new(
        "3D/volume/layer0.png",
        "image/png",
        vec![0x89, b'P', b'N', b'G'],
    ));
    let image = document
        .resources_mut()
        .create(
            Image3D::new(ImageStack {
                row_count: 2,
                column_count: 2,
                sheets: vec![ImageSheet::new("/3D/volume/layer0.png")],
            })
            .into(),
        )
        .unwrap();
    let selector = document
        .resources_mut()
        .create(Image3DChannelSelector::new(image, "R", "density").unwrap().into())
        .unwrap();

    document
        .resources_mut()
        .channel_selector_mut(selector)
        .unwrap()
        .set_value_range(5.0, 2.0);

    let report = document.validate(Strictness::Standard);
    let inverted: Vec<_> = report.with_code(FindingCode::InvalidValueRange).collect();
    assert_eq!(inverted.len(), 1);
    assert_eq!(inverted[0].severity, Severity::Error);
    assert_eq!(inverted[0].location.resource, Some(selector));
    assert!(!report.has_fatal());

    // Errors only block in strict mode
    let bytes = document.save(Cursor::new(Vec::new())).unwrap().into_inner();
    let err = document
        .save_with_config(
            Cursor::new(Vec::new()),
            &WriterConfig::new().with_strictness(Strictness::Strict),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let reloaded = Document::load(Cursor::new(bytes)).unwrap();
    assert_eq!(
        reloaded.resources().channel_selector(selector).unwrap().value_range(),
        (5.0, 2.0)
    );
}

#[test]
fn test_unknown_channel_reported_not_rejected() {
    let mut document = Document::new();
    let image = document
        .resources_mut()
        .create(Image3D::new(ImageStack::default()).into())
        .unwrap();
    let mut selector = Image3DChannelSelector::new(image, "R", "R").unwrap();
    selector.set_source_channel("Density").unwrap();
    let selector = document.resources_mut().create(selector.into()).unwrap();

    let report = document.validate(Strictness::Standard);
    let unknown: Vec<_> = report.with_code(FindingCode::UnknownChannel).collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].location.resource, Some(selector));
}

#[test]
fn test_unresolved_reference_fails_load() {
    let xml = model(
        "",
        r#"    <object id="5"><components><component objectid="6"/></components></object>"#,
        r#"    <item objectid="5"/>"#,
    );
    let err = Document::load(package(&xml)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert!(err.to_string().contains("resource 6"));
}

#[test]
fn test_save_without_validation() {
    let document =
        Document::load_with_config(package(&cyclic_model()), ParserConfig::lenient()).unwrap();
    let config = WriterConfig::new().with_validation(false);
    let bytes = document
        .save_with_config(Cursor::new(Vec::new()), &config)
        .unwrap()
        .into_inner();

    let reloaded = Document::load_with_config(Cursor::new(bytes), ParserConfig::lenient()).unwrap();
    assert_eq!(reloaded.resources().len(), 3);
}

fn volumetric_package(extra_resources: &str) -> Cursor<Vec<u8>> {
    let resources = format!(
        r#"{}
    <v:image3d id="2">
      <v:imagestack rowcount="1" columncount="1" sheetcount="1">
        <v:imagesheet path="/3D/volume/s0.png"/>
      </v:imagestack>
    </v:image3d>
    <v:image3dchannelselector id="3" image3did="2" srcchannel="R" dstchannel="density"/>{}"#,
        triangle_object(1),
        extra_resources
    );
    let xml = model(
        r#"xmlns:v="http://schemas.microsoft.com/3dmanufacturing/volumetric/2018/11""#,
        &resources,
        r#"    <item objectid="1"/>"#,
    );
    package_with(
        &xml,
        ROOT_RELS,
        &[("3D/volume/s0.png", b"\x89PNG".as_slice())],
    )
}

#[test]
fn test_strict_load_accepts_unreferenced_image_resources() {
    let document =
        Document::load_with_config(volumetric_package(""), ParserConfig::strict()).unwrap();

    let report = document.validate(Strictness::Strict);
    let orphans: Vec<_> = report.with_code(FindingCode::OrphanedResource).collect();
    assert_eq!(orphans.len(), 2);
    assert!(orphans.iter().all(|f| f.severity == Severity::Warning));
    assert!(report.blocking(Strictness::Strict).is_empty());

    let config = WriterConfig::new().with_strictness(Strictness::Strict);
    document
        .save_with_config(Cursor::new(Vec::new()), &config)
        .unwrap();
}

#[test]
fn test_strict_load_rejects_unused_object() {
    let extra = format!("\n{}", triangle_object(4));
    let err = Document::load_with_config(volumetric_package(&extra), ParserConfig::strict())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(err.findings().len(), 1);
    assert_eq!(err.findings()[0].code, FindingCode::OrphanedResource);
    assert_eq!(err.findings()[0].location.resource, Some(4));
}
