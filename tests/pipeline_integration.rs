use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use parcel_envelope::export::{ExportError, IfcWriter, ObjWriter};
use parcel_envelope::parse::cadastre_wfs::CadastreError;
use parcel_envelope::parse::poum_gml::ZoningIndex;
use parcel_envelope::pipeline::{EnvelopePipeline, Outcome, PipelineError, UNKNOWN_ZONE};
use parcel_envelope::source::FileGeometrySource;
use parcel_envelope::zoning::{DepthSource, RuleSet};
use parcel_envelope::PipelineConfig;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn ifc_pipeline(
    out_dir: &std::path::Path,
    config: PipelineConfig,
) -> EnvelopePipeline<FileGeometrySource, IfcWriter> {
    let rules = RuleSet::compiled(config.default_policy()).expect("compiled rules");
    let index = ZoningIndex::from_path(fixture("poum_sample.gml")).expect("POUM fixture");
    let writer = IfcWriter::new(config.project_name.clone(), config.site_name.clone())
        .with_overwrite(config.overwrite);
    EnvelopePipeline::new(
        Arc::new(rules),
        Arc::new(index),
        FileGeometrySource::new(fixture("parcels")),
        writer,
        config,
    )
    .expect("pipeline")
    .with_out_dir(out_dir)
}

#[test]
fn zoning_fixture_is_indexed() {
    let index = ZoningIndex::from_path(fixture("poum_sample.gml")).unwrap();
    assert_eq!(index.len(), 6);
    assert_eq!(index.zone_of("0003002DG7100S"), Some("18c"));
    let info = index.get("0003001DG7100S").unwrap();
    assert_eq!(info.altmax_m, Some(19.8));
    assert_eq!(info.profedif_m, Some(13.3));
}

#[test]
fn buildable_parcel_is_written_as_ifc() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());

    let report = pipeline.run("0001001DG7100S").unwrap();
    assert!(report.matched);
    assert_eq!(report.zone_key, "12a");
    assert_eq!(report.vertex_count, 5);
    assert_abs_diff_eq!(report.bbox_width_m, 16.72, epsilon = 0.05);
    assert_abs_diff_eq!(report.bbox_depth_m, 22.25, epsilon = 0.05);
    assert_eq!(report.buildability.height_m, 9.0);
    assert_eq!(report.buildability.depth_m, 15.0);
    assert_eq!(report.buildability.depth_source, DepthSource::Rule);

    let expected = dir.path().join("malgrat_0001001DG7100S_12a_envelope.ifc");
    assert_eq!(report.outcome, Outcome::Emitted { path: expected.clone() });

    let text = fs::read_to_string(&expected).unwrap();
    assert!(text.contains("FILE_SCHEMA(('IFC4X3_ADD2'));"));
    assert!(text.contains("'Building Zone 12a'"));
    assert!(text.contains("'Envelope_12a'"));
    assert!(text.contains("'Ground Floor'"));
    assert!(text.contains("IFCEXTRUDEDAREASOLID("));
    assert!(text.contains(",9.);"));
}

#[test]
fn zero_height_zone_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());

    let report = pipeline.run("0002001DG7100S").unwrap();
    assert_eq!(report.zone_key, "5p");
    assert!(report.matched);
    assert!(!report.buildability.buildable);
    assert_eq!(report.outcome, Outcome::NotBuildable);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn aliased_zone_uses_canonical_rule_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());

    let report = pipeline.run("0003001DG7100S").unwrap();
    assert_eq!(report.raw_zone, "18c");
    assert_eq!(report.zone_key, "18b");
    assert!(report.matched);
    assert_eq!(report.buildability.height_m, 19.8);
    assert_eq!(report.buildability.depth_source, DepthSource::BoundingBox);
    assert_abs_diff_eq!(report.buildability.depth_m, report.bbox_depth_m);
    assert!(
        dir.path()
            .join("malgrat_0003001DG7100S_18b_envelope.ifc")
            .is_file()
    );
}

#[test]
fn unknown_and_missing_zones_fall_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());

    let unknown = pipeline.run("0004001DG7100S").unwrap();
    assert!(!unknown.matched);
    assert_eq!(unknown.zone_key, "unknown_zone_xyz");
    assert_eq!(unknown.buildability.height_m, 10.0);
    assert!(unknown.emitted_path().is_some());

    let not_indexed = pipeline.run("0009001DG7100S").unwrap();
    assert!(!not_indexed.matched);
    assert_eq!(not_indexed.raw_zone, UNKNOWN_ZONE);
    assert_eq!(
        not_indexed.emitted_path(),
        Some(
            dir.path()
                .join("malgrat_0009001DG7100S_UNKNOWN_envelope.ifc")
                .as_path()
        )
    );
}

#[test]
fn zero_default_height_makes_unknown_zones_unbuildable() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::from_xml_str(r#"<envelope default-height="0"/>"#).unwrap();
    let pipeline = ifc_pipeline(dir.path(), config);

    let report = pipeline.run("0004001DG7100S").unwrap();
    assert!(!report.matched);
    assert_eq!(report.outcome, Outcome::NotBuildable);

    let known = pipeline.run("0001001DG7100S").unwrap();
    assert!(known.emitted_path().is_some());
}

#[test]
fn slash_in_zone_is_replaced_in_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());

    let report = pipeline.run("0005001DG7100S").unwrap();
    assert_eq!(report.zone_key, "21a/1");
    assert_eq!(
        report.emitted_path(),
        Some(
            dir.path()
                .join("malgrat_0005001DG7100S_21a-1_envelope.ifc")
                .as_path()
        )
    );
    let text = fs::read_to_string(report.emitted_path().unwrap()).unwrap();
    assert!(text.contains("'Building Zone 21a/1'"));
}

#[test]
fn geometry_failures_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());

    assert!(matches!(
        pipeline.run("0006001DG7100S"),
        Err(PipelineError::Geometry(CadastreError::ExceptionReport(msg))) if msg.contains("no existe")
    ));
    assert!(matches!(
        pipeline.run("0007001DG7100S"),
        Err(PipelineError::Geometry(CadastreError::Io { .. }))
    ));
    assert!(matches!(pipeline.run(" "), Err(PipelineError::EmptyParcelId)));
}

#[test]
fn existing_output_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());
    let path = dir.path().join("malgrat_0001001DG7100S_12a_envelope.ifc");
    fs::write(&path, "keep me").unwrap();

    assert!(matches!(
        pipeline.run("0001001DG7100S"),
        Err(PipelineError::Export(ExportError::Exists(_)))
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");

    let config = PipelineConfig {
        overwrite: true,
        ..PipelineConfig::default()
    };
    let pipeline = ifc_pipeline(dir.path(), config);
    pipeline.run("0001001DG7100S").unwrap();
    assert!(fs::read_to_string(&path).unwrap().starts_with("ISO-10303-21;"));
}

#[test]
fn batch_keeps_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ifc_pipeline(dir.path(), PipelineConfig::default());
    let refcats = [
        "0001001DG7100S",
        "0006001DG7100S",
        "0002001DG7100S",
        "0003001DG7100S",
    ];

    let results = pipeline.run_batch(&refcats);
    assert_eq!(results.len(), refcats.len());
    assert_eq!(results[0].as_ref().unwrap().zone_key, "12a");
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().outcome, Outcome::NotBuildable);
    assert_eq!(results[3].as_ref().unwrap().zone_key, "18b");
}

#[test]
fn obj_output_is_a_closed_prism() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default();
    let rules = RuleSet::compiled(config.default_policy()).unwrap();
    let index = ZoningIndex::from_path(fixture("poum_sample.gml")).unwrap();
    let pipeline = EnvelopePipeline::new(
        Arc::new(rules),
        Arc::new(index),
        FileGeometrySource::new(fixture("parcel_wfs.xml")),
        ObjWriter::new(),
        config,
    )
    .unwrap()
    .with_out_dir(dir.path());

    let report = pipeline.run("0001001DG7100S").unwrap();
    let text = fs::read_to_string(report.emitted_path().unwrap()).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 8);
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 12);
}
