//! IFC4X3 STEP physical file output.
//!
//! The file holds a minimal spatial tree (project, site, building, storey)
//! and one `IfcBuildingElementProxy` whose body is the footprint profile
//! extruded along +Z by the envelope height.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use time::OffsetDateTime;
use time::macros::format_description;

use super::guid::new_ifc_guid;
use super::{Envelope, EnvelopeWriter, ExportError, OutputFormat, prepare_output};

pub const IFC_SCHEMA: &str = "IFC4X3_ADD2";

const DEFAULT_PROJECT_NAME: &str = "Malgrat Envelope Project";
const DEFAULT_SITE_NAME: &str = "Malgrat de Mar";

#[derive(Debug, Clone)]
pub struct IfcWriter {
    project_name: String,
    site_name: String,
    overwrite: bool,
}

impl Default for IfcWriter {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.to_owned(),
            site_name: DEFAULT_SITE_NAME.to_owned(),
            overwrite: false,
        }
    }
}

impl IfcWriter {
    #[must_use]
    pub fn new(project_name: impl Into<String>, site_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            site_name: site_name.into(),
            overwrite: false,
        }
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    #[must_use]
    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    /// Full file text for `envelope`. `file_name` and `timestamp` only feed
    /// the header.
    pub fn render(&self, envelope: &Envelope, file_name: &str, timestamp: &str) -> Result<String, ExportError> {
        envelope.check()?;

        let mut data = StepData::default();
        let zone = &envelope.zone_key;

        // Units and context.
        let unit = data.push("IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.)".to_owned());
        let units = data.push(format!("IFCUNITASSIGNMENT((#{unit}))"));
        let origin = data.push("IFCCARTESIANPOINT((0.,0.,0.))".to_owned());
        let z_dir = data.push("IFCDIRECTION((0.,0.,1.))".to_owned());
        let x_dir = data.push("IFCDIRECTION((1.,0.,0.))".to_owned());
        let world = data.push(format!("IFCAXIS2PLACEMENT3D(#{origin},#{z_dir},#{x_dir})"));
        let context = data.push(format!(
            "IFCGEOMETRICREPRESENTATIONCONTEXT('Model','Model',3,1.E-05,#{world},$)"
        ));
        let project = data.push(format!(
            "IFCPROJECT('{}',$,{},$,$,$,$,(#{context}),#{units})",
            new_ifc_guid(),
            step_string(&self.project_name)
        ));

        // Spatial tree.
        let site = data.push(format!(
            "IFCSITE('{}',$,{},$,$,$,$,$,.ELEMENT.,$,$,$,$,$)",
            new_ifc_guid(),
            step_string(&self.site_name)
        ));
        let building = data.push(format!(
            "IFCBUILDING('{}',$,{},$,$,$,$,$,.ELEMENT.,$,$,$)",
            new_ifc_guid(),
            step_string(&format!("Building Zone {zone}"))
        ));
        let storey = data.push(format!(
            "IFCBUILDINGSTOREY('{}',$,'Ground Floor',$,$,$,$,$,.ELEMENT.,0.)",
            new_ifc_guid()
        ));
        for (parent, child) in [(project, site), (site, building), (building, storey)] {
            data.push(format!(
                "IFCRELAGGREGATES('{}',$,$,$,#{parent},(#{child}))",
                new_ifc_guid()
            ));
        }

        // Body geometry. Profile points are 2D, in the projected CRS. The
        // polyline closes on the first point's instance.
        let ring = envelope.closed_footprint();
        let mut point_refs = Vec::with_capacity(ring.len());
        for p in &ring[..ring.len() - 1] {
            let id = data.push(format!(
                "IFCCARTESIANPOINT(({},{}))",
                step_real(p.x),
                step_real(p.y)
            ));
            point_refs.push(format!("#{id}"));
        }
        point_refs.push(point_refs[0].clone());
        let polyline = data.push(format!("IFCPOLYLINE(({}))", point_refs.join(",")));
        let profile = data.push(format!("IFCARBITRARYCLOSEDPROFILEDEF(.AREA.,$,#{polyline})"));
        let solid_origin = data.push("IFCCARTESIANPOINT((0.,0.,0.))".to_owned());
        let solid_axis = data.push("IFCDIRECTION((0.,0.,1.))".to_owned());
        let solid_ref = data.push("IFCDIRECTION((1.,0.,0.))".to_owned());
        let position = data.push(format!(
            "IFCAXIS2PLACEMENT3D(#{solid_origin},#{solid_axis},#{solid_ref})"
        ));
        let extrude_dir = data.push("IFCDIRECTION((0.,0.,1.))".to_owned());
        let solid = data.push(format!(
            "IFCEXTRUDEDAREASOLID(#{profile},#{position},#{extrude_dir},{})",
            step_real(envelope.height_m)
        ));
        let body = data.push(format!(
            "IFCSHAPEREPRESENTATION(#{context},'Body','SweptSolid',(#{solid}))"
        ));
        let shape = data.push(format!("IFCPRODUCTDEFINITIONSHAPE($,$,(#{body}))"));

        let proxy = data.push(format!(
            "IFCBUILDINGELEMENTPROXY('{}',$,{},$,'BUILDING_ENVELOPE',$,#{shape},$,$)",
            new_ifc_guid(),
            step_string(&format!("Envelope_{zone}"))
        ));
        data.push(format!(
            "IFCRELCONTAINEDINSPATIALSTRUCTURE('{}',$,$,$,(#{proxy}),#{storey})",
            new_ifc_guid()
        ));

        let mut out = String::new();
        out.push_str("ISO-10303-21;\nHEADER;\n");
        out.push_str("FILE_DESCRIPTION(('ViewDefinition [DesignTransferView]'),'2;1');\n");
        let _ = writeln!(
            out,
            "FILE_NAME({},'{timestamp}',(''),(''),'parcel-envelope','parcel-envelope {}','');",
            step_string(file_name),
            env!("CARGO_PKG_VERSION")
        );
        let _ = writeln!(out, "FILE_SCHEMA(('{IFC_SCHEMA}'));");
        out.push_str("ENDSEC;\nDATA;\n");
        for line in &data.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        Ok(out)
    }
}

impl EnvelopeWriter for IfcWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Ifc
    }

    fn write(&self, envelope: &Envelope, path: &Path) -> Result<(), ExportError> {
        let timestamp = OffsetDateTime::now_utc()
            .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = self.render(envelope, &file_name, &timestamp)?;

        prepare_output(path, self.overwrite)?;
        fs::write(path, text).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("wrote IFC envelope {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StepData {
    lines: Vec<String>,
}

impl StepData {
    /// Appends an instance and returns its `#id`.
    fn push(&mut self, entity: String) -> usize {
        let id = self.lines.len() + 1;
        self.lines.push(format!("#{id}={entity};"));
        id
    }
}

/// STEP REAL literal. Always carries a decimal point.
fn step_real(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') { s } else { format!("{s}.") }
}

/// Quoted STEP string. Non-ASCII characters use the `\X2\` UTF-16 encoding.
fn step_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            ' '..='~' => out.push(ch),
            _ => {
                out.push_str("\\X2\\");
                let mut buf = [0u16; 2];
                for unit in ch.encode_utf16(&mut buf) {
                    let _ = write!(out, "{unit:04X}");
                }
                out.push_str("\\X0\\");
            }
        }
    }
    out.push('\'');
    out
}
