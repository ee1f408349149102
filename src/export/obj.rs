use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{Envelope, EnvelopeWriter, ExportError, OutputFormat, prepare_output};
use crate::geom::{GeomMesh, extrude_footprint};

/// Wavefront OBJ output of the extruded envelope prism.
#[derive(Debug, Clone, Default)]
pub struct ObjWriter {
    overwrite: bool,
}

impl ObjWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl EnvelopeWriter for ObjWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Obj
    }

    fn write(&self, envelope: &Envelope, path: &Path) -> Result<(), ExportError> {
        envelope.check()?;
        let mesh = extrude_footprint(&envelope.footprint, envelope.height_m)?;
        mesh.validate().map_err(ExportError::InvalidEnvelope)?;

        prepare_output(path, self.overwrite)?;
        let io_err = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut w = BufWriter::new(file);
        write_mesh(&mut w, &mesh, envelope).map_err(io_err)?;
        w.flush().map_err(io_err)?;

        log::debug!(
            "wrote {} ({} vertices, {} triangles)",
            path.display(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(())
    }
}

fn write_mesh(w: &mut impl Write, mesh: &GeomMesh, envelope: &Envelope) -> std::io::Result<()> {
    writeln!(w, "# parcel-envelope {}", envelope.refcat)?;
    writeln!(w, "# zone {} height {} m", envelope.zone_key, envelope.height_m)?;
    writeln!(w, "o Envelope_{}", envelope.zone_key)?;

    for p in mesh.positions.iter().copied() {
        writeln!(w, "v {} {} {}", p[0], p[1], p[2])?;
    }
    for tri in mesh.indices.chunks_exact(3) {
        writeln!(w, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1)?;
    }
    Ok(())
}
