//! Parcel geometry sources.
//!
//! A source turns a refcat into the parcel outline. The pipeline only talks
//! to [`ParcelGeometrySource`], so the live WFS, saved responses and
//! in-memory fixtures are interchangeable.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::parse::cadastre_wfs::{CadastreError, CadastreResult, ParcelPolygon, parse_parcel_response};

/// Catastro INSPIRE cadastral parcels WFS endpoint.
pub const CATASTRO_WFS_URL: &str = "https://ovc.catastro.meh.es/INSPIRE/wfsCP.aspx";

pub trait ParcelGeometrySource: Send + Sync {
    fn fetch(&self, refcat: &str) -> CadastreResult<ParcelPolygon>;
}

impl<T: ParcelGeometrySource + ?Sized> ParcelGeometrySource for Box<T> {
    fn fetch(&self, refcat: &str) -> CadastreResult<ParcelPolygon> {
        (**self).fetch(refcat)
    }
}

fn checked_refcat(refcat: &str) -> CadastreResult<&str> {
    let refcat = refcat.trim();
    if refcat.is_empty() {
        return Err(CadastreError::EmptyParcelId);
    }
    Ok(refcat)
}

/// Saved WFS responses on disk.
///
/// With a directory, `fetch` reads `{dir}/{refcat}.xml`. With a single file,
/// every refcat is answered from that file.
#[derive(Debug, Clone)]
pub struct FileGeometrySource {
    path: PathBuf,
}

impl FileGeometrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn response_path(&self, refcat: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{refcat}.xml"))
        } else {
            self.path.clone()
        }
    }
}

impl ParcelGeometrySource for FileGeometrySource {
    fn fetch(&self, refcat: &str) -> CadastreResult<ParcelPolygon> {
        let refcat = checked_refcat(refcat)?;
        let path = self.response_path(refcat);
        let body = fs::read_to_string(&path).map_err(|source| CadastreError::Io {
            path: path.clone(),
            source,
        })?;
        log::debug!("read parcel response for {refcat} from {}", path.display());
        parse_parcel_response(&body, None)
    }
}

/// Outlines held in memory, keyed by refcat.
#[derive(Debug, Clone, Default)]
pub struct StaticGeometrySource {
    parcels: HashMap<String, ParcelPolygon>,
}

impl StaticGeometrySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_parcel(mut self, refcat: impl Into<String>, polygon: ParcelPolygon) -> Self {
        self.insert(refcat, polygon);
        self
    }

    pub fn insert(&mut self, refcat: impl Into<String>, polygon: ParcelPolygon) {
        self.parcels.insert(refcat.into(), polygon);
    }
}

impl ParcelGeometrySource for StaticGeometrySource {
    fn fetch(&self, refcat: &str) -> CadastreResult<ParcelPolygon> {
        let refcat = checked_refcat(refcat)?;
        self.parcels
            .get(refcat)
            .cloned()
            .ok_or_else(|| CadastreError::MissingParcel {
                preview: format!("no stored parcel for {refcat}"),
            })
    }
}

#[cfg(feature = "wfs-http")]
pub use http::WfsGeometrySource;

#[cfg(feature = "wfs-http")]
mod http {
    use std::time::Duration;

    use super::{CATASTRO_WFS_URL, ParcelGeometrySource, checked_refcat};
    use crate::parse::cadastre_wfs::{CadastreError, CadastreResult, ParcelPolygon, parse_parcel_response};
    use crate::parse::preview;

    const USER_AGENT: &str = "Mozilla/5.0 (parcel-envelope)";

    /// Live Catastro INSPIRE WFS, queried with the `GetParcel` stored query.
    #[derive(Debug, Clone)]
    pub struct WfsGeometrySource {
        client: reqwest::blocking::Client,
        url: String,
    }

    impl WfsGeometrySource {
        pub fn new(url: Option<&str>, timeout: Duration) -> CadastreResult<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()?;
            Ok(Self {
                client,
                url: url.unwrap_or(CATASTRO_WFS_URL).to_owned(),
            })
        }
    }

    impl ParcelGeometrySource for WfsGeometrySource {
        fn fetch(&self, refcat: &str) -> CadastreResult<ParcelPolygon> {
            let refcat = checked_refcat(refcat)?;
            log::debug!("requesting parcel {refcat} from {}", self.url);

            let resp = self
                .client
                .get(&self.url)
                .query(&[
                    ("service", "WFS"),
                    ("request", "GetFeature"),
                    ("version", "2.0.0"),
                    ("STOREDQUERIE_ID", "GetParcel"),
                    ("refcat", refcat),
                    ("srsname", "EPSG:4326"),
                ])
                .send()?;

            let status = resp.status();
            let url = resp.url().to_string();
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = resp.text()?;

            if status != reqwest::StatusCode::OK {
                return Err(CadastreError::Http {
                    status: status.as_u16(),
                    url,
                    preview: preview(&body),
                });
            }
            parse_parcel_response(&body, content_type.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::LonLat;

    const RESPONSE: &str = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0">
  <wfs:member><cp:CadastralParcel><cp:geometry><gml:MultiSurface><gml:surfaceMember><gml:Polygon><gml:exterior><gml:LinearRing>
    <gml:posList>41.6450 2.7410 41.6450 2.7412 41.6452 2.7412</gml:posList>
  </gml:LinearRing></gml:exterior></gml:Polygon></gml:surfaceMember></gml:MultiSurface></cp:geometry></cp:CadastralParcel></wfs:member>
</wfs:FeatureCollection>"#;

    #[test]
    fn file_source_reads_directory_and_single_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ABC123.xml"), RESPONSE).unwrap();

        let by_dir = FileGeometrySource::new(dir.path());
        let polygon = by_dir.fetch(" ABC123 ").unwrap();
        assert_eq!(polygon.len(), 4);
        assert!(matches!(by_dir.fetch("OTHER"), Err(CadastreError::Io { .. })));

        let by_file = FileGeometrySource::new(dir.path().join("ABC123.xml"));
        assert_eq!(by_file.fetch("anything").unwrap(), polygon);
    }

    #[test]
    fn empty_refcat_is_rejected_by_every_source() {
        let file = FileGeometrySource::new("missing.xml");
        assert!(matches!(file.fetch("  "), Err(CadastreError::EmptyParcelId)));
        let memory = StaticGeometrySource::new();
        assert!(matches!(memory.fetch(""), Err(CadastreError::EmptyParcelId)));
    }

    #[test]
    fn static_source_answers_known_parcels() {
        let polygon = ParcelPolygon::closed(vec![
            LonLat::new(2.0, 41.0),
            LonLat::new(2.1, 41.0),
            LonLat::new(2.1, 41.1),
        ]);
        let source = StaticGeometrySource::new().with_parcel("R1", polygon.clone());
        assert_eq!(source.fetch("R1").unwrap(), polygon);
        assert!(matches!(
            source.fetch("R2"),
            Err(CadastreError::MissingParcel { .. })
        ));
    }
}
