//! Parser for Catastro INSPIRE WFS `GetParcel` responses.
//!
//! The service answers with a WFS 2.0 feature collection holding
//! `cp:CadastralParcel` features. Their `gml:posList` lists coordinates as
//! `lat lon` pairs in EPSG:4326.

use std::num::ParseFloatError;
use std::path::PathBuf;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

use super::preview;
use crate::geom::LonLat;

pub type CadastreResult<T> = Result<T, CadastreError>;

#[derive(Debug, Error)]
pub enum CadastreError {
    #[error("parcel reference (refcat) must not be empty")]
    EmptyParcelId,
    #[error("WFS returned HTML instead of XML (service may be under maintenance)\n{preview}")]
    ServiceUnavailable { preview: String },
    #[error("WFS response is not valid XML: {source}\n{preview}")]
    Xml {
        #[source]
        source: quick_xml::Error,
        preview: String,
    },
    #[error("WFS returned an exception report: {0}")]
    ExceptionReport(String),
    #[error("no CadastralParcel in WFS response\n{preview}")]
    MissingParcel { preview: String },
    #[error("parcel geometry has no gml:posList")]
    MissingPosList,
    #[error("posList holds an odd number of values ({0}); expected lat/lon pairs")]
    OddCoordinateCount(usize),
    #[error("posList value `{value}` is not a number")]
    InvalidNumber {
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("WFS HTTP status {status} for {url}\n{preview}")]
    Http {
        status: u16,
        url: String,
        preview: String,
    },
    #[error("cannot read parcel response {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "wfs-http")]
    #[error("WFS request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Closed parcel outline in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelPolygon {
    points: Vec<LonLat>,
}

impl ParcelPolygon {
    /// Wraps a ring, appending the first point when the ring is open.
    #[must_use]
    pub fn closed(mut points: Vec<LonLat>) -> Self {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if first != last {
                points.push(first);
            }
        }
        Self { points }
    }

    #[must_use]
    pub fn points(&self) -> &[LonLat] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Parses a WFS body into the first parcel's outline.
///
/// `content_type` is the HTTP header value when known; an HTML body is
/// reported as an unavailable service rather than as an XML error.
pub fn parse_parcel_response(body: &str, content_type: Option<&str>) -> CadastreResult<ParcelPolygon> {
    if looks_like_html(body, content_type) {
        return Err(CadastreError::ServiceUnavailable {
            preview: preview(body),
        });
    }

    let scan = scan_document(body).map_err(|source| CadastreError::Xml {
        source,
        preview: preview(body),
    })?;

    if let Some(text) = scan.exception_text.filter(|t| !t.trim().is_empty()) {
        return Err(CadastreError::ExceptionReport(text.trim().to_owned()));
    }
    if scan.parcel_count == 0 {
        return Err(CadastreError::MissingParcel {
            preview: preview(body),
        });
    }

    let pos_list = scan
        .pos_list
        .filter(|t| !t.trim().is_empty())
        .ok_or(CadastreError::MissingPosList)?;

    let numbers: Vec<&str> = pos_list.split_whitespace().collect();
    if numbers.len() % 2 != 0 {
        return Err(CadastreError::OddCoordinateCount(numbers.len()));
    }

    let mut points = Vec::with_capacity(numbers.len() / 2 + 1);
    for pair in numbers.chunks_exact(2) {
        let lat = parse_number(pair[0])?;
        let lon = parse_number(pair[1])?;
        points.push(LonLat::new(lon, lat));
    }

    let polygon = ParcelPolygon::closed(points);
    log::debug!("read {} parcel vertices", polygon.len());
    Ok(polygon)
}

fn parse_number(value: &str) -> CadastreResult<f64> {
    value
        .parse::<f64>()
        .map_err(|source| CadastreError::InvalidNumber {
            value: value.to_owned(),
            source,
        })
}

fn looks_like_html(body: &str, content_type: Option<&str>) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("html")) {
        return true;
    }
    let head: String = body
        .trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace())
        .chars()
        .take(16)
        .collect::<String>()
        .to_lowercase();
    head.starts_with("<html") || head.starts_with("<!doctype")
}

#[derive(Debug, Default)]
struct DocumentScan {
    exception_text: Option<String>,
    parcel_count: usize,
    pos_list: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    ExceptionText,
    PosList,
}

fn scan_document(body: &str) -> Result<DocumentScan, quick_xml::Error> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut scan = DocumentScan::default();
    // Element depth of the first CadastralParcel while we are inside it.
    let mut parcel_depth: Option<usize> = None;
    let mut depth = 0usize;
    let mut capture: Option<(Capture, usize)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"ExceptionText" if scan.exception_text.is_none() => {
                        scan.exception_text = Some(String::new());
                        capture = Some((Capture::ExceptionText, depth));
                    }
                    b"CadastralParcel" => {
                        scan.parcel_count += 1;
                        if scan.parcel_count == 1 {
                            parcel_depth = Some(depth);
                        }
                    }
                    b"posList" if parcel_depth.is_some() && scan.pos_list.is_none() => {
                        scan.pos_list = Some(String::new());
                        capture = Some((Capture::PosList, depth));
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"ExceptionText" if scan.exception_text.is_none() => {
                    scan.exception_text = Some(String::new());
                }
                b"CadastralParcel" => scan.parcel_count += 1,
                b"posList" if parcel_depth.is_some() && scan.pos_list.is_none() => {
                    scan.pos_list = Some(String::new());
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some((target, _)) = capture {
                    let text = t.unescape()?;
                    let slot = match target {
                        Capture::ExceptionText => scan.exception_text.as_mut(),
                        Capture::PosList => scan.pos_list.as_mut(),
                    };
                    if let Some(slot) = slot {
                        if !slot.is_empty() {
                            slot.push(' ');
                        }
                        slot.push_str(&text);
                    }
                }
            }
            Event::End(_) => {
                if capture.is_some_and(|(_, d)| d == depth) {
                    capture = None;
                }
                if parcel_depth == Some(depth) {
                    parcel_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(scan)
}
