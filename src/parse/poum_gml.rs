//! Zoning index built from the POUM GML export.
//!
//! Each `featureMember` wraps one feature whose direct children carry the
//! zoning attributes. `RC` holds one or more comma-separated cadastral
//! references, all of which map to the same [`PoumInfo`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

pub type ZoningIndexResult<T> = Result<T, ZoningIndexError>;

#[derive(Debug, Error)]
pub enum ZoningIndexError {
    #[error("cannot read zoning file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid zoning GML at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
}

/// Zoning attributes of a parcel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoumInfo {
    /// Raw zone code from `C_QUAL_AJT`, e.g. `12a`, `13b`, `12-2`.
    pub zone: Option<String>,
    pub altmax_m: Option<f64>,
    /// `PROFEDIF`; ranges such as `13-13,3` keep their maximum.
    pub profedif_m: Option<f64>,
    /// Storey count expression, e.g. `PB+4P`.
    pub numplamax: Option<String>,
}

/// Parcel reference (refcat) to zoning attributes.
#[derive(Debug, Clone, Default)]
pub struct ZoningIndex {
    entries: HashMap<String, PoumInfo>,
}

impl ZoningIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: impl AsRef<Path>) -> ZoningIndexResult<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path).map_err(|source| ZoningIndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::parse_str(&xml)?;
        log::info!(
            "zoning index {} holds {} parcel references",
            path.display(),
            index.len()
        );
        Ok(index)
    }

    pub fn parse_str(xml: &str) -> ZoningIndexResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut index = Self::new();
        let mut member: Option<MemberState> = None;

        loop {
            let event = reader.read_event().map_err(|source| ZoningIndexError::Xml {
                position: reader.buffer_position(),
                source,
            })?;

            match event {
                Event::Start(e) => match member.as_mut() {
                    Some(state) => state.open(e.local_name().as_ref()),
                    None if e.local_name().as_ref() == b"featureMember" => {
                        member = Some(MemberState::default());
                    }
                    None => {}
                },
                Event::Empty(e) => {
                    if let Some(state) = member.as_mut() {
                        state.open(e.local_name().as_ref());
                        state.close();
                    }
                }
                Event::Text(t) => {
                    if let Some(state) = member.as_mut() {
                        let text = t.unescape().map_err(|source| ZoningIndexError::Xml {
                            position: reader.buffer_position(),
                            source,
                        })?;
                        state.text(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(state) = member.as_mut() {
                        state.text(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(_) => {
                    if let Some(state) = member.as_mut() {
                        if state.depth == 0 {
                            if let Some(state) = member.take() {
                                index.absorb(state.fields);
                            }
                        } else {
                            state.close();
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        log::debug!("parsed zoning GML into {} entries", index.len());
        Ok(index)
    }

    #[must_use]
    pub fn get(&self, refcat: &str) -> Option<&PoumInfo> {
        self.entries.get(refcat.trim())
    }

    /// Raw zone code for a parcel, if the parcel is indexed and carries one.
    #[must_use]
    pub fn zone_of(&self, refcat: &str) -> Option<&str> {
        self.get(refcat).and_then(|info| info.zone.as_deref())
    }

    pub fn insert(&mut self, refcat: impl Into<String>, info: PoumInfo) {
        self.entries.insert(refcat.into(), info);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn absorb(&mut self, fields: FeatureFields) {
        let Some(rc_text) = fields.rc.filter(|rc| !rc.trim().is_empty()) else {
            return;
        };

        let info = PoumInfo {
            zone: non_empty(fields.zone),
            altmax_m: fields.altmax.as_deref().and_then(parse_float_maybe),
            profedif_m: fields.profedif.as_deref().and_then(parse_float_maybe),
            numplamax: non_empty(fields.numplamax),
        };

        for rc in rc_text.split(',').map(str::trim).filter(|rc| !rc.is_empty()) {
            self.entries.insert(rc.to_owned(), info.clone());
        }
    }
}

impl FromIterator<(String, PoumInfo)> for ZoningIndex {
    fn from_iter<I: IntoIterator<Item = (String, PoumInfo)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Lenient numeric parsing for POUM attributes: decimal commas, and ranges
/// written as `a-b` resolve to their largest parseable bound.
#[must_use]
pub fn parse_float_maybe(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }

    if normalized.contains('-') {
        return normalized
            .split('-')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| part.parse::<f64>().ok())
            .reduce(f64::max);
    }

    normalized.parse::<f64>().ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Zone,
    AltMax,
    ProfEdif,
    NumPlaMax,
    Rc,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"C_QUAL_AJT" => Some(Self::Zone),
            b"ALTMAX" => Some(Self::AltMax),
            b"PROFEDIF" => Some(Self::ProfEdif),
            b"NUMPLAMAX" => Some(Self::NumPlaMax),
            b"RC" => Some(Self::Rc),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct FeatureFields {
    zone: Option<String>,
    altmax: Option<String>,
    profedif: Option<String>,
    numplamax: Option<String>,
    rc: Option<String>,
}

impl FeatureFields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Zone => &mut self.zone,
            Field::AltMax => &mut self.altmax,
            Field::ProfEdif => &mut self.profedif,
            Field::NumPlaMax => &mut self.numplamax,
            Field::Rc => &mut self.rc,
        }
    }
}

/// Walk state inside one `featureMember`. Depth 1 is the feature element,
/// depth 2 its attribute elements. Only the first feature is read.
#[derive(Debug, Default)]
struct MemberState {
    depth: usize,
    seen_feature: bool,
    in_feature: bool,
    field: Option<Field>,
    fields: FeatureFields,
}

impl MemberState {
    fn open(&mut self, local_name: &[u8]) {
        self.depth += 1;
        match self.depth {
            1 => {
                self.in_feature = !self.seen_feature;
                self.seen_feature = true;
            }
            2 if self.in_feature => {
                self.field = Field::from_local_name(local_name);
                if let Some(field) = self.field {
                    // First occurrence wins; an empty element still counts.
                    let slot = self.fields.slot(field);
                    if slot.is_none() {
                        *slot = Some(String::new());
                    } else {
                        self.field = None;
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.depth == 2 {
            if let Some(field) = self.field {
                if let Some(slot) = self.fields.slot(field).as_mut() {
                    slot.push_str(text);
                }
            }
        }
    }

    fn close(&mut self) {
        if self.depth == 2 {
            self.field = None;
        }
        if self.depth == 1 {
            self.in_feature = false;
        }
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<ogr:FeatureCollection xmlns:ogr="http://ogr.maptools.org/" xmlns:gml="http://www.opengis.net/gml/3.2">
  <ogr:featureMember>
    <ogr:POUM gml:id="POUM.0">
      <ogr:geometryProperty><gml:Polygon><gml:exterior><gml:LinearRing><gml:posList>1 2 3 4</gml:posList></gml:LinearRing></gml:exterior></gml:Polygon></ogr:geometryProperty>
      <ogr:C_QUAL_AJT> 12a </ogr:C_QUAL_AJT>
      <ogr:ALTMAX>9</ogr:ALTMAX>
      <ogr:PROFEDIF>13-13,3</ogr:PROFEDIF>
      <ogr:NUMPLAMAX>PB+2P</ogr:NUMPLAMAX>
      <ogr:RC>0001001DG7100S, 0001002DG7100S ,</ogr:RC>
    </ogr:POUM>
  </ogr:featureMember>
  <ogr:featureMember>
    <ogr:POUM gml:id="POUM.1">
      <ogr:C_QUAL_AJT>5p</ogr:C_QUAL_AJT>
    </ogr:POUM>
  </ogr:featureMember>
  <ogr:featureMember>
    <ogr:POUM gml:id="POUM.2">
      <ogr:C_QUAL_AJT></ogr:C_QUAL_AJT>
      <ogr:ALTMAX>n/a</ogr:ALTMAX>
      <ogr:RC>0003001DG7100S</ogr:RC>
    </ogr:POUM>
  </ogr:featureMember>
</ogr:FeatureCollection>"#;

    #[test]
    fn indexes_every_reference_of_a_feature() {
        let index = ZoningIndex::parse_str(SAMPLE).unwrap();
        assert_eq!(index.len(), 3);

        let first = index.get("0001001DG7100S").unwrap();
        assert_eq!(first.zone.as_deref(), Some("12a"));
        assert_eq!(first.altmax_m, Some(9.0));
        assert_eq!(first.profedif_m, Some(13.3));
        assert_eq!(first.numplamax.as_deref(), Some("PB+2P"));
        assert_eq!(index.get("0001002DG7100S"), Some(first));
    }

    #[test]
    fn skips_features_without_references() {
        let index = ZoningIndex::parse_str(SAMPLE).unwrap();
        assert!(index.get("5p").is_none());
        assert!(index.get("").is_none());
    }

    #[test]
    fn blank_zone_and_bad_numbers_become_none() {
        let index = ZoningIndex::parse_str(SAMPLE).unwrap();
        let info = index.get(" 0003001DG7100S ").unwrap();
        assert_eq!(info.zone, None);
        assert_eq!(info.altmax_m, None);
        assert_eq!(index.zone_of("0003001DG7100S"), None);
    }

    #[test]
    fn later_features_overwrite_earlier_ones() {
        let xml = r#"<c xmlns:ogr="http://ogr.maptools.org/">
            <ogr:featureMember><ogr:P><ogr:C_QUAL_AJT>12</ogr:C_QUAL_AJT><ogr:RC>A</ogr:RC></ogr:P></ogr:featureMember>
            <ogr:featureMember><ogr:P><ogr:C_QUAL_AJT>13a</ogr:C_QUAL_AJT><ogr:RC>A</ogr:RC></ogr:P></ogr:featureMember>
        </c>"#;
        let index = ZoningIndex::parse_str(xml).unwrap();
        assert_eq!(index.zone_of("A"), Some("13a"));
    }

    #[test]
    fn only_the_first_feature_of_a_member_counts() {
        let xml = r#"<c xmlns:ogr="http://ogr.maptools.org/">
            <ogr:featureMember>
              <ogr:P><ogr:C_QUAL_AJT>17</ogr:C_QUAL_AJT><ogr:RC>B</ogr:RC></ogr:P>
              <ogr:P><ogr:C_QUAL_AJT>30</ogr:C_QUAL_AJT><ogr:RC>C</ogr:RC></ogr:P>
            </ogr:featureMember>
            <ogr:featureMember/>
        </c>"#;
        let index = ZoningIndex::parse_str(xml).unwrap();
        assert_eq!(index.zone_of("B"), Some("17"));
        assert!(index.get("C").is_none());
    }

    #[test]
    fn malformed_xml_is_reported() {
        let err = ZoningIndex::parse_str("<a><ogr:featureMember></a>").unwrap_err();
        assert!(matches!(err, ZoningIndexError::Xml { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ZoningIndex::from_path("/definitely/not/here/POUM.gml").unwrap_err();
        assert!(matches!(err, ZoningIndexError::Io { .. }));
    }

    #[test]
    fn float_parsing_handles_commas_and_ranges() {
        assert_eq!(parse_float_maybe("12"), Some(12.0));
        assert_eq!(parse_float_maybe(" 13,3 "), Some(13.3));
        assert_eq!(parse_float_maybe("13-13,3"), Some(13.3));
        assert_eq!(parse_float_maybe("10 - 12"), Some(12.0));
        assert_eq!(parse_float_maybe("x-7"), Some(7.0));
        assert_eq!(parse_float_maybe("x-y"), None);
        assert_eq!(parse_float_maybe(""), None);
        assert_eq!(parse_float_maybe("abc"), None);
    }
}
