use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ProbeId = u64;

const CONNECTED_STATUS_ID: i64 = 1;
const CONNECTED_STATUS_NAME: &str = "connected";

/// A probe that survived filtering: an id and a usable coordinate pair in
/// degrees. The pair may still be outside a projection's domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub id: ProbeId,
    pub longitude: f64,
    pub latitude: f64,
}

/// One entry of a probe directory listing or dump, as loosely as the
/// different schema versions write it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProbeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

/// Legacy dumps carry a bare status code, v2 listings an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Status {
    Code(i64),
    Name(String),
    Detail(StatusDetail),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Vec<Coordinate>>,
}

impl Status {
    pub fn is_connected(&self) -> bool {
        match self {
            Status::Code(code) => *code == CONNECTED_STATUS_ID,
            Status::Name(name) => is_connected_name(name),
            Status::Detail(detail) => {
                detail.id == Some(CONNECTED_STATUS_ID)
                    || detail.name.as_deref().is_some_and(is_connected_name)
            }
            Status::Other(_) => false,
        }
    }
}

fn is_connected_name(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(CONNECTED_STATUS_NAME)
}

impl Coordinate {
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            Coordinate::Number(v) => *v,
            Coordinate::Text(s) => s.trim().parse::<f64>().ok()?,
            Coordinate::Other(_) => return None,
        };
        v.is_finite().then_some(v)
    }
}

impl ProbeRecord {
    pub fn is_connected(&self) -> bool {
        match &self.status {
            Some(status) => status.is_connected(),
            None => self.status_name.as_deref().is_some_and(is_connected_name),
        }
    }

    /// `(longitude, latitude)` from the flat fields, falling back to a
    /// GeoJSON-style geometry.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let flat = match (&self.longitude, &self.latitude) {
            (Some(lon), Some(lat)) => lon.value().zip(lat.value()),
            _ => None,
        };
        flat.or_else(|| {
            let coords = self.geometry.as_ref()?.coordinates.as_ref()?;
            match coords.as_slice() {
                [lon, lat, ..] => lon.value().zip(lat.value()),
                _ => None,
            }
        })
    }
}

impl From<Probe> for ProbeRecord {
    fn from(probe: Probe) -> Self {
        ProbeRecord {
            id: Some(probe.id),
            longitude: Some(Coordinate::Number(probe.longitude)),
            latitude: Some(Coordinate::Number(probe.latitude)),
            ..ProbeRecord::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub online_only: bool,
    countries: BTreeSet<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            online_only: true,
            countries: BTreeSet::new(),
        }
    }
}

impl FilterOptions {
    pub fn new(online_only: bool) -> Self {
        FilterOptions {
            online_only,
            ..FilterOptions::default()
        }
    }

    /// Restrict to the given ISO country codes. An empty list means world-wide.
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.countries = countries
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.iter().map(String::as_str)
    }

    fn admits_country(&self, code: Option<&str>) -> bool {
        if self.countries.is_empty() {
            return true;
        }
        code.is_some_and(|c| self.countries.contains(&c.trim().to_ascii_uppercase()))
    }
}

/// Keep records that are online (when asked), in an allowed country, and
/// carry an id plus a usable coordinate pair. Only the first admitted record
/// of each id is kept.
pub fn filter_probes(records: &[ProbeRecord], opts: &FilterOptions) -> Vec<Probe> {
    let mut out = Vec::with_capacity(records.len());
    let mut seen = HashSet::with_capacity(records.len());
    for rec in records {
        let Some(id) = rec.id else { continue };
        if opts.online_only && !rec.is_connected() {
            continue;
        }
        if !opts.admits_country(rec.country_code.as_deref()) {
            continue;
        }
        let Some((longitude, latitude)) = rec.coordinates() else {
            continue;
        };
        if !seen.insert(id) {
            log::debug!("duplicate probe {id} ignored");
            continue;
        }
        out.push(Probe {
            id,
            longitude,
            latitude,
        });
    }
    log::debug!("filter kept {} of {} records", out.len(), records.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ProbeRecord {
        serde_json::from_str(json).expect("valid record")
    }

    #[test]
    fn legacy_dump_record_is_kept() {
        let rec = parse(r#"{"id": 7, "status": 1, "country_code": "DE", "longitude": 11.0, "latitude": 49.6}"#);
        let probes = filter_probes(&[rec], &FilterOptions::default());
        assert_eq!(
            probes,
            vec![Probe {
                id: 7,
                longitude: 11.0,
                latitude: 49.6
            }]
        );
    }

    #[test]
    fn listing_record_uses_geometry_and_status_object() {
        let rec = parse(
            r#"{"id": 9, "status": {"id": 1, "name": "Connected"}, "country_code": "nl",
                "geometry": {"type": "Point", "coordinates": [4.9, 52.4]}}"#,
        );
        assert!(rec.is_connected());
        assert_eq!(rec.coordinates(), Some((4.9, 52.4)));
        let probes = filter_probes(&[rec], &FilterOptions::default().with_countries(["NL"]));
        assert_eq!(probes.len(), 1);
    }

    #[test]
    fn status_name_and_string_coordinates() {
        let rec = parse(r#"{"id": 3, "status_name": "connected", "longitude": "-3.5", "latitude": " 40.1 "}"#);
        assert!(rec.is_connected());
        assert_eq!(rec.coordinates(), Some((-3.5, 40.1)));
    }

    #[test]
    fn disconnected_dropped_only_when_online_only() {
        let rec = parse(r#"{"id": 4, "status": 2, "longitude": 0.0, "latitude": 0.0}"#);
        assert!(filter_probes(std::slice::from_ref(&rec), &FilterOptions::default()).is_empty());
        assert_eq!(filter_probes(&[rec], &FilterOptions::new(false)).len(), 1);
    }

    #[test]
    fn country_filter_is_case_insensitive_and_requires_code() {
        let de = parse(r#"{"id": 1, "status": 1, "country_code": "de", "longitude": 1, "latitude": 1}"#);
        let fr = parse(r#"{"id": 2, "status": 1, "country_code": "FR", "longitude": 1, "latitude": 1}"#);
        let none = parse(r#"{"id": 3, "status": 1, "longitude": 1, "latitude": 1}"#);
        let opts = FilterOptions::default().with_countries(["DE", " at "]);
        let ids: Vec<_> = filter_probes(&[de, fr, none], &opts).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(opts.countries().collect::<Vec<_>>(), vec!["AT", "DE"]);
    }

    #[test]
    fn records_without_id_or_coordinates_are_dropped() {
        let no_id = parse(r#"{"status": 1, "longitude": 1, "latitude": 1}"#);
        let no_coords = parse(r#"{"id": 5, "status": 1, "latitude": 1}"#);
        let garbage = parse(r#"{"id": 6, "status": 1, "longitude": "east", "latitude": 1}"#);
        let null_geom = parse(r#"{"id": 8, "status": 1, "geometry": {"type": "Point", "coordinates": null}}"#);
        assert!(filter_probes(&[no_id, no_coords, garbage, null_geom], &FilterOptions::new(false)).is_empty());
    }

    #[test]
    fn repeated_id_keeps_first_usable_record() {
        let records = vec![
            parse(r#"{"id": 7, "status": 2, "longitude": 0.0, "latitude": 0.0}"#),
            parse(r#"{"id": 7, "status": 1, "longitude": -150.0, "latitude": -60.0}"#),
            parse(r#"{"id": 7, "status": 1, "longitude": 150.0, "latitude": 60.0}"#),
            parse(r#"{"id": 8, "status": 1, "longitude": 10.0, "latitude": 10.0}"#),
        ];
        let probes = filter_probes(&records, &FilterOptions::default());
        assert_eq!(
            probes,
            vec![
                Probe { id: 7, longitude: -150.0, latitude: -60.0 },
                Probe { id: 8, longitude: 10.0, latitude: 10.0 },
            ]
        );
    }

    #[test]
    fn unexpected_status_shape_is_not_connected() {
        let rec = parse(r#"{"id": 1, "status": true, "longitude": 1, "latitude": 1}"#);
        assert!(!rec.is_connected());
    }

    #[test]
    fn refiltering_filtered_probes_is_identity() {
        let records = vec![
            parse(r#"{"id": 1, "status": 1, "country_code": "DE", "longitude": 8.0, "latitude": 50.0}"#),
            parse(r#"{"id": 2, "status": 2, "country_code": "DE", "longitude": 9.0, "latitude": 51.0}"#),
            parse(r#"{"id": 3, "status": 1, "country_code": "US", "longitude": -90.0, "latitude": 35.0}"#),
        ];
        let first = filter_probes(&records, &FilterOptions::default().with_countries(["DE"]));
        let again: Vec<ProbeRecord> = first.iter().copied().map(ProbeRecord::from).collect();
        assert_eq!(filter_probes(&again, &FilterOptions::new(false)), first);
    }

    #[test]
    fn probe_record_serializes_compactly() {
        let rec = ProbeRecord::from(Probe {
            id: 12,
            longitude: 1.5,
            latitude: -2.0,
        });
        let text = serde_json::to_string(&rec).unwrap();
        assert_eq!(text, r#"{"id":12,"longitude":1.5,"latitude":-2.0}"#);
    }
}
