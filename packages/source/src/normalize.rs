//! Raw-feature normalization.
//!
//! Turns a GeoJSON feature from a county layer into a canonical
//! [`ParcelRecord`] by probing its properties against the source's ordered
//! candidate-field lists — first field present with a usable value wins.

use parcel_map_source_models::{ParcelPolygon, ParcelRecord, Position};
use serde_json::Value;

use crate::source_def::FieldMapping;

/// Probes candidate fields for the first non-empty string value.
///
/// Numeric values are accepted and stringified — object ids and some parcel
/// serials are published as numbers.
fn probe_string(props: &Value, candidates: &[String]) -> Option<String> {
    candidates.iter().find_map(|field| {
        let value = props.get(field)?;
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

/// Probes candidate fields for the first parseable finite number.
fn probe_number(props: &Value, candidates: &[String]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|field| parse_number(props.get(field)?))
}

/// Parses a numeric attribute that may arrive as a JSON number or as a
/// display string with thousands separators (`"1,234.5"`).
fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Reads a GeoJSON linear ring into positions. `None` if any coordinate
/// pair is malformed.
fn ring_positions(ring: &Value) -> Option<Vec<Position>> {
    ring.as_array()?
        .iter()
        .map(|coord| {
            let pair = coord.as_array()?;
            Some([pair.first()?.as_f64()?, pair.get(1)?.as_f64()?])
        })
        .collect()
}

/// Reads a GeoJSON polygon ring set (outer ring first, then holes).
fn polygon_from_rings(rings: &Value) -> Option<ParcelPolygon> {
    let rings = rings.as_array()?;
    let mut rings = rings.iter();
    let outer = ring_positions(rings.next()?)?;
    let holes = rings.filter_map(ring_positions).collect();
    Some(ParcelPolygon { outer, holes })
}

/// Normalizes one GeoJSON feature into a [`ParcelRecord`].
///
/// Returns `None` for features without polygon geometry (the layers also
/// publish the odd point annotation); a missing parcel id degrades to an
/// empty string rather than dropping the geometry.
#[must_use]
pub fn normalize_feature(feature: &Value, fields: &FieldMapping) -> Option<ParcelRecord> {
    let props = feature.get("properties").unwrap_or(&Value::Null);
    let geometry = feature.get("geometry")?;
    let coordinates = geometry.get("coordinates")?;

    let polygons: Vec<ParcelPolygon> = match geometry.get("type").and_then(Value::as_str)? {
        "Polygon" => polygon_from_rings(coordinates).into_iter().collect(),
        "MultiPolygon" => coordinates
            .as_array()?
            .iter()
            .filter_map(polygon_from_rings)
            .collect(),
        _ => return None,
    };
    if polygons.is_empty() {
        return None;
    }

    Some(ParcelRecord {
        parcel_id: probe_string(props, &fields.parcel_id).unwrap_or_default(),
        address: probe_string(props, &fields.address),
        city: probe_string(props, &fields.city),
        acres: probe_number(props, &fields.acres),
        total_value: probe_number(props, &fields.total_value),
        land_value: probe_number(props, &fields.land_value),
        owner: probe_string(props, &fields.owner),
        zoning: probe_string(props, &fields.zoning),
        polygons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping() -> FieldMapping {
        crate::source_def::parse_source_toml(
            r#"
id = "t"
name = "T"
layer_url = "https://example.com/FeatureServer/0"

[fields]
parcel_id = ["PARCEL_ID", "SERIAL_NUM", "OBJECTID"]
address = ["PARCEL_ADD", "SITUS_ADDR"]
city = ["PARCEL_CITY"]
acres = ["PARCEL_ACRES", "ACRES"]
total_value = ["TOTAL_MKT_VALUE"]
land_value = ["LAND_MKT_VALUE"]
owner = ["OWNER", "OWNER_NAME"]
zoning = ["ZONE_CODE"]
"#,
        )
        .unwrap()
        .fields
    }

    fn square(props: Value) -> Value {
        json!({
            "type": "Feature",
            "properties": props,
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [-112.0, 40.5], [-111.9, 40.5], [-111.9, 40.6],
                    [-112.0, 40.6], [-112.0, 40.5]
                ]]
            }
        })
    }

    #[test]
    fn first_present_candidate_wins() {
        let feature = square(json!({
            "SERIAL_NUM": "2225170030",
            "OBJECTID": 17,
            "PARCEL_ADD": "123 MAIN ST"
        }));
        let record = normalize_feature(&feature, &mapping()).unwrap();
        assert_eq!(record.parcel_id, "2225170030");
        assert_eq!(record.address.as_deref(), Some("123 MAIN ST"));
    }

    #[test]
    fn numeric_object_id_is_stringified() {
        let record = normalize_feature(&square(json!({"OBJECTID": 17})), &mapping()).unwrap();
        assert_eq!(record.parcel_id, "17");
    }

    #[test]
    fn missing_parcel_id_degrades_to_empty() {
        let record = normalize_feature(&square(json!({})), &mapping()).unwrap();
        assert_eq!(record.parcel_id, "");
    }

    #[test]
    fn empty_string_candidates_are_skipped() {
        let feature = square(json!({"PARCEL_ID": "  ", "SERIAL_NUM": "99-001"}));
        let record = normalize_feature(&feature, &mapping()).unwrap();
        assert_eq!(record.parcel_id, "99-001");
    }

    #[test]
    fn numbers_parse_from_strings_with_separators() {
        let feature = square(json!({
            "PARCEL_ID": "1",
            "PARCEL_ACRES": "1,234.56",
            "TOTAL_MKT_VALUE": 350_000.0
        }));
        let record = normalize_feature(&feature, &mapping()).unwrap();
        assert!((record.acres.unwrap() - 1234.56).abs() < 1e-9);
        assert!((record.total_value.unwrap() - 350_000.0).abs() < f64::EPSILON);
        assert!(record.land_value.is_none());
    }

    #[test]
    fn multi_polygon_yields_all_polygons() {
        let feature = json!({
            "properties": {"PARCEL_ID": "1"},
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [
                    [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                    [
                        [[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]],
                        [[2.4, 2.4], [2.6, 2.4], [2.6, 2.6], [2.4, 2.4]]
                    ]
                ]
            }
        });
        let record = normalize_feature(&feature, &mapping()).unwrap();
        assert_eq!(record.polygons.len(), 2);
        assert!(record.polygons[0].holes.is_empty());
        assert_eq!(record.polygons[1].holes.len(), 1);
    }

    #[test]
    fn non_polygon_geometry_is_skipped() {
        let feature = json!({
            "properties": {"PARCEL_ID": "1"},
            "geometry": {"type": "Point", "coordinates": [-112.0, 40.5]}
        });
        assert!(normalize_feature(&feature, &mapping()).is_none());
    }

    #[test]
    fn missing_geometry_is_skipped() {
        let feature = json!({"properties": {"PARCEL_ID": "1"}});
        assert!(normalize_feature(&feature, &mapping()).is_none());
    }
}
