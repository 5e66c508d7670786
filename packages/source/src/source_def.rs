//! Config-driven parcel source definition.
//!
//! [`SourceDefinition`] captures everything unique about a county in a
//! serializable config struct. A single generic ArcGIS implementation
//! handles all sources, eliminating per-county code.

use serde::Deserialize;

/// A complete, config-driven county parcel source definition.
///
/// Loaded from TOML files at compile time and shared read-only across
/// requests for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"salt_lake"`).
    pub id: String,
    /// Human-readable county name (e.g., `"Salt Lake County"`), used as the
    /// display/grouping key and matched case-insensitively by the `county`
    /// filter.
    pub name: String,
    /// ArcGIS `FeatureServer` layer URL (without the `/query` suffix).
    pub layer_url: String,
    /// URL template for the county assessor's valuation page, with a
    /// `{pid}` placeholder for the raw parcel id. `None` when the county
    /// has no deep-linkable valuation page.
    #[serde(default)]
    pub valuation_url: Option<String>,
    /// URL template for the county GIS map. May contain a `{pid}`
    /// placeholder or be a plain landing page URL.
    #[serde(default)]
    pub gis_map_url: Option<String>,
    /// Candidate attribute fields for normalization.
    pub fields: FieldMapping,
}

impl SourceDefinition {
    /// Expands the valuation link template for a parcel id.
    #[must_use]
    pub fn valuation_link(&self, pid: &str) -> Option<String> {
        self.valuation_url
            .as_deref()
            .map(|tmpl| tmpl.replace("{pid}", pid))
    }

    /// Expands the GIS map link template for a parcel id.
    #[must_use]
    pub fn gis_map_link(&self, pid: &str) -> Option<String> {
        self.gis_map_url
            .as_deref()
            .map(|tmpl| tmpl.replace("{pid}", pid))
    }
}

/// Maps county-specific attribute names to canonical parcel fields.
///
/// Each list is tried in order; the first field present with a non-empty
/// value wins. Counties publish land-information-record data under several
/// historical field names, so most lists carry more than one candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    /// Attribute names for the parcel id, tried in order.
    pub parcel_id: Vec<String>,
    /// Attribute names for the situs street address.
    #[serde(default)]
    pub address: Vec<String>,
    /// Attribute names for the situs city.
    #[serde(default)]
    pub city: Vec<String>,
    /// Attribute names for the parcel acreage.
    #[serde(default)]
    pub acres: Vec<String>,
    /// Attribute names for the total assessed market value.
    #[serde(default)]
    pub total_value: Vec<String>,
    /// Attribute names for the assessed land value.
    #[serde(default)]
    pub land_value: Vec<String>,
    /// Attribute names for the owner/taxpayer.
    #[serde(default)]
    pub owner: Vec<String>,
    /// Attribute names for the zoning label.
    #[serde(default)]
    pub zoning: Vec<String>,
}

/// Parses a [`SourceDefinition`] from TOML text.
///
/// # Errors
///
/// Returns a [`toml::de::Error`] if the text is not a valid definition.
pub fn parse_source_toml(text: &str) -> Result<SourceDefinition, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
id = "test_county"
name = "Test County"
layer_url = "https://example.com/FeatureServer/0"

[fields]
parcel_id = ["PARCEL_ID", "OBJECTID"]
"#;

    #[test]
    fn parses_minimal_definition() {
        let def = parse_source_toml(MINIMAL).unwrap();
        assert_eq!(def.id, "test_county");
        assert_eq!(def.name, "Test County");
        assert!(def.valuation_url.is_none());
        assert_eq!(def.fields.parcel_id, vec!["PARCEL_ID", "OBJECTID"]);
        assert!(def.fields.owner.is_empty());
    }

    #[test]
    fn expands_link_templates() {
        let def = SourceDefinition {
            id: "t".into(),
            name: "T".into(),
            layer_url: "https://example.com/FeatureServer/0".into(),
            valuation_url: Some("https://assessor.example.com/?parcel={pid}".into()),
            gis_map_url: Some("https://gis.example.com/map".into()),
            fields: parse_source_toml(MINIMAL).unwrap().fields,
        };
        assert_eq!(
            def.valuation_link("12345").unwrap(),
            "https://assessor.example.com/?parcel=12345"
        );
        // Template without a placeholder passes through unchanged.
        assert_eq!(def.gis_map_link("12345").unwrap(), "https://gis.example.com/map");
    }

    #[test]
    fn rejects_definition_without_fields() {
        assert!(parse_source_toml("id = \"x\"\nname = \"X\"").is_err());
    }
}
