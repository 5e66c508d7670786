#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! KML rendering for the parcel overlay.
//!
//! Produces the documents Google Earth consumes: a replaceable folder of
//! parcel placemarks for the live query, a screen-overlay marker when the
//! count guard trips, and the network-link menu that drives viewport
//! refreshes. Everything here is plain string assembly over normalized
//! records; no remote state.

use parcel_map_query::SourceParcels;
use parcel_map_source::SourceDefinition;
use parcel_map_source_models::{ParcelRecord, Position};

/// Content type for every KML response.
pub const MEDIA_TYPE: &str = "application/vnd.google-earth.kml+xml";

/// Document preamble: cyan parcel outlines, bold on hover, and a list style
/// that hides container children in the Places tree for speed.
const KML_HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
    "<kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>",
    "<name>Parcel Map (live)</name>",
    "<Style id=\"parcel-normal\">",
    "<LineStyle><color>ffffff00</color><width>2</width></LineStyle>",
    "<PolyStyle><color>00000000</color></PolyStyle>",
    "</Style>",
    "<Style id=\"parcel-highlight\">",
    "<LineStyle><color>ffffff00</color><width>4</width></LineStyle>",
    "<PolyStyle><color>00000000</color></PolyStyle>",
    "</Style>",
    "<StyleMap id=\"parcel-map\">",
    "<Pair><key>normal</key><styleUrl>#parcel-normal</styleUrl></Pair>",
    "<Pair><key>highlight</key><styleUrl>#parcel-highlight</styleUrl></Pair>",
    "</StyleMap>",
    "<Style id=\"container-hide-children\">",
    "<ListStyle><listItemType>checkHideChildren</listItemType></ListStyle>",
    "</Style>",
);

const KML_FOOTER: &str = "</Document></kml>";

/// Escapes text for embedding in XML element content or attributes.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Percent-encodes a URL query value (RFC 3986 unreserved set passes
/// through).
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Pretty-prints a 14-digit Utah parcel serial as
/// `NN-NN-NNN-NNN-NNNN`; anything else passes through unchanged.
fn format_parcel_id(pid: &str) -> String {
    let digits: String = pid.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 14 {
        format!(
            "{}-{}-{}-{}-{}",
            &digits[0..2],
            &digits[2..4],
            &digits[4..7],
            &digits[7..10],
            &digits[10..14]
        )
    } else {
        pid.to_string()
    }
}

/// Inserts thousands separators into a formatted decimal number.
fn group_thousands(value: &str) -> String {
    let (int_part, frac_part) = value
        .split_once('.')
        .map_or((value, None), |(i, f)| (i, Some(f)));
    let (sign, digits) = int_part
        .strip_prefix('-')
        .map_or(("", int_part), |d| ("-", d));

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Formats an assessed value as whole dollars, e.g. `$350,000`.
fn format_money(value: f64) -> String {
    format!("${}", group_thousands(&format!("{value:.0}")))
}

/// Formats an acreage to two decimals, e.g. `1,234.56`.
fn format_acres(value: f64) -> String {
    group_thousands(&format!("{value:.2}"))
}

/// Renders a coordinate ring as a KML `coordinates` string.
fn ring_coords(ring: &[Position]) -> String {
    ring.iter()
        .map(|c| format!("{},{},0", c[0], c[1]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the HTML description block for one parcel.
fn description_html(
    record: &ParcelRecord,
    source: &SourceDefinition,
    pid: &str,
    pretty: &str,
) -> String {
    let mut parts = String::from("<b>Parcel:</b> ");
    match source.valuation_link(pid) {
        Some(href) => parts.push_str(&format!("<a href='{href}' target='_blank'>{pretty}</a>")),
        None => parts.push_str(pretty),
    }
    if let Some(href) = source.gis_map_link(pid) {
        parts.push_str(&format!(
            "<br/><a href='{href}' target='_blank'>{} GIS</a>",
            escape(&source.name)
        ));
    }

    if record.address.is_some() || record.city.is_some() {
        let address = record.address.as_deref().map(escape).unwrap_or_default();
        let city = record
            .city
            .as_deref()
            .map(|c| format!(", {}", escape(c)))
            .unwrap_or_default();
        parts.push_str(&format!("<br/><b>Address:</b> {address}{city}"));
    }
    if let Some(acres) = record.acres {
        parts.push_str(&format!("<br/><b>Acres:</b> {}", format_acres(acres)));
    }
    if let Some(value) = record.total_value {
        parts.push_str(&format!(
            "<br/><b>Assessed Total Value:</b> {}",
            format_money(value)
        ));
    }
    if let Some(value) = record.land_value {
        parts.push_str(&format!(
            "<br/><b>Assessed Land Value:</b> {}",
            format_money(value)
        ));
    }
    if let Some(owner) = &record.owner {
        parts.push_str(&format!("<br/><b>Owner:</b> {}", escape(owner)));
    }
    if let Some(zoning) = &record.zoning {
        parts.push_str(&format!("<br/><b>Zoning:</b> {}", escape(zoning)));
    }
    parts
}

/// Renders one parcel as placemarks, one per polygon.
fn placemark(record: &ParcelRecord, source: &SourceDefinition) -> String {
    let pid = escape(&record.parcel_id);
    let pretty = format_parcel_id(&pid);
    let description = description_html(record, source, &pid, &pretty);

    let mut out = String::new();
    for polygon in &record.polygons {
        let outer = ring_coords(&polygon.outer);
        let holes: String = polygon
            .holes
            .iter()
            .map(|ring| {
                format!(
                    "<innerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></innerBoundaryIs>",
                    ring_coords(ring)
                )
            })
            .collect();
        out.push_str(&format!(
            "<Placemark>\
             <name>{pid}</name>\
             <description><![CDATA[{description}]]></description>\
             <styleUrl>#parcel-map</styleUrl>\
             <Polygon><outerBoundaryIs><LinearRing><coordinates>{outer}</coordinates></LinearRing></outerBoundaryIs>\
             {holes}</Polygon>\
             </Placemark>"
        ));
    }
    out
}

/// An empty but well-formed document.
///
/// Returned for missing bounding boxes and rejected viewports so the viewer
/// renders nothing instead of breaking.
#[must_use]
pub fn empty_document() -> String {
    format!("{KML_HEADER}{KML_FOOTER}")
}

/// The full overlay: every source's parcels inside one replaceable folder.
///
/// The folder carries a stable `container_id` so Google Earth replaces the
/// previous response's folder on refresh rather than accumulating stale
/// placemarks, and a count-labeled title.
#[must_use]
pub fn document(container_id: &str, sources: &[SourceParcels]) -> String {
    let total: usize = sources.iter().map(|s| s.records.len()).sum();
    let folder_name = match sources {
        [only] => escape(&only.source.name),
        _ => "Parcels".to_string(),
    };

    let mut placemarks = String::new();
    for sp in sources {
        for record in &sp.records {
            placemarks.push_str(&placemark(record, &sp.source));
        }
    }

    format!(
        "{KML_HEADER}\
         <Folder id='{container_id}'>\
         <open>0</open>\
         <styleUrl>#container-hide-children</styleUrl>\
         <name>{folder_name} — {total}</name>\
         {placemarks}\
         </Folder>\
         {KML_FOOTER}"
    )
}

/// The count-guard marker: a screen overlay plus a placemark explaining
/// that the view would return `total` parcels against a cap of `max`.
#[must_use]
pub fn too_many_parcels(total: u64, max: u64) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\">\
         <Document>\
         <name>Too many parcels</name>\
         <ScreenOverlay>\
         <name>Zoom in</name>\
         <overlayXY x=\"0\" y=\"1\" xunits=\"fraction\" yunits=\"fraction\"/>\
         <screenXY x=\"0.02\" y=\"0.98\" xunits=\"fraction\" yunits=\"fraction\"/>\
         <size x=\"0\" y=\"0\" xunits=\"pixels\" yunits=\"pixels\"/>\
         <Icon><href>http://maps.google.com/mapfiles/kml/shapes/forbidden.png</href></Icon>\
         </ScreenOverlay>\
         <Placemark>\
         <name>Parcel query too large</name>\
         <description><![CDATA[\
         Your current view would return <b>{total}</b> parcels (max {max}).<br/>\
         Please zoom in or select fewer counties.\
         ]]></description>\
         <Point><coordinates>0,0,0</coordinates></Point>\
         </Placemark>\
         </Document>\
         </kml>"
    )
}

/// The counties menu: one hidden network link per source that re-queries
/// `/kml` shortly after the camera stops moving, with Google Earth
/// substituting the current viewport into the `viewFormat` placeholders.
#[must_use]
pub fn menu(base_url: &str, sources: &[SourceDefinition]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut links = String::new();
    for src in sources {
        let name = escape(&src.name);
        let href = format!("{base}/kml?county={}", encode_query_value(&src.name));
        links.push_str(&format!(
            "<NetworkLink>\
             <name>{name}</name>\
             <visibility>0</visibility>\
             <Link>\
             <href>{href}</href>\
             <viewRefreshMode>onStop</viewRefreshMode>\
             <viewRefreshTime>1.5</viewRefreshTime>\
             <viewFormat>&amp;bbox=[bboxWest],[bboxSouth],[bboxEast],[bboxNorth]\
             &amp;eyeAlt=[eyeAltitude]</viewFormat>\
             </Link>\
             </NetworkLink>"
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>\
         <name>Parcel Map Counties</name>\
         {links}\
         </Document></kml>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_map_source::registry;
    use parcel_map_source_models::ParcelPolygon;

    fn salt_lake() -> SourceDefinition {
        registry::all_sources()
            .into_iter()
            .find(|s| s.id == "salt_lake")
            .unwrap()
    }

    fn weber() -> SourceDefinition {
        registry::all_sources()
            .into_iter()
            .find(|s| s.id == "weber")
            .unwrap()
    }

    fn record(parcel_id: &str) -> ParcelRecord {
        ParcelRecord {
            parcel_id: parcel_id.to_string(),
            address: None,
            city: None,
            acres: None,
            total_value: None,
            land_value: None,
            owner: None,
            zoning: None,
            polygons: vec![ParcelPolygon {
                outer: vec![[-112.0, 40.5], [-111.9, 40.5], [-111.9, 40.6], [-112.0, 40.5]],
                holes: vec![],
            }],
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape("<Smith & Sons> \"LLC\""),
            "&lt;Smith &amp; Sons&gt; &quot;LLC&quot;"
        );
    }

    #[test]
    fn formats_fourteen_digit_serials() {
        assert_eq!(format_parcel_id("22251700300000"), "22-25-170-030-0000");
        // Dashes are stripped before regrouping.
        assert_eq!(format_parcel_id("22-25170030-0000"), "22-25-170-030-0000");
        assert_eq!(format_parcel_id("123456"), "123456");
    }

    #[test]
    fn formats_money_and_acres() {
        assert_eq!(format_money(350_000.0), "$350,000");
        assert_eq!(format_money(1_234_567.8), "$1,234,568");
        assert_eq!(format_money(999.0), "$999");
        assert_eq!(format_acres(1234.5), "1,234.50");
        assert_eq!(format_acres(0.25), "0.25");
    }

    #[test]
    fn placemark_links_through_valuation_template() {
        let kml = placemark(&record("22251700300000"), &salt_lake());
        assert!(kml.contains("valuationInfoExpanded.cfm?parcel_id=22251700300000"));
        assert!(kml.contains(">22-25-170-030-0000</a>"));
        assert!(kml.contains("<styleUrl>#parcel-map</styleUrl>"));
    }

    #[test]
    fn placemark_without_valuation_template_shows_plain_id() {
        let kml = placemark(&record("170330001"), &weber());
        assert!(!kml.contains("<a href=''"));
        assert!(kml.contains("<b>Parcel:</b> 170330001"));
        assert!(kml.contains("Weber County GIS"));
    }

    #[test]
    fn description_escapes_owner() {
        let mut rec = record("1");
        rec.owner = Some("SMITH & JONES <TRUST>".to_string());
        let kml = placemark(&rec, &weber());
        assert!(kml.contains("<b>Owner:</b> SMITH &amp; JONES &lt;TRUST&gt;"));
    }

    #[test]
    fn holes_render_as_inner_boundaries() {
        let mut rec = record("1");
        rec.polygons[0].holes = vec![vec![[-111.95, 40.55], [-111.94, 40.55], [-111.95, 40.56]]];
        let kml = placemark(&rec, &weber());
        assert!(kml.contains("<innerBoundaryIs>"));
        assert!(kml.contains("-111.95,40.55,0 -111.94,40.55,0"));
    }

    #[test]
    fn document_carries_stable_container_and_count() {
        let sources = vec![
            SourceParcels {
                source: salt_lake(),
                records: vec![record("1"), record("2")],
            },
            SourceParcels {
                source: weber(),
                records: vec![record("3")],
            },
        ];
        let kml = document("active-parcels", &sources);
        assert!(kml.contains("<Folder id='active-parcels'>"));
        assert!(kml.contains("<name>Parcels — 3</name>"));
    }

    #[test]
    fn single_source_document_is_titled_by_county() {
        let sources = vec![SourceParcels {
            source: weber(),
            records: vec![record("1")],
        }];
        let kml = document("active-parcels", &sources);
        assert!(kml.contains("<name>Weber County — 1</name>"));
    }

    #[test]
    fn empty_document_is_well_formed() {
        let kml = empty_document();
        assert!(kml.starts_with("<?xml"));
        assert!(kml.ends_with("</Document></kml>"));
        assert!(!kml.contains("<Folder"));
    }

    #[test]
    fn too_many_marker_carries_both_numbers() {
        let kml = too_many_parcels(6_000, 5_000);
        assert!(kml.contains("<b>6000</b> parcels (max 5000)"));
        assert!(kml.contains("<ScreenOverlay>"));
    }

    #[test]
    fn menu_links_encode_county_names() {
        let kml = menu("http://127.0.0.1:8000/", &registry::all_sources());
        assert!(kml.contains("http://127.0.0.1:8000/kml?county=Salt%20Lake%20County"));
        assert!(kml.contains("<viewRefreshMode>onStop</viewRefreshMode>"));
        assert!(kml.contains("[bboxWest],[bboxSouth],[bboxEast],[bboxNorth]"));
        assert!(kml.contains("[eyeAltitude]"));
    }
}
