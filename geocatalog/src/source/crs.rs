//! Coordinate reference system identification.
//!
//! Layers describe their CRS in several ways: an OGC WKT string (`.prj`
//! files, GeoPackage `gpkg_spatial_ref_sys.definition`), an ESRI flavored WKT
//! that names the system without any authority, or a short user-input form
//! such as `EPSG:2154`. [`epsg_from_user_input`] reduces all of them to an
//! EPSG code when one can be identified.

use std::sync::OnceLock;

use regex::Regex;

/// Resolve a CRS description to its EPSG code.
///
/// Accepted inputs:
///
/// - `EPSG:4326`, `epsg:4326`
/// - `urn:ogc:def:crs:EPSG::4326` (and the `EPSG:6.3:4326` versioned form)
/// - `http://www.opengis.net/def/crs/EPSG/0/4326`
/// - `+init=epsg:4326`
/// - a bare positive integer
/// - WKT1 with a root `AUTHORITY["EPSG","4326"]`
/// - WKT2 with a root `ID["EPSG",4326]`
/// - ESRI WKT whose root name is a well known system
///
/// Returns `None` when no EPSG code can be identified.
pub fn epsg_from_user_input(input: &str) -> Option<u32> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(code) = short_form(input) {
        return Some(code);
    }

    let node = parse_wkt(input)?;
    node.root_authority().or_else(|| esri_name_to_epsg(node.name()?))
}

fn short_form(input: &str) -> Option<u32> {
    if let Ok(code) = input.parse::<u32>() {
        return (code > 0).then_some(code);
    }

    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?ix)^(?:
                    \+init=epsg:(\d+)
                  | epsg:(\d+)
                  | urn:ogc:def:crs:epsg:[0-9.]*:(\d+)
                  | https?://www\.opengis\.net/def/crs/epsg/[0-9.]+/(\d+)
                )$",
            )
            .ok()
        })
        .as_ref()?;

    let captures = pattern.captures(input)?;
    captures
        .iter()
        .skip(1)
        .flatten()
        .next()
        .and_then(|m| m.as_str().parse().ok())
}

// ============================================================================
// WKT tree
// ============================================================================

/// One WKT node: `KEYWORD[arg, arg, ...]`.
#[derive(Debug, Clone, PartialEq)]
struct WktNode {
    keyword: String,
    args: Vec<WktArg>,
}

#[derive(Debug, Clone, PartialEq)]
enum WktArg {
    Text(String),
    Number(String),
    Node(WktNode),
}

impl WktNode {
    /// The quoted name given as first argument.
    fn name(&self) -> Option<&str> {
        match self.args.first() {
            Some(WktArg::Text(name)) => Some(name),
            _ => None,
        }
    }

    fn children(&self) -> impl Iterator<Item = &WktNode> {
        self.args.iter().filter_map(|arg| match arg {
            WktArg::Node(node) => Some(node),
            _ => None,
        })
    }

    /// EPSG code carried directly by this node (not its descendants).
    fn root_authority(&self) -> Option<u32> {
        self.children()
            .filter(|child| {
                child.keyword.eq_ignore_ascii_case("AUTHORITY")
                    || child.keyword.eq_ignore_ascii_case("ID")
            })
            .find_map(|child| {
                let mut args = child.args.iter();
                match args.next() {
                    Some(WktArg::Text(authority)) if authority.eq_ignore_ascii_case("EPSG") => {}
                    _ => return None,
                }
                match args.next() {
                    Some(WktArg::Text(code)) | Some(WktArg::Number(code)) => code.parse().ok(),
                    _ => None,
                }
            })
    }
}

/// Parse a WKT string into its root node.
fn parse_wkt(input: &str) -> Option<WktNode> {
    let mut parser = WktParser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let node = parser.node()?;
    parser.skip_whitespace();
    (parser.pos == parser.chars.len()).then_some(node)
}

/// Deepest node nesting accepted. Real CRS definitions stay well under 10.
const MAX_WKT_DEPTH: usize = 64;

struct WktParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl WktParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: &[char]) -> Option<char> {
        self.skip_whitespace();
        let c = self.peek().filter(|c| expected.contains(c))?;
        self.pos += 1;
        Some(c)
    }

    fn node(&mut self) -> Option<WktNode> {
        if self.depth >= MAX_WKT_DEPTH {
            return None;
        }
        self.depth += 1;
        let node = self.node_body();
        self.depth -= 1;
        node
    }

    fn node_body(&mut self) -> Option<WktNode> {
        self.skip_whitespace();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        let keyword: String = self.chars[start..self.pos].iter().collect();

        let open = self.expect(&['[', '('])?;
        let close = if open == '[' { ']' } else { ')' };

        let mut args = Vec::new();
        loop {
            args.push(self.arg()?);
            match self.expect(&[',', close])? {
                ',' => continue,
                _ => break,
            }
        }

        Some(WktNode { keyword, args })
    }

    fn arg(&mut self) -> Option<WktArg> {
        self.skip_whitespace();
        match self.peek()? {
            '"' => self.quoted().map(WktArg::Text),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
                {
                    self.pos += 1;
                }
                Some(WktArg::Number(self.chars[start..self.pos].iter().collect()))
            }
            _ => {
                let checkpoint = self.pos;
                if let Some(node) = self.node() {
                    return Some(WktArg::Node(node));
                }
                // Bare enumeration value such as `NORTH` or `EAST`.
                self.pos = checkpoint;
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    self.pos += 1;
                }
                (self.pos > start)
                    .then(|| WktArg::Text(self.chars[start..self.pos].iter().collect()))
            }
        }
    }

    /// A double-quoted string; `""` escapes a quote.
    fn quoted(&mut self) -> Option<String> {
        self.pos += 1;
        let mut text = String::new();
        loop {
            let c = self.peek()?;
            self.pos += 1;
            if c == '"' {
                if self.peek() == Some('"') {
                    text.push('"');
                    self.pos += 1;
                } else {
                    return Some(text);
                }
            } else {
                text.push(c);
            }
        }
    }
}

// ============================================================================
// ESRI names
// ============================================================================

/// EPSG code for a CRS name as written by ESRI tools, which omit authorities.
fn esri_name_to_epsg(name: &str) -> Option<u32> {
    let known = match name {
        "GCS_WGS_1984" | "WGS 84" | "WGS_1984" => Some(4326),
        "WGS_1984_Web_Mercator_Auxiliary_Sphere" | "WGS_84_Pseudo_Mercator" => Some(3857),
        "RGF_1993_Lambert_93" | "RGF93_Lambert_93" | "RGF93 / Lambert-93" => Some(2154),
        "GCS_RGF_1993" | "RGF93" => Some(4171),
        "ETRS_1989_LAEA" | "ETRS_1989_LAEA_Europe" => Some(3035),
        "GCS_ETRS_1989" => Some(4258),
        "GCS_North_American_1983" => Some(4269),
        "NTF_Paris_Lambert_II_Etendu" | "NTF_Paris_Lambert_zone_II" => Some(27572),
        _ => None,
    };
    known.or_else(|| zoned_name_to_epsg(name))
}

/// UTM and French conic conformal zones.
fn zoned_name_to_epsg(name: &str) -> Option<u32> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^(?:(WGS_1984_UTM_Zone_)(\d{1,2})([NS])|(NAD_1983_UTM_Zone_)(\d{1,2})N|(RGF93_CC|RGF_1993_CC)(\d{2}))$",
            )
            .ok()
        })
        .as_ref()?;
    let captures = pattern.captures(name)?;

    if captures.get(1).is_some() {
        let zone: u32 = captures.get(2)?.as_str().parse().ok()?;
        if !(1..=60).contains(&zone) {
            return None;
        }
        let base = if captures.get(3)?.as_str() == "N" {
            32600
        } else {
            32700
        };
        return Some(base + zone);
    }

    if captures.get(4).is_some() {
        let zone: u32 = captures.get(5)?.as_str().parse().ok()?;
        return (1..=23).contains(&zone).then_some(26900 + zone);
    }

    let zone: u32 = captures.get(7)?.as_str().parse().ok()?;
    (42..=50).contains(&zone).then_some(3900 + zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMBERT_93_WKT1: &str = r#"PROJCS["RGF93 / Lambert-93",
        GEOGCS["RGF93",
            DATUM["Reseau_Geodesique_Francais_1993",
                SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],
                AUTHORITY["EPSG","6171"]],
            PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],
            UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],
            AUTHORITY["EPSG","4171"]],
        PROJECTION["Lambert_Conformal_Conic_2SP"],
        PARAMETER["standard_parallel_1",49],
        PARAMETER["latitude_of_origin",46.5],
        UNIT["metre",1,AUTHORITY["EPSG","9001"]],
        AXIS["Easting",EAST],
        AXIS["Northing",NORTH],
        AUTHORITY["EPSG","2154"]]"#;

    const ESRI_LAMBERT_93: &str = r#"PROJCS["RGF_1993_Lambert_93",GEOGCS["GCS_RGF_1993",DATUM["D_RGF_1993",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",700000.0],UNIT["Meter",1.0]]"#;

    #[test]
    fn test_short_forms() {
        assert_eq!(epsg_from_user_input("EPSG:4326"), Some(4326));
        assert_eq!(epsg_from_user_input("epsg:2154"), Some(2154));
        assert_eq!(epsg_from_user_input("urn:ogc:def:crs:EPSG::3857"), Some(3857));
        assert_eq!(
            epsg_from_user_input("urn:ogc:def:crs:EPSG:6.3:27572"),
            Some(27572)
        );
        assert_eq!(
            epsg_from_user_input("http://www.opengis.net/def/crs/EPSG/0/3035"),
            Some(3035)
        );
        assert_eq!(epsg_from_user_input("+init=epsg:32631"), Some(32631));
        assert_eq!(epsg_from_user_input("4326"), Some(4326));
        assert_eq!(epsg_from_user_input("0"), None);
        assert_eq!(epsg_from_user_input(""), None);
    }

    #[test]
    fn test_wkt1_root_authority_wins_over_nested() {
        assert_eq!(epsg_from_user_input(LAMBERT_93_WKT1), Some(2154));
    }

    #[test]
    fn test_wkt2_id() {
        let wkt = r#"GEOGCRS["WGS 84",DATUM["World Geodetic System 1984",ELLIPSOID["WGS 84",6378137,298.257223563]],CS[ellipsoidal,2],ID["EPSG",4326]]"#;
        assert_eq!(epsg_from_user_input(wkt), Some(4326));
    }

    #[test]
    fn test_esri_wkt_by_name() {
        assert_eq!(epsg_from_user_input(ESRI_LAMBERT_93), Some(2154));
        let wgs84 = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(epsg_from_user_input(wgs84), Some(4326));
    }

    #[test]
    fn test_zoned_names() {
        assert_eq!(zoned_name_to_epsg("WGS_1984_UTM_Zone_31N"), Some(32631));
        assert_eq!(zoned_name_to_epsg("WGS_1984_UTM_Zone_33S"), Some(32733));
        assert_eq!(zoned_name_to_epsg("NAD_1983_UTM_Zone_17N"), Some(26917));
        assert_eq!(zoned_name_to_epsg("RGF93_CC46"), Some(3946));
        assert_eq!(zoned_name_to_epsg("WGS_1984_UTM_Zone_61N"), None);
        assert_eq!(zoned_name_to_epsg("RGF93_CC41"), None);
    }

    #[test]
    fn test_unknown_crs() {
        let local = r#"LOCAL_CS["Site grid",LOCAL_DATUM["Arbitrary",0],UNIT["metre",1]]"#;
        assert_eq!(epsg_from_user_input(local), None);
        assert_eq!(epsg_from_user_input("not a crs"), None);
        assert_eq!(epsg_from_user_input("PROJCS[\"broken\""), None);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let depth = 10_000;
        let wkt = format!("{}1{}", "A[".repeat(depth), "]".repeat(depth));
        assert_eq!(epsg_from_user_input(&wkt), None);
        assert!(parse_wkt(&wkt).is_none());

        let shallow = format!("{}1{}", "A[".repeat(MAX_WKT_DEPTH), "]".repeat(MAX_WKT_DEPTH));
        assert!(parse_wkt(&shallow).is_some());
    }

    #[test]
    fn test_quoted_escape() {
        let node = parse_wkt(r#"GEOGCS["a ""quoted"" name",AUTHORITY["EPSG","4326"]]"#).unwrap();
        assert_eq!(node.name(), Some("a \"quoted\" name"));
        assert_eq!(node.root_authority(), Some(4326));
    }
}
