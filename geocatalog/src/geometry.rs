//! Geometry type vocabulary.

use std::fmt;
use std::str::FromStr;

/// Kind of geometry a layer holds.
///
/// Names follow the catalog vocabulary (`Linestring`, not `LineString`) so
/// that the same geometry stored from different drivers upserts onto one
/// GeometryType row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    Point,
    Linestring,
    Polygon,
    PointZ,
    LinestringZ,
    PolygonZ,
    MultiPoint,
    MultiLinestring,
    MultiPolygon,
    MultiPointZ,
    MultiLinestringZ,
    MultiPolygonZ,
    /// Features whose geometry type is not constrained.
    Geometry,
    /// Tables without geometry.
    None,
}

impl GeometryKind {
    /// Every kind, in declaration order.
    pub const ALL: [GeometryKind; 14] = [
        GeometryKind::Point,
        GeometryKind::Linestring,
        GeometryKind::Polygon,
        GeometryKind::PointZ,
        GeometryKind::LinestringZ,
        GeometryKind::PolygonZ,
        GeometryKind::MultiPoint,
        GeometryKind::MultiLinestring,
        GeometryKind::MultiPolygon,
        GeometryKind::MultiPointZ,
        GeometryKind::MultiLinestringZ,
        GeometryKind::MultiPolygonZ,
        GeometryKind::Geometry,
        GeometryKind::None,
    ];

    /// Catalog name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::Linestring => "Linestring",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::PointZ => "PointZ",
            GeometryKind::LinestringZ => "LinestringZ",
            GeometryKind::PolygonZ => "PolygonZ",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLinestring => "MultiLinestring",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::MultiPointZ => "MultiPointZ",
            GeometryKind::MultiLinestringZ => "MultiLinestringZ",
            GeometryKind::MultiPolygonZ => "MultiPolygonZ",
            GeometryKind::Geometry => "Geometry",
            GeometryKind::None => "None",
        }
    }

    /// True for layers that carry geometry.
    pub fn has_geometry(&self) -> bool {
        *self != GeometryKind::None
    }

    /// Kind for an ESRI shapefile shape-type code.
    ///
    /// Measured (`M`) variants collapse onto their 2D counterparts.
    pub fn from_shape_type(code: i32) -> Option<Self> {
        let kind = match code {
            0 => GeometryKind::None,
            1 | 21 => GeometryKind::Point,
            3 | 23 => GeometryKind::Linestring,
            5 | 25 => GeometryKind::Polygon,
            8 | 28 => GeometryKind::MultiPoint,
            11 => GeometryKind::PointZ,
            13 => GeometryKind::LinestringZ,
            15 => GeometryKind::PolygonZ,
            18 => GeometryKind::MultiPointZ,
            31 => GeometryKind::Geometry,
            _ => return None,
        };
        Some(kind)
    }

    /// Kind for a GeoPackage `geometry_type_name` and its `z` flag
    /// (0 prohibited, 1 mandatory, 2 optional).
    pub fn from_gpkg(type_name: &str, z: i64) -> Self {
        let has_z = z == 1;
        match (type_name.to_ascii_uppercase().as_str(), has_z) {
            ("POINT", false) => GeometryKind::Point,
            ("POINT", true) => GeometryKind::PointZ,
            ("LINESTRING", false) => GeometryKind::Linestring,
            ("LINESTRING", true) => GeometryKind::LinestringZ,
            ("POLYGON", false) => GeometryKind::Polygon,
            ("POLYGON", true) => GeometryKind::PolygonZ,
            ("MULTIPOINT", false) => GeometryKind::MultiPoint,
            ("MULTIPOINT", true) => GeometryKind::MultiPointZ,
            ("MULTILINESTRING", false) => GeometryKind::MultiLinestring,
            ("MULTILINESTRING", true) => GeometryKind::MultiLinestringZ,
            ("MULTIPOLYGON", false) => GeometryKind::MultiPolygon,
            ("MULTIPOLYGON", true) => GeometryKind::MultiPolygonZ,
            _ => GeometryKind::Geometry,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown geometry names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown geometry type '{0}'")]
pub struct UnknownGeometry(pub String);

impl FromStr for GeometryKind {
    type Err = UnknownGeometry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeometryKind::ALL
            .iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownGeometry(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_type_codes() {
        assert_eq!(GeometryKind::from_shape_type(1), Some(GeometryKind::Point));
        assert_eq!(
            GeometryKind::from_shape_type(3),
            Some(GeometryKind::Linestring)
        );
        assert_eq!(
            GeometryKind::from_shape_type(15),
            Some(GeometryKind::PolygonZ)
        );
        assert_eq!(GeometryKind::from_shape_type(25), Some(GeometryKind::Polygon));
        assert_eq!(GeometryKind::from_shape_type(0), Some(GeometryKind::None));
        assert_eq!(GeometryKind::from_shape_type(99), None);
    }

    #[test]
    fn test_gpkg_names() {
        assert_eq!(
            GeometryKind::from_gpkg("MULTIPOLYGON", 0),
            GeometryKind::MultiPolygon
        );
        assert_eq!(GeometryKind::from_gpkg("Point", 1), GeometryKind::PointZ);
        assert_eq!(
            GeometryKind::from_gpkg("LINESTRING", 2),
            GeometryKind::Linestring
        );
        assert_eq!(
            GeometryKind::from_gpkg("GEOMETRYCOLLECTION", 0),
            GeometryKind::Geometry
        );
    }

    #[test]
    fn test_name_round_trip() {
        for kind in GeometryKind::ALL {
            assert_eq!(kind.as_str().parse::<GeometryKind>().unwrap(), kind);
        }
        assert!("Hexagon".parse::<GeometryKind>().is_err());
    }
}
