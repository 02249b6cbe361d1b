//! Row identifiers and reference vocabularies.

use std::fmt;
use std::str::FromStr;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Id of a GeometryType row.
    GeometryTypeId
);
row_id!(
    /// Id of an AttributeType row.
    AttributeTypeId
);
row_id!(
    /// Id of a GeoLayer row.
    GeoLayerId
);
row_id!(
    /// Id of an Attribute row.
    AttributeId
);
row_id!(
    /// Id of an AttributeValue row.
    AttributeValueId
);

/// Error for names outside a reference vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {vocabulary} '{value}'")]
pub struct UnknownVocabulary {
    pub vocabulary: &'static str,
    pub value: String,
}

/// Priority classification of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityLevel {
    N1,
    N2,
    N3,
    N4,
}

impl PriorityLevel {
    pub const ALL: [PriorityLevel; 4] = [
        PriorityLevel::N1,
        PriorityLevel::N2,
        PriorityLevel::N3,
        PriorityLevel::N4,
    ];

    /// Stored name (`"1"` to `"4"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::N1 => "1",
            PriorityLevel::N2 => "2",
            PriorityLevel::N3 => "3",
            PriorityLevel::N4 => "4",
        }
    }

    /// Human label.
    pub fn label(&self) -> &'static str {
        match self {
            PriorityLevel::N1 => "Level N1",
            PriorityLevel::N2 => "Level N2",
            PriorityLevel::N3 => "Level N3",
            PriorityLevel::N4 => "Level N4",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PriorityLevel {
    type Err = UnknownVocabulary;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("N")
            .or_else(|| s.strip_prefix("n"))
            .unwrap_or(s);
        PriorityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownVocabulary {
                vocabulary: "priority level",
                value: s.to_string(),
            })
    }
}

/// OGC spatial relation between layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OgcRelation {
    Disjoint,
    Intersects,
    Contains,
    Within,
    Touches,
    Equals,
}

impl OgcRelation {
    pub const ALL: [OgcRelation; 6] = [
        OgcRelation::Disjoint,
        OgcRelation::Intersects,
        OgcRelation::Contains,
        OgcRelation::Within,
        OgcRelation::Touches,
        OgcRelation::Equals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OgcRelation::Disjoint => "disjoint",
            OgcRelation::Intersects => "intersects",
            OgcRelation::Contains => "contains",
            OgcRelation::Within => "within",
            OgcRelation::Touches => "touches",
            OgcRelation::Equals => "equals",
        }
    }
}

impl fmt::Display for OgcRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OgcRelation {
    type Err = UnknownVocabulary;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OgcRelation::ALL
            .into_iter()
            .find(|relation| relation.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVocabulary {
                vocabulary: "OGC relation",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_level_parsing() {
        assert_eq!("1".parse::<PriorityLevel>().unwrap(), PriorityLevel::N1);
        assert_eq!("N4".parse::<PriorityLevel>().unwrap(), PriorityLevel::N4);
        assert!("5".parse::<PriorityLevel>().is_err());
        assert_eq!(PriorityLevel::N2.to_string(), "Level N2");
    }

    #[test]
    fn test_ogc_relation_parsing() {
        assert_eq!(
            "Intersects".parse::<OgcRelation>().unwrap(),
            OgcRelation::Intersects
        );
        let err = "overlaps".parse::<OgcRelation>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown OGC relation 'overlaps'");
    }
}
