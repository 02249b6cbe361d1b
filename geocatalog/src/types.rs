//! Mapping from source type tags to catalog storage types.

/// Canonical storage type for a source type tag.
///
/// | tag        | storage            |
/// |------------|--------------------|
/// | `str`      | `TEXT`             |
/// | `str:N`    | `VARCHAR(N)`       |
/// | `int`      | `INTEGER`          |
/// | `float`    | `DOUBLE PRECISION` |
/// | `bool`     | `BOOLEAN`          |
/// | `datetime` | `TIMESTAMP`        |
/// | `date`     | `DATE`             |
/// | `time`     | `TIME`             |
/// | `object`   | `JSONB`            |
///
/// Anything else maps to `TEXT`.
///
/// ```
/// use geocatalog::types::to_storage_type;
///
/// assert_eq!(to_storage_type("str:80"), "VARCHAR(80)");
/// assert_eq!(to_storage_type("int"), "INTEGER");
/// assert_eq!(to_storage_type("bytes"), "TEXT");
/// ```
pub fn to_storage_type(tag: &str) -> String {
    if let Some(width) = tag.strip_prefix("str:") {
        if !width.is_empty() && width.bytes().all(|b| b.is_ascii_digit()) {
            return format!("VARCHAR({})", width);
        }
    }

    match tag {
        "int" => "INTEGER",
        "float" => "DOUBLE PRECISION",
        "bool" => "BOOLEAN",
        "datetime" => "TIMESTAMP",
        "date" => "DATE",
        "time" => "TIME",
        "object" => "JSONB",
        _ => "TEXT",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_rules() {
        assert_eq!(to_storage_type("str"), "TEXT");
        assert_eq!(to_storage_type("str:20"), "VARCHAR(20)");
        assert_eq!(to_storage_type("int"), "INTEGER");
        assert_eq!(to_storage_type("float"), "DOUBLE PRECISION");
        assert_eq!(to_storage_type("bool"), "BOOLEAN");
        assert_eq!(to_storage_type("datetime"), "TIMESTAMP");
        assert_eq!(to_storage_type("date"), "DATE");
        assert_eq!(to_storage_type("time"), "TIME");
        assert_eq!(to_storage_type("object"), "JSONB");
    }

    #[test]
    fn test_zero_width_string() {
        assert_eq!(to_storage_type("str:0"), "VARCHAR(0)");
    }

    #[test]
    fn test_unknown_tags_are_text() {
        assert_eq!(to_storage_type("bytes"), "TEXT");
        assert_eq!(to_storage_type("int64"), "TEXT");
        assert_eq!(to_storage_type("str:"), "TEXT");
        assert_eq!(to_storage_type("str:-4"), "TEXT");
        assert_eq!(to_storage_type(""), "TEXT");
    }
}
