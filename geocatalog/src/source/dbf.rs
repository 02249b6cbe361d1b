//! dBASE (`.dbf`) attribute table codec.
//!
//! The layout handled here is the dBASE III+ layout written by every
//! Shapefile producer:
//!
//! - 32-byte file header: version, last update, record count (u32 LE),
//!   header length (u16 LE), record length (u16 LE)
//! - 32-byte field descriptors, terminated by `0x0D`
//! - fixed-width records, each prefixed by a deletion flag (`' '` live,
//!   `'*'` deleted), optionally followed by a `0x1A` end-of-file marker
//!
//! Field names are decoded independently of the record encoding (UTF-8 when
//! valid, Latin-1 otherwise) so that schema reads and row reads agree on
//! column names whatever encoding the records turn out to use.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::{Field, FieldValue, SourceError, SourceFormat};
use crate::encoding::TextEncoding;

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const DESCRIPTOR_TERMINATOR: u8 = 0x0D;
const DELETED_FLAG: u8 = b'*';

/// One field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfField {
    pub name: String,
    /// dBASE type code (`C`, `N`, `F`, `L`, `D`, ...).
    pub kind: u8,
    pub length: usize,
    pub decimals: usize,
}

impl DbfField {
    /// Source type tag for this field.
    ///
    /// Character fields carry their width (`str:80`); numeric fields become
    /// `int` or `float` depending on their decimal count.
    pub fn type_tag(&self) -> String {
        match self.kind {
            b'C' => format!("str:{}", self.length),
            b'N' | b'F' if self.decimals == 0 => "int".to_string(),
            b'N' | b'F' | b'B' | b'O' => "float".to_string(),
            b'I' | b'+' => "int".to_string(),
            b'L' => "bool".to_string(),
            b'D' => "date".to_string(),
            b'T' | b'@' => "datetime".to_string(),
            _ => "str".to_string(),
        }
    }
}

/// An in-memory dBASE file.
#[derive(Debug, Clone)]
pub struct DbfTable {
    path: PathBuf,
    fields: Vec<DbfField>,
    record_count: usize,
    header_len: usize,
    record_len: usize,
    data: Vec<u8>,
}

impl DbfTable {
    /// Read and validate a `.dbf` file.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let data = std::fs::read(path).map_err(|e| SourceError::io(path, e))?;
        Self::from_bytes(path, data)
    }

    /// Parse the header of an already loaded `.dbf` image.
    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self, SourceError> {
        let malformed = |message: String| SourceError::Malformed {
            path: path.to_path_buf(),
            format: SourceFormat::Shapefile,
            message,
        };

        if data.len() < HEADER_LEN + 1 {
            return Err(malformed(format!(
                "dbf header truncated ({} bytes)",
                data.len()
            )));
        }

        let record_count = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
        let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
        let record_len = u16::from_le_bytes([data[10], data[11]]) as usize;

        if header_len > data.len() || header_len < HEADER_LEN + 1 {
            return Err(malformed(format!("invalid dbf header length {}", header_len)));
        }

        let mut fields = Vec::new();
        let mut offset = HEADER_LEN;
        while offset < header_len && data[offset] != DESCRIPTOR_TERMINATOR {
            if offset + DESCRIPTOR_LEN > header_len {
                return Err(malformed("field descriptor overruns header".to_string()));
            }
            let descriptor = &data[offset..offset + DESCRIPTOR_LEN];
            fields.push(DbfField {
                name: decode_field_name(&descriptor[..11]),
                kind: descriptor[11].to_ascii_uppercase(),
                length: descriptor[16] as usize,
                decimals: descriptor[17] as usize,
            });
            offset += DESCRIPTOR_LEN;
        }

        let declared_len: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
        if record_len < declared_len {
            return Err(malformed(format!(
                "record length {} shorter than its fields ({})",
                record_len, declared_len
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            fields,
            record_count,
            header_len,
            record_len,
            data,
        })
    }

    /// Field descriptors in file order.
    pub fn fields(&self) -> &[DbfField] {
        &self.fields
    }

    /// Source schema for the fields.
    pub fn schema(&self) -> Vec<Field> {
        self.fields
            .iter()
            .map(|f| Field::new(f.name.clone(), f.type_tag()))
            .collect()
    }

    /// Number of records declared by the header (deleted ones included).
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Decode every live record with `encoding`.
    ///
    /// Records past the end of the file (truncated tables) are ignored.
    pub fn read_records(&self, encoding: TextEncoding) -> Result<Vec<Vec<FieldValue>>, SourceError> {
        let mut rows = Vec::with_capacity(self.record_count);

        for index in 0..self.record_count {
            let start = self.header_len + index * self.record_len;
            let end = start + self.record_len;
            if end > self.data.len() {
                tracing::warn!(
                    file = %self.path.display(),
                    declared = self.record_count,
                    read = index,
                    "dbf file shorter than its declared record count"
                );
                break;
            }

            let record = &self.data[start..end];
            if record[0] == DELETED_FLAG {
                continue;
            }

            let mut row = Vec::with_capacity(self.fields.len());
            let mut cursor = 1;
            for field in &self.fields {
                let raw = &record[cursor..cursor + field.length];
                cursor += field.length;
                let value = parse_value(field, raw, encoding).ok_or_else(|| SourceError::Decode {
                    path: self.path.clone(),
                    encoding,
                    record: index,
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

/// Decode a field name: bytes up to the first NUL, UTF-8 when valid and
/// Latin-1 otherwise.
fn decode_field_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let bytes = &raw[..end];
    match std::str::from_utf8(bytes) {
        Ok(name) => name.trim().to_string(),
        Err(_) => encoding_rs::mem::decode_latin1(bytes).trim().to_string(),
    }
}

/// Parse one cell. Returns `None` only when text cannot be decoded.
fn parse_value(field: &DbfField, raw: &[u8], encoding: TextEncoding) -> Option<FieldValue> {
    let value = match field.kind {
        b'N' | b'F' => parse_number(raw, field.decimals),
        b'L' => match raw.first() {
            Some(b'T' | b't' | b'Y' | b'y') => FieldValue::Boolean(true),
            Some(b'F' | b'f' | b'N' | b'n') => FieldValue::Boolean(false),
            _ => FieldValue::Null,
        },
        b'D' => parse_date(raw),
        _ => {
            let trimmed = trim_text(raw);
            if trimmed.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Text(encoding.decode(trimmed).ok()?)
            }
        }
    };
    Some(value)
}

fn parse_number(raw: &[u8], decimals: usize) -> FieldValue {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(|c: char| c == ' ' || c == '\0');
    if text.is_empty() || text.chars().all(|c| c == '*') {
        return FieldValue::Null;
    }

    if decimals == 0 {
        if let Ok(value) = text.parse::<i64>() {
            return FieldValue::Integer(value);
        }
    }
    match text.parse::<f64>() {
        Ok(value) => FieldValue::Real(value),
        Err(_) => FieldValue::Null,
    }
}

fn parse_date(raw: &[u8]) -> FieldValue {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() || text.chars().all(|c| c == '0') {
        return FieldValue::Null;
    }
    NaiveDate::parse_from_str(text, "%Y%m%d")
        .map(FieldValue::Date)
        .unwrap_or(FieldValue::Null)
}

/// Strip the space/NUL padding around a character field.
fn trim_text(raw: &[u8]) -> &[u8] {
    let is_pad = |b: &u8| *b == b' ' || *b == 0;
    let start = raw.iter().position(|b| !is_pad(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

/// Serialize a dBASE III table for unit test fixtures.
///
/// Values are written as already-encoded bytes, left-aligned for character
/// fields and right-aligned otherwise.
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub fn write_table(fields: &[DbfField], records: &[(bool, Vec<Vec<u8>>)]) -> Vec<u8> {
    let header_len = HEADER_LEN + fields.len() * DESCRIPTOR_LEN + 1;
    let record_len = 1 + fields.iter().map(|f| f.length).sum::<usize>();

    let mut out = Vec::with_capacity(header_len + records.len() * record_len + 1);
    out.push(0x03);
    out.extend_from_slice(&[124, 1, 1]);
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(&(record_len as u16).to_le_bytes());
    out.resize(HEADER_LEN, 0);

    for field in fields {
        let mut descriptor = [0u8; DESCRIPTOR_LEN];
        let name = field.name.as_bytes();
        let name_len = name.len().min(10);
        descriptor[..name_len].copy_from_slice(&name[..name_len]);
        descriptor[11] = field.kind;
        descriptor[16] = field.length as u8;
        descriptor[17] = field.decimals as u8;
        out.extend_from_slice(&descriptor);
    }
    out.push(DESCRIPTOR_TERMINATOR);

    for (deleted, values) in records {
        out.push(if *deleted { DELETED_FLAG } else { b' ' });
        for (field, value) in fields.iter().zip(values) {
            let mut cell = vec![b' '; field.length];
            let len = value.len().min(field.length);
            if field.kind == b'C' {
                cell[..len].copy_from_slice(&value[..len]);
            } else {
                cell[field.length - len..].copy_from_slice(&value[..len]);
            }
            out.extend_from_slice(&cell);
        }
    }
    out.push(0x1A);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, kind: u8, length: usize, decimals: usize) -> DbfField {
        DbfField {
            name: name.to_string(),
            kind,
            length,
            decimals,
        }
    }

    fn sample_table() -> DbfTable {
        let fields = vec![
            field("NOM", b'C', 20, 0),
            field("POP", b'N', 9, 0),
            field("SURF", b'N', 12, 3),
            field("ACTIF", b'L', 1, 0),
            field("MAJ", b'D', 8, 0),
        ];
        let records = vec![
            (
                false,
                vec![
                    b"Besan\xe7on".to_vec(),
                    b"116466".to_vec(),
                    b"65.050".to_vec(),
                    b"T".to_vec(),
                    b"20210309".to_vec(),
                ],
            ),
            (
                true,
                vec![
                    b"Supprim\xe9".to_vec(),
                    b"1".to_vec(),
                    b"1.0".to_vec(),
                    b"F".to_vec(),
                    b"20000101".to_vec(),
                ],
            ),
            (
                false,
                vec![
                    b"Dole".to_vec(),
                    b"".to_vec(),
                    b"********".to_vec(),
                    b"?".to_vec(),
                    b"".to_vec(),
                ],
            ),
        ];
        let bytes = write_table(&fields, &records);
        DbfTable::from_bytes(Path::new("communes.dbf"), bytes).unwrap()
    }

    #[test]
    fn test_schema_tags() {
        let table = sample_table();
        let tags: Vec<_> = table.schema().into_iter().map(|f| f.type_tag).collect();
        assert_eq!(tags, vec!["str:20", "int", "float", "bool", "date"]);
        assert_eq!(table.record_count(), 3);
    }

    #[test]
    fn test_read_records_skips_deleted() {
        let table = sample_table();
        let rows = table.read_records(TextEncoding::Latin1).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0][0], FieldValue::Text("Besançon".to_string()));
        assert_eq!(rows[0][1], FieldValue::Integer(116466));
        assert_eq!(rows[0][2], FieldValue::Real(65.05));
        assert_eq!(rows[0][3], FieldValue::Boolean(true));
        assert_eq!(
            rows[0][4],
            FieldValue::Date(NaiveDate::from_ymd_opt(2021, 3, 9).unwrap())
        );

        assert_eq!(rows[1][0], FieldValue::Text("Dole".to_string()));
        assert_eq!(rows[1][1], FieldValue::Null);
        assert_eq!(rows[1][2], FieldValue::Null);
        assert_eq!(rows[1][3], FieldValue::Null);
        assert_eq!(rows[1][4], FieldValue::Null);
    }

    #[test]
    fn test_invalid_text_is_a_decode_error() {
        let table = sample_table();
        let err = table.read_records(TextEncoding::Utf8).unwrap_err();
        match err {
            SourceError::Decode {
                encoding, record, ..
            } => {
                assert_eq!(encoding, TextEncoding::Utf8);
                assert_eq!(record, 0);
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_field_names_decode_independently_of_records() {
        let fields = vec![field("R\u{e9}GION", b'C', 4, 0)];
        let mut bytes = write_table(&fields, &[]);
        // Rewrite the name as Latin-1 bytes: R, 0xE9, G, I, O, N
        bytes[32..43].copy_from_slice(b"R\xe9GION\0\0\0\0\0");
        let table = DbfTable::from_bytes(Path::new("r.dbf"), bytes).unwrap();
        assert_eq!(table.fields()[0].name, "RéGION");
    }

    #[test]
    fn test_truncated_header_is_malformed() {
        let err = DbfTable::from_bytes(Path::new("bad.dbf"), vec![0x03; 10]).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn test_trim_text() {
        assert_eq!(trim_text(b"  abc \0\0"), b"abc");
        assert_eq!(trim_text(b"    "), b"");
    }
}
