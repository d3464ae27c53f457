//! Turning raw JSON or CSV text into loosely typed records

use battlelog_common::types::RecordKind;
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Csv,
}

impl PayloadFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .ok_or_else(|| FormatError::UnknownFormat(path.display().to_string()))
    }
}

impl FromStr for PayloadFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(PayloadFormat::Json),
            "csv" => Ok(PayloadFormat::Csv),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

/// Where records came from; decides how line numbers are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrigin {
    /// A JSON array: element `i` is line `i + 1`
    Structured,
    /// Delimited text with a header row: row `i` is line `i + 2`
    Tabular,
}

impl RecordOrigin {
    pub fn line_number(self, index: usize) -> usize {
        match self {
            RecordOrigin::Structured => index + 1,
            RecordOrigin::Tabular => index + 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPayload {
    pub records: Vec<Value>,
    pub origin: RecordOrigin,
}

/// Headers a CSV payload of `kind` must carry.
pub fn required_headers(kind: RecordKind) -> &'static [&'static str] {
    match kind {
        RecordKind::BattleLog => &[
            "date",
            "battleType",
            "rank",
            "groupName",
            "myDeckId",
            "turn",
            "result",
            "opponentDeckId",
        ],
        RecordKind::MyDeck => &["deckId", "deckName"],
        RecordKind::DeckMaster => &["className", "deckName"],
    }
}

/// Older exports used `group`; it still satisfies the `groupName` header.
fn header_aliases(header: &str) -> &'static [&'static str] {
    match header {
        "groupName" => &["group"],
        _ => &[],
    }
}

pub fn parse_payload(
    kind: RecordKind,
    text: &str,
    format: PayloadFormat,
) -> Result<ParsedPayload, FormatError> {
    let records = match format {
        PayloadFormat::Json => parse_json(text)?,
        PayloadFormat::Csv => parse_csv(kind, text)?,
    };
    let origin = match format {
        PayloadFormat::Json => RecordOrigin::Structured,
        PayloadFormat::Csv => RecordOrigin::Tabular,
    };
    Ok(ParsedPayload { records, origin })
}

fn parse_json(text: &str) -> Result<Vec<Value>, FormatError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FormatError::InvalidJson(e.to_string()))?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(FormatError::NotAnArray),
    }
}

fn parse_csv(kind: RecordKind, text: &str) -> Result<Vec<Value>, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FormatError::InvalidCsv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(FormatError::EmptyCsv);
    }

    let missing: Vec<String> = required_headers(kind)
        .iter()
        .filter(|required| {
            !headers.iter().any(|h| {
                h == *required || header_aliases(required).iter().any(|alias| h == alias)
            })
        })
        .map(|h| h.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FormatError::MissingHeaders(missing));
    }

    let mut records = Vec::new();
    for (row_index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| FormatError::InvalidCsv(e.to_string()))?;
        if row.len() != headers.len() {
            debug!(
                row = row_index + 2,
                columns = row.len(),
                expected = headers.len(),
                "Skipping CSV row with mismatched column count"
            );
            continue;
        }

        let mut fields = Map::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            fields.insert(header.clone(), csv_cell(cell));
        }
        records.push(Value::Object(fields));
    }

    Ok(records)
}

fn csv_cell(cell: &str) -> Value {
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_must_be_an_array() {
        let parsed = parse_payload(RecordKind::MyDeck, r#"[{"deckId":"1"}]"#, PayloadFormat::Json)
            .unwrap();
        assert_eq!(parsed.origin, RecordOrigin::Structured);
        assert_eq!(parsed.records, vec![json!({ "deckId": "1" })]);

        assert_eq!(
            parse_payload(RecordKind::MyDeck, r#"{"deckId":"1"}"#, PayloadFormat::Json),
            Err(FormatError::NotAnArray)
        );
        assert!(matches!(
            parse_payload(RecordKind::MyDeck, "[{", PayloadFormat::Json),
            Err(FormatError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_csv_cells_are_trimmed_typed_and_sparse() {
        let text = "deckId,deckName,deckCode,isArchived\n 1 , Aggro Sword ,,true\n";
        let parsed = parse_payload(RecordKind::MyDeck, text, PayloadFormat::Csv).unwrap();

        assert_eq!(parsed.origin, RecordOrigin::Tabular);
        assert_eq!(
            parsed.records,
            vec![json!({ "deckId": "1", "deckName": "Aggro Sword", "isArchived": true })]
        );
    }

    #[test]
    fn test_csv_empty_text() {
        assert_eq!(
            parse_payload(RecordKind::MyDeck, "", PayloadFormat::Csv),
            Err(FormatError::EmptyCsv)
        );
        assert_eq!(
            parse_payload(RecordKind::MyDeck, "  \n", PayloadFormat::Csv),
            Err(FormatError::EmptyCsv)
        );
    }

    #[test]
    fn test_csv_missing_headers_named_before_rows() {
        let text = "date,battleType,group,myDeckId\n2025/08/07,ランクマッチ,A,1\n";
        let err = parse_payload(RecordKind::BattleLog, text, PayloadFormat::Csv).unwrap_err();
        assert_eq!(
            err,
            FormatError::MissingHeaders(vec![
                "rank".to_string(),
                "turn".to_string(),
                "result".to_string(),
                "opponentDeckId".to_string(),
            ])
        );
    }

    #[test]
    fn test_csv_mismatched_rows_are_dropped() {
        let text = "className,deckName\nElf,Fairy\nRoyal\nDragon,Ramp,extra\nWitch,Spell\n";
        let parsed = parse_payload(RecordKind::DeckMaster, text, PayloadFormat::Csv).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1]["className"], "Witch");
    }

    #[test]
    fn test_line_numbers() {
        assert_eq!(RecordOrigin::Structured.line_number(2), 3);
        assert_eq!(RecordOrigin::Tabular.line_number(2), 4);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(PayloadFormat::from_path(Path::new("logs.CSV")).unwrap(), PayloadFormat::Csv);
        assert_eq!(PayloadFormat::from_path(Path::new("a/b.json")).unwrap(), PayloadFormat::Json);
        assert!(PayloadFormat::from_path(Path::new("notes.txt")).is_err());
    }
}
