//! Legacy-to-target field normalization
//!
//! Pure and infallible. Shapes that are not recognized are passed through
//! untouched so the validator can report them.

use battlelog_common::types::RecordKind;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

// Pattern is a literal, so compilation cannot fail.
#[allow(clippy::unwrap_used)]
static LEGACY_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})/(\d{2})/(\d{2})$").unwrap());

#[allow(clippy::unwrap_used)]
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());

/// Date-valued fields of a kind
fn date_fields(kind: RecordKind) -> &'static [&'static str] {
    match kind {
        RecordKind::BattleLog => &["date"],
        RecordKind::DeckMaster | RecordKind::MyDeck => &[],
    }
}

/// Convert one legacy record of `kind` into the target field shape.
pub fn normalize(kind: RecordKind, record: Value) -> Value {
    let Value::Object(mut fields) = record else {
        return record;
    };

    for field in date_fields(kind) {
        if let Some(Value::String(date)) = fields.get_mut(*field) {
            if let Some(converted) = convert_legacy_date(date) {
                *date = converted;
            }
        }
    }

    rename_group(&mut fields);
    coerce_season(&mut fields);
    tidy_id(&mut fields);

    Value::Object(fields)
}

/// `2025/08/07` -> `2025-08-07`; anything else is `None`.
pub fn convert_legacy_date(text: &str) -> Option<String> {
    let caps = LEGACY_DATE.captures(text)?;
    Some(format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]))
}

fn rename_group(fields: &mut Map<String, Value>) {
    if let Some(group) = fields.remove("group") {
        fields.entry("groupName").or_insert(group);
    }
}

fn coerce_season(fields: &mut Map<String, Value>) {
    let Some(Value::String(season)) = fields.get("season") else {
        return;
    };
    if !INTEGER.is_match(season) {
        return;
    }
    if let Ok(number) = season.parse::<i64>() {
        fields.insert("season".to_string(), Value::from(number));
    }
}

fn tidy_id(fields: &mut Map<String, Value>) {
    let Some(Value::String(id)) = fields.get("id") else {
        return;
    };
    let trimmed = id.trim();
    if trimmed.is_empty() {
        fields.remove("id");
    } else if trimmed.len() != id.len() {
        let trimmed = trimmed.to_string();
        fields.insert("id".to_string(), Value::String(trimmed));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_battle_log_legacy_shape() {
        let normalized = normalize(
            RecordKind::BattleLog,
            json!({ "date": "2025/08/07", "group": "A", "result": "WIN" }),
        );
        assert_eq!(normalized, json!({ "date": "2025-08-07", "groupName": "A", "result": "WIN" }));
    }

    #[test]
    fn test_non_date_text_is_left_alone() {
        let normalized = normalize(RecordKind::BattleLog, json!({ "date": "Aug 7/8" }));
        assert_eq!(normalized["date"], "Aug 7/8");

        let normalized = normalize(RecordKind::BattleLog, json!({ "date": "2025/8/7" }));
        assert_eq!(normalized["date"], "2025/8/7");
    }

    #[test]
    fn test_group_name_wins_over_group() {
        let normalized =
            normalize(RecordKind::BattleLog, json!({ "group": "old", "groupName": "new" }));
        assert_eq!(normalized, json!({ "groupName": "new" }));
    }

    #[test]
    fn test_season_coercion() {
        let numeric = normalize(RecordKind::DeckMaster, json!({ "season": "12" }));
        assert_eq!(numeric["season"], json!(12));

        let text = normalize(RecordKind::DeckMaster, json!({ "season": "spring" }));
        assert_eq!(text["season"], json!("spring"));

        let empty = normalize(RecordKind::DeckMaster, json!({ "season": "" }));
        assert_eq!(empty["season"], json!(""));

        let negative = normalize(RecordKind::DeckMaster, json!({ "season": "-2" }));
        assert_eq!(negative["season"], json!(-2));

        for loose in ["+12", " 12", "1_000", "99999999999999999999"] {
            let kept = normalize(RecordKind::DeckMaster, json!({ "season": loose }));
            assert_eq!(kept["season"], json!(loose));
        }
    }

    #[test]
    fn test_id_is_trimmed_or_dropped() {
        let trimmed = normalize(RecordKind::MyDeck, json!({ "id": "  md-1 " }));
        assert_eq!(trimmed["id"], "md-1");

        let blank = normalize(RecordKind::MyDeck, json!({ "id": "   " }));
        assert!(blank.get("id").is_none());
    }

    #[test]
    fn test_non_object_passes_through() {
        assert_eq!(normalize(RecordKind::BattleLog, json!([1, 2])), json!([1, 2]));
        assert_eq!(normalize(RecordKind::BattleLog, Value::Null), Value::Null);
    }

    #[test]
    fn test_dates_only_converted_for_dated_kinds() {
        let normalized = normalize(RecordKind::MyDeck, json!({ "date": "2025/08/07" }));
        assert_eq!(normalized["date"], "2025/08/07");
    }
}
