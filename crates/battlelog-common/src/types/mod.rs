//! Record types shared across battlelog
//!
//! The target relational schema has three tables. Deck masters are reference
//! data; personal decks point at a deck master; battle logs point at both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

// ============================================================================
// Record Kinds
// ============================================================================

/// One of the three migrated record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    DeckMaster,
    MyDeck,
    BattleLog,
}

impl RecordKind {
    /// Migration order: reference data first, dependents after.
    pub const MIGRATION_ORDER: [RecordKind; 3] =
        [RecordKind::DeckMaster, RecordKind::MyDeck, RecordKind::BattleLog];

    /// Rollback order, the reverse of [`RecordKind::MIGRATION_ORDER`].
    pub const ROLLBACK_ORDER: [RecordKind; 3] =
        [RecordKind::BattleLog, RecordKind::MyDeck, RecordKind::DeckMaster];

    pub fn table_name(self) -> &'static str {
        match self {
            RecordKind::DeckMaster => "deck_masters",
            RecordKind::MyDeck => "my_decks",
            RecordKind::BattleLog => "battle_logs",
        }
    }

    /// Key used in JSON payloads and reports (`deckMasters`, ...)
    pub fn camel_name(self) -> &'static str {
        match self {
            RecordKind::DeckMaster => "deckMasters",
            RecordKind::MyDeck => "myDecks",
            RecordKind::BattleLog => "battleLogs",
        }
    }

    /// Human-readable label used in progress messages
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::DeckMaster => "deck masters",
            RecordKind::MyDeck => "my decks",
            RecordKind::BattleLog => "battle logs",
        }
    }

    /// Well-known legacy document name in the object store
    pub fn legacy_document(self) -> &'static str {
        match self {
            RecordKind::DeckMaster => "deck-master.json",
            RecordKind::MyDeck => "my-decks.json",
            RecordKind::BattleLog => "battle-logs.json",
        }
    }

    /// Whether rows of this kind carry a `userId` owner
    pub fn supports_owner(self) -> bool {
        !matches!(self, RecordKind::DeckMaster)
    }

    fn rank_in(self, order: &[RecordKind; 3]) -> usize {
        order.iter().position(|k| *k == self).unwrap_or(order.len())
    }

    /// Position of this kind in [`RecordKind::ROLLBACK_ORDER`]
    pub fn rollback_rank(self) -> usize {
        self.rank_in(&Self::ROLLBACK_ORDER)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for RecordKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "deck_masters" | "deckMasters" | "deck-masters" | "deck-master" => {
                Ok(RecordKind::DeckMaster)
            },
            "my_decks" | "myDecks" | "my-decks" => Ok(RecordKind::MyDeck),
            "battle_logs" | "battleLogs" | "battle-logs" => Ok(RecordKind::BattleLog),
            other => Err(CommonError::UnknownRecordKind(other.to_string())),
        }
    }
}

// ============================================================================
// Enumerated Battle Fields
// ============================================================================

macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CommonError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| CommonError::InvalidValue {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

closed_set!(
    /// Match format a battle was played in
    BattleType, "battleType" {
        RankMatch => "ランクマッチ",
        FreeMatch => "対戦台",
        LobbyTournament => "ロビー大会",
    }
);

closed_set!(
    /// Player rank at the time of the battle
    Rank, "rank" {
        Sapphire => "サファイア",
        Diamond => "ダイアモンド",
        Ruby => "ルビー",
        Topaz => "トパーズ",
        Beginner => "ビギナー",
        Unranked => "-",
    }
);

closed_set!(
    /// Whether the player moved first or second
    Turn, "turn" {
        First => "先攻",
        Second => "後攻",
    }
);

closed_set!(
    BattleResult, "result" {
        Win => "WIN",
        Lose => "LOSE",
    }
);

// ============================================================================
// Normalized Rows
// ============================================================================

/// Reference deck archetype (`deck_masters` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckMaster {
    pub id: String,
    pub class_name: String,
    pub deck_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<i64>,
}

/// A user's own deck (`my_decks` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyDeck {
    pub id: String,
    /// Deck master this deck is built from
    pub deck_id: String,
    pub deck_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_code: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// One recorded match (`battle_logs` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleLog {
    pub id: String,
    pub date: NaiveDate,
    pub battle_type: BattleType,
    pub rank: Rank,
    pub group_name: String,
    pub my_deck_id: String,
    pub turn: Turn,
    pub result: BattleResult,
    pub opponent_deck_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A target row of any kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    DeckMaster(DeckMaster),
    MyDeck(MyDeck),
    BattleLog(BattleLog),
}

impl NormalizedRecord {
    /// Build a typed row of `kind` from a normalized JSON object.
    pub fn from_value(kind: RecordKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            RecordKind::DeckMaster => NormalizedRecord::DeckMaster(serde_json::from_value(value)?),
            RecordKind::MyDeck => NormalizedRecord::MyDeck(serde_json::from_value(value)?),
            RecordKind::BattleLog => NormalizedRecord::BattleLog(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            NormalizedRecord::DeckMaster(_) => RecordKind::DeckMaster,
            NormalizedRecord::MyDeck(_) => RecordKind::MyDeck,
            NormalizedRecord::BattleLog(_) => RecordKind::BattleLog,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            NormalizedRecord::DeckMaster(r) => &r.id,
            NormalizedRecord::MyDeck(r) => &r.id,
            NormalizedRecord::BattleLog(r) => &r.id,
        }
    }
}
