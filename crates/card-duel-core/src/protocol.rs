use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::elo::DuelDelta;

/// A card as returned by the REST API: rating record plus display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub image: String,
    pub artist: Option<String>,
    pub set_name: String,
    pub series: String,
    pub elo: f64,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
}

/// `GET /api/pair`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResponse {
    pub a: Card,
    pub b: Card,
}

/// `POST /api/duel` body. Ids are optional so a missing one can be reported
/// as invalid input rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuelRequest {
    #[serde(rename = "winnerId")]
    pub winner_id: Option<String>,
    #[serde(rename = "loserId")]
    pub loser_id: Option<String>,
}

/// `POST /api/duel` response: `a` is the winner, `b` the loser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelResponse {
    pub a: Card,
    pub b: Card,
    pub delta: DuelDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub items: Vec<Card>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardList {
    pub items: Vec<Card>,
}

/// Legacy ranking by share of duels won.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinRateEntry {
    #[serde(flatten)]
    pub card: Card,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBucket {
    #[serde(rename = "avgElo")]
    pub avg_elo: f64,
    pub count: i64,
}

/// Aggregate buckets keyed by label. Serialized as a JSON object that keeps
/// the query's row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsReport(pub Vec<(String, StatBucket)>);

impl StatsReport {
    pub fn get(&self, label: &str) -> Option<&StatBucket> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, b)| b)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(l, _)| l.as_str())
    }
}

impl Serialize for StatsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, bucket) in &self.0 {
            map.serialize_entry(label, bucket)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSummary {
    pub id: String,
    pub name: String,
    pub series: String,
    pub release_date: Option<String>,
    pub logo_image: Option<String>,
}

/// Sets of one series; `release_date` is the earliest of its sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesGroup {
    pub series: String,
    pub release_date: Option<String>,
    pub sets: Vec<SetSummary>,
}

/// Lightweight card row for set listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCard {
    pub id: String,
    pub name: String,
    pub image: String,
    pub artist: Option<String>,
    pub elo: f64,
    pub set_name: String,
    pub series: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetCardList {
    pub items: Vec<SetCard>,
}

/// Error body for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duel_request_uses_camel_case_ids() {
        let req: DuelRequest =
            serde_json::from_str(r#"{"winnerId": "base1-4", "loserId": "base1-2"}"#).unwrap();
        assert_eq!(req.winner_id.as_deref(), Some("base1-4"));
        assert_eq!(req.loser_id.as_deref(), Some("base1-2"));

        let empty: DuelRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.winner_id.is_none() && empty.loser_id.is_none());
    }

    #[test]
    fn stats_report_keeps_row_order() {
        let report = StatsReport(vec![
            ("Zeta".into(), StatBucket { avg_elo: 1100.0, count: 3 }),
            ("Alpha".into(), StatBucket { avg_elo: 900.0, count: 1 }),
        ]);
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"Zeta":{"avgElo":1100.0,"count":3},"Alpha":{"avgElo":900.0,"count":1}}"#
        );
    }

    #[test]
    fn win_rate_entry_flattens_card() {
        let entry = WinRateEntry {
            card: Card {
                id: "x".into(),
                name: "X".into(),
                image: String::new(),
                artist: None,
                set_name: "Base".into(),
                series: "Base".into(),
                elo: 1000.0,
                games_played: 4,
                wins: 3,
                losses: 1,
            },
            win_rate: 0.75,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], "x");
        assert_eq!(value["win_rate"], 0.75);
    }
}
