use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

mod client;
mod transport;

pub use client::MalClient;
pub use transport::{HttpTransport, Transport};

#[cfg(test)]
pub(crate) use transport::testing;

pub const MAL_API_BASE: &str = "https://api.myanimelist.net/v2/";

pub const SEARCH_LIMIT_MAX: i64 = 50;
pub const RANKING_LIMIT_MAX: i64 = 100;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeSummary {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub entries: Vec<AnimeSummary>,
    /// Upstream cursor for the next page; `None` when there are no more pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiringStatus {
    FinishedAiring,
    CurrentlyAiring,
    NotYetAired,
}

impl AiringStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiringStatus::FinishedAiring => "finished_airing",
            AiringStatus::CurrentlyAiring => "currently_airing",
            AiringStatus::NotYetAired => "not_yet_aired",
        }
    }
}

impl fmt::Display for AiringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anime detail record.
///
/// Field names follow the MAL payload so the same type decodes the upstream
/// response and round-trips through the tool protocol. Optional fields stay
/// absent when MAL omits them: `episode_count: None` means "unknown", which is
/// not the same thing as `Some(0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeDetails {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(
        rename = "num_episodes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub episode_count: Option<u32>,
    pub status: AiringStatus,
    #[serde(
        rename = "mean",
        default,
        deserialize_with = "mean_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub mean_score: Option<f64>,
    #[serde(
        default,
        deserialize_with = "optional_position",
        skip_serializing_if = "Option::is_none"
    )]
    pub rank: Option<u32>,
    #[serde(
        default,
        deserialize_with = "optional_position",
        skip_serializing_if = "Option::is_none"
    )]
    pub popularity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

const MEAN_SCORE_MAX: f64 = 10.0;

// MAL scores are on a 0-10 scale.
fn mean_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(score) if !(0.0..=MEAN_SCORE_MAX).contains(&score) => Err(serde::de::Error::custom(
            format!("mean score {} is outside 0-10", score),
        )),
        score => Ok(score),
    }
}

/// Rank and popularity are 1-based positions.
fn position<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match u32::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("position must be at least 1")),
        position => Ok(position),
    }
}

fn optional_position<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Position(#[serde(deserialize_with = "position")] u32);

    Ok(Option::<Position>::deserialize(deserializer)?.map(|Position(p)| p))
}

/// Ranking categories accepted by `anime/ranking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankingType {
    #[default]
    All,
    Tv,
    Movie,
    Ova,
    Ona,
    Special,
    ByPopularity,
    Favorite,
}

impl RankingType {
    pub const ALL: [RankingType; 8] = [
        RankingType::All,
        RankingType::Tv,
        RankingType::Movie,
        RankingType::Ova,
        RankingType::Ona,
        RankingType::Special,
        RankingType::ByPopularity,
        RankingType::Favorite,
    ];

    /// Value sent as `ranking_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingType::All => "all",
            RankingType::Tv => "tv",
            RankingType::Movie => "movie",
            RankingType::Ova => "ova",
            RankingType::Ona => "ona",
            RankingType::Special => "special",
            RankingType::ByPopularity => "bypopularity",
            RankingType::Favorite => "favorite",
        }
    }
}

impl fmt::Display for RankingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(RankingType::All),
            "tv" => Ok(RankingType::Tv),
            "movie" => Ok(RankingType::Movie),
            "ova" => Ok(RankingType::Ova),
            "ona" => Ok(RankingType::Ona),
            "special" => Ok(RankingType::Special),
            "bypopularity" | "by-popularity" => Ok(RankingType::ByPopularity),
            "favorite" => Ok(RankingType::Favorite),
            other => Err(Error::invalid(format!(
                "invalid ranking type '{}', must be one of: {}",
                other,
                RankingType::ALL.map(|t| t.as_str()).join(", ")
            ))),
        }
    }
}

/// Map a raw ranking type string to a [`RankingType`].
pub fn parse_ranking_type(raw: &str) -> Result<RankingType> {
    raw.parse()
}

/// Whitespace-only queries count as empty.
pub fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::invalid("query cannot be empty"));
    }
    Ok(())
}

pub fn validate_search_limit(limit: i64) -> Result<u32> {
    validate_limit(limit, SEARCH_LIMIT_MAX)
}

pub fn validate_ranking_limit(limit: i64) -> Result<u32> {
    validate_limit(limit, RANKING_LIMIT_MAX)
}

fn validate_limit(limit: i64, max: i64) -> Result<u32> {
    if !(1..=max).contains(&limit) {
        return Err(Error::invalid(format!(
            "limit must be between 1 and {}, got {}",
            max, limit
        )));
    }
    Ok(limit as u32)
}

pub fn validate_anime_id(id: i64) -> Result<u64> {
    if id <= 0 {
        return Err(Error::invalid(format!(
            "anime id must be a positive integer, got {}",
            id
        )));
    }
    Ok(id as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_type_accepts_closed_set() {
        for tag in RankingType::ALL {
            assert_eq!(parse_ranking_type(tag.as_str()).unwrap(), tag);
        }
        assert_eq!(
            parse_ranking_type("by-popularity").unwrap(),
            RankingType::ByPopularity
        );
    }

    #[test]
    fn test_ranking_type_rejects_unknown() {
        for raw in ["", "TV", "airing", "upcoming", " all", "manga", "popularity"] {
            assert!(
                matches!(parse_ranking_type(raw), Err(Error::InvalidArgument(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_limit_bounds() {
        assert_eq!(validate_search_limit(1).unwrap(), 1);
        assert_eq!(validate_search_limit(50).unwrap(), 50);
        assert!(validate_search_limit(0).is_err());
        assert!(validate_search_limit(51).is_err());
        assert!(validate_search_limit(-3).is_err());

        assert_eq!(validate_ranking_limit(100).unwrap(), 100);
        assert!(validate_ranking_limit(101).is_err());
    }

    #[test]
    fn test_anime_id() {
        assert_eq!(validate_anime_id(5114).unwrap(), 5114);
        assert!(matches!(validate_anime_id(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(validate_anime_id(-1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_query_rejects_blank() {
        assert!(validate_query("one piece").is_ok());
        assert!(validate_query(" frieren ").is_ok());
        assert!(validate_query("").is_err());
        assert!(validate_query("   ").is_err());
        assert!(matches!(validate_query("\t\n"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_details_round_trip_keeps_absent_fields() {
        let details = AnimeDetails {
            title: "Frieren".to_string(),
            synopsis: None,
            episode_count: None,
            status: AiringStatus::NotYetAired,
            mean_score: None,
            rank: None,
            popularity: None,
            start_date: None,
            end_date: None,
        };

        let encoded = serde_json::to_string(&details).unwrap();
        assert_eq!(encoded, r#"{"title":"Frieren","status":"not_yet_aired"}"#);

        let decoded: AnimeDetails = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, details);
        assert_eq!(decoded.episode_count, None);
        assert_eq!(decoded.mean_score, None);
    }

    #[test]
    fn test_details_rejects_out_of_range_numbers() {
        let decode = |extra: &str| {
            serde_json::from_str::<AnimeDetails>(&format!(
                r#"{{"title":"X","status":"finished_airing",{}}}"#,
                extra
            ))
        };

        assert_eq!(decode(r#""mean":8.9"#).unwrap().mean_score, Some(8.9));
        assert_eq!(decode(r#""mean":0"#).unwrap().mean_score, Some(0.0));
        assert_eq!(decode(r#""mean":10"#).unwrap().mean_score, Some(10.0));
        assert_eq!(decode(r#""rank":1,"popularity":1"#).unwrap().rank, Some(1));

        assert!(decode(r#""mean":11.5"#).is_err());
        assert!(decode(r#""mean":-0.5"#).is_err());
        assert!(decode(r#""rank":0"#).is_err());
        assert!(decode(r#""popularity":0"#).is_err());
        assert!(decode(r#""rank":-4"#).is_err());
    }

    #[test]
    fn test_details_zero_episodes_is_not_absent() {
        let decoded: AnimeDetails =
            serde_json::from_str(r#"{"title":"X","status":"currently_airing","num_episodes":0}"#)
                .unwrap();
        assert_eq!(decoded.episode_count, Some(0));

        let encoded = serde_json::to_value(&decoded).unwrap();
        assert_eq!(encoded["num_episodes"], 0);
    }
}
