//! Tool registry: each tool is a name, an input schema and a handler that
//! validates its arguments and delegates to exactly one [`MalClient`] call.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::mal::{self, MalClient, RankingType};

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;
pub type ToolHandler = for<'a> fn(&'a MalClient, Value) -> ToolFuture<'a>;

pub const DEFAULT_LIMIT: i64 = 10;

pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

impl Tool {
    /// Entry advertised by `tools/list`.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
            "annotations": {
                "readOnlyHint": true,
                "openWorldHint": true,
            }
        })
    }
}

/// The fixed tool set served over MCP.
pub fn build_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "get_anime_ranking",
            description: "Get anime rankings from MyAnimeList. Returns the top-ranked anime based on the specified ranking type.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ranking_type": {
                        "type": "string",
                        "description": "Type of ranking (all, tv, movie, ova, ona, special, bypopularity, favorite)",
                        "enum": RankingType::ALL.map(|t| t.as_str()),
                        "default": "all"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results to return (1-100)",
                        "minimum": 1,
                        "maximum": mal::RANKING_LIMIT_MAX,
                        "default": DEFAULT_LIMIT
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Offset for pagination",
                        "default": 0
                    }
                }
            }),
            handler: get_anime_ranking,
        },
        Tool {
            name: "get_anime_details",
            description: "Get detailed information about an anime by its MyAnimeList ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "ID of the anime to get details for",
                        "minimum": 1
                    }
                },
                "required": ["id"]
            }),
            handler: get_anime_details,
        },
        Tool {
            name: "search_anime",
            description: "Search for anime on MyAnimeList by query string. Use this tool to find anime ids",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for the anime"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results to return (1-50)",
                        "minimum": 1,
                        "maximum": mal::SEARCH_LIMIT_MAX,
                        "default": DEFAULT_LIMIT
                    }
                },
                "required": ["query"]
            }),
            handler: search_anime,
        },
    ]
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RankingInput {
    #[serde(alias = "rankingType")]
    pub ranking_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingParams {
    pub ranking_type: RankingType,
    pub limit: u32,
    pub offset: u32,
}

impl RankingInput {
    /// Apply defaults and validate. A negative offset is clamped to 0 while an
    /// out of range limit is rejected.
    pub fn normalize(self) -> Result<RankingParams> {
        let limit = match self.limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(limit) => limit,
        };
        let limit = mal::validate_ranking_limit(limit)?;

        let offset = self.offset.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;

        let ranking_type = match self.ranking_type.as_deref() {
            None | Some("") => RankingType::All,
            Some(raw) => mal::parse_ranking_type(raw)?,
        };

        Ok(RankingParams {
            ranking_type,
            limit,
            offset,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DetailsInput {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchInput {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub limit: u32,
}

impl SearchInput {
    pub fn normalize(self) -> Result<SearchParams> {
        let limit = match self.limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(limit) => limit,
        };
        let limit = mal::validate_search_limit(limit)?;
        mal::validate_query(&self.query)?;

        Ok(SearchParams {
            query: self.query,
            limit,
        })
    }
}

fn parse_input<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| Error::invalid(format!("invalid arguments for {}: {}", tool, e)))
}

fn get_anime_ranking(client: &MalClient, args: Value) -> ToolFuture<'_> {
    Box::pin(async move {
        let params = parse_input::<RankingInput>("get_anime_ranking", args)?.normalize()?;
        debug!(?params, "get_anime_ranking");

        let rankings = client
            .rankings(params.ranking_type, params.limit, params.offset)
            .await?;
        Ok(json!({
            "ranking_type": params.ranking_type.as_str(),
            "rankings": rankings,
        }))
    })
}

fn get_anime_details(client: &MalClient, args: Value) -> ToolFuture<'_> {
    Box::pin(async move {
        let input: DetailsInput = parse_input("get_anime_details", args)?;
        let id = mal::validate_anime_id(input.id)?;
        debug!(id, "get_anime_details");

        let details = client.details(id).await?;
        Ok(serde_json::to_value(details)?)
    })
}

fn search_anime(client: &MalClient, args: Value) -> ToolFuture<'_> {
    Box::pin(async move {
        let params = parse_input::<SearchInput>("search_anime", args)?.normalize()?;
        debug!(query = %params.query, limit = params.limit, "search_anime");

        let results = client.search(&params.query, params.limit).await?;
        Ok(serde_json::to_value(results)?)
    })
}
