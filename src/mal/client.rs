use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::transport::{ApiRequest, HttpTransport, Transport};
use super::{AnimeDetails, AnimeSummary, MAL_API_BASE, RankingEntry, RankingType, SearchResult};
use crate::error::{Error, Result};

pub const CLIENT_ID_ENV: &str = "MAL_CLIENT_ID";
pub const CLIENT_ID_HEADER: &str = "X-MAL-CLIENT-ID";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const LIST_FIELDS: &str = "alternative_titles";
const DETAIL_FIELDS: &str =
    "title,synopsis,num_episodes,status,start_date,end_date,mean,rank,popularity";

/// MyAnimeList v2 API client.
///
/// Cheap to clone; holds no mutable state, so one instance can serve
/// concurrent callers.
#[derive(Clone)]
pub struct MalClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    client_id: String,
}

impl MalClient {
    /// Build a client. Without a transport a reqwest one with a 30s deadline
    /// is created; without a client id `MAL_CLIENT_ID` is read. A missing id
    /// is not an error here, MAL rejects the first request instead.
    pub fn new(transport: Option<Arc<dyn Transport>>, client_id: Option<String>) -> Result<Self> {
        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(DEFAULT_TIMEOUT)?),
        };

        let client_id = client_id
            .filter(|id| !id.is_empty())
            .or_else(|| std::env::var(CLIENT_ID_ENV).ok())
            .unwrap_or_default();

        if client_id.is_empty() {
            warn!("No MAL client id configured, requests will be rejected");
        }

        Ok(Self {
            transport,
            base_url: MAL_API_BASE.to_string(),
            client_id,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search anime by title. `limit` is forwarded as given; callers bound it.
    pub async fn search(&self, query: &str, limit: u32) -> Result<SearchResult> {
        let resp: MalListResponse<MalNode> = self
            .get(
                "search",
                "anime",
                vec![
                    ("q", query.to_string()),
                    ("limit", limit.to_string()),
                    ("fields", LIST_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(SearchResult {
            entries: resp
                .data
                .into_iter()
                .map(|n| AnimeSummary {
                    id: n.node.id,
                    english_title: n.node.english_title(),
                    title: n.node.title,
                })
                .collect(),
            next_page: resp.paging.next.filter(|next| !next.is_empty()),
        })
    }

    pub async fn details(&self, id: u64) -> Result<AnimeDetails> {
        if id == 0 {
            return Err(Error::invalid("anime id must be a positive integer, got 0"));
        }

        self.get(
            "details",
            &format!("anime/{}", id),
            vec![("fields", DETAIL_FIELDS.to_string())],
        )
        .await
    }

    pub async fn rankings(
        &self,
        ranking_type: RankingType,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RankingEntry>> {
        let resp: MalListResponse<MalRankedNode> = self
            .get(
                "rankings",
                "anime/ranking",
                vec![
                    ("ranking_type", ranking_type.as_str().to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                    ("fields", LIST_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(resp
            .data
            .into_iter()
            .map(|n| RankingEntry {
                rank: n.ranking.rank,
                id: n.node.id,
                english_title: n.node.english_title(),
                title: n.node.title,
            })
            .collect())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> Result<T> {
        let request = ApiRequest {
            url: format!("{}{}", self.base_url, path),
            query,
            headers: vec![(CLIENT_ID_HEADER, self.client_id.clone())],
        };
        debug!(operation, url = %request.url, query = ?request.query, "MAL request");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| Error::Transport { operation, source })?;

        if !response.is_success() {
            debug!(operation, status = response.status, "MAL request failed");
            return Err(Error::Upstream {
                operation,
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(|source| Error::Decode { operation, source })
    }
}

impl fmt::Debug for MalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MalClient")
            .field("base_url", &self.base_url)
            .field("client_id", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct MalListResponse<N> {
    data: Vec<N>,
    #[serde(default)]
    paging: MalPaging,
}

#[derive(Deserialize, Default)]
struct MalPaging {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct MalNode {
    node: MalAnimeNode,
}

#[derive(Deserialize)]
struct MalRankedNode {
    node: MalAnimeNode,
    ranking: MalRanking,
}

#[derive(Deserialize)]
struct MalAnimeNode {
    id: u64,
    title: String,
    #[serde(default)]
    alternative_titles: Option<MalAlternativeTitles>,
}

impl MalAnimeNode {
    fn english_title(&self) -> Option<String> {
        self.alternative_titles
            .as_ref()
            .and_then(|t| t.en.clone())
            .filter(|en| !en.is_empty())
    }
}

#[derive(Deserialize)]
struct MalAlternativeTitles {
    #[serde(default)]
    en: Option<String>,
}

#[derive(Deserialize)]
struct MalRanking {
    #[serde(deserialize_with = "super::position")]
    rank: u32,
}
