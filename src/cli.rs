use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use crate::display;
use crate::error::{Error, Result};
use crate::mal::{self, MalClient};
use crate::mcp::McpServer;

#[derive(Parser)]
#[command(name = "zutto")]
#[command(version, about = "Browse MyAnimeList from the terminal or serve it to agents over MCP", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// MyAnimeList client id (defaults to the config file, then MAL_CLIENT_ID)
    #[arg(long, global = true)]
    pub client_id: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search, rank and inspect anime
    Anime {
        #[command(subcommand)]
        command: AnimeCommand,
    },

    /// Search for anime
    Search {
        #[command(subcommand)]
        command: SearchCommand,
    },

    /// Get details for anime
    Detail {
        #[command(subcommand)]
        command: DetailCommand,
    },

    /// Start the MCP server on stdio
    Mcp,
}

#[derive(Subcommand)]
pub enum AnimeCommand {
    /// Search for anime by title
    Search(SearchArgs),
    /// Get anime rankings
    Ranking(RankingArgs),
    /// Get detailed information about an anime
    Detail(DetailArgs),
}

#[derive(Subcommand)]
pub enum SearchCommand {
    /// Search for anime by title
    Anime(SearchArgs),
}

#[derive(Subcommand)]
pub enum DetailCommand {
    /// Get detailed information about an anime
    Anime(DetailArgs),
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Maximum number of results to return (1-50)
    #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
    pub limit: i64,
}

#[derive(Args)]
pub struct RankingArgs {
    /// Type of ranking (all, tv, movie, ova, ona, special, bypopularity, favorite)
    #[arg(long = "type", default_value = "all")]
    pub ranking_type: String,

    /// Maximum number of results to return (1-100)
    #[arg(short, long, default_value_t = 50, allow_negative_numbers = true)]
    pub limit: i64,

    /// Offset for pagination
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub offset: i64,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct DetailArgs {
    /// Anime ID
    #[arg(short, long, allow_negative_numbers = true)]
    pub id: Option<i64>,

    /// Anime name (searches and uses the first result)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Run a one-shot command against the MAL API.
pub async fn run(command: Commands, client: MalClient) -> Result<()> {
    match command {
        Commands::Anime { command } => match command {
            AnimeCommand::Search(args) => search(&client, args).await,
            AnimeCommand::Ranking(args) => ranking(&client, args).await,
            AnimeCommand::Detail(args) => detail(&client, args).await,
        },
        Commands::Search {
            command: SearchCommand::Anime(args),
        } => search(&client, args).await,
        Commands::Detail {
            command: DetailCommand::Anime(args),
        } => detail(&client, args).await,
        Commands::Mcp => {
            info!("Starting MCP server on stdio");
            let mut server = McpServer::new(client);
            let result = server.run_stdio().await;
            debug!(state = ?server.state(), "MCP server exited");
            result
        }
    }
}

async fn search(client: &MalClient, args: SearchArgs) -> Result<()> {
    let limit = mal::validate_search_limit(args.limit)?;
    let query = args.query.join(" ");
    mal::validate_query(&query)?;

    let results = client.search(&query, limit).await?;
    println!("{}", display::format_search(&results));
    Ok(())
}

async fn ranking(client: &MalClient, args: RankingArgs) -> Result<()> {
    let ranking_type = mal::parse_ranking_type(&args.ranking_type)?;
    let limit = mal::validate_ranking_limit(args.limit)?;
    let offset = args.offset.clamp(0, u32::MAX as i64) as u32;

    let entries = client.rankings(ranking_type, limit, offset).await?;
    println!("{}", display::format_rankings(&entries, ranking_type));
    Ok(())
}

async fn detail(client: &MalClient, args: DetailArgs) -> Result<()> {
    let id = match (args.id, args.name) {
        (Some(id), _) => mal::validate_anime_id(id)?,
        (None, Some(name)) => {
            mal::validate_query(&name)?;
            println!("Searching for anime: {}", name);

            let results = client.search(&name, 1).await?;
            let first = results
                .entries
                .into_iter()
                .next()
                .ok_or(Error::NotFound(name))?;
            println!("Found: {} (ID: {})\n", first.title, first.id);
            first.id
        }
        (None, None) => return Err(Error::invalid("either --id or --name must be provided")),
    };

    let details = client.details(id).await?;
    println!("{}", display::format_details(&details));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mal::Transport;
    use crate::mal::testing::MockTransport;

    fn client(transport: &Arc<MockTransport>) -> MalClient {
        MalClient::new(
            Some(transport.clone() as Arc<dyn Transport>),
            Some("test-id".to_string()),
        )
        .unwrap()
    }

    fn search_args(query: &str, limit: i64) -> SearchArgs {
        SearchArgs {
            query: vec![query.to_string()],
            limit,
        }
    }

    fn ranking_args(limit: i64, offset: i64) -> RankingArgs {
        RankingArgs {
            ranking_type: "all".to_string(),
            limit,
            offset,
        }
    }

    #[test]
    fn test_anime_search_args() {
        let cli = Cli::try_parse_from(["zutto", "anime", "search", "one", "piece", "-l", "20"]).unwrap();
        match cli.command {
            Commands::Anime {
                command: AnimeCommand::Search(args),
            } => {
                assert_eq!(args.query.join(" "), "one piece");
                assert_eq!(args.limit, 20);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_ranking_defaults() {
        let cli = Cli::try_parse_from(["zutto", "anime", "ranking"]).unwrap();
        match cli.command {
            Commands::Anime {
                command: AnimeCommand::Ranking(args),
            } => {
                assert_eq!(args.ranking_type, "all");
                assert_eq!(args.limit, 50);
                assert_eq!(args.offset, 0);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_detail_requires_exactly_one_selector() {
        assert!(Cli::try_parse_from(["zutto", "detail", "anime"]).is_err());
        assert!(Cli::try_parse_from(["zutto", "detail", "anime", "-i", "5114", "-n", "fma"]).is_err());
        assert!(Cli::try_parse_from(["zutto", "detail", "anime", "-i", "5114"]).is_ok());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["zutto", "mcp", "--verbose", "--client-id", "abc"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.client_id.as_deref(), Some("abc"));
        assert!(matches!(cli.command, Commands::Mcp));
    }

    #[tokio::test]
    async fn test_detail_rejects_non_positive_id_without_request() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);

        for id in [0, -3] {
            let args = DetailArgs {
                id: Some(id),
                name: None,
            };
            let result = detail(&client, args).await;
            assert!(matches!(result, Err(Error::InvalidArgument(_))), "id {}", id);
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_detail_by_blank_name_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        let args = DetailArgs {
            id: None,
            name: Some("  ".to_string()),
        };

        let result = detail(&client(&transport), args).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_search_limit_out_of_range_sends_nothing() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);

        for limit in [0, 51] {
            let result = search(&client, search_args("one piece", limit)).await;
            assert!(matches!(result, Err(Error::InvalidArgument(_))), "limit {}", limit);
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_search_joins_query_words() {
        let transport = Arc::new(MockTransport::new().respond(200, r#"{"data": []}"#));
        let args = SearchArgs {
            query: vec!["one".to_string(), "piece".to_string()],
            limit: 50,
        };

        search(&client(&transport), args).await.unwrap();
        let request = transport.last_request();
        assert_eq!(request.query_param("q"), Some("one piece"));
        assert_eq!(request.query_param("limit"), Some("50"));
    }

    #[tokio::test]
    async fn test_ranking_offset_clamped_but_limit_rejected() {
        let transport = Arc::new(MockTransport::new().respond(200, r#"{"data": []}"#));
        let client = client(&transport);

        ranking(&client, ranking_args(10, -5)).await.unwrap();
        let request = transport.last_request();
        assert_eq!(request.query_param("offset"), Some("0"));
        assert_eq!(request.query_param("limit"), Some("10"));

        let result = ranking(&client, ranking_args(101, 0)).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(transport.requests().len(), 1);
    }
}
