//! Command-line interface for docshell
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading with CLI overrides
//! - Subcommand dispatch: offline parsing and completion, live execution,
//!   field sampling and database browsing, configuration inspection

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use crate::completion::{CollectionCatalog, CompletionEngine};
use crate::config::{Config, LogLevel, OutputFormat};
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::executor::{DocumentStore, MongoStore, QueryExecutor};
use crate::formatter::Formatter;
use crate::parser::QueryParser;
use crate::schema::Schema;

/// Safe query shell for MongoDB-style document collections
#[derive(Parser, Debug)]
#[command(
    name = "docshell",
    version,
    about = "Parse, complete and run db.<collection>.<op>(...) queries",
    long_about = "Parses MongoDB shell-style query chains with a closed literal grammar,
offers context-aware completion, and runs allow-listed operations against MongoDB.
No query text is ever evaluated as code."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// MongoDB connection URI
    #[arg(long, value_name = "URI", global = true)]
    pub uri: Option<String>,

    /// Database name to use
    #[arg(long, value_name = "NAME", global = true)]
    pub database: Option<String>,

    /// Output format (json, json-pretty, table)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for docshell
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a query and print the call chain
    Parse {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Print completion suggestions for a query
    Complete {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Cursor byte offset (defaults to the end of the query)
        #[arg(long, value_name = "OFFSET")]
        cursor: Option<usize>,

        /// Collection names offered after `db.`
        #[arg(long, value_name = "NAMES", value_delimiter = ',')]
        collections: Vec<String>,

        /// Field paths of the target collection
        #[arg(long, value_name = "PATHS", value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Run a query against MongoDB
    Run {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Sample a collection and print its field paths
    Fields {
        #[arg(value_name = "COLLECTION")]
        collection: String,

        /// Number of documents to sample
        #[arg(long, value_name = "N")]
        sample: Option<usize>,
    },

    /// List the collections of the database with document counts and sizes
    Collections,

    /// List the databases on the server
    Databases,

    /// Show or validate configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    args: CliArgs,
    config: Config,
}

impl CliInterface {
    /// Parse process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and environment, then apply CLI flags
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args)?;
        Ok(config)
    }

    fn apply_args_to_config(config: &mut Config, args: &CliArgs) -> Result<()> {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if let Some(database) = &args.database {
            config.connection.database = database.clone();
        }
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }

        if let Some(format) = &args.format {
            config.display.format = format.parse::<OutputFormat>()?;
        }
        if args.no_color {
            config.display.color_output = false;
        }

        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Formatter for the effective display settings
    pub fn formatter(&self) -> Formatter {
        Formatter::from_config(&self.config.display)
    }

    /// Run the selected subcommand and print its output
    pub async fn handle_command(&self) -> Result<()> {
        let output = match &self.args.command {
            Commands::Parse { query } => self.parse_query(query)?,
            Commands::Complete {
                query,
                cursor,
                collections,
                fields,
            } => self.complete_query(query, *cursor, collections, fields)?,
            Commands::Run { query } => self.run_query(query).await?,
            Commands::Fields { collection, sample } => {
                self.sample_fields(collection, *sample).await?
            }
            Commands::Collections => self.list_collections().await?,
            Commands::Databases => self.list_databases().await?,
            Commands::Config { show, validate } => self.config_report(*show, *validate)?,
        };

        println!("{}", output);
        Ok(())
    }

    fn parse_query(&self, query: &str) -> Result<String> {
        let chain = QueryParser::parse(query)?;
        self.formatter().format_chain(&chain)
    }

    /// Completion without a store: the catalog comes from the flags or the
    /// config, the schema from `--fields`.
    fn complete_query(
        &self,
        query: &str,
        cursor: Option<usize>,
        collections: &[String],
        fields: &[String],
    ) -> Result<String> {
        let names = if collections.is_empty() {
            &self.config.completion.collections
        } else {
            collections
        };
        let engine = CompletionEngine::new(CollectionCatalog::new(names.iter().cloned()))
            .with_max_suggestions(self.config.completion.max_suggestions);

        let schema = (!fields.is_empty())
            .then(|| Schema::new(target_collection(query), fields.to_vec()));

        let cursor = cursor.unwrap_or(query.len());
        let suggestions = engine.complete(query, cursor, schema.as_ref());
        self.formatter().format_suggestions(&suggestions)
    }

    async fn run_query(&self, query: &str) -> Result<String> {
        // Reject bad query text before opening a connection
        let chain = QueryParser::parse(query)?;

        let result = self
            .with_store(|store| async move {
                QueryExecutor::new(Arc::new(store))
                    .execute_chain(&chain, query)
                    .await
            })
            .await?;
        self.formatter().format(&result)
    }

    async fn sample_fields(&self, collection: &str, sample: Option<usize>) -> Result<String> {
        let sample_size = sample.unwrap_or(self.config.schema.sample_size);

        let schema = self
            .with_store(|store| async move {
                QueryExecutor::new(Arc::new(store))
                    .infer_schema(collection, sample_size)
                    .await
            })
            .await?;
        self.formatter().format_schema(&schema)
    }

    async fn list_collections(&self) -> Result<String> {
        let collections = self
            .with_store(|store| async move { store.collection_stats().await })
            .await?;
        self.formatter().format_collections(&collections)
    }

    async fn list_databases(&self) -> Result<String> {
        let databases = self
            .with_store(|store| async move { store.list_databases().await })
            .await?;
        self.formatter().format_databases(&databases)
    }

    /// Connect, run `work` against the configured database, then disconnect
    async fn with_store<T, F, Fut>(&self, work: F) -> Result<T>
    where
        F: FnOnce(MongoStore) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.config.validate()?;
        let mut manager = ConnectionManager::new(self.config.connection.clone());
        manager.connect().await?;

        let outcome = match manager.store() {
            Ok(store) => work(store).await,
            Err(e) => Err(e),
        };
        settle(outcome, manager.disconnect().await)
    }

    /// Report for the config subcommand
    ///
    /// Validation failures are returned as errors.
    fn config_report(&self, show: bool, validate: bool) -> Result<String> {
        let mut lines = Vec::new();
        let path = self.get_config_path();

        if validate {
            self.config.validate()?;
            lines.push(format!("Configuration is valid ({})", path.display()));
        }

        if show || !validate {
            lines.push(format!("# Configuration file: {}", path.display()));
            lines.push(self.config.to_toml()?);
        }

        Ok(lines.join("\n"))
    }

    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }
}

/// The outcome of a connected command once the connection is closed
///
/// A failed disconnect is logged; it never replaces the command's own result.
fn settle<T>(outcome: Result<T>, disconnected: Result<()>) -> Result<T> {
    if let Err(e) = disconnected {
        warn!("Failed to disconnect cleanly: {}", e);
    }
    outcome
}

/// Collection named by `db.<name>` at the start of the query, or empty
fn target_collection(query: &str) -> String {
    let name = QueryParser::target_collection(query).unwrap_or_default();
    debug!("Completion target collection: '{}'", name);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ConnectionError, DocshellError, QueryError, QueryErrorKind};

    fn interface(argv: &[&str]) -> CliInterface {
        let args = CliArgs::try_parse_from(argv).unwrap();
        let mut config = Config::default();
        CliInterface::apply_args_to_config(&mut config, &args).unwrap();
        CliInterface { args, config }
    }

    #[test]
    fn test_parse_subcommand() {
        let args = CliArgs::try_parse_from(["docshell", "parse", "db.users.find()"]).unwrap();
        match args.command {
            Commands::Parse { query } => assert_eq!(query, "db.users.find()"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_complete_subcommand_lists() {
        let args = CliArgs::try_parse_from([
            "docshell",
            "complete",
            "db.us",
            "--cursor",
            "5",
            "--collections",
            "users,orders",
            "--fields",
            "name,address.city",
        ])
        .unwrap();
        match args.command {
            Commands::Complete {
                cursor,
                collections,
                fields,
                ..
            } => {
                assert_eq!(cursor, Some(5));
                assert_eq!(collections, vec!["users", "orders"]);
                assert_eq!(fields, vec!["name", "address.city"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["docshell"]).is_err());
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = interface(&[
            "docshell",
            "--uri",
            "mongodb://db.internal:27017",
            "--database",
            "shop",
            "--format",
            "table",
            "--no-color",
            "-v",
            "run",
            "db.users.find()",
        ]);
        assert_eq!(cli.config().connection.uri, "mongodb://db.internal:27017");
        assert_eq!(cli.config().connection.database, "shop");
        assert_eq!(cli.config().display.format, OutputFormat::Table);
        assert!(!cli.config().display.color_output);
        assert_eq!(cli.config().logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_format_is_rejected() {
        let args =
            CliArgs::try_parse_from(["docshell", "--format", "yaml", "parse", "db.a.find()"])
                .unwrap();
        let mut config = Config::default();
        assert!(CliInterface::apply_args_to_config(&mut config, &args).is_err());
    }

    #[test]
    fn test_parse_query_output() {
        let cli = interface(&["docshell", "--format", "json", "parse", "db.users.find()"]);
        let output = cli.parse_query("db.users.find({ a: 1 }).limit(2)").unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["collection"], "users");
        assert_eq!(value["calls"][1]["name"], "limit");

        assert!(cli.parse_query("users.find()").is_err());
    }

    #[test]
    fn test_complete_query_output() {
        let cli = interface(&["docshell", "--format", "json", "complete", "db.us"]);
        let output = cli
            .complete_query("db.us", None, &["users".into(), "orders".into()], &[])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["label"], "users");
        assert_eq!(value[0]["category"], "Collection");
        assert_eq!(value[0]["replaceRange"]["start"], 3);
        assert_eq!(value[0]["replaceRange"]["end"], 5);
    }

    #[test]
    fn test_complete_query_with_fields() {
        let cli = interface(&["docshell", "--format", "json", "complete", "x"]);
        let query = "db.users.find({ \"na";
        let output = cli
            .complete_query(query, None, &[], &["name".into(), "age".into()])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["label"], "name");
        assert_eq!(value[0]["detail"], "Field in users");
    }

    #[test]
    fn test_target_collection() {
        assert_eq!(target_collection("db.users.find("), "users");
        assert_eq!(target_collection("  db.order_items"), "order_items");
        assert_eq!(target_collection("find()"), "");
        assert_eq!(target_collection("db.my-coll.find("), "my");
    }

    #[test]
    fn test_browse_subcommands() {
        let args =
            CliArgs::try_parse_from(["docshell", "--database", "shop", "collections"]).unwrap();
        assert!(matches!(args.command, Commands::Collections));
        assert_eq!(args.database.as_deref(), Some("shop"));

        let args = CliArgs::try_parse_from(["docshell", "databases"]).unwrap();
        assert!(matches!(args.command, Commands::Databases));
        assert!(CliArgs::try_parse_from(["docshell", "collections", "extra"]).is_err());
    }

    #[test]
    fn test_settle_keeps_command_error() {
        let failed: Result<u32> = Err(QueryError::store("E11000 duplicate key").into());
        let err = settle(failed, Err(ConnectionError::NotConnected.into())).unwrap_err();
        assert_eq!(err.query_kind(), Some(QueryErrorKind::StoreError));
        assert!(err.to_string().contains("E11000"));

        let done = settle(Ok(7), Err(ConnectionError::NotConnected.into())).unwrap();
        assert_eq!(done, 7);
        assert_eq!(settle(Ok(1), Ok(())).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let cli = interface(&["docshell", "--uri", "http://x", "collections"]);
        let err = cli.list_collections().await.unwrap_err();
        assert!(matches!(
            err,
            DocshellError::Config(ConfigError::InvalidValue { ref field, .. })
                if field == "connection.uri"
        ));
    }

    #[test]
    fn test_config_report() {
        let cli = interface(&["docshell", "config", "--show", "--validate"]);
        let report = cli.config_report(true, true).unwrap();
        assert!(report.starts_with("Configuration is valid"));
        assert!(report.contains("[connection]"));

        let bad = interface(&["docshell", "--uri", "http://x", "config", "--validate"]);
        assert!(bad.config_report(false, true).is_err());
    }
}
