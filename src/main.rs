//! docshell - query shell for MongoDB-style document collections
//!
//! Parses `db.<collection>.<op>(args)` chains with a closed literal grammar,
//! offers context-aware completion, and runs allow-listed operations.
//!
//! # Usage
//!
//! ```bash
//! # Offline
//! docshell parse 'db.users.find({ age: { $gt: 18 } }).limit(5)'
//! docshell complete 'db.users.find({ $' --collections users,orders
//!
//! # Against a server
//! docshell --uri mongodb://localhost:27017 --database shop run 'db.orders.countDocuments({})'
//! docshell fields orders --sample 10
//! docshell --database shop --format table collections
//! ```

use docshell::cli::CliInterface;
use docshell::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    let cli = match CliInterface::new() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cli).await {
        eprintln!("{}", cli.formatter().format_error(&e));
        std::process::exit(1);
    }
}

/// Main application logic: logging first, then the subcommand
async fn run(cli: &CliInterface) -> Result<()> {
    initialize_logging(cli);
    cli.handle_command().await
}

/// Initialize logging system based on the effective log level
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
