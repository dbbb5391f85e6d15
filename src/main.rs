mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use devmemory::config::Config;
use devmemory::logging;

#[derive(Parser)]
#[command(name = "devmemory")]
#[command(about = "Persistent project memory for coding agents, served over MCP", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search notes, sessions and files across all projects
    Search {
        query: String,
        #[arg(long, short, help = "Results per content kind (default: 10)")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show the usage dashboard
    Stats {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Load docs, transcripts and source signatures from a project tree
    Index {
        #[arg(long, short, help = "Project identifier")]
        project: String,
        #[arg(long, help = "Project name (defaults to the identifier)")]
        name: Option<String>,
        #[arg(default_value = ".")]
        root: PathBuf,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Compute missing embeddings for a project
    Reembed {
        #[arg(long, short, help = "Project identifier")]
        project: String,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server over stdio
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show MCP client configuration instructions")]
        install: bool,
        #[arg(long, help = "Log a dashboard summary after every recorded operation")]
        watch_stats: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(&cli.config.log_level, cli.config.log_format);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "devmemory starting");

    #[cfg(feature = "mcp")]
    if let Commands::Mcp { install: true, .. } = cli.command {
        print_mcp_install_instructions(&cli.config);
        return Ok(());
    }

    let service = cli.config.build_service()?;

    match cli.command {
        Commands::Search { query, limit, json } => {
            commands::search::run(&service, &query, limit, json).await
        }
        Commands::Stats { json } => commands::stats::run(&service, json),
        Commands::Index {
            project,
            name,
            root,
            json,
        } => commands::index::run(&service, &project, name.as_deref(), &root, json).await,
        Commands::Reembed { project, json } => {
            commands::reembed::run(&service, &project, json).await
        }

        // MCP Server
        #[cfg(feature = "mcp")]
        Commands::Mcp { watch_stats, .. } => {
            devmemory::mcp::run_mcp_server(service, watch_stats).await
        }
    }
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions(config: &Config) {
    use colored::Colorize;

    let db_path = std::fs::canonicalize(&config.db)
        .unwrap_or_else(|_| config.db.clone())
        .to_string_lossy()
        .to_string();

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "devmemory".to_string());

    let embedding_url = config.embedding_url.clone().unwrap_or_default();

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(
        r#"{{
  "mcpServers": {{
    "devmemory": {{
      "command": "{}",
      "args": ["mcp"],
      "env": {{
        "DEVMEMORY_DB": "{}",
        "EMBEDDING_URL": "{}"
      }}
    }}
  }}
}}"#,
        binary_path, db_path, embedding_url
    );
    println!();
    if embedding_url.is_empty() {
        println!(
            "{}",
            "EMBEDDING_URL is empty: search runs in full-text mode only.".dimmed()
        );
        println!();
    }
    println!("{}", "Available tools:".bold());
    println!(
        "  • {} - Register and inspect projects",
        "project_register / project_list / project_status".green()
    );
    println!(
        "  • {} - Project notes by topic/key",
        "memory_set / memory_get / memory_list / memory_search / memory_delete".green()
    );
    println!(
        "  • {} - Numbered session transcripts",
        "session_create / session_get / session_list / session_search / session_delete".green()
    );
    println!(
        "  • {} - Source file signatures",
        "file_index / file_get / file_list / file_search / file_delete".green()
    );
    println!("  • {} - Search every project at once", "search_all".green());
    println!("  • {} - Usage and token savings", "dashboard_stats".green());
    println!("  • {} - Fill in missing embeddings", "reembed".green());
}
