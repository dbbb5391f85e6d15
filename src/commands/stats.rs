use anyhow::Result;
use colored::*;

use devmemory::service::MemoryService;

pub fn run(service: &MemoryService, json: bool) -> Result<()> {
    let stats = service.dashboard_stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "DevMemory Stats".bold());
    println!();
    println!("{}", "Content".bold());
    println!("  Projects:  {}", stats.project_count.to_string().cyan());
    println!("  Notes:     {}", stats.memory_count);
    println!("  Sessions:  {}", stats.session_count);
    println!("  Files:     {}", stats.file_count);
    println!();

    println!("{}", "Usage".bold());
    println!(
        "  Queries:       {} ({} in the last 24h)",
        stats.total_queries.to_string().cyan(),
        stats.queries_last_24h
    );
    println!(
        "  Tokens saved:  {} ({} in the last 24h)",
        format_tokens(stats.total_tokens_saved).green(),
        format_tokens(stats.tokens_last_24h)
    );
    println!();

    if !stats.projects.is_empty() {
        println!("{}", "Projects".bold());
        for p in &stats.projects {
            println!(
                "  {} {}: {} notes, {} sessions, {} files, {} queries, {} tokens",
                "→".dimmed(),
                p.project.name.cyan(),
                p.memory_count,
                p.session_count,
                p.file_count,
                p.query_count,
                format_tokens(p.tokens_saved)
            );
        }
        println!();
    }

    let status = if stats.embedding_status.starts_with("disabled")
        || stats.embedding_status.starts_with("degraded")
    {
        stats.embedding_status.yellow()
    } else {
        stats.embedding_status.normal()
    };
    println!("Embeddings: {}", status);

    Ok(())
}

fn format_tokens(tokens: i64) -> String {
    match tokens {
        t if t >= 1_000_000 => format!("{:.1}M", t as f64 / 1_000_000.0),
        t if t >= 1_000 => format!("{:.1}k", t as f64 / 1_000.0),
        t => t.to_string(),
    }
}
