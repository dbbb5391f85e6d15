use anyhow::{Context, Result};
use colored::*;

use devmemory::service::MemoryService;

pub async fn run(service: &MemoryService, project_id: &str, json: bool) -> Result<()> {
    let status = service.embedding_status();
    if !status.is_enabled() {
        anyhow::bail!("embeddings are {status}; set EMBEDDING_URL first");
    }

    let report = service
        .reembed(project_id)
        .await
        .with_context(|| format!("Failed to re-embed project {project_id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} Embedded {} notes, {} sessions, {} files",
        "✓".green().bold(),
        report.memories.to_string().cyan(),
        report.sessions.to_string().cyan(),
        report.files.to_string().cyan()
    );
    if report.skipped > 0 {
        println!(
            "  {} {} items still without a vector ({})",
            "!".yellow().bold(),
            report.skipped,
            service.embedding_status()
        );
    }

    Ok(())
}
