use anyhow::Result;
use colored::*;

use devmemory::core::model::Scored;
use devmemory::service::MemoryService;

pub async fn run(
    service: &MemoryService,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let response = service.search_all(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", "Search Results".bold());
    println!(
        "Query: \"{}\" ({}, {} matches)",
        query.cyan(),
        response.search_type.to_string().dimmed(),
        response.results.total()
    );
    println!();

    if response.results.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    print_section(
        "Notes",
        &response.results.memories,
        |m| format!("{} {}/{}", m.project_id.dimmed(), m.topic, m.key.green()),
        |m| m.value.as_str(),
    );
    print_section(
        "Sessions",
        &response.results.sessions,
        |s| {
            format!(
                "{} #{} {}",
                s.project_id.dimmed(),
                s.session_num,
                s.title.green()
            )
        },
        |s| s.summary.as_str(),
    );
    print_section(
        "Files",
        &response.results.files,
        |f| format!("{} {}", f.project_id.dimmed(), f.file_path.green()),
        |f| f.summary.as_str(),
    );

    Ok(())
}

fn print_section<T>(
    title: &str,
    results: &[Scored<T>],
    heading: impl Fn(&T) -> String,
    detail: impl Fn(&T) -> &str,
) {
    if results.is_empty() {
        return;
    }

    println!("{} ({})", title.bold(), results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            heading(&result.item),
            format!("[{:.3}]", result.score).dimmed()
        );
        let detail = detail(&result.item);
        if !detail.is_empty() {
            println!("     {}", truncate(&detail.replace('\n', " "), 100).dimmed());
        }
    }
    println!();
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
