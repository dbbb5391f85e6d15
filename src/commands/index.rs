//! Index command - load a project tree into memory
//!
//! Markdown docs become notes, transcripts become numbered sessions and
//! source files become file signatures.

use anyhow::{Context, Result};
use colored::Colorize;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use devmemory::service::{FileInput, MemoryService, SessionInput};

/// Transcripts loaded from disk are numbered from here.
const FIRST_SESSION_NUM: i64 = 100;

const SUMMARY_MAX_CHARS: usize = 500;
const SIGNATURE_SUMMARY_MAX_CHARS: usize = 1000;

const SOURCE_EXTENSIONS: &[&str] = &["rs", "go", "py", "ts"];
const SKIP_DIRS: &[&str] = &[".git", "vendor", "target", "node_modules"];

/// (directory relative to root, note topic)
const NOTE_DIRS: &[(&str, &str)] = &[("spec", "spec"), ("docs", "docs"), ("docs/adr", "adr")];

/// (file relative to root, note topic, note key)
const NOTE_FILES: &[(&str, &str, &str)] = &[
    ("README.md", "project", "readme"),
    ("CLAUDE.md", "project", "claude-md"),
    ("transcripts/INDEX.md", "project", "transcript-index"),
];

const TRANSCRIPT_DIRS: &[&str] = &["transcripts", "transcripts/phases"];

lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"^(?://[/!]?|#)\s+(.+)$").unwrap();
    static ref SIGNATURE_RE: Regex = Regex::new(
        r"^(?:export\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:fn|struct|enum|trait|impl|type|func|def|class|interface|function)\b"
    )
    .unwrap();
    static ref SYMBOL_RE: Regex = Regex::new(
        r"\b(fn|struct|enum|trait|type|func|def|class|interface|function)\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)"
    )
    .unwrap();
}

#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    pub memories: usize,
    pub sessions: usize,
    pub files: usize,
    pub failed: usize,
}

/// Run index command
pub async fn run(
    service: &MemoryService,
    project_id: &str,
    name: Option<&str>,
    root: &Path,
    json: bool,
) -> Result<()> {
    if !json {
        println!(
            "{} Indexing {} into project {}",
            "→".dimmed(),
            root.display(),
            project_id.cyan()
        );
    }

    let report = index_project(service, project_id, name, root).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!(
            "{} {} notes, {} sessions, {} files",
            "✓".green().bold(),
            report.memories.to_string().cyan(),
            report.sessions.to_string().cyan(),
            report.files.to_string().cyan()
        );
        if report.failed > 0 {
            println!("  {} {} items failed", "✗".red(), report.failed);
        }
        if !service.embedding_status().is_enabled() {
            println!(
                "  {} Embeddings disabled; run {} once EMBEDDING_URL is set",
                "→".dimmed(),
                "devmemory reembed".cyan()
            );
        }
    }

    Ok(())
}

pub async fn index_project(
    service: &MemoryService,
    project_id: &str,
    name: Option<&str>,
    root: &Path,
) -> Result<IndexReport> {
    if !root.is_dir() {
        anyhow::bail!("not a directory: {}", root.display());
    }
    let root_path = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    service
        .register_project(
            project_id,
            name.unwrap_or(project_id),
            Some(&root_path.to_string_lossy()),
            None,
        )
        .with_context(|| format!("Failed to register project {project_id}"))?;

    let mut report = IndexReport::default();

    for (dir, topic) in NOTE_DIRS {
        for path in markdown_files(&root.join(dir)) {
            let key = file_stem(&path);
            load_note(service, project_id, &path, topic, &key, &mut report).await;
        }
    }
    for (file, topic, key) in NOTE_FILES {
        let path = root.join(file);
        if path.is_file() {
            load_note(service, project_id, &path, topic, key, &mut report).await;
        }
    }

    let mut session_num = FIRST_SESSION_NUM;
    for dir in TRANSCRIPT_DIRS {
        for path in markdown_files(&root.join(dir)) {
            if path.file_name().is_some_and(|n| n == "INDEX.md") {
                continue;
            }
            load_transcript(service, project_id, &path, session_num, &mut report).await;
            session_num += 1;
        }
    }

    for path in source_files(root) {
        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        load_source(service, project_id, &path, &rel, &mut report).await;
    }

    tracing::info!(
        project = project_id,
        memories = report.memories,
        sessions = report.sessions,
        files = report.files,
        failed = report.failed,
        "index complete"
    );
    Ok(report)
}

async fn load_note(
    service: &MemoryService,
    project_id: &str,
    path: &Path,
    topic: &str,
    key: &str,
    report: &mut IndexReport,
) {
    let Some(content) = read_non_empty(path) else {
        return;
    };
    match service
        .set_memory(project_id, topic, key, Some(&content), Some("devmemory index"))
        .await
    {
        Ok(_) => report.memories += 1,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load note");
            report.failed += 1;
        }
    }
}

async fn load_transcript(
    service: &MemoryService,
    project_id: &str,
    path: &Path,
    session_num: i64,
    report: &mut IndexReport,
) {
    let Some(content) = read_non_empty(path) else {
        return;
    };
    let input = SessionInput {
        summary: Some(extract_summary(&content)),
        content: Some(content),
        metadata: Some(
            json!({ "source": path.to_string_lossy() })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        ),
    };
    match service
        .create_session(project_id, session_num, &file_stem(path), input)
        .await
    {
        Ok(_) => report.sessions += 1,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load transcript");
            report.failed += 1;
        }
    }
}

async fn load_source(
    service: &MemoryService,
    project_id: &str,
    path: &Path,
    rel_path: &str,
    report: &mut IndexReport,
) {
    let Some(content) = read_non_empty(path) else {
        return;
    };
    let input = FileInput {
        file_type: None,
        symbols: extract_symbols(&content),
        summary: Some(extract_signature_summary(&content)),
    };
    match service.index_file(project_id, rel_path, input).await {
        Ok(_) => report.files += 1,
        Err(e) => {
            tracing::warn!(path = rel_path, error = %e, "failed to index file");
            report.failed += 1;
        }
    }
}

fn read_non_empty(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => Some(content),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file");
            None
        }
    }
}

/// `*.md` directly inside `dir`, sorted by name.
fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    files
}

fn source_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.depth() > 0
                && e.file_name()
                    .to_str()
                    .is_some_and(|n| SKIP_DIRS.contains(&n)))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();
    files
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// First paragraph of a markdown document, headers skipped.
fn extract_summary(content: &str) -> String {
    let mut lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        if trimmed.starts_with('#') {
            continue;
        }
        lines.push(trimmed);
    }
    truncate_chars(&lines.join(" "), SUMMARY_MAX_CHARS)
}

/// Comment lines and item signatures, joined into one searchable line.
fn extract_signature_summary(content: &str) -> String {
    let mut parts = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(caps) = COMMENT_RE.captures(trimmed) {
            parts.push(caps[1].trim().to_string());
        } else if SIGNATURE_RE.is_match(trimmed) {
            let signature = trimmed
                .split('{')
                .next()
                .unwrap_or(trimmed)
                .trim_end_matches(':')
                .trim();
            parts.push(signature.to_string());
        }
    }
    truncate_chars(&parts.join(". "), SIGNATURE_SUMMARY_MAX_CHARS)
}

fn extract_symbols(content: &str) -> Vec<Value> {
    let mut symbols = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if !SIGNATURE_RE.is_match(trimmed) {
            continue;
        }
        if let Some(caps) = SYMBOL_RE.captures(trimmed) {
            symbols.push(json!({ "kind": &caps[1], "name": &caps[2] }));
        }
    }
    symbols
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
