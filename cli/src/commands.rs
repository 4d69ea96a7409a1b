use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use docrag_retrieval::{
    CollectionAdmin, CollectionInfo, CollectionStats, Document, IngestReport, RetrievalConfig,
    RetrievalEngine, SearchResult, SourceRegistry, TextSource,
};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::args::{Cli, Command};

/// Characters of chunk text shown per search result.
const PREVIEW_CHARS: usize = 160;

pub async fn run(cli: Cli, config: RetrievalConfig) -> Result<()> {
    let engine = RetrievalEngine::open(&config)
        .await
        .context("failed to open the collection")?;
    let admin = CollectionAdmin::for_engine(&engine, config.stats);

    match cli.command {
        Command::Ingest {
            paths,
            doc_id,
            replace,
        } => ingest(&engine, &paths, doc_id, replace, cli.json).await,
        Command::Remove { doc_id } => {
            let removed = engine
                .remove(&doc_id)
                .await
                .with_context(|| format!("failed to remove {doc_id}"))?;
            if cli.json {
                print_json(&serde_json::json!({ "doc_id": doc_id, "removed": removed }))
            } else {
                println!("Removed {removed} chunks of {doc_id}");
                Ok(())
            }
        }
        Command::Search { query, n_results } => {
            let n_results = n_results.unwrap_or(engine.default_results());
            let results = engine
                .try_search(&query, n_results)
                .await
                .context("search failed")?;
            if cli.json {
                print_json(&results)
            } else {
                print!("{}", format_results(&results));
                Ok(())
            }
        }
        Command::Stats => {
            let stats = admin.stats().await.context("failed to compute statistics")?;
            if cli.json {
                print_json(&stats)
            } else {
                print!("{}", format_stats(&stats));
                Ok(())
            }
        }
        Command::Clear => {
            admin.clear().await.context("failed to clear the collection")?;
            if cli.json {
                print_json(&clear_summary())
            } else {
                println!("Collection cleared");
                Ok(())
            }
        }
        Command::Info => {
            let info = admin.info().await.context("failed to read collection info")?;
            if cli.json {
                print_json(&info)
            } else {
                print!("{}", format_info(&info, &config));
                Ok(())
            }
        }
    }
}

async fn ingest(
    engine: &RetrievalEngine,
    paths: &[PathBuf],
    doc_id: Option<String>,
    replace: bool,
    json: bool,
) -> Result<()> {
    let registry = SourceRegistry::with_defaults();
    let files = collect_files(paths, &registry)?;
    if files.is_empty() {
        bail!(
            "no supported files found (supported extensions: {})",
            registry.extensions().join(", ")
        );
    }
    if doc_id.is_some() && files.len() > 1 {
        bail!("--doc-id can only be used with a single file");
    }

    let mut reports: Vec<IngestReport> = Vec::new();
    let mut failures = 0usize;
    for file in &files {
        let document = match &doc_id {
            Some(id) => Document::new(id, file.display().to_string()),
            None => Document::from_path(file),
        };

        let outcome = if replace {
            match registry.extract_text(file).await {
                Ok(text) => engine.reingest(&document, &text).await,
                Err(e) => Err(e.into()),
            }
        } else {
            engine.ingest_from_source(&document, &registry).await
        };

        match outcome {
            Ok(report) => {
                if !json {
                    println!(
                        "Ingested {} ({} chunks{})",
                        report.doc_id,
                        report.chunk_count,
                        if report.replaced > 0 {
                            format!(", replaced {}", report.replaced)
                        } else {
                            String::new()
                        }
                    );
                }
                reports.push(report);
            }
            Err(e) => {
                error!("Failed to ingest {}: {e}", file.display());
                failures += 1;
            }
        }
    }

    if json {
        print_json(&reports)?;
    }
    info!("Ingested {} of {} files", reports.len(), files.len());
    if failures > 0 {
        bail!("{failures} of {} files failed to ingest", files.len());
    }
    Ok(())
}

/// Expand directories into the supported files below them, in path order.
///
/// Explicitly named files are kept even when unsupported so the failure is
/// reported for them; unsupported files found while walking are skipped.
fn collect_files(paths: &[PathBuf], registry: &SourceRegistry) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry =
                    entry.with_context(|| format!("failed to walk {}", path.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if registry.supports(entry.path()) {
                    files.push(entry.into_path());
                } else {
                    warn!("Skipping unsupported file {}", entry.path().display());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}

fn clear_summary() -> serde_json::Value {
    serde_json::json!({ "cleared": true })
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}

fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results\n".to_string();
    }
    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        let metadata = result.metadata();
        out.push_str(&format!(
            "{}. {} [chunk {}/{}] score {:.4}\n   {}\n",
            rank + 1,
            result.doc_id(),
            metadata.chunk_index + 1,
            metadata.total_chunks,
            result.score(),
            preview(result.text())
        ));
    }
    out
}

fn format_stats(stats: &CollectionStats) -> String {
    let mut out = format!(
        "Entries: {}\nDocuments: {}\n",
        stats.total_entries, stats.distinct_documents
    );
    if stats.truncated {
        out.push_str(&format!(
            "Note: only the first {} entries were scanned; per-document figures are partial\n",
            stats.scanned_entries
        ));
    }
    for (doc_id, doc) in &stats.per_document {
        out.push_str(&format!(
            "  {doc_id}: {} chunks, {} characters\n",
            doc.chunk_count, doc.total_text_size
        ));
    }
    out
}

fn format_info(info: &CollectionInfo, config: &RetrievalConfig) -> String {
    format!(
        "Name: {}\nDescription: {}\nDimension: {}\nMetric: {:?}\nCreated: {}\nData dir: {}\n",
        info.name,
        info.description,
        info.dimension,
        info.metric,
        info.created_at.to_rfc3339(),
        config.collection.data_dir.display()
    )
}
