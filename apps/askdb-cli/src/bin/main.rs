use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use askdb_core::config::{expand_path, Config};
use askdb_core::fingerprint::chunk_id;
use askdb_core::types::{AnswerSource, ResultRecord};
use askdb_embed::get_default_embedder;
use askdb_pipeline::{get_default_engine, BatchOptions, BatchRunner, ResponseGate};
use askdb_retrieval::{ChunkIndex, ContextAssembler};
use askdb_store::CacheStore;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

const MAX_CHUNK_CHARS: usize = 1200;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <ingest|ask|batch|status> [args...]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&config, &args),
        "ask" => ask(&config, &args).await,
        "batch" => batch(&config, &args).await,
        "status" => status(&config),
        _ => {
            eprintln!("Unknown command: {cmd}");
            std::process::exit(1);
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<CacheStore>> {
    let dir = expand_path(config.get_or("cache.dir", "cache".to_string()));
    Ok(Arc::new(CacheStore::open(dir)?))
}

fn visual_source(config: &Config) -> Option<PathBuf> {
    config
        .get::<String>("retrieval.visual_source")
        .ok()
        .map(expand_path)
}

async fn build_pipeline(
    config: &Config,
    store: Arc<CacheStore>,
) -> anyhow::Result<(Arc<ContextAssembler>, Arc<ResponseGate>)> {
    let embedder = get_default_embedder(config)?;
    println!(
        "Building chunk index over {} chunks...",
        store.chunk_count()
    );
    let index = Arc::new(ChunkIndex::build(&store, embedder.clone()).await?);
    let assembler = ContextAssembler::new(store.clone(), index, embedder)
        .with_top_k(config.get_or("retrieval.top_k", 3))
        .with_visual_top_k(config.get_or("retrieval.visual_top_k", 2));
    Ok((Arc::new(assembler), Arc::new(ResponseGate::new(store))))
}

fn ingest(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let data_dir = args.first().map(expand_path).unwrap_or_else(|| {
        expand_path(config.get_or("data.txt_dir", "data/txt".to_string()))
    });
    println!("Ingesting from {}", data_dir.display());
    let store = open_store(config)?;

    let mut files = 0usize;
    let mut written = 0usize;
    for entry in WalkDir::new(&data_dir).into_iter().filter_map(std::result::Result::ok) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let content = fs::read_to_string(path)?;
        files += 1;
        for piece in split_paragraphs(&content, MAX_CHUNK_CHARS) {
            store.put_chunk(&chunk_id(&piece), piece.trim())?;
            written += 1;
        }
        println!("Processed {}", path.display());
    }
    if files == 0 {
        println!("No .txt files found under {}.", data_dir.display());
        return Ok(());
    }
    println!(
        "Ingest complete: {files} files, {written} chunk writes, {} chunks stored",
        store.chunk_count()
    );
    Ok(())
}

/// Fold blank-line-separated paragraphs into pieces of at most `max_chars`.
/// An oversized paragraph becomes its own piece rather than being split
/// mid-sentence.
fn split_paragraphs(content: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for paragraph in content.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if !current.is_empty() && current.len() + paragraph.len() + 2 > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
        if current.len() >= max_chars {
            pieces.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

async fn ask(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let Some(question) = args.first() else {
        eprintln!("Usage: askdb ask \"<question>\"");
        std::process::exit(1);
    };
    let store = open_store(config)?;
    if store.chunk_count() == 0 {
        anyhow::bail!("Chunk store is empty; run `askdb ingest` first");
    }
    let (assembler, gate) = build_pipeline(config, store).await?;
    let engine = get_default_engine(config)?;

    let visual = visual_source(config);
    let ctx = assembler.build_context(question, visual.as_deref()).await?;
    let resolved = gate
        .resolve(question, &ctx.chunk_ids, &ctx.text, engine.as_ref())
        .await?;

    let source = match resolved.source {
        AnswerSource::Cache => "cache",
        AnswerSource::Live => "live",
    };
    println!("Answer ({source}, {} chunks):", ctx.chunk_ids.len());
    println!("{}", resolved.answer);
    Ok(())
}

async fn batch(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let Some(input) = args.first() else {
        eprintln!("Usage: askdb batch <questions.json> [output.json]");
        std::process::exit(1);
    };
    let output = args
        .get(1)
        .map(expand_path)
        .unwrap_or_else(|| PathBuf::from("outputs/answers_batch.json"));

    let questions: Vec<String> = serde_json::from_str(&fs::read_to_string(expand_path(input))?)?;
    println!("Loaded {} questions", questions.len());

    let store = open_store(config)?;
    if store.chunk_count() == 0 {
        anyhow::bail!("Chunk store is empty; run `askdb ingest` first");
    }
    let (assembler, gate) = build_pipeline(config, store).await?;
    let engine = get_default_engine(config)?;

    let runner = BatchRunner::new(assembler, gate, engine).with_options(BatchOptions {
        concurrency: config.get_or("batch.concurrency", 1),
        visual_source: visual_source(config),
    });

    let pb = ProgressBar::new(questions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} questions ({percent}%)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let records = runner
        .run_with_progress(&questions, |_| pb.inc(1))
        .await;
    pb.finish_and_clear();

    save_results(&records, &output)?;
    let cached = records
        .iter()
        .filter(|r| r.source == Some(AnswerSource::Cache))
        .count();
    let failed = records.iter().filter(|r| r.is_failed()).count();
    println!(
        "Batch complete: {} answered ({cached} from cache), {failed} failed -> {}",
        records.len() - failed,
        output.display()
    );
    Ok(())
}

fn save_results(records: &[ResultRecord], output: &Path) -> anyhow::Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, serde_json::to_vec_pretty(records)?)?;
    Ok(())
}

fn status(config: &Config) -> anyhow::Result<()> {
    let dir = expand_path(config.get_or("cache.dir", "cache".to_string()));
    let store = CacheStore::open(&dir)?;
    println!("Cache dir:        {}", dir.display());
    println!("Chunks stored:    {}", store.chunk_count());
    println!("Responses cached: {}", store.response_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::split_paragraphs;

    #[test]
    fn split_keeps_short_paragraphs_together() {
        let pieces = split_paragraphs("one\n\ntwo\n\nthree", 100);
        assert_eq!(pieces, vec!["one\n\ntwo\n\nthree".to_string()]);
    }

    #[test]
    fn split_folds_at_max_chars() {
        let long_a = "a".repeat(700);
        let long_b = "b".repeat(700);
        let content = format!("{long_a}\n\n{long_b}");
        let pieces = split_paragraphs(&content, 1200);
        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].starts_with('a'));
        assert!(pieces[1].starts_with('b'));
    }

    #[test]
    fn split_skips_blank_paragraphs() {
        let pieces = split_paragraphs("\n\n  \n\nalpha\n\n\n\n", 100);
        assert_eq!(pieces, vec!["alpha".to_string()]);
    }
}
