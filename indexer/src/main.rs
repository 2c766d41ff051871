use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shelf_core::{pipeline, similarity};
use shelf_core::{open_db, DataPaths, DocId, DocumentStore, IndexStore, IndexerConfig, SimilarityStore, Tokenizer};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the inverted word-frequency index of the book corpus", long_about = None)]
struct Cli {
    /// Data directory shared with the crawler
    #[arg(long, env = "SHELF_DATA_DIR", default_value = "./data", global = true)]
    data_dir: String,
    /// JSON file with indexer settings; lookup uses its tokenizer section
    #[arg(long, env = "SHELF_INDEX_CONFIG", global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from every stored book and swap it in
    Build {
        /// Worker threads (defaults to one per CPU)
        #[arg(long, env = "SHELF_INDEX_THREADS")]
        threads: Option<usize>,
        /// Drop tokens shorter than this many characters
        #[arg(long)]
        min_length: Option<usize>,
        /// Stopword language for books that declare none
        #[arg(long)]
        default_language: Option<String>,
        /// Stem terms before counting
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Do not post a term for a book that uses it fewer times than this
        #[arg(long)]
        min_term_count: Option<u32>,
    },
    /// Show books containing every word of the query
    Lookup {
        query: String,
        /// Maximum number of books to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Match every index term containing a query word instead of the exact term
        #[arg(long, default_value_t = false)]
        substring: bool,
    },
    /// Recompute book-to-book similarity from the live index
    Similarity {
        /// Worker threads (defaults to one per CPU)
        #[arg(long, env = "SHELF_INDEX_THREADS")]
        threads: Option<usize>,
        /// Keep only pairs scoring above this
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Show the books most similar to one book
    Similar {
        doc_id: DocId,
        /// Maximum number of books to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the manifest of the live index
    Stats,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let paths = DataPaths::new(&cli.data_dir);
    let mut cfg = match &cli.config {
        Some(path) => IndexerConfig::from_json_file(path)?,
        None => IndexerConfig::default(),
    };

    match cli.command {
        Commands::Build { threads, min_length, default_language, stem, min_term_count } => {
            if threads.is_some() { cfg.threads = threads; }
            if let Some(n) = min_length { cfg.tokenizer.min_length = n; }
            if let Some(lang) = default_language { cfg.tokenizer.default_language = lang; }
            if stem { cfg.tokenizer.stem = true; }
            if let Some(n) = min_term_count { cfg.min_term_count = n; }
            build(&paths, &cfg)
        }
        Commands::Lookup { query, limit, substring } => lookup(&paths, &cfg, &query, limit, substring),
        Commands::Similarity { threads, threshold } => {
            if threads.is_some() { cfg.threads = threads; }
            if let Some(t) = threshold { cfg.similarity.threshold = t; }
            compute_similarity(&paths, &cfg)
        }
        Commands::Similar { doc_id, limit } => {
            if let Some(n) = limit { cfg.similarity.limit = n; }
            similar(&paths, &cfg, doc_id)
        }
        Commands::Stats => stats(&paths),
    }
}

fn build(paths: &DataPaths, cfg: &IndexerConfig) -> Result<()> {
    let db = open_db(paths)?;
    let docs = DocumentStore::new(&db, paths.clone())?;
    let index = IndexStore::new(db)?;
    let tokenizer = Tokenizer::new(cfg.tokenizer.clone());

    tracing::info!(documents = docs.len(), data_dir = %paths.root.display(), "starting index build");
    let report = pipeline::run(&docs, &index, &tokenizer, cfg)?;
    let term_count = index.term_count()?;
    tracing::info!(
        generation = report.manifest.generation,
        terms = term_count,
        indexed = report.stats.documents_indexed,
        skipped = report.stats.skipped(),
        "index build complete"
    );
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "manifest": report.manifest,
        "stats": report.stats,
        "elapsed_s": report.elapsed.as_secs_f64(),
    }))?);
    Ok(())
}

fn lookup(paths: &DataPaths, cfg: &IndexerConfig, query: &str, limit: usize, substring: bool) -> Result<()> {
    let db = open_db(paths)?;
    let index = IndexStore::new(db.clone())?;
    let docs = DocumentStore::new(&db, paths.clone())?;
    if index.active()?.is_none() {
        bail!("no index in {}; run `indexer build` first", paths.root.display());
    }
    let tokenizer = Tokenizer::new(cfg.tokenizer.clone());
    let hits = if substring { index.lookup_substring(&tokenizer, query)? } else { index.lookup(&tokenizer, query)? };
    let total = hits.len();
    let mut results = Vec::new();
    for (doc_id, counts) in hits.into_iter().take(limit) {
        let title = docs.get(doc_id)?.map(|d| d.title).unwrap_or_default();
        results.push(serde_json::json!({ "doc_id": doc_id, "title": title, "counts": counts }));
    }
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "query": query,
        "substring": substring,
        "total_hits": total,
        "results": results,
    }))?);
    Ok(())
}

fn compute_similarity(paths: &DataPaths, cfg: &IndexerConfig) -> Result<()> {
    let db = open_db(paths)?;
    let index = IndexStore::new(db.clone())?;
    if index.active()?.is_none() {
        bail!("no index in {}; run `indexer build` first", paths.root.display());
    }
    let table = SimilarityStore::new(&db)?;
    let report = similarity::run(&index, &table, &cfg.similarity, cfg.threads)?;
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "generation": report.generation,
        "books": report.books,
        "pairs": report.pairs,
        "threshold": cfg.similarity.threshold,
        "elapsed_s": report.elapsed.as_secs_f64(),
    }))?);
    Ok(())
}

fn similar(paths: &DataPaths, cfg: &IndexerConfig, doc_id: DocId) -> Result<()> {
    let db = open_db(paths)?;
    let docs = DocumentStore::new(&db, paths.clone())?;
    let table = SimilarityStore::new(&db)?;
    if table.is_empty() {
        bail!("no similarity table in {}; run `indexer similarity` first", paths.root.display());
    }
    let mut results = Vec::new();
    for n in table.similar(doc_id, cfg.similarity.limit)? {
        let title = docs.get(n.doc_id)?.map(|d| d.title).unwrap_or_default();
        results.push(serde_json::json!({ "doc_id": n.doc_id, "title": title, "similarity": n.score }));
    }
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "doc_id": doc_id,
        "results": results,
    }))?);
    Ok(())
}

fn stats(paths: &DataPaths) -> Result<()> {
    let db = open_db(paths)?;
    let index = IndexStore::new(db)?;
    match index.active()? {
        Some(manifest) => println!("{}", serde_json::to_string_pretty(&manifest)?),
        None => bail!("no index in {}", paths.root.display()),
    }
    Ok(())
}
