use anyhow::{anyhow, Result};
use clap::Parser;
use reqwest::Client;
use shelf_core::tokenizer::word_count;
use shelf_core::{open_db, DataPaths, Document, DocumentStore};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

mod catalog;

use crate::catalog::{CatalogBook, CatalogPage};

const PAGE_RETRIES: u32 = 3;
const PAGE_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Download public-domain books from a Gutendex catalog into the data directory")]
struct Cli {
    /// Data directory shared with the indexer
    #[arg(long, env = "SHELF_DATA_DIR", default_value = "./data")]
    data_dir: String,
    /// First catalog page to read; further pages follow the `next` links
    #[arg(long, env = "SHELF_CATALOG_URL", default_value = "https://gutendex.com/books/")]
    catalog_url: String,
    /// Stop after storing this many new books
    #[arg(long, default_value_t = 1000)]
    max_books: usize,
    /// Skip books with fewer words than this
    #[arg(long, default_value_t = 10_000)]
    min_words: usize,
    /// Maximum simultaneous downloads
    #[arg(long, default_value_t = 10)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,
    /// User-Agent sent with every request
    #[arg(long, default_value = "shelf-crawler/0.1")]
    user_agent: String,
}

/// A book that passed every filter and is ready to be stored.
struct Downloaded {
    book: CatalogBook,
    text: String,
    words: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let concurrency = args.concurrency.max(1);

    let paths = DataPaths::new(&args.data_dir);
    let db = open_db(&paths)?;
    let store = DocumentStore::new(&db, paths.clone())?;

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let mut next_page = Some(Url::parse(&args.catalog_url)?);
    let mut pending: VecDeque<CatalogBook> = VecDeque::new();
    let mut scheduled: HashSet<u32> = HashSet::new();
    let mut inflight: JoinSet<Result<Option<Downloaded>>> = JoinSet::new();
    let mut stored = 0usize;
    let mut skipped = 0usize;
    tracing::info!(
        catalog = %args.catalog_url,
        max_books = args.max_books,
        min_words = args.min_words,
        concurrency,
        already_stored = store.len(),
        "crawler starting"
    );

    loop {
        while inflight.len() < concurrency && stored + inflight.len() < args.max_books {
            if pending.is_empty() {
                let Some(url) = next_page.take() else { break };
                match fetch_page(&client, &url).await {
                    Ok(page) => {
                        next_page = page.next.as_deref().and_then(|n| Url::parse(n).ok());
                        tracing::info!(
                            page = %url,
                            books = page.results.len(),
                            catalog_total = page.count,
                            "catalog page fetched"
                        );
                        pending.extend(page.results);
                    }
                    Err(e) => {
                        tracing::error!(page = %url, error = %e, "giving up on catalog");
                        break;
                    }
                }
                continue;
            }
            let Some(book) = pending.pop_front() else { continue };
            if !scheduled.insert(book.id) || store.contains(book.id)? {
                tracing::debug!(id = book.id, "already stored");
                continue;
            }
            let Some(text_url) = book.text_url().map(str::to_string) else {
                tracing::debug!(id = book.id, title = %book.title, "no plain-text format");
                skipped += 1;
                continue;
            };
            let client = client.clone();
            let min_words = args.min_words;
            inflight.spawn(async move { download(&client, book, &text_url, min_words).await });
        }

        let Some(joined) = inflight.join_next().await else { break };
        match joined {
            Ok(Ok(Some(dl))) => {
                persist(&store, dl)?;
                stored += 1;
                if stored % 50 == 0 {
                    tracing::info!(stored, skipped, "progress");
                }
            }
            Ok(Ok(None)) => skipped += 1,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "download failed");
                skipped += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, "download task failed");
                skipped += 1;
            }
        }
    }

    store.flush()?;
    tracing::info!(stored, skipped, total = store.len(), "crawl complete");
    Ok(())
}

async fn fetch_page(client: &Client, url: &Url) -> Result<CatalogPage> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let res = async {
            let resp = client.get(url.clone()).send().await?.error_for_status()?;
            Ok::<CatalogPage, reqwest::Error>(resp.json::<CatalogPage>().await?)
        }
        .await;
        match res {
            Ok(page) => return Ok(page),
            Err(e) if attempt < PAGE_RETRIES => {
                tracing::warn!(page = %url, attempt, error = %e, "catalog page fetch failed, retrying");
                sleep(PAGE_RETRY_DELAY).await;
            }
            Err(e) => return Err(anyhow!("fetching {url} failed after {attempt} attempts: {e}")),
        }
    }
}

async fn download(client: &Client, book: CatalogBook, text_url: &str, min_words: usize) -> Result<Option<Downloaded>> {
    let text = client.get(text_url).send().await?.error_for_status()?.text().await?;
    let words = word_count(&text);
    if words < min_words {
        tracing::debug!(id = book.id, title = %book.title, words, "too short");
        return Ok(None);
    }
    Ok(Some(Downloaded { book, text, words }))
}

fn persist(store: &DocumentStore, dl: Downloaded) -> Result<()> {
    let Downloaded { book, text, words } = dl;
    let content_ref = store.write_text(book.id, &text)?;
    let doc = Document {
        id: book.id,
        author: book.author(),
        cover_url: book.cover_url(),
        title: book.title,
        languages: book.languages,
        content_ref,
        word_count: words as u64,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
    };
    store.insert(&doc)?;
    tracing::info!(id = doc.id, title = %doc.title, author = %doc.author, words, "book stored");
    Ok(())
}
