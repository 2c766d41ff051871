use serde::Deserialize;
use std::collections::HashMap;

/// Plain-text formats in order of preference.
const TEXT_FORMATS: &[&str] = &["text/plain; charset=utf-8", "text/plain; charset=us-ascii", "text/plain"];

/// One page of the Gutendex `/books` listing.
#[derive(Debug, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub count: Option<u64>,
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<CatalogBook>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogBook {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Person>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub formats: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub name: String,
}

impl CatalogBook {
    /// Download link of a plain-text rendition, skipping zipped ones.
    pub fn text_url(&self) -> Option<&str> {
        TEXT_FORMATS
            .iter()
            .filter_map(|f| self.formats.get(*f))
            .map(String::as_str)
            .find(|url| !url.ends_with(".zip"))
    }

    pub fn author(&self) -> String {
        self.authors.first().map(|a| a.name.clone()).unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn cover_url(&self) -> Option<String> {
        self.formats.get("image/jpeg").cloned()
    }
}
