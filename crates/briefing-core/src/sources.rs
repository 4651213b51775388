//! Source registry: the static list of feeds, grouped by category.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::types::{CategoryInfo, FeedSource};
use crate::ConfigError;

/// Immutable registry of feed sources, loaded once at startup.
///
/// Source order is significant: refresh passes walk sources in registry order
/// and the priority subset is taken from the front.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    categories: Vec<CategoryInfo>,
    sources: Vec<FeedSource>,
}

#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub categories: Vec<CategoryInfo>,
    pub sources: Vec<FeedSource>,
}

impl SourceRegistry {
    /// Build a registry, validating it the same way a YAML file is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on duplicate URLs, undeclared
    /// categories, blank names, or non-HTTP URLs.
    pub fn new(
        categories: Vec<CategoryInfo>,
        sources: Vec<FeedSource>,
    ) -> Result<Self, ConfigError> {
        let registry = Self {
            categories,
            sources,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// The default UK personal-finance registry.
    #[must_use]
    pub fn builtin() -> Self {
        let category = |key: &str, title: &str, description: &str| CategoryInfo {
            key: key.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        };
        let source = |url: &str, name: &str, category: &str| FeedSource {
            url: url.to_string(),
            display_name: name.to_string(),
            category: category.to_string(),
        };

        Self {
            categories: vec![
                category(
                    "tax",
                    "Tax",
                    "Income tax, National Insurance and HMRC updates",
                ),
                category(
                    "pensions",
                    "Pensions",
                    "State and workplace pension news",
                ),
                category(
                    "personal-finance",
                    "Personal Finance",
                    "Saving, borrowing and household money news",
                ),
                category(
                    "economy",
                    "Economy",
                    "Interest rates, inflation and the wider UK economy",
                ),
                category(
                    "property",
                    "Property",
                    "Mortgages, housing and property tax",
                ),
            ],
            sources: vec![
                source(
                    "https://www.gov.uk/government/organisations/hm-revenue-customs.atom",
                    "HMRC",
                    "tax",
                ),
                source("https://taxpolicy.org.uk/feed/", "Tax Policy Associates", "tax"),
                source(
                    "https://www.theguardian.com/money/pensions/rss",
                    "Guardian Pensions",
                    "pensions",
                ),
                source(
                    "https://www.moneysavingexpert.com/news/feeds/news.rss",
                    "MoneySavingExpert",
                    "personal-finance",
                ),
                source(
                    "https://feeds.bbci.co.uk/news/business/rss.xml",
                    "BBC Business",
                    "economy",
                ),
                source(
                    "https://www.bankofengland.co.uk/rss/news",
                    "Bank of England",
                    "economy",
                ),
                source(
                    "https://www.theguardian.com/money/rss",
                    "Guardian Money",
                    "personal-finance",
                ),
                source(
                    "https://www.thisismoney.co.uk/money/index.rss",
                    "This is Money",
                    "personal-finance",
                ),
                source(
                    "https://www.gov.uk/government/organisations/hm-treasury.atom",
                    "HM Treasury",
                    "economy",
                ),
                source(
                    "https://www.theguardian.com/money/property/rss",
                    "Guardian Property",
                    "property",
                ),
            ],
        }
    }

    #[must_use]
    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    #[must_use]
    pub fn categories(&self) -> &[CategoryInfo] {
        &self.categories
    }

    #[must_use]
    pub fn category(&self, key: &str) -> Option<&CategoryInfo> {
        self.categories.iter().find(|c| c.key == key)
    }

    #[must_use]
    pub fn source_by_url(&self, url: &str) -> Option<&FeedSource> {
        self.sources.iter().find(|s| s.url == url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_keys = HashSet::new();
        for category in &self.categories {
            if category.key.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "category key must be non-empty".to_string(),
                ));
            }
            if !seen_keys.insert(category.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate category key: '{}'",
                    category.key
                )));
            }
        }

        let mut seen_urls = HashSet::new();
        for source in &self.sources {
            if source.display_name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{}' has an empty display name",
                    source.url
                )));
            }
            if !(source.url.starts_with("http://") || source.url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "source '{}' has non-HTTP url '{}'",
                    source.display_name, source.url
                )));
            }
            if !seen_keys.contains(source.category.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "source '{}' uses undeclared category '{}'",
                    source.display_name, source.category
                )));
            }
            if !seen_urls.insert(source.url.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate source url: '{}'",
                    source.url
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate a source registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_registry(path: &Path) -> Result<SourceRegistry, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_registry(&content)
}

/// Parse and validate a source registry from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_registry(yaml: &str) -> Result<SourceRegistry, ConfigError> {
    let file: SourcesFile = serde_yaml::from_str(yaml).map_err(ConfigError::SourcesFileParse)?;
    SourceRegistry::new(file.categories, file.sources)
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
