// src/config/options.rs
use std::path::Path;

use serde::Deserialize;

use super::consts::*;
use crate::error::{Error, Result};

/// Where the catalog and override data come from. Supplied by the caller;
/// nothing here is read from the environment.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Base location of the catalog files (url or directory).
    pub base_url: String,
    /// Catalog file names relative to `base_url`, scanned in this order.
    pub files: Vec<String>,
    /// Base location of the override data; `None` disables overrides.
    pub override_base: Option<String>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            base_url: s!(DEFAULT_BASE_URL),
            files: DEFAULT_FILES.iter().map(|f| s!(*f)).collect(),
            override_base: None,
        }
    }
}

impl CatalogOptions {
    pub fn new<I, S>(base_url: &str, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_url: with_trailing_sep(base_url),
            files: files.into_iter().map(Into::into).collect(),
            override_base: None,
        }
    }

    pub fn with_overrides(mut self, base: &str) -> Self {
        self.override_base = Some(with_trailing_sep(base));
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let opts: Self = toml::from_str(text)?;
        opts.validated()
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Ensure trailing separators and a non-empty file list.
    pub fn validated(mut self) -> Result<Self> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config(s!("base_url is empty")));
        }
        if self.files.iter().all(|f| f.trim().is_empty()) {
            return Err(Error::Config(s!("no catalog files configured")));
        }
        self.base_url = with_trailing_sep(&self.base_url);
        self.override_base = self.override_base.as_deref().map(with_trailing_sep);
        Ok(self)
    }

    /// Full locations of the catalog files, in scan order.
    pub fn source_urls(&self) -> Vec<(String, String)> {
        self.files
            .iter()
            .filter(|f| !f.trim().is_empty())
            .map(|f| (f.clone(), join!(&self.base_url, f)))
            .collect()
    }

    /// Full location of one override table, if overrides are configured.
    pub fn override_url(&self, file: &str) -> Option<String> {
        self.override_base
            .as_deref()
            .map(|base| join!(base, OVERRIDE_SUBPATH, file))
    }
}

fn with_trailing_sep(base: &str) -> String {
    let base = base.trim();
    if base.ends_with('/') || base.ends_with('\\') {
        s!(base)
    } else {
        join!(base, "/")
    }
}
