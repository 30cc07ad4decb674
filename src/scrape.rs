// src/scrape.rs
// The pipeline: fetch sources in list order, parse, extract, assemble.
// Nothing here caches; see `store` for that.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::assemble::{self, ConceptResult, FormationTemplate, LegionTemplate, TitanResult, TraitTemplate, UpgradeTemplate};
use crate::catalog::{chassis, formations, legions, upgrades, Catalog, Document};
use crate::config::CatalogOptions;
use crate::core::net::Fetch;
use crate::core::xml;
use crate::error::Result;
use crate::overrides::{self, OverrideTables};
use crate::progress::Progress;

/// What to load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Concept {
    #[default]
    Titans,
    Formations,
    Legions,
    Upgrades,
    Traits,
}

impl Concept {
    pub const ALL: [Concept; 5] = [Concept::Titans, Concept::Formations, Concept::Legions, Concept::Upgrades, Concept::Traits];

    pub fn as_str(self) -> &'static str {
        match self {
            Concept::Titans => "titans",
            Concept::Formations => "formations",
            Concept::Legions => "legions",
            Concept::Upgrades => "upgrades",
            Concept::Traits => "traits",
        }
    }
}

/// Parsed source documents of one load, in list order, plus the files that failed.
#[derive(Clone, Debug, Default)]
pub struct Sources {
    pub docs: Vec<Document>,
    pub warnings: Vec<String>,
}

/// Fetch every configured file concurrently; results keep list order.
/// A file that cannot be fetched is skipped with a warning.
pub async fn fetch_sources(fetcher: &dyn Fetch, opts: &CatalogOptions, mut progress: Option<&mut dyn Progress>) -> Sources {
    let urls = opts.source_urls();
    if let Some(p) = progress.as_deref_mut() {
        p.begin(urls.len());
        p.log("Fetching catalog files...");
    }

    let bodies = join_all(urls.iter().map(|(_, url)| fetcher.get(url))).await;

    let mut out = Sources::default();
    for (index, ((file, url), body)) in urls.into_iter().zip(bodies).enumerate() {
        match body {
            Ok(text) => {
                let root = xml::parse(&text);
                logd!("{file}: {} bytes, {} top-level nodes", text.len(), root.children.len());
                out.docs.push(Document { file, root });
            }
            Err(e) => {
                warn_push!(out.warnings, "source {file} skipped: {e}");
                if let Some(p) = progress.as_deref_mut() {
                    p.log(&format!("{url}: {e}"));
                }
            }
        }
        if let Some(p) = progress.as_deref_mut() {
            p.item_done(index);
        }
    }

    if let Some(p) = progress.as_deref_mut() {
        p.finish();
    }
    out
}

/* ---------------- Per-concept extraction over fetched sources ---------------- */

pub fn titans(sources: &Sources, overrides: &OverrideTables) -> TitanResult {
    let cat = Catalog::new(&sources.docs);
    let skeletons = chassis::extract_all(&cat);
    let mut warnings = sources.warnings.clone();
    if skeletons.is_empty() {
        warn_push!(warnings, "no chassis found in {} source file(s)", cat.len());
    }
    let mut result = assemble::titans(skeletons, overrides);
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    result
}

fn with_source_warnings<T>(sources: &Sources, mut result: ConceptResult<T>) -> ConceptResult<T> {
    let mut warnings = sources.warnings.clone();
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    result
}

pub fn formations(sources: &Sources) -> ConceptResult<FormationTemplate> {
    let cat = Catalog::new(&sources.docs);
    with_source_warnings(sources, assemble::formations(formations::extract_all(&cat)))
}

pub fn legions(sources: &Sources) -> ConceptResult<LegionTemplate> {
    let cat = Catalog::new(&sources.docs);
    with_source_warnings(sources, assemble::legions(legions::extract_all(&cat)))
}

pub fn upgrades(sources: &Sources) -> ConceptResult<UpgradeTemplate> {
    let cat = Catalog::new(&sources.docs);
    with_source_warnings(sources, assemble::upgrades(upgrades::extract_upgrades(&cat)))
}

pub fn traits(sources: &Sources) -> ConceptResult<TraitTemplate> {
    let cat = Catalog::new(&sources.docs);
    with_source_warnings(sources, assemble::traits(upgrades::extract_traits(&cat)))
}

/* ---------------- One-shot loads ---------------- */

/// Result of any concept.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Collected {
    Titans(TitanResult),
    Formations(ConceptResult<FormationTemplate>),
    Legions(ConceptResult<LegionTemplate>),
    Upgrades(ConceptResult<UpgradeTemplate>),
    Traits(ConceptResult<TraitTemplate>),
}

impl Collected {
    pub fn warnings(&self) -> &[String] {
        match self {
            Collected::Titans(r) => &r.warnings,
            Collected::Formations(r) => &r.warnings,
            Collected::Legions(r) => &r.warnings,
            Collected::Upgrades(r) => &r.warnings,
            Collected::Traits(r) => &r.warnings,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Collected::Titans(r) => r.templates.len(),
            Collected::Formations(r) => r.templates.len(),
            Collected::Legions(r) => r.templates.len(),
            Collected::Upgrades(r) => r.templates.len(),
            Collected::Traits(r) => r.templates.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Titans: sources and override tables are fetched in parallel. Override
/// tables go through the process-wide cache.
pub async fn collect_titans(fetcher: Arc<dyn Fetch>, opts: &CatalogOptions, progress: Option<&mut dyn Progress>) -> Result<TitanResult> {
    let (sources, tables) = tokio::join!(
        fetch_sources(fetcher.as_ref(), opts, progress),
        overrides::load(Arc::clone(&fetcher), opts),
    );
    Ok(titans(&sources, &*tables?))
}

/// Top-level: dispatch on concept and collect (no caching).
pub async fn run(concept: Concept, fetcher: Arc<dyn Fetch>, opts: &CatalogOptions, progress: Option<&mut dyn Progress>) -> Result<Collected> {
    logf!("loading {}", concept.as_str());
    let extract: fn(&Sources) -> Collected = match concept {
        Concept::Titans => return collect_titans(fetcher, opts, progress).await.map(Collected::Titans),
        Concept::Formations => |s| Collected::Formations(formations(s)),
        Concept::Legions => |s| Collected::Legions(legions(s)),
        Concept::Upgrades => |s| Collected::Upgrades(upgrades(s)),
        Concept::Traits => |s| Collected::Traits(traits(s)),
    };
    let sources = fetch_sources(fetcher.as_ref(), opts, progress).await;
    Ok(extract(&sources))
}
