// src/cli.rs
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

use crate::config::CatalogOptions;
use crate::core::net::default_fetcher;
use crate::progress::LogProgress;
use crate::scrape::{self, Collected, Concept};

/// Extract titan, formation, legion, upgrade and trait templates from catalog files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Catalog location: an http(s) url or a directory.
    #[arg(long)]
    pub base: Option<String>,

    /// Catalog file name under the base; repeat for several, scanned in order.
    #[arg(long = "file", value_name = "NAME")]
    pub files: Vec<String>,

    /// Override data location (its `overrides/` folder holds the JSON tables).
    #[arg(long)]
    pub overrides: Option<String>,

    #[arg(long, value_enum, default_value_t = Concept::Titans)]
    pub concept: Concept,

    /// TOML file with `base_url`, `files` and `override_base`; flags win over it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the full result as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Config file (or defaults), then flags on top.
    pub fn options(&self) -> Result<CatalogOptions> {
        let mut opts = match &self.config {
            Some(path) => CatalogOptions::from_toml_file(path)
                .wrap_err_with(|| format!("reading config {}", path.display()))?,
            None => CatalogOptions::default(),
        };
        if let Some(base) = &self.base {
            opts.base_url = base.clone();
        }
        if !self.files.is_empty() {
            opts.files = self.files.clone();
        }
        if let Some(over) = &self.overrides {
            opts.override_base = Some(over.clone());
        }
        Ok(opts.validated()?)
    }
}

pub async fn run(args: Args) -> Result<()> {
    crate::log::init(args.log_file.as_deref())?;
    let opts = args.options()?;
    let fetcher = default_fetcher()?;

    let mut progress = LogProgress::default();
    let out = scrape::run(args.concept, fetcher, &opts, Some(&mut progress))
        .await
        .wrap_err_with(|| format!("loading {}", args.concept.as_str()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&out);
    }
    for w in out.warnings() {
        eprintln!("warning: {w}");
    }
    Ok(())
}

fn print_summary(out: &Collected) {
    match out {
        Collected::Titans(r) => {
            for t in &r.templates {
                let pts = t.points.map(|p| p.to_string()).unwrap_or_else(|| s!("-"));
                let legendary = if t.legendary { " [legendary]" } else { "" };
                println!("{:<28} {:<24} {:>5} pts  {} weapons{legendary}", t.id, t.name, pts, t.weapons.len());
            }
            if !r.missing_maxima.is_empty() {
                println!("{} chassis missing maxima", r.missing_maxima.len());
            }
        }
        Collected::Formations(r) => {
            for f in &r.templates {
                let max = f.max_titans.map(|m| m.to_string()).unwrap_or_else(|| s!("∞"));
                println!("{:<40} {}-{} titans, {} slots", f.name, f.min_titans, max, f.slots.len());
            }
        }
        Collected::Legions(r) => {
            for l in &r.templates {
                println!("{:<32} {} rules", l.name, l.rules.len());
            }
        }
        Collected::Upgrades(r) => {
            for u in &r.templates {
                let pts = u.points.map(|p| p.to_string()).unwrap_or_else(|| s!("-"));
                println!("{:<40} {:>5} pts  {}", u.name, pts, u.group.as_deref().unwrap_or(""));
            }
        }
        Collected::Traits(r) => {
            for t in &r.templates {
                println!("{:<40} {}", t.name, t.group.as_deref().unwrap_or(""));
            }
        }
    }
    println!("{} record(s)", out.len());
}
