//! Check command - report which packages must be pushed to each feed

use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::messages;
use clap::Args;
use feedcheck::{Feed, ProjectToPublish, RegistryContext};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Version every project would be published at
    #[arg(long, short = 't', value_name = "VERSION")]
    pub target_version: String,

    /// Project (package id) to check; repeat for several
    #[arg(long = "project", short = 'p', required = true, value_name = "NAME")]
    pub projects: Vec<String>,

    /// Feed as NAME=URL, a bare URL, or the name of a configured source; repeat for several
    #[arg(long = "feed", short = 'f', required = true, value_name = "FEED")]
    pub feeds: Vec<String>,

    /// Existence queries in flight per feed (default from settings)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Per-feed result printed with `--json`
#[derive(Debug, Serialize)]
struct FeedReport {
    feed: String,
    source: String,
    to_publish: Vec<String>,
    already_published: usize,
}

/// Resolve a `--feed` value into a feed name and URL
fn resolve_feed(context: &RegistryContext, spec: &str) -> CliResult<(String, String)> {
    let spec = spec.trim();

    if let Some((name, url)) = spec.split_once('=') {
        // A name never contains URL punctuation; otherwise `=` belongs to the URL
        if !name.is_empty() && !name.contains(':') && !name.contains('/') && !url.is_empty() {
            return Ok((name.trim().to_string(), url.trim().to_string()));
        }
    }

    if let Some(source) = context.sources().find_by_name(spec) {
        if !source.enabled {
            eprintln!(
                "{}",
                messages::warning(&format!(
                    "Source '{}' is disabled in settings; checking it anyway",
                    source.name
                ))
            );
        }
        return Ok((source.name.clone(), source.url.clone()));
    }

    if spec.contains("://") {
        return Ok((spec.to_string(), spec.to_string()));
    }

    Err(CliError::Config(format!(
        "Unknown feed '{}': use NAME=URL or the name of a configured source",
        spec
    )))
}

pub async fn execute_check(context: Arc<RegistryContext>, args: CheckArgs) -> CliResult<()> {
    let candidates: Vec<ProjectToPublish> = args
        .projects
        .iter()
        .map(|p| ProjectToPublish::new(p.trim()))
        .collect();

    if let Some(0) = args.concurrency {
        return Err(CliError::Config(
            "--concurrency must be at least 1".to_string(),
        ));
    }

    let mut reports = Vec::new();
    for spec in &args.feeds {
        let (name, url) = resolve_feed(&context, spec)?;
        let feed = Feed::new(name, &url, context.clone())?;

        match args.concurrency {
            Some(limit) => {
                feed.check_existence_with_concurrency(&candidates, &args.target_version, limit)
                    .await?
            }
            None => feed.check_existence(&candidates, &args.target_version).await?,
        }

        let status = feed.describe_status(&candidates);
        if args.json {
            reports.push(FeedReport {
                feed: feed.name().to_string(),
                source: feed.source_url().to_string(),
                to_publish: feed
                    .packages_to_publish()
                    .iter()
                    .map(|p| p.name.clone())
                    .collect(),
                already_published: feed.already_published_count(),
            });
        } else {
            println!("{}", status);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}
