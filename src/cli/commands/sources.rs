//! Sources command - list the package sources found in settings

use crate::cli::error::CliResult;
use crate::cli::utils::messages;
use clap::Args;
use feedcheck::RegistryContext;

#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

pub async fn execute_sources(context: &RegistryContext, args: SourcesArgs) -> CliResult<()> {
    let summaries = context.sources().summaries();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("{}", messages::info("No package sources configured"));
        return Ok(());
    }

    for file in &context.settings().files {
        println!("# {}", file.display());
    }
    for source in summaries {
        let mut flags = Vec::new();
        if !source.enabled {
            flags.push("disabled");
        }
        if source.has_credentials {
            flags.push("credentials");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("{}  {}{}", source.name, source.url, flags);
    }
    Ok(())
}
