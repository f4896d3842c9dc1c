//! Command modules for CLI

pub mod check;
pub mod sources;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
#[command(about = "feedcheck commands")]
pub enum Commands {
    /// Check which packages must still be pushed to each feed
    #[command(about = "Check which packages must still be pushed to each feed")]
    Check(check::CheckArgs),

    /// List the package sources found in settings
    #[command(about = "List configured package sources")]
    Sources(sources::SourcesArgs),
}
