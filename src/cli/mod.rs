pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "recipebook")]
#[command(about = "Recipe catalogue with full-text search", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Run database migrations
    Migrate,

    /// Search recipes on a running server
    Search {
        /// Query-string expression, e.g. "name:soup AND tags:quick"
        query: String,
    },

    /// Show a recipe from a running server
    Show {
        /// Recipe ID
        recipe_id: i64,
    },

    /// Rebuild the search index from the database (stop the server first)
    Reindex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from(["recipebook", "search", "name:soup"]);
        assert!(matches!(cli.command, Commands::Search { query } if query == "name:soup"));

        let cli = Cli::parse_from(["recipebook", "show", "3"]);
        assert!(matches!(cli.command, Commands::Show { recipe_id: 3 }));

        let cli = Cli::parse_from(["recipebook", "reindex"]);
        assert!(matches!(cli.command, Commands::Reindex));
    }
}
