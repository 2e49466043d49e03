//! CLI commands and argument parsing

use crate::api::{Plan, Tone};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PinCart command-line client
#[derive(Parser, Debug)]
#[command(name = "pincart")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides config and PINCART_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Retries beyond the first attempt
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "PINCART_PASSWORD", hide_env_values = true)]
        password: String,

        /// Store the session in this settings file (YAML) for `--config`
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Find trending products for one or more keywords
    Discover {
        /// Niche or product keywords (queried concurrently)
        #[arg(required = true)]
        keywords: Vec<String>,
    },

    /// Find suppliers for a product
    Match {
        /// Product title
        title: String,

        /// Product image URL
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Generate AI product page copy
    Generate {
        /// Product name
        name: String,

        /// Target audience
        #[arg(long, default_value = "")]
        audience: String,

        /// Writing tone
        #[arg(long, default_value = "standard")]
        tone: Tone,

        /// Supplier unit cost
        #[arg(long)]
        supplier_price: Option<f64>,

        /// Suggested retail price (carried into a later export)
        #[arg(long, requires = "supplier_price")]
        retail_price: Option<f64>,

        /// Product image URL (carried into a later export)
        #[arg(long)]
        image_url: Option<String>,

        /// Account id to save the generation under
        #[arg(long)]
        user_id: Option<String>,

        /// Save the generated page (JSON) for `export --from`
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Export a generated page as a store-import CSV
    Export {
        /// Generated page JSON written by `generate --save`
        #[arg(long)]
        from: PathBuf,

        /// Output file or directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start a subscription checkout
    Checkout {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        plan: Plan,
    },

    /// Open the billing portal
    Portal {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        email: String,
    },

    /// Discover, match, generate and export in one go
    Run {
        /// Niche or product keyword
        keyword: String,

        /// Target audience
        #[arg(long, default_value = "")]
        audience: String,

        /// Writing tone
        #[arg(long, default_value = "standard")]
        tone: Tone,

        /// Account id to save the generation under
        #[arg(long)]
        user_id: Option<String>,

        /// Output file or directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_discover_many() {
        let cli = Cli::parse_from(["pincart", "discover", "home decor", "pet toys"]);
        match cli.command {
            Commands::Discover { keywords } => assert_eq!(keywords, vec!["home decor", "pet toys"]),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_parse_generate_with_globals() {
        let cli = Cli::parse_from([
            "pincart",
            "--api-url",
            "http://127.0.0.1:9000",
            "generate",
            "Rattan Lamp",
            "--tone",
            "luxury",
            "--supplier-price",
            "8.5",
            "--retries",
            "0",
            "-f",
            "json",
        ]);

        assert_eq!(cli.api_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(cli.retries, Some(0));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Generate {
                name,
                tone,
                supplier_price,
                ..
            } => {
                assert_eq!(name, "Rattan Lamp");
                assert_eq!(tone, Tone::Luxury);
                assert_eq!(supplier_price, Some(8.5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_retail_price_requires_supplier_price() {
        let result = Cli::try_parse_from(["pincart", "generate", "Lamp", "--retail-price", "20"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_login() {
        let cli = Cli::parse_from([
            "pincart", "login", "--email", "a@b.co", "--password", "pw", "--save", "s.yaml",
        ]);
        match cli.command {
            Commands::Login {
                email,
                password,
                save,
            } => {
                assert_eq!(email, "a@b.co");
                assert_eq!(password, "pw");
                assert_eq!(save, Some(PathBuf::from("s.yaml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_checkout_plan() {
        let cli = Cli::parse_from([
            "pincart", "checkout", "--user-id", "u1", "--email", "a@b.co", "--plan", "pro",
        ]);
        assert!(matches!(cli.command, Commands::Checkout { plan: Plan::Pro, .. }));
    }
}
