use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{Engine, RenderRequest};

#[derive(Parser)]
#[command(name = "stackmark")]
#[command(about = "Renders .NET and Mono exception stack traces as annotated HTML")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Render a stack trace to HTML
    Render {
        /// File holding the raw stack trace
        #[arg(required_unless_present = "job")]
        trace: Option<PathBuf>,

        /// Render a failed job record (JSON) instead of a bare trace
        #[arg(long)]
        job: Option<PathBuf>,

        /// Culture whose marker tokens the trace was written with, e.g. de-DE
        #[arg(long)]
        culture: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wrap the markup into a complete HTML page
        #[arg(long)]
        standalone: bool,
    },

    /// Print how every line of a trace is classified, as JSON
    Parse {
        /// File holding the raw stack trace
        trace: PathBuf,

        /// Culture whose marker tokens the trace was written with
        #[arg(long)]
        culture: Option<String>,
    },

    /// Show the cached descriptor of a type
    Inspect {
        /// Type name as it appears in a trace, e.g. MyApp.Worker
        type_name: String,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => {
                engine.init(path).await
            }
            Commands::Render { trace, job, culture, output, standalone } => {
                engine
                    .render(RenderRequest { trace, job, culture, output, standalone })
                    .await
            }
            Commands::Parse { trace, culture } => {
                engine.parse(&trace, culture.as_deref()).await
            }
            Commands::Inspect { type_name } => {
                engine.inspect(&type_name).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_requires_trace_or_job() {
        assert!(Cli::try_parse_from(["stackmark", "render"]).is_err());

        let cli = Cli::try_parse_from(["stackmark", "render", "--job", "job.json", "--standalone"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Render { trace: None, job: Some(_), standalone: true, .. }
        ));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["stackmark", "-v", "--config", "x.toml", "inspect", "MyApp.Worker"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Inspect { type_name } if type_name == "MyApp.Worker"));
    }
}
