//! Command-line interface.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::SchemaConfig;
use crate::document::load_file_with;
use crate::error::Result;
use crate::provider::XmlLicenseProvider;
use crate::schema::SchemaProvider;

/// Exit status when every file was processed.
pub const SUCCESS_STATUS: i32 = 0;

/// Exit status when some files were skipped with warnings.
pub const WARNING_STATUS: i32 = 64;

/// SPDX License XML tool - validate License XML and derive license text.
#[derive(Parser)]
#[command(name = "spdx-license-xml")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this schema file instead of fetching the canonical schema
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Never fetch the schema over the network
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse one License XML file and print the derived records.
    Parse {
        /// License XML file
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Check every License XML file below a directory.
    Check {
        /// Directory containing License XML files
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl Cli {
    /// Schema configuration from the environment, adjusted by the flags.
    pub fn schema_config(&self) -> SchemaConfig {
        let mut config = SchemaConfig::from_env();
        if self.offline {
            config = config.without_url();
        }
        if let Some(path) = &self.schema {
            config = config.with_override_path(path);
        }
        config
    }
}

/// Run the CLI and return the process exit status.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    let schemas = SchemaProvider::new(cli.schema_config());

    match &cli.command {
        Commands::Parse { file, format } => parse_command(file, *format, &schemas),
        Commands::Check { dir } => check_command(dir, &schemas),
    }
}

/// Execute the parse command.
fn parse_command(file: &Path, format: OutputFormat, schemas: &SchemaProvider) -> Result<i32> {
    let contents = load_file_with(file, schemas)?;
    let output = match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(&contents)?,
        OutputFormat::Json => serde_json::to_string_pretty(&contents)?,
    };
    println!("{output}");
    Ok(SUCCESS_STATUS)
}

/// Execute the check command.
fn check_command(dir: &Path, schemas: &SchemaProvider) -> Result<i32> {
    let mut provider = XmlLicenseProvider::from_dir(dir, schemas)?;

    println!(
        "{} {} license XML files in {}",
        style("Checking").bold(),
        style(provider.files().len()).cyan(),
        dir.display()
    );
    println!();

    let pb = ProgressBar::new(provider.files().len() as u64);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40}] {pos}/{len} {msg}")
            .expect("valid template"),
    );

    let contents = provider.contents(|path| {
        if let Some(name) = path.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        pb.inc(1);
    });
    pb.finish_and_clear();

    println!("  Licenses: {}", style(contents.licenses.len()).green());
    println!("  Exceptions: {}", style(contents.exceptions.len()).green());

    let warnings = provider.warnings();
    if warnings.is_empty() {
        println!();
        println!("{}", style("All files are valid").green().bold());
        return Ok(SUCCESS_STATUS);
    }

    println!("  Warnings: {}", style(warnings.len()).yellow().bold());
    println!();
    for warning in warnings {
        println!("{} {warning}", style("warning:").yellow().bold());
    }
    Ok(WARNING_STATUS)
}
