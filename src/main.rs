use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use sg_importer::config::{Config, ScriptFlavor};
use sg_importer::logging;
use sg_importer::pipeline::{Pipeline, RulePaths, RulePipelineResult};
use sg_importer::storage::FileSink;

#[derive(Parser)]
#[command(name = "sg_importer")]
#[command(about = "Generate Terraform blocks and import scripts from security group exports")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./sg_importer.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for this crate
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Skip every row of this normalized group name (repeatable)
    #[arg(long = "exclude-group", global = true)]
    exclude_groups: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate security group blocks
    Groups {
        /// Group export CSV
        #[arg(long)]
        input: PathBuf,
        /// Destination for the generated blocks
        #[arg(long)]
        output: PathBuf,
    },
    /// Generate rule blocks and the import script
    Rules {
        /// Rule export CSV
        #[arg(long)]
        input: PathBuf,
        /// Remote rule listing (describe-security-group-rules JSON)
        #[arg(long)]
        remote: PathBuf,
        /// Destination for the generated blocks
        #[arg(long)]
        output: PathBuf,
        /// Destination for the import script
        #[arg(long)]
        script: PathBuf,
        /// Write a JSON run report here
        #[arg(long)]
        report: Option<PathBuf>,
        /// Override the configured script flavor
        #[arg(long, value_enum)]
        flavor: Option<ScriptFlavor>,
    },
}

fn print_rule_summary(result: &RulePipelineResult) {
    println!("✅ Blocks generated: {}", result.blocks_generated);
    println!("📜 Import commands generated: {}", result.imports_generated);
    println!("🔑 Distinct remote rules: {}", result.distinct_remote_identifiers);
    if result.excluded_rows > 0 {
        println!("⏭️  Rows skipped for excluded groups: {}", result.excluded_rows);
    }
    if !result.unmatched.is_empty() {
        println!("\n⚠️  Rules without a matching remote rule:");
        for identifier in &result.unmatched {
            println!("   - {}", identifier);
        }
    }
    if !result.duplicates.is_empty() {
        println!("\n⚠️  Remote rules imported more than once:");
        for duplicate in &result.duplicates {
            println!(
                "   - {} ({} times): {}",
                duplicate.remote_identifier,
                duplicate.count,
                duplicate.addresses.join(", ")
            );
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.excluded_groups.extend(cli.exclude_groups);

    let mut sink = FileSink::new();

    match cli.command {
        Commands::Groups { input, output } => {
            println!("🚀 Generating security group blocks...");
            let pipeline = Pipeline::new(config);
            let result = pipeline
                .run_groups(&input, &output, &mut sink)
                .with_context(|| format!("Group pipeline failed for {}", input.display()))?;

            println!("✅ Blocks generated: {}", result.blocks_generated);
            if result.excluded_rows > 0 {
                println!("⏭️  Rows skipped for excluded groups: {}", result.excluded_rows);
            }
            println!("💾 Written to {}", output.display());
        }
        Commands::Rules {
            input,
            remote,
            output,
            script,
            report,
            flavor,
        } => {
            println!("🚀 Generating security group rule blocks and import script...");
            if let Some(flavor) = flavor {
                config.import.flavor = flavor;
            }
            let pipeline = Pipeline::new(config);
            let paths = RulePaths {
                input,
                remote,
                output,
                script,
                report,
            };
            let result = pipeline
                .run_rules(&paths, &mut sink)
                .with_context(|| format!("Rule pipeline failed for {}", paths.input.display()))?;

            print_rule_summary(&result);
            println!(
                "💾 Written to {} and {}",
                paths.output.display(),
                paths.script.display()
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let _guard = logging::init_logging(cli.verbose, cli.log_dir.as_deref())
        .context("Failed to initialize logging")?;
    info!("sg_importer {}", env!("CARGO_PKG_VERSION"));

    run(cli).map_err(|e| {
        error!("{:#}", e);
        e
    })
}
