use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flexi_logger::Logger;
use log::info;

use fedplan::catalog::ClusterMetadata;
use fedplan::config::OptimizerConfig;
use fedplan::query::planner::OptimizerContext;
use fedplan::query::sql_node::SqlSelect;
use fedplan::readwrite::{DiscoveryExport, ReadwriteSplittingRuleConfig, ReadwriteSplittingRuleQuery};

#[derive(Parser)]
#[command(author, version, about = "fedplan - federated query optimizer")]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a statement and print the executable plan with its cost
    Explain {
        /// Cluster metadata (JSON)
        #[arg(short, long)]
        metadata: PathBuf,

        /// Statement to optimize (JSON)
        #[arg(short, long)]
        statement: PathBuf,

        /// Logical database the statement is addressed to
        #[arg(short, long)]
        database: String,

        /// Schema the statement is addressed to
        #[arg(long)]
        schema: String,

        /// Optimizer configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the configured readwrite-splitting rules
    ShowRules {
        /// Readwrite-splitting rule configuration (JSON)
        #[arg(short, long)]
        rules: PathBuf,

        /// Sources exported by discovery (JSON)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
}

fn explain(metadata: &Path, statement: &Path, database: &str, schema: &str, config: Option<&Path>) -> Result<()> {
    let metadata = ClusterMetadata::from_file(metadata)
        .with_context(|| format!("Failed to load metadata from {}", metadata.display()))?;
    let config = match config {
        Some(path) => OptimizerConfig::from_file(path)
            .with_context(|| format!("Failed to load optimizer config from {}", path.display()))?,
        None => OptimizerConfig::default(),
    };
    let text = std::fs::read_to_string(statement)
        .with_context(|| format!("Failed to read statement from {}", statement.display()))?;
    let select: SqlSelect = serde_json::from_str(&text).context("Failed to parse statement")?;

    let context = OptimizerContext::new(&metadata, config).context("Invalid optimizer configuration")?;
    let optimized = context.optimize(database, schema, &select)?;
    info!("Optimized statement for {}.{}", database, schema);
    println!("{}", optimized);
    Ok(())
}

fn show_rules(rules: &Path, export: Option<&Path>) -> Result<()> {
    let config = ReadwriteSplittingRuleConfig::from_file(rules)
        .with_context(|| format!("Failed to load rules from {}", rules.display()))?;
    let export = match export {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read discovery export from {}", path.display()))?;
            serde_json::from_str(&text).context("Failed to parse discovery export")?
        }
        None => DiscoveryExport::default(),
    };

    let rows: Vec<Vec<String>> = ReadwriteSplittingRuleQuery::new(&config, &export).rows()
        .iter()
        .map(|row| row.cells())
        .collect();
    display_rows(&ReadwriteSplittingRuleQuery::COLUMN_NAMES, &rows);
    Ok(())
}

fn display_rows(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len().max(3)).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.len());
        }
    }

    print!("|");
    for (header, width) in headers.iter().zip(&widths) {
        print!(" {:<width$} |", header, width = width);
    }
    println!();

    print!("+");
    for width in &widths {
        print!("{:-<width$}+", "", width = width + 2);
    }
    println!();

    for row in rows {
        print!("|");
        for (value, width) in row.iter().zip(&widths) {
            print!(" {:<width$} |", value, width = width);
        }
        println!();
    }
    println!("({} rows)", rows.len());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logger = Logger::try_with_str(&cli.log_level)
        .context("Invalid log level")?
        .start()
        .context("Failed to initialize logging")?;

    match &cli.command {
        Commands::Explain { metadata, statement, database, schema, config } => {
            explain(metadata, statement, database, schema, config.as_deref())
        }
        Commands::ShowRules { rules, export } => show_rules(rules, export.as_deref()),
    }
}
