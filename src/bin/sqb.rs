//! sqb — compile entity queries to SQL from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Active products in a category, second page of 20
//! sqb build -c catalog.toml Product \
//!     --include CategoryId \
//!     --where "IsActive && Category.Name.contains('tools')" \
//!     --order -Price --page 1 --page-size 20
//!
//! # Show the join graph and predicate tree
//! sqb explain -c catalog.toml Order --include "UserId>User.CreatedBy"
//!
//! # List entities with their SQL types
//! sqb catalog -c catalog.toml --dialect postgres
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use sqb::ast::{Predicate, TableAlias};
use sqb::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqb")]
#[command(author = "SQB Contributors")]
#[command(version)]
#[command(about = "Typed SELECT builder: entities, includes and filters to SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqb build -c catalog.toml User --where 'IsActive' --order Id --skip 10 --take 5
    sqb build -c catalog.toml Order --include UserId --where \"User.Email.ends_with('@x.com')\"
    sqb explain -c catalog.toml Order --include 'UserId>User.CreatedBy'")]
struct Cli {
    /// Settings file (default: ./sqb.toml, then the user config dir)
    #[arg(long, global = true, env = "SQB_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output (debug logging unless SQB_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the SQL for a query
    Build {
        #[command(flatten)]
        query: QueryArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the join graph and predicate tree of a query
    Explain {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// List catalog entities with mapped SQL types
    Catalog {
        /// Catalog TOML file
        #[arg(short, long, env = "SQB_CATALOG")]
        catalog: PathBuf,

        /// Dialect for type names
        #[arg(long, value_enum)]
        dialect: Option<Dialect>,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Catalog TOML file
    #[arg(short, long, env = "SQB_CATALOG")]
    catalog: PathBuf,

    /// Root entity
    root: String,

    /// Include chain: `Field>Entity.Field>...`; the first hop starts at the root
    #[arg(short, long)]
    include: Vec<String>,

    /// Filter expression (repeatable, AND-combined)
    #[arg(short = 'w', long = "where")]
    filter: Vec<String>,

    /// Sort key: `Field`, `+Field` or `-Field`
    #[arg(short, long, allow_hyphen_values = true)]
    order: Vec<String>,

    /// Group-by field
    #[arg(short, long)]
    group: Vec<String>,

    #[arg(long, allow_hyphen_values = true)]
    skip: Option<i64>,

    #[arg(long, allow_hyphen_values = true)]
    take: Option<i64>,

    /// Zero-based page index (uses --page-size)
    #[arg(long, conflicts_with_all = ["skip", "take"])]
    page: Option<i64>,

    #[arg(long, default_value_t = 20, requires = "page")]
    page_size: i64,

    #[arg(long, value_enum)]
    dialect: Option<Dialect>,

    #[arg(long, value_enum)]
    literal_mode: Option<LiteralMode>,

    #[arg(long, value_enum)]
    layout: Option<Layout>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sqb=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SQB_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match &cli.command {
        Commands::Build { query, format } => {
            let catalog = load_catalog(&query.catalog)?;
            let builder = compose(&catalog, query, settings)?;
            print_query(&builder.build()?, format)
        }
        Commands::Explain { query } => {
            let catalog = load_catalog(&query.catalog)?;
            let builder = compose(&catalog, query, settings)?;
            explain(&builder)
        }
        Commands::Catalog { catalog, dialect } => {
            let catalog = load_catalog(catalog)?;
            show_catalog(&catalog, dialect.unwrap_or(settings.dialect));
            Ok(())
        }
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    Catalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

fn compose<'c>(
    catalog: &'c Catalog,
    args: &QueryArgs,
    mut settings: Settings,
) -> Result<QueryBuilder<'c, Catalog>> {
    let root = args.root.as_str();
    let mut query = QueryBuilder::new(catalog, root)?;

    for chain in &args.include {
        for (hop, step) in chain.split('>').enumerate() {
            let source = parse_field(root, step.trim())
                .with_context(|| format!("Invalid include step '{}'", step))?;
            query = if hop == 0 {
                query.include(source)?
            } else {
                query.then_include(source)?
            };
        }
    }

    for text in &args.filter {
        let expr = parse_filter(root, text).with_context(|| format!("Invalid filter '{}'", text))?;
        query = query.filter(expr)?;
    }

    for text in &args.group {
        let field = parse_field(root, text).with_context(|| format!("Invalid group key '{}'", text))?;
        query = query.group_by(field)?;
    }

    for text in &args.order {
        let (field, direction) =
            parse_sort_key(root, text).with_context(|| format!("Invalid sort key '{}'", text))?;
        query = query.order_by(field, direction)?;
    }

    if let Some(index) = args.page {
        query = query.page(index, args.page_size);
    }
    if let Some(n) = args.skip {
        query = query.skip(n);
    }
    if let Some(n) = args.take {
        query = query.take(n);
    }

    if let Some(dialect) = args.dialect {
        settings.dialect = dialect;
    }
    if let Some(mode) = args.literal_mode {
        settings.literal_mode = mode;
    }
    if let Some(layout) = args.layout {
        settings.layout = layout;
    }

    Ok(query.settings(settings))
}

fn print_query(query: &SqlQuery, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(query)?);
        }
        OutputFormat::Text => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", query.sql.white());

            println!();
            println!("{}", "Result Columns:".cyan());
            for column in query.columns.iter() {
                println!(
                    "  {:32} {}",
                    format!("{}.{}", column.entity, column.field).white(),
                    column.alias.yellow()
                );
            }

            if !query.params.is_empty() {
                println!();
                println!("{}", "Parameters:".cyan());
                for (i, value) in query.params.iter().enumerate() {
                    println!("  #{} = {}", i, value.to_string().yellow());
                }
            }
        }
    }
    Ok(())
}

fn explain(query: &QueryBuilder<'_, Catalog>) -> Result<()> {
    let graph = query.graph();

    println!("{}", "Query Explanation".cyan().bold());
    println!();
    println!("  {} {} as {}", "Root:".dimmed(), graph.root().white(), TableAlias::ROOT.to_string().yellow());

    if !graph.joins().is_empty() {
        println!("  {}", "Joins:".dimmed());
        for join in graph.joins() {
            println!(
                "    {} {} as {} on {}.{} = {}.{}",
                join.key.to_string().cyan(),
                join.target_entity.white(),
                join.alias.to_string().yellow(),
                join.source_alias,
                join.fk_column,
                join.alias,
                join.target_pk_column
            );
        }
    }

    if !query.filters().is_empty() {
        println!("  {}", "Filters:".dimmed());
        for predicate in query.filters() {
            print_predicate(predicate, 2);
        }
    }

    if !query.group_keys().is_empty() {
        println!("  {}", "Group by:".dimmed());
        for key in query.group_keys() {
            println!("    {}.{}", key.alias, key.column.white());
        }
    }

    if !query.order_keys().is_empty() {
        println!("  {}", "Order by:".dimmed());
        for key in query.order_keys() {
            let arrow = match key.direction {
                SortDirection::Asc => "↑",
                SortDirection::Desc => "↓",
            };
            println!("    {}.{} {}", key.column.alias, key.column.column.white(), arrow.cyan());
        }
    }

    println!();
    println!("{}", "Generated SQL:".green().bold());
    println!("{}", query.build_query()?.white());
    Ok(())
}

fn print_predicate(predicate: &Predicate, depth: usize) {
    let indent = "  ".repeat(depth);
    match predicate {
        Predicate::Comparison { column, op, value } => {
            println!(
                "{}{}.{} {} {}",
                indent,
                column.alias,
                column.column.white(),
                op.to_string().cyan(),
                value.to_string().yellow()
            );
        }
        Predicate::Group { op, children } => {
            println!("{}{}", indent, op.to_string().magenta().bold());
            for child in children {
                print_predicate(child, depth + 1);
            }
        }
    }
}

fn show_catalog(catalog: &Catalog, dialect: Dialect) {
    let generator = dialect.generator();

    for entity in catalog.entities() {
        println!(
            "{} {} {}",
            entity.name.cyan().bold(),
            "→".dimmed(),
            generator.quote_identifier(&entity.table).white()
        );
        for field in &entity.fields {
            let pk = if field.name == entity.primary_key_field() { "PK" } else { "" };
            let fk = field
                .foreign_key
                .as_deref()
                .map(|target| format!("→ {}", target))
                .unwrap_or_default();
            println!(
                "  {:2} {:24} {:18} {}",
                pk.yellow(),
                field.name.white(),
                generator.sql_type(field.field_type).dimmed(),
                fk.cyan()
            );
        }
        println!();
    }
}
