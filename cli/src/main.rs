use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use table_alter_core::{
    AlterTableHandler, ChangeAction, ExecutionArguments, SchemaConnection, TableSchema,
};
use table_alter_sqlite::SqliteBackend;

const DEFAULT_PREFIX: &str = "ta_";

#[derive(Debug, Parser)]
#[command(name = "table-alter")]
#[command(about = "Plan and apply table schema alterations over a SQLite catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema catalog tables in a database file.
    Init(InitArgs),
    /// Define a new table from a JSON schema.
    Create(CreateArgs),
    /// Print a stored table schema as JSON, or list stored tables.
    Show(ShowArgs),
    /// Apply (or simulate) a JSON action plan against a table.
    Apply(ApplyArgs),
}

#[derive(Debug, Args)]
struct InitArgs {
    /// SQLite database file (created if missing).
    #[arg(long)]
    db: PathBuf,
    /// Catalog table prefix (alphanumerics and underscores).
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// SQLite database file.
    #[arg(long)]
    db: PathBuf,
    /// Table schema JSON file, or '-' for stdin.
    #[arg(long)]
    schema: PathBuf,
    /// Drop and replace an existing table of the same name.
    #[arg(long)]
    replace: bool,
    /// Catalog table prefix.
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// SQLite database file.
    #[arg(long)]
    db: PathBuf,
    /// Table to print; lists all stored tables when omitted.
    #[arg(long)]
    table: Option<String>,
    /// Catalog table prefix.
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

#[derive(Debug, Args)]
struct ApplyArgs {
    /// SQLite database file.
    #[arg(long)]
    db: PathBuf,
    /// Table to alter.
    #[arg(long)]
    table: String,
    /// Action plan JSON file (array of actions), or '-' for stdin.
    #[arg(long)]
    plan: PathBuf,
    /// Compute requirements and validate the plan without changing anything.
    #[arg(long)]
    simulate: bool,
    /// Print only the computed requirement set.
    #[arg(long)]
    requirements_only: bool,
    /// Run without a wrapping transaction.
    #[arg(long)]
    no_transaction: bool,
    /// Catalog table prefix.
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Init(args) => run_init(args),
        Command::Create(args) => run_create(args),
        Command::Show(args) => run_show(args),
        Command::Apply(args) => run_apply(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn open_backend(db: &Path, prefix: &str) -> Result<SqliteBackend, String> {
    SqliteBackend::open(db, prefix)
        .map_err(|err| format!("Failed to open database '{}': {err}", db.display()))
}

fn read_input(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        Ok(buffer)
    } else {
        fs::read_to_string(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))
    }
}

fn run_init(args: InitArgs) -> Result<(), String> {
    let mut backend = open_backend(&args.db, &args.prefix)?;
    backend
        .init_catalog()
        .map_err(|err| format!("Failed to initialize catalog: {err}"))?;
    println!(
        "Initialized catalog with prefix '{}' in {}",
        args.prefix,
        args.db.display()
    );
    Ok(())
}

fn run_create(args: CreateArgs) -> Result<(), String> {
    let json = read_input(&args.schema)?;
    let mut schema: TableSchema =
        serde_json::from_str(&json).map_err(|err| format!("Invalid table schema JSON: {err}"))?;

    let mut backend = open_backend(&args.db, &args.prefix)?;
    backend
        .create_table(&mut schema, args.replace)
        .map_err(|err| format!("Failed to create table '{}': {err}", schema.name))?;
    println!(
        "Created table '{}' with {} field(s)",
        schema.name,
        schema.field_count()
    );
    Ok(())
}

fn run_show(args: ShowArgs) -> Result<(), String> {
    let mut backend = open_backend(&args.db, &args.prefix)?;

    match args.table {
        Some(name) => {
            let schema = backend
                .table_schema(&name)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| format!("Table not found: {name}"))?;
            let json = serde_json::to_string_pretty(&schema)
                .map_err(|err| format!("Failed to serialize schema: {err}"))?;
            println!("{json}");
        }
        None => {
            let names = backend
                .table_names()
                .map_err(|err| format!("Failed to list tables: {err}"))?;
            for name in names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn run_apply(args: ApplyArgs) -> Result<(), String> {
    let json = read_input(&args.plan)?;
    let actions: Vec<ChangeAction> =
        serde_json::from_str(&json).map_err(|err| format!("Invalid action plan JSON: {err}"))?;
    if actions.is_empty() {
        return Err("Action plan is empty".to_string());
    }

    let mut backend = open_backend(&args.db, &args.prefix)?;
    let mut handler = AlterTableHandler::new(&mut backend);
    handler.set_actions(actions);

    let exec_args = ExecutionArguments {
        simulate: args.simulate,
        only_compute_requirements: args.requirements_only,
        within_transaction: !args.no_transaction,
    };
    let outcome = handler
        .execute(&args.table, &exec_args)
        .map_err(|err| format!("Alteration failed: {err}"))?;

    println!("requirements: {}", outcome.requirements);
    if args.requirements_only {
        return Ok(());
    }
    if args.simulate {
        println!("simulation only; no changes were made");
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&outcome.table)
        .map_err(|err| format!("Failed to serialize schema: {err}"))?;
    println!("{json}");
    Ok(())
}
