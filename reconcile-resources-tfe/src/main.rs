use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{bail, Context, Result};
use clap::{ColorChoice, CommandFactory, Parser, Subcommand};
use reconcile_resource::diff::{plan, Plan};
use reconcile_resource::{Properties, ResourceRecord};
use reconcile_resources_tfe::import::ImportId;
use reconcile_resources_tfe::policy::CustomAccessBoundary;
use reconcile_resources_tfe::schema::{schema_version, team_access_schema, SCHEMA_VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

mod logging;

fn main() {
    let args = Args::parse();
    handle_result(run(args));
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("{}", error_message(&e));
            exit(1);
        }
    }
}

fn error_message(e: &anyhow::Error) -> String {
    format!("reconcile-resources-tfe error: {}, {}", e.root_cause(), e)
}

fn run(args: Args) -> Result<()> {
    logging::set_up(&logging::Options {
        verbose: args.options.verbose,
        color: args.options.color,
    })?;

    match &args.command {
        Commands::Schema { version } => {
            let version = version.unwrap_or(SCHEMA_VERSION);
            let schema = schema_version(version)
                .with_context(|| format!("unknown schema version {}", version))?;
            print_json(&schema)
        }
        Commands::Validate { record } => {
            let report = validate_record_file(record)?;
            print_json(&report)
        }
        Commands::Plan { prior, desired } => {
            let plan = plan_files(prior, desired)?;
            print_json(&plan)
        }
        Commands::ParseImportId { id } => {
            let id: ImportId = id.parse()?;
            print_json(&id)
        }
        Commands::GenerateMan => {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        }
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(
                *shell,
                &mut cmd,
                "reconcile-resources-tfe",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Could not parse {}", path.display()))
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationReport {
    schema_version: u64,
    /// Whether the record must go through the state upgraders first
    needs_upgrade: bool,
}

/// Check a persisted record against the schema of the version it was
/// written with. Older records are reported as such; upgrading them needs
/// the remote.
fn validate_record_file(path: &Path) -> Result<ValidationReport> {
    let record: ResourceRecord = read_json(path)?;
    let schema = match schema_version(record.schema_version) {
        Some(schema) => schema,
        None => bail!(
            "{}: unknown schema version {} (current is {})",
            path.display(),
            record.schema_version,
            SCHEMA_VERSION
        ),
    };
    debug!(version = record.schema_version, "validating record");
    schema
        .validate(&record.properties)
        .with_context(|| format!("{} is not a valid record", path.display()))?;
    Ok(ValidationReport {
        schema_version: record.schema_version,
        needs_upgrade: record.schema_version != SCHEMA_VERSION,
    })
}

/// Plan from a persisted record to desired properties. Either file may hold
/// `null` for "absent". The prior record is taken as is, without refreshing.
fn plan_files(prior: &Path, desired: &Path) -> Result<Plan> {
    let prior: Option<ResourceRecord> = read_json(prior)?;
    let desired: Option<Properties> = read_json(desired)?;
    if let Some(prior) = &prior {
        if prior.schema_version != SCHEMA_VERSION {
            bail!(
                "prior record is at schema version {}; it must be upgraded to version {} first",
                prior.schema_version,
                SCHEMA_VERSION
            );
        }
    }
    let plan = plan(
        &team_access_schema(),
        &CustomAccessBoundary,
        prior.as_ref(),
        desired.as_ref(),
    )?;
    Ok(plan)
}

/// Team access resource adapter: inspect schemas, records and plans
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug, Clone)]
struct Options {
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resource schema as JSON
    Schema {
        /// Schema version to print; defaults to the current one
        #[arg(long)]
        version: Option<u64>,
    },

    /// Validate a persisted record
    Validate {
        /// JSON file holding the record
        record: PathBuf,
    },

    /// Compute the plan from a prior record to a desired state
    Plan {
        /// JSON file holding the prior record, or `null`
        prior: PathBuf,
        /// JSON file holding the desired properties, or `null`
        desired: PathBuf,
    },

    /// Split an import identifier into its parts
    ParseImportId {
        /// `<ORGANIZATION>/<WORKSPACE>/<TEAM ACCESS ID>`
        id: String,
    },

    /// Generate markdown documentation
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
