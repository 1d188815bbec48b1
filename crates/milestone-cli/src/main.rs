// crates/milestone-cli/src/main.rs
// ============================================================================
// Module: Milestone CLI Entry Point
// Description: Command dispatcher for milestone projects and due-date reads.
// Purpose: Expose the project lifecycle and due-date queries over a configured store.
// Dependencies: clap, milestone-config, milestone-core, milestone-store-sqlite,
//               serde, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The milestone CLI loads `milestone.toml`, opens the configured key-value
//! store, and runs one project or due-date operation per invocation. Results
//! are printed as pretty JSON on stdout; errors go to stderr with exit code 2
//! for caller mistakes (validation, conflicts, unknown projects) and 1 for
//! everything else. Inputs are untrusted: grid files are read with a hard size
//! limit before parsing.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use milestone_config::CONFIG_ENV_VAR;
use milestone_config::DEFAULT_CONFIG_NAME;
use milestone_config::MilestoneConfig;
use milestone_config::StoreType;
use milestone_core::BatchWriter;
use milestone_core::DueDateService;
use milestone_core::GridDocument;
use milestone_core::InMemoryKeyValueStore;
use milestone_core::OperationContext;
use milestone_core::ProjectError;
use milestone_core::ProjectService;
use milestone_core::SharedKeyValueStore;
use milestone_core::runtime::AuditSink;
use milestone_core::runtime::CreateProjectRequest;
use milestone_core::runtime::Deadline;
use milestone_core::runtime::FileAuditSink;
use milestone_core::runtime::NoopAuditSink;
use milestone_core::runtime::StderrAuditSink;
use milestone_core::runtime::ThreadSleeper;
use milestone_core::runtime::UpdateProjectRequest;
use milestone_store_sqlite::SqliteKeyValueStore;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum grid document size accepted from disk.
const MAX_GRID_FILE_BYTES: usize = 256 * 1024;
/// Exit code for caller mistakes.
const CLIENT_ERROR_EXIT: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "milestone", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Optional config file path (defaults to milestone.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Project lifecycle operations.
    Project {
        /// Selected project subcommand.
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Due-date queries.
    Due {
        /// Selected due-date subcommand.
        #[command(subcommand)]
        command: DueCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Project subcommands.
#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// Create a project from a grid document.
    Create(ProjectCreateCommand),
    /// Apply a grid document to an existing project.
    Update(ProjectUpdateCommand),
    /// Print a project with its complete grid.
    Get(ProjectGetCommand),
    /// List project summaries.
    List,
}

/// Due-date subcommands.
#[derive(Subcommand, Debug)]
enum DueCommand {
    /// Read one page of a single day.
    Date(DueDateCommand),
    /// Read the first page of each day in a range.
    Range(DueRangeCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and open the configured store.
    Validate,
}

/// Arguments for `project create`.
#[derive(Args, Debug)]
struct ProjectCreateCommand {
    /// Project identifier.
    #[arg(long = "id", value_name = "PROJECT_ID")]
    project_id: String,
    /// Project display name.
    #[arg(long = "name", value_name = "NAME")]
    project_name: String,
    /// Path to the grid document JSON file.
    #[arg(long, value_name = "PATH")]
    grid: PathBuf,
    /// Idempotency key (UUID); reuse it to resume an interrupted create.
    #[arg(long, value_name = "UUID")]
    request_id: Option<String>,
}

/// Arguments for `project update`.
#[derive(Args, Debug)]
struct ProjectUpdateCommand {
    /// Project identifier.
    #[arg(long = "id", value_name = "PROJECT_ID")]
    project_id: String,
    /// Path to the grid document JSON file.
    #[arg(long, value_name = "PATH")]
    grid: PathBuf,
    /// Idempotency key (UUID); reuse it to resume an interrupted update.
    #[arg(long, value_name = "UUID")]
    request_id: Option<String>,
}

/// Arguments for `project get`.
#[derive(Args, Debug)]
struct ProjectGetCommand {
    /// Project identifier.
    #[arg(long = "id", value_name = "PROJECT_ID")]
    project_id: String,
}

/// Arguments for `due date`.
#[derive(Args, Debug)]
struct DueDateCommand {
    /// Day to read (`YYYY-MM-DD`).
    #[arg(long, value_name = "DATE")]
    date: String,
    /// Token from a previous page of the same day.
    #[arg(long, value_name = "TOKEN")]
    page_token: Option<String>,
    /// Page size.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

/// Arguments for `due range`.
#[derive(Args, Debug)]
struct DueRangeCommand {
    /// First day of the range (`YYYY-MM-DD`).
    #[arg(long, value_name = "DATE")]
    start: String,
    /// Number of days.
    #[arg(long, value_name = "N")]
    days: Option<u32>,
    /// Page size per day.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying the message and exit classification.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
    /// Caller mistake rather than an environment or storage failure.
    client: bool,
}

impl CliError {
    /// Constructs a failure unrelated to caller input.
    const fn new(message: String) -> Self {
        Self {
            message,
            client: false,
        }
    }

    /// Constructs a caller-input failure.
    const fn client(message: String) -> Self {
        Self {
            message,
            client: true,
        }
    }

    /// Exit code for this error.
    fn exit_code(&self) -> ExitCode {
        if self.client { ExitCode::from(CLIENT_ERROR_EXIT) } else { ExitCode::FAILURE }
    }
}

impl From<ProjectError> for CliError {
    fn from(error: ProjectError) -> Self {
        let client = error.is_client_error();
        Self {
            message: error.to_string(),
            client,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        write_stdout_line(&format!("milestone {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        write_stdout_line("usage: milestone [--config PATH] <project|due|config> ...")?;
        return Ok(ExitCode::SUCCESS);
    };
    let config = load_config(cli.config.as_deref())?;
    match command {
        Commands::Project {
            command,
        } => command_project(&config, command),
        Commands::Due {
            command,
        } => command_due(&config, command),
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(&config),
    }
}

// ============================================================================
// SECTION: Project Commands
// ============================================================================

/// Dispatches project subcommands.
fn command_project(config: &MilestoneConfig, command: ProjectCommand) -> CliResult<ExitCode> {
    let service = project_service(config)?;
    let ctx = operation_context(config);
    match command {
        ProjectCommand::Create(command) => {
            let grid = read_grid(&command.grid)?;
            let view = service.create_project(&ctx, &CreateProjectRequest {
                project_id: command.project_id,
                project_name: command.project_name,
                grid,
                request_id: command.request_id,
            })?;
            write_json(&view)?;
        }
        ProjectCommand::Update(command) => {
            let grid = read_grid(&command.grid)?;
            let view = service.update_project(&ctx, &UpdateProjectRequest {
                project_id: command.project_id,
                grid,
                request_id: command.request_id,
            })?;
            write_json(&view)?;
        }
        ProjectCommand::Get(command) => write_json(&service.get_project(&command.project_id)?)?,
        ProjectCommand::List => write_json(&service.list_projects()?)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds the project service over the configured store.
fn project_service(config: &MilestoneConfig) -> CliResult<ProjectService<SharedKeyValueStore>> {
    let store = open_store(config)?;
    let audit = audit_sink(config)?;
    let writer =
        BatchWriter::new(config.batch.writer_config(), Arc::new(ThreadSleeper), Arc::clone(&audit));
    Ok(ProjectService::new(store, writer).with_audit(audit))
}

/// Builds the operation context from the configured deadline budget.
fn operation_context(config: &MilestoneConfig) -> OperationContext {
    config.batch.deadline().map_or_else(OperationContext::default, |budget| {
        OperationContext::with_deadline(Deadline::after(budget))
    })
}

// ============================================================================
// SECTION: Due-Date Commands
// ============================================================================

/// Dispatches due-date subcommands.
fn command_due(config: &MilestoneConfig, command: DueCommand) -> CliResult<ExitCode> {
    let service = DueDateService::new(open_store(config)?, config.due_dates.service_config());
    match command {
        DueCommand::Date(command) => write_json(&service.get_due_date(
            &command.date,
            command.page_token.as_deref(),
            command.limit,
        )?)?,
        DueCommand::Range(command) => {
            write_json(&service.get_due_date_range(&command.start, command.days, command.limit)?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Reports a validated configuration after opening its store.
fn command_config_validate(config: &MilestoneConfig) -> CliResult<ExitCode> {
    if let Some(sqlite) = config.store.sqlite_config() {
        let store = SqliteKeyValueStore::new(sqlite)
            .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
        store
            .check_connection()
            .map_err(|err| CliError::new(format!("store readiness check failed: {err}")))?;
    }
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Loads configuration; falls back to defaults only when no config source exists.
fn load_config(path: Option<&Path>) -> CliResult<MilestoneConfig> {
    let implicit = path.is_none()
        && std::env::var_os(CONFIG_ENV_VAR).is_none()
        && !Path::new(DEFAULT_CONFIG_NAME).exists();
    if implicit {
        return Ok(MilestoneConfig::default());
    }
    MilestoneConfig::load(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the configured key-value store.
fn open_store(config: &MilestoneConfig) -> CliResult<SharedKeyValueStore> {
    match config.store.store_type {
        StoreType::Memory => Ok(SharedKeyValueStore::from_store(
            InMemoryKeyValueStore::with_max_batch_size(config.store.max_batch_size),
        )),
        StoreType::Sqlite => {
            let sqlite = config
                .store
                .sqlite_config()
                .ok_or_else(|| CliError::new("sqlite store requires path".to_string()))?;
            let store = SqliteKeyValueStore::new(sqlite)
                .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
            Ok(SharedKeyValueStore::from_store(store))
        }
    }
}

/// Selects the audit sink from configuration.
fn audit_sink(config: &MilestoneConfig) -> CliResult<Arc<dyn AuditSink>> {
    if !config.audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(path)
                .map_err(|err| CliError::new(format!("failed to open audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Input
// ============================================================================

/// Errors raised while reading bounded input files.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a grid document file.
fn read_grid(path: &Path) -> CliResult<GridDocument> {
    let bytes = read_bytes_with_limit(path, MAX_GRID_FILE_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read grid {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::client(format!(
            "grid {} is {size} bytes, exceeding the {limit} byte limit",
            path.display()
        )),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::client(format!("invalid grid document {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render output: {err}")))?;
    write_stdout_line(&text)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns its exit code.
fn emit_error(error: &CliError) -> ExitCode {
    let _ = write_stderr_line(&error.to_string());
    error.exit_code()
}
