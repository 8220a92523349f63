//! CLI command implementations
//!
//! - `check`: load config, compile the schema, print the tables
//! - `run`: load config and store, push every request through the latency
//!   wrapper and request queue, print completions in order, save the store
//!
//! Both commands own stdout for their JSON lines; log lines go to stderr.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::CruddyConfig;
use crate::engine::CruddyDb;
use crate::latency::{LatencyDb, Request};
use crate::observability::Logger;
use crate::queue::{Completion, RequestQueue};
use crate::schema::compile;

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{read_requests, write_json_to};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Run { config, script } => run_script(&config, script.as_deref()),
    }
}

fn load_config(config_path: &Path) -> CliResult<CruddyConfig> {
    Logger::set_stderr_only(true);
    let config = CruddyConfig::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    Ok(config)
}

/// Compile the configured schema and print its tables
pub fn check(config_path: &Path) -> CliResult<()> {
    check_to(config_path, &mut io::stdout())
}

/// `check`, writing its report to `out`
pub fn check_to<W: Write>(config_path: &Path, out: &mut W) -> CliResult<()> {
    let config = load_config(config_path)?;
    let schema = compile(&config.schema_decl()?)?;

    let mut tables = Map::new();
    for table in schema.tables() {
        tables.insert(table.name.clone(), serde_json::to_value(&table.fields)?);
    }

    write_json_to(
        out,
        &json!({
            "status": "ok",
            "namespace": config.namespace,
            "tables": tables,
        }),
    )
}

/// Execute requests from `script` (or stdin) and print one completion per line
pub fn run_script(config_path: &Path, script: Option<&Path>) -> CliResult<()> {
    run_script_to(config_path, script, &mut io::stdout())
}

/// `run`, writing completions and the summary to `out`
pub fn run_script_to<W: Write>(config_path: &Path, script: Option<&Path>, out: &mut W) -> CliResult<()> {
    let config = load_config(config_path)?;
    let requests = read_requests(script)?;

    let store = Arc::new(config.open_store()?);
    let randoms = config.randoms();
    let db = CruddyDb::with_randoms(&config.schema_decl()?, store.clone(), randoms.clone())?;
    let delay = config.latency.delay(&randoms);
    let db = LatencyDb::new(db).with_delays(delay.clone(), delay);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let (completed, failed) = runtime.block_on(execute_all(db, requests, &mut *out))?;

    if let Some(path) = config.data_path() {
        store.medium().save_to(&path)?;
    }

    write_json_to(
        out,
        &json!({
            "status": "ok",
            "completed": completed,
            "failed": failed,
        }),
    )
}

async fn execute_all<W: Write>(db: LatencyDb, requests: Vec<Request>, out: &mut W) -> CliResult<(u64, u64)> {
    let queue = RequestQueue::start(db);
    let tickets = requests
        .into_iter()
        .map(|request| queue.submit(request))
        .collect::<Result<Vec<_>, _>>()?;

    let mut failed = 0;
    for ticket in tickets {
        let completion = ticket.wait().await?;
        if !completion.response.success {
            failed += 1;
        }
        write_json_to(out, &completion_line(&completion))?;
    }

    let completed = queue.completed();
    queue.shutdown().await?;
    Ok((completed, failed))
}

fn completion_line(completion: &Completion) -> Value {
    json!({
        "sequence": completion.sequence,
        "op": completion.request.op(),
        "target": completion.request.target(),
        "response": completion.response,
        "elapsed_ms": u64::try_from(completion.elapsed.as_millis()).unwrap_or(u64::MAX),
    })
}
