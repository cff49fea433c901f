use anyhow::{Context, Result};
use athena_query::config::Config;
use athena_query::model::{ExecutionId, QueryMode, QueryOutcome, QueryRequest};
use athena_query::orchestrator::{self, LifecycleController};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "athena-query",
    version,
    about = "Run SQL on Amazon Athena and wait for the results"
)]
pub struct Cli {
    /// SQL text to run
    pub sql: Option<String>,

    /// Database the query runs against
    #[arg(long, short = 'd', env = "ATHENA_QUERY_DATABASE", default_value = "default")]
    pub database: String,

    /// Only submit the query and print its execution id
    #[arg(long)]
    pub submit_only: bool,

    /// Print the state of an existing execution instead of running SQL
    #[arg(long, value_name = "EXECUTION_ID", conflicts_with_all = ["sql", "submit_only"])]
    pub status: Option<String>,

    /// TOML config file (defaults to <config dir>/athena-query/config.toml)
    #[arg(long, env = "ATHENA_QUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// AWS region of the Athena endpoint
    #[arg(long, env = "ATHENA_QUERY_REGION")]
    pub region: Option<String>,

    /// IAM role ARN to assume
    #[arg(long, env = "ATHENA_QUERY_ROLE")]
    pub role: Option<String>,

    /// S3 prefix Athena writes results to
    #[arg(long, env = "ATHENA_QUERY_OUTPUT_LOCATION")]
    pub output_location: Option<String>,

    /// Static access key id (requires --secret-access-key)
    #[arg(long, env = "ATHENA_QUERY_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,

    #[arg(long, env = "ATHENA_QUERY_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    #[arg(long, env = "ATHENA_QUERY_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Delay between status checks
    #[arg(long)]
    pub poll_interval: Option<humantime::Duration>,

    /// Give up waiting (and cancel the execution) after this long
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Extra attempts for failed status/result lookups
    #[arg(long)]
    pub lookup_retries: Option<u32>,

    /// Drop the first result row (the header Athena echoes for SELECT)
    #[arg(long, conflicts_with = "keep_header")]
    pub skip_header: bool,

    /// Keep the first result row even if the config file skips it
    #[arg(long)]
    pub keep_header: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,
}

/// Load the config file and apply command-line overrides on top.
pub fn build_config(args: &Cli) -> Result<Config> {
    let mut cfg = Config::load(args.config.as_deref()).context("failed to load config")?;

    let overrides = [
        (&mut cfg.region, &args.region),
        (&mut cfg.role, &args.role),
        (&mut cfg.access_key_id, &args.access_key_id),
        (&mut cfg.secret_access_key, &args.secret_access_key),
        (&mut cfg.session_token, &args.session_token),
    ];
    for (slot, value) in overrides {
        if value.is_some() {
            slot.clone_from(value);
        }
    }
    if let Some(loc) = &args.output_location {
        cfg.output_location = loc.clone();
    }
    if let Some(d) = args.poll_interval {
        cfg.poll_interval = Duration::from(d);
    }
    if let Some(d) = args.timeout {
        cfg.timeout = Duration::from(d);
    }
    if let Some(n) = args.lookup_retries {
        cfg.lookup_retries = n;
    }
    if args.skip_header {
        cfg.skip_header = true;
    } else if args.keep_header {
        cfg.skip_header = false;
    }
    Ok(cfg)
}

/// Translate arguments into a request; `None` when there is nothing to run.
pub fn build_request(args: &Cli) -> Option<QueryRequest> {
    if let Some(id) = &args.status {
        return Some(QueryRequest::status(ExecutionId::new(id.clone())));
    }
    let sql = args.sql.as_deref()?;
    if args.submit_only {
        Some(QueryRequest::submit(sql, &args.database))
    } else {
        Some(QueryRequest::run(sql, &args.database))
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // An empty invocation touches neither the config file nor the service.
    let outcome = match build_request(&args) {
        None => None,
        Some(req) => {
            let cfg = build_config(&args)?;
            let controller = orchestrator::connect(Some(&cfg))
                .await
                .context("failed to set up Athena client")?;
            if req.mode == QueryMode::RunToCompletion {
                Some(run_interruptible(&controller, &req).await?)
            } else {
                controller
                    .execute(Some(&req))
                    .await
                    .context("query failed")?
            }
        }
    };

    if args.silent {
        return Ok(());
    }

    let (out_tx, out_handle) = spawn_output_writer();
    match outcome {
        None => {
            let _ = out_tx.send(OutputLine::Stderr(
                "No SQL or --status given; nothing to do.".into(),
            ));
        }
        Some(outcome) if args.json => {
            let out = serde_json::to_string_pretty(&outcome)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        }
        Some(outcome) => {
            for line in crate::text_summary::build_text_summary(&outcome).lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Submit, then wait for completion; Ctrl-C asks the service to stop the execution.
async fn run_interruptible(
    controller: &LifecycleController,
    request: &QueryRequest,
) -> Result<QueryOutcome> {
    let execution_id = controller
        .submit(request)
        .await
        .context("query submission failed")?;

    tokio::select! {
        res = controller.complete(execution_id.clone()) => res.context("query failed"),
        _ = tokio::signal::ctrl_c() => {
            controller
                .cancel(&execution_id)
                .await
                .context("failed to cancel after interrupt")?;
            Err(anyhow::anyhow!(
                "interrupted; cancellation requested for execution {execution_id}"
            ))
        }
    }
}
