use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ferry_core::impls::{InMemoryTaskQueue, LocalStore, TaskState, TaskView};
use ferry_core::ports::TaskQueue;
use ferry_core::{ExportConfig, ExportEntry, ExportHandler, ExportTask, SuccessMatcher, WorkerGroup};

#[derive(Debug, Parser)]
#[command(name = "ferry", about = "Run export tasks against local storage")]
struct Cli {
    /// Emit JSON logs.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan and execute an export manifest.
    Run {
        /// JSON array of {source, destination, change} entries.
        #[arg(long)]
        manifest: PathBuf,

        /// Directory backing `local://<root>/<key>` locations.
        #[arg(long, env = "FERRY_ROOT", default_value = ".")]
        root: PathBuf,

        /// JSON config file.
        #[arg(long, env = "FERRY_CONFIG")]
        config: Option<PathBuf>,

        /// Override the number of workers.
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Test keys against success-marker patterns.
    CheckMarker {
        #[arg(long = "pattern", required = true)]
        patterns: Vec<String>,

        keys: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct Summary {
    data_tasks: usize,
    marker_tasks: usize,
    succeeded: usize,
    failed: usize,
    markers_skipped: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    // subsequent calls are no-ops
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Run {
            manifest,
            root,
            config,
            workers,
        } => run(manifest, root, config, workers).await,
        Command::CheckMarker { patterns, keys } => check_marker(&patterns, &keys),
    }
}

async fn run(
    manifest: PathBuf,
    root: PathBuf,
    config: Option<PathBuf>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = ExportConfig::load(config.as_deref()).context("loading config")?;
    if let Some(n) = workers {
        config.workers = n;
        config.validate().context("validating config")?;
    }

    let raw = std::fs::read_to_string(&manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;
    let entries: Vec<ExportEntry> = serde_json::from_str(&raw).context("parsing manifest")?;

    let plan = config.planner()?.plan(&entries)?;
    info!(
        entries = entries.len(),
        data_tasks = plan.data.len(),
        marker_tasks = plan.markers.len(),
        root = %root.display(),
        "export planned"
    );

    let store = Arc::new(LocalStore::new(root));
    let handler = Arc::new(
        ExportHandler::new(store)
            .with_escalation(Arc::new(config.escalation()))
            .with_operation_timeout(config.operation_timeout())
            .with_put_options(config.put_options()),
    );
    let queue = Arc::new(InMemoryTaskQueue::new(config.max_deliveries));

    let data = run_batch(&queue, &handler, config.workers, &plan.data).await?;
    let data_ok = data.iter().all(|v| v.state == TaskState::Succeeded);

    // markers only once every data task completed
    let markers = if data_ok {
        run_batch(&queue, &handler, config.workers, &plan.markers).await?
    } else {
        warn!("data tasks failed, skipping success markers");
        Vec::new()
    };
    queue.close();

    let views: Vec<&TaskView> = data.iter().chain(markers.iter()).collect();
    let summary = Summary {
        data_tasks: plan.data.len(),
        marker_tasks: plan.markers.len(),
        succeeded: views.iter().filter(|v| v.state == TaskState::Succeeded).count(),
        failed: views.iter().filter(|v| v.state != TaskState::Succeeded).count(),
        markers_skipped: !data_ok && !plan.markers.is_empty(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    for view in views.iter().filter(|v| v.state != TaskState::Succeeded) {
        warn!(
            task_id = %view.id,
            action = %view.action,
            state = ?view.state,
            error = view.last_error.as_deref().unwrap_or_default(),
            "task did not complete"
        );
    }
    if summary.failed > 0 || summary.markers_skipped {
        bail!("export incomplete: {} task(s) failed", summary.failed);
    }
    Ok(())
}

async fn run_batch(
    queue: &Arc<InMemoryTaskQueue>,
    handler: &Arc<ExportHandler>,
    workers: usize,
    tasks: &[ExportTask],
) -> anyhow::Result<Vec<TaskView>> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::with_capacity(tasks.len());
    for task in tasks {
        ids.push(queue.enqueue(task).await?);
    }

    let group = WorkerGroup::spawn(workers, queue.clone(), handler.clone());
    queue.wait_idle().await;
    group.shutdown_and_join().await;

    ids.into_iter()
        .map(|id| queue.get(id).with_context(|| format!("task {id} vanished from queue")))
        .collect()
}

fn check_marker(patterns: &[String], keys: &[String]) -> anyhow::Result<()> {
    let matcher = SuccessMatcher::build(patterns)?;
    for key in keys {
        println!("{}\t{}", matcher.is_match(key), key);
    }
    Ok(())
}
