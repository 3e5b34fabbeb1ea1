//! `d2c publish` command implementation.

use std::path::PathBuf;

use clap::Args;
use d2c_config::{
    AuthMethod, CliSettings, Config, ConfigError, ConfluenceConfig, FailurePolicy,
};
use d2c_confluence::ConfluenceClient;
use d2c_renderer::StorageRenderer;
use d2c_sync::{
    CancelFlag, Converter, DocumentTree, DryRunRemote, NodeOutcome, PageId, PlannedWrite,
    RemotePages, Summary, SyncEngine, SyncOptions, SyncReport,
};
use tracing::warn;

use crate::error::CliError;
use crate::output::{Output, Tone};

/// Arguments for the publish command.
#[derive(Args)]
pub(crate) struct PublishArgs {
    /// Documentation source directory (overrides config).
    source_dir: Option<PathBuf>,

    /// Target space key (overrides config).
    #[arg(short, long, env = "D2C_SPACE")]
    space: Option<String>,

    /// Page to publish the tree under (overrides config).
    #[arg(long, value_name = "ID")]
    parent_id: Option<String>,

    /// Sibling pages synced in parallel (overrides config).
    #[arg(short = 'j', long, value_name = "N")]
    concurrency: Option<usize>,

    /// What to do after a page fails: continue or stop (overrides config).
    #[arg(long, value_name = "POLICY")]
    failure_policy: Option<FailurePolicy>,

    /// Resolve and plan every page without writing to Confluence.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to configuration file (default: auto-discover d2c.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output (log every remote call).
    #[arg(short, long)]
    pub verbose: bool,
}

impl PublishArgs {
    /// Execute the publish command.
    ///
    /// # Errors
    ///
    /// Returns an error if setup fails or any page did not sync.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir.clone(),
            space_key: self.space.clone(),
            parent_id: self.parent_id.clone(),
            concurrency: self.concurrency,
            failure_policy: self.failure_policy,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let confluence = config.require_confluence()?;

        let source_dir = &config.docs_resolved.source_dir;
        output.info(&format!("Loading {}...", source_dir.display()));
        let tree = d2c_sync::load(source_dir)?;
        output.info(&format!("Found {} pages", tree.len()));

        let client = create_confluence_client(confluence)?;
        let renderer = StorageRenderer::new()
            .with_gfm(config.render.gfm)
            .with_toc(config.render.prepend_toc);
        let options = sync_options(&config, confluence);

        let cancel = CancelFlag::new();
        let watcher = spawn_signal_watcher(cancel.clone());

        let summary = if self.dry_run {
            let engine = SyncEngine::new(DryRunRemote::new(client), renderer, options)
                .with_cancel_flag(cancel);
            let (engine, report) = run_engine(engine, tree).await?;
            print_dry_run(&output, &engine.remote().writes());
            print_report(&output, &report, None);
            report.summary
        } else {
            let engine = SyncEngine::new(client, renderer, options).with_cancel_flag(cancel);
            let (engine, report) = run_engine(engine, tree).await?;
            print_report(&output, &report, Some(engine.remote()));
            report.summary
        };
        watcher.abort();

        if summary.failed + summary.blocked + summary.cancelled == 0 {
            Ok(())
        } else {
            Err(CliError::Incomplete(summary))
        }
    }
}

fn create_confluence_client(conf: &ConfluenceConfig) -> Result<ConfluenceClient, CliError> {
    let client = match conf.auth {
        AuthMethod::Basic => {
            ConfluenceClient::with_basic_auth(&conf.base_url, &conf.username, &conf.api_token)
        }
        AuthMethod::OAuth => {
            let key_file = conf.key_file.as_deref().ok_or_else(|| {
                ConfigError::Validation("confluence.key_file is required for oauth".to_owned())
            })?;
            ConfluenceClient::with_oauth(
                &conf.base_url,
                &conf.consumer_key,
                key_file,
                &conf.access_token,
            )?
        }
    };
    Ok(client)
}

fn sync_options(config: &Config, conf: &ConfluenceConfig) -> SyncOptions {
    SyncOptions::new(conf.space_key.clone())
        .with_root_parent(conf.parent_id.clone().map(PageId::from))
        .with_concurrency(config.sync.concurrency)
        .with_failure_policy(engine_policy(config.sync.failure_policy))
}

fn engine_policy(policy: FailurePolicy) -> d2c_sync::FailurePolicy {
    match policy {
        FailurePolicy::Continue => d2c_sync::FailurePolicy::Continue,
        FailurePolicy::Stop => d2c_sync::FailurePolicy::Stop,
    }
}

/// Run the engine on the blocking pool and hand it back with its report.
async fn run_engine<R, C>(
    engine: SyncEngine<R, C>,
    tree: DocumentTree,
) -> Result<(SyncEngine<R, C>, SyncReport), CliError>
where
    R: RemotePages + 'static,
    C: Converter + 'static,
{
    tokio::task::spawn_blocking(move || {
        let report = engine.run(&tree);
        (engine, report)
    })
    .await
    .map_err(|e| CliError::Task(e.to_string()))
}

/// Cancel the run on Ctrl-C or SIGTERM.
fn spawn_signal_watcher(cancel: CancelFlag) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                Output::new().line(Tone::Attention, "Interrupted, finishing in-flight requests...");
                cancel.cancel();
            }
            Err(err) => warn!("Failed to install signal handler: {err}"),
        }
    })
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn print_dry_run(output: &Output, writes: &[PlannedWrite]) {
    output.line(Tone::Heading, "\n[DRY RUN] No changes made.");
    if writes.is_empty() {
        output.info("Nothing to write.");
        return;
    }
    output.info(&format!("\nPlanned writes ({}):", writes.len()));
    for write in writes {
        output.info(&format!("  {}", describe_write(write)));
    }
}

fn describe_write(write: &PlannedWrite) -> String {
    match write {
        PlannedWrite::Create {
            parent_id: Some(parent_id),
            title,
            ..
        } => format!("create \"{title}\" under {parent_id}"),
        PlannedWrite::Create {
            parent_id: None,
            title,
            ..
        } => format!("create \"{title}\" at space root"),
        PlannedWrite::Update {
            page_id,
            version,
            title,
            move_to,
        } => {
            let mut line = format!("update \"{title}\" ({page_id} v{version})");
            if let Some(parent_id) = move_to {
                line.push_str(&format!(", move under {parent_id}"));
            }
            line
        }
    }
}

/// Print one line per page, then the totals.
///
/// Page URLs are shown when a live client is given.
fn print_report(output: &Output, report: &SyncReport, client: Option<&ConfluenceClient>) {
    output.info("");
    for node in &report.nodes {
        let label = format!("{:>9}", node.outcome.label());
        let mut line = format!("{label}  {} ({})", node.title, node.path.display());
        match &node.outcome {
            NodeOutcome::Created { page_id } | NodeOutcome::Updated { page_id, .. } => {
                if let Some(client) = client {
                    line.push_str(&format!("  {}", client.page_url(page_id.as_str())));
                }
            }
            NodeOutcome::Failed(err) => line.push_str(&format!(": {err}")),
            NodeOutcome::Blocked { ancestor } => {
                line.push_str(&format!(": parent {} failed", ancestor.display()));
            }
            NodeOutcome::Skipped { .. } | NodeOutcome::Cancelled => {}
        }
        output.line(outcome_tone(&node.outcome), &line);
    }

    let totals = summary_line(&report.summary);
    output.info("");
    let tone = if report.is_success() {
        Tone::Done
    } else {
        Tone::Failure
    };
    output.line(tone, &totals);
}

fn outcome_tone(outcome: &NodeOutcome) -> Tone {
    match outcome {
        NodeOutcome::Created { .. } | NodeOutcome::Updated { .. } => Tone::Done,
        NodeOutcome::Skipped { .. } => Tone::Quiet,
        NodeOutcome::Failed(_) => Tone::Failure,
        NodeOutcome::Blocked { .. } | NodeOutcome::Cancelled => Tone::Attention,
    }
}

fn summary_line(summary: &Summary) -> String {
    let mut line = format!(
        "{} created, {} updated, {} skipped",
        summary.created, summary.updated, summary.skipped
    );
    for (count, label) in [
        (summary.failed, "failed"),
        (summary.blocked, "blocked"),
        (summary.cancelled, "cancelled"),
    ] {
        if count > 0 {
            line.push_str(&format!(", {count} {label}"));
        }
    }
    line
}
