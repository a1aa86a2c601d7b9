//! mv command - Move objects
//!
//! Moves an object, or every object under a prefix, within one alias:
//! copy server-side, then delete the source.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Args;
use mv_core::{
    ConfigManager, Error, MoveObserver, MoveOptions, MoveRequest, MovedObject, ObjectLocation,
    Relocator, RemotePath, TransferConfig, parse_path,
};
use mv_s3::S3Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// Move objects
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Source path (alias/bucket/key)
    pub source: String,

    /// Destination path (alias/bucket/key)
    pub target: String,

    /// Only move a single object; fail instead of expanding a prefix
    #[arg(long)]
    pub file_only: bool,

    /// Size in bytes at or above which objects are copied in parts
    #[arg(long, value_name = "BYTES")]
    pub threshold: Option<u64>,

    /// Part size in bytes for chunked copies
    #[arg(long, value_name = "BYTES")]
    pub part_size: Option<u64>,

    /// Maximum number of parts copied at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Attempts at deleting each source after its copy
    #[arg(long, value_name = "N")]
    pub delete_attempts: Option<u32>,
}

impl MvArgs {
    /// Apply command-line overrides on top of `[transfer]`
    fn transfer_config(&self, mut transfer: TransferConfig) -> TransferConfig {
        if let Some(threshold) = self.threshold {
            transfer.multipart_threshold = threshold;
        }
        if let Some(part_size) = self.part_size {
            transfer.part_size = part_size;
        }
        if let Some(concurrency) = self.concurrency {
            transfer.concurrency = concurrency;
        }
        if let Some(attempts) = self.delete_attempts {
            transfer.delete_attempts = attempts;
        }
        transfer
    }
}

#[derive(Debug, Serialize)]
struct MovedOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
}

#[derive(Debug, Serialize)]
struct SummaryOutput {
    status: &'static str,
    source: String,
    target: String,
    objects: u64,
    total_bytes: u64,
}

/// Execute the mv command
pub async fn execute(args: MvArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let source = match parse_path(&args.source) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Invalid source path: {e}"));
            return ExitCode::UsageError;
        }
    };

    let target = match parse_path(&args.target) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Invalid target path: {e}"));
            return ExitCode::UsageError;
        }
    };

    // Server-side copy only works within one endpoint
    if source.alias != target.alias {
        formatter.error(
            "Cross-alias moves are not supported; source and target must share an alias.",
        );
        return ExitCode::UnsupportedFeature;
    }

    let config = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to load configuration: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let Some(alias) = config.aliases.iter().find(|a| a.name == source.alias).cloned() else {
        formatter.error(&format!("Alias '{}' not found", source.alias));
        return ExitCode::NotFound;
    };

    let transfer = args.transfer_config(config.transfer);
    tracing::debug!(?transfer, alias = %alias.name, "transfer settings");

    let client = match S3Client::new(alias).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create S3 client: {e}"));
            return ExitCode::NetworkError;
        }
    };

    let spinner = Arc::new(Spinner::new(
        &output_config,
        &format!("Moving {source} -> {target}"),
    ));

    let relocator = match Relocator::new(Arc::new(client), source.bucket.clone(), transfer) {
        Ok(r) => r.on_moved(observer(&source.alias, formatter.clone(), spinner.clone())),
        Err(e) => {
            formatter.error(&format!("Invalid transfer settings: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let request = MoveRequest::new(
        source.key.clone(),
        target.bucket.clone(),
        target.key.clone(),
        MoveOptions {
            file_only: args.file_only,
        },
    );
    let result = relocator.execute(&request, &cancel).await;

    interrupt.abort();
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            if formatter.is_json() {
                formatter.json_line(&SummaryOutput {
                    status: "success",
                    source: source.to_string(),
                    target: target.to_string(),
                    objects: summary.objects,
                    total_bytes: summary.bytes,
                });
            } else {
                formatter.success(&format!(
                    "Moved {} object(s), {}",
                    summary.objects,
                    humansize::format_size(summary.bytes, humansize::BINARY)
                ));
            }
            ExitCode::Success
        }
        Err(e) => report_failure(&formatter, &source, &e),
    }
}

/// Per-object output, printed as each source is deleted
fn observer(alias: &str, formatter: Formatter, spinner: Arc<Spinner>) -> MoveObserver {
    let alias = alias.to_string();
    let moved = AtomicU64::new(0);

    Arc::new(move |object: &MovedObject| {
        let count = moved.fetch_add(1, Ordering::Relaxed) + 1;
        let source = display_path(&alias, &object.source);
        let target = display_path(&alias, &object.destination);

        spinner.suspend(|| {
            if formatter.is_json() {
                formatter.json_line(&MovedOutput {
                    status: "moved",
                    source: source.clone(),
                    target: target.clone(),
                    size_bytes: object.size,
                    size_human: humansize::format_size(object.size, humansize::BINARY),
                });
            } else {
                formatter.println(&format!(
                    "{} -> {} ({})",
                    formatter.path(&source),
                    formatter.path(&target),
                    humansize::format_size(object.size, humansize::BINARY)
                ));
            }
        });
        spinner.set_message(&format!("Moved {count} object(s), last {source}"));
    })
}

fn report_failure(formatter: &Formatter, source: &RemotePath, error: &Error) -> ExitCode {
    match error {
        Error::Cancelled => formatter.error("Interrupted; objects already moved stay moved"),
        e if e.is_not_found() => formatter.error(&format!("Source not found: {source}")),
        e => formatter.error(&e.to_string()),
    }

    if error.leaves_duplicate() {
        formatter.warning(
            "The object was copied but its source could not be deleted; it now exists at both locations",
        );
    }

    ExitCode::from_error(error)
}

/// `alias/bucket/key` form of a store location
fn display_path(alias: &str, location: &ObjectLocation) -> String {
    RemotePath::new(alias, location.bucket.clone(), location.key.clone()).to_full_path()
}
