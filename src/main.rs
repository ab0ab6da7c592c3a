// ABOUTME: Entry point for the ferry CLI application.
// ABOUTME: Parses arguments, connects to the local engine, and runs one container operation.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use ferry::config::Config;
use ferry::error::Result;
use ferry::inject::{
    ContainerOperation, InjectionRequest, RunImageMetadata, StackMetadata, copy_dir,
    write_stack_toml,
};
use ferry::runtime::{
    BollardRuntime, FullRuntime, RuntimeError, RuntimeInfoTrait, detect_local,
};
use ferry::types::ContainerId;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(hint) = e.hint() {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover_or_default(&env::current_dir()?)?,
    };
    let options = config.inject_options();

    let (container, operation): (String, Box<dyn ContainerOperation>) = match cli.command {
        Commands::Copy {
            container,
            src,
            dst,
            uid,
            gid,
            excludes,
        } => {
            let mut request = InjectionRequest::new(src, dst);
            if let (Some(uid), Some(gid)) = (uid, gid) {
                request = request.with_owner(uid, gid);
            }
            if !excludes.is_empty() {
                request = request.with_filter(move |path: &Path| {
                    path.file_name()
                        .and_then(|name| name.to_str())
                        .is_none_or(|name| !excludes.iter().any(|excluded| excluded == name))
                });
            }
            let operation: Box<dyn ContainerOperation> =
                Box::new(copy_dir(request).with_options(options));
            (container, operation)
        }
        Commands::WriteStack {
            container,
            dst,
            run_image,
            mirrors,
        } => {
            let stack = StackMetadata {
                run_image: RunImageMetadata {
                    image: run_image,
                    mirrors,
                },
            };
            let operation: Box<dyn ContainerOperation> =
                Box::new(write_stack_toml(dst, stack).with_options(options));
            (container, operation)
        }
    };

    let runtime = connect(&config).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    tracing::debug!(op = operation.name(), %container, "running operation");
    operation
        .run(
            runtime,
            cancel,
            &ContainerId::new(container),
            &mut stdout,
            &mut stderr,
        )
        .await?;
    stdout.flush().await?;
    stderr.flush().await?;

    Ok(())
}

/// Connect to the local engine and make sure it answers.
async fn connect(config: &Config) -> Result<Arc<dyn FullRuntime>> {
    let endpoint = detect_local(Some(&config.runtime)).map_err(RuntimeError::from)?;
    tracing::debug!(
        runtime = %endpoint.runtime_type,
        socket = %endpoint.socket_path,
        "using container runtime"
    );

    let runtime = BollardRuntime::connect(&endpoint, config.timeout).map_err(RuntimeError::from)?;
    runtime.ping().await.map_err(RuntimeError::from)?;

    Ok(Arc::new(runtime))
}
