use anyhow::{Context, Result};
use clap::Parser;
use serialsum::{cli::Cli, pipeline, source::SqliteRecordSource};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.into_config();

    let source = SqliteRecordSource::open(&config.database)
        .with_context(|| format!("Failed to open trace database {}", config.database.display()))?;

    let report = pipeline::run(&source, &config).with_context(|| {
        format!(
            "Failed to summarize serial sections of '{}' in {}",
            config.dataset,
            config.database.display()
        )
    })?;

    let rendered = report.render(config.format).context("Failed to render report")?;
    print!("{}", rendered);
    Ok(())
}
