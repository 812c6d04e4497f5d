// Age-curve batch runner entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Load raw caches, run the analysis for every position
// 4. Write the run summary
// 5. Print a per-position overview

use agecurve_app::config;
use agecurve_app::report;
use agecurve_app::storage::CsvDir;

use anyhow::Context;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("agecurve starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: raw={}, processed={}, download={}, alpha={}",
        config.data.raw_dir.display(),
        config.data.processed_dir.display(),
        config.output.download,
        config.significance_level
    );

    // 3. Run
    let raw = CsvDir::new(&config.data.raw_dir);
    let mut processed = CsvDir::new(&config.data.processed_dir);
    let sink = config.output.download.then_some(&mut processed);
    let summary = report::run(&raw, sink, &config).context("analysis run failed")?;

    // 4. Summary
    if config.output.download {
        let path = processed
            .write_json(&config.output.summary_file, &summary)
            .context("failed to write run summary")?;
        info!("Run summary written to {}", path.display());
    }

    // 5. Overview
    for p in &summary.positions {
        println!(
            "{}: {}/{} players retained, {} ages, {} career years, {} significant age declines",
            p.position,
            p.players_retained,
            p.players_raw,
            p.ages,
            p.career_years,
            p.declines_by_age.len()
        );
    }
    if config.output.download {
        println!(
            "{} artifacts written to {}",
            summary.artifacts.len(),
            processed.root().display()
        );
    }

    info!("agecurve finished");
    Ok(())
}

/// Initialize tracing to log to `logs/agecurve.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("agecurve.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("agecurve=info,agecurve_core=info,agecurve_app=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
