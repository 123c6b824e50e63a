use clap::Parser;
use manifest_sync::utils::logger::{self, LogFormat};
use manifest_sync::utils::validation::Validate;
use manifest_sync::{CliArgs, SyncConfig, SyncError, SyncJob};

fn fail(e: &SyncError) -> ! {
    tracing::error!(
        "❌ manifest sync failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.severity().exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -h 以 0 結束，錯誤選項以 2 結束 (clap 預設)
    let args = CliArgs::parse();

    let config = match SyncConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let format = if config.json_logging() {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(args.verbose, config.logging.level.as_deref(), format);

    tracing::info!("🚀 Starting manifest-sync");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let run = match args.sync_run() {
        Ok(run) => run,
        Err(e) => fail(&e),
    };

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let job = SyncJob::new(config)
        .dry_run(args.dry_run)
        .monitor(args.monitor);

    match job.execute(&run).await {
        Ok(report) => {
            print!("{}", report);
            if report.failure_count() > 0 {
                tracing::warn!(
                    "⚠️ Sync completed with {} failures",
                    report.failure_count()
                );
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
