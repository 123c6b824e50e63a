use crate::domain::model::SyncRun;
use crate::utils::error::Result;
use clap::{ArgGroup, Parser};

#[derive(Debug, Clone, Parser)]
#[command(name = "manifest-sync")]
#[command(about = "Harvest passenger manifests from the ticketing API into the navigation API")]
#[command(group(ArgGroup::new("mode").required(true).args(["date", "update"])))]
pub struct CliArgs {
    /// Initial sync for a date (YYYY-MM-DD)
    #[arg(short, long, value_name = "DATE", value_parser = date_arg)]
    pub date: Option<String>,

    /// Incremental update since a timestamp ("YYYY-MM-DD HH:MM[:SS]")
    #[arg(short, long, value_name = "DATE TIME", value_parser = timestamp_arg)]
    pub update: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = "manifest-sync.toml")]
    pub config: String,

    /// Record new entries locally without writing to the navigation API
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log process CPU and memory usage
    #[arg(long)]
    pub monitor: bool,
}

// 日期格式錯誤視為選項錯誤，由 clap 以 2 結束
fn date_arg(value: &str) -> std::result::Result<String, String> {
    SyncRun::initial(value)
        .map(|_| value.to_string())
        .map_err(|e| e.to_string())
}

fn timestamp_arg(value: &str) -> std::result::Result<String, String> {
    SyncRun::update(value)
        .map(|_| value.to_string())
        .map_err(|e| e.to_string())
}

impl CliArgs {
    pub fn sync_run(&self) -> Result<SyncRun> {
        match (&self.date, &self.update) {
            (_, Some(timestamp)) => SyncRun::update(timestamp),
            (Some(date), None) => SyncRun::initial(date),
            // clap 的 ArgGroup 保證至少有一個
            (None, None) => Err(crate::utils::error::SyncError::MissingConfigError {
                field: "--date or --update".to_string(),
            }),
        }
    }
}
