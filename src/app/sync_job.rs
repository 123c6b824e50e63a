use crate::adapters::{NavigationClient, SqliteDedupStore, TicketingClient};
use crate::config::SyncConfig;
use crate::core::{SyncEngine, SyncOptions, SyncReport};
use crate::domain::model::SyncRun;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub type HttpSyncEngine = SyncEngine<TicketingClient, NavigationClient, SqliteDedupStore>;

/// 一次 CLI 呼叫：依配置建立客戶端與該日期的 store，然後執行同步
pub struct SyncJob {
    config: SyncConfig,
    dry_run: bool,
    monitor: bool,
}

impl SyncJob {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            dry_run: false,
            monitor: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            forward: self.config.forward_enabled() && !self.dry_run,
            only_itineraries: self
                .config
                .sync
                .itineraries
                .as_ref()
                .map(|ids| ids.iter().copied().collect()),
        }
    }

    pub fn build_engine(&self, run: &SyncRun) -> Result<HttpSyncEngine> {
        let store_path = self.config.store.path_for_date(&run.date_string());
        tracing::info!("🗄️ Using dedup store {}", store_path.display());
        let store = SqliteDedupStore::open(&store_path)?;

        let engine = SyncEngine::new(
            TicketingClient::new(self.config.source.clone()),
            NavigationClient::new(self.config.destination.clone()),
            store,
            self.options(),
        )
        .with_monitor(SystemMonitor::new(self.monitor));
        Ok(engine)
    }

    pub async fn execute(&self, run: &SyncRun) -> Result<SyncReport> {
        let options = self.options();
        if options.forward {
            tracing::info!("Data will be inserted into the navigation API");
        } else {
            tracing::info!("🔍 DRY RUN - data won't be inserted into the navigation API");
        }

        let engine = self.build_engine(run)?;
        engine.run(run).await
    }
}
