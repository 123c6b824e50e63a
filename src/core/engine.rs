use crate::core::identity::{IdentityResolver, ItineraryIdentity};
use crate::core::report::{ItineraryReport, PortReport, SyncFailure, SyncReport};
use crate::domain::model::{Itinerary, ManifestEntry, Port, RejectedRecord, SyncMode, SyncRun};
use crate::domain::ports::{DedupStore, DestinationApi, SourceApi};
use crate::utils::error::{Result, SyncError};
use crate::utils::monitor::SystemMonitor;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// false：不呼叫目的系統的建立 API，新艙單仍寫入本地 store
    pub forward: bool,
    /// 只處理這些來源航程；None 表示全部
    pub only_itineraries: Option<HashSet<i64>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            forward: true,
            only_itineraries: None,
        }
    }
}

impl SyncOptions {
    fn includes(&self, itinerary_source_id: i64) -> bool {
        self.only_itineraries
            .as_ref()
            .map_or(true, |only| only.contains(&itinerary_source_id))
    }
}

/// 艙單要送往哪裡
#[derive(Debug, Clone, PartialEq, Eq)]
enum ForwardTarget {
    Destination(String),
    /// dry run：只記錄到本地 store
    LocalOnly,
    /// 航程身分無法取得：只計數
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Delivered,
    AlreadyDelivered,
    /// 起點不是目前港口，屬於其他航段
    OtherLeg,
    Unresolved,
}

/// 增量同步引擎：航程 → 港口 → 艙單，依序處理
pub struct SyncEngine<S: SourceApi, D: DestinationApi, K: DedupStore> {
    source: S,
    destination: D,
    store: K,
    options: SyncOptions,
    monitor: SystemMonitor,
}

impl<S: SourceApi, D: DestinationApi, K: DedupStore> SyncEngine<S, D, K> {
    pub fn new(source: S, destination: D, store: K, options: SyncOptions) -> Self {
        Self {
            source,
            destination,
            store,
            options,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// 只有無法列出航程時整體失敗；其餘錯誤都收進報表
    pub async fn run(&self, run: &SyncRun) -> Result<SyncReport> {
        tracing::info!(
            "🚀 Starting {} sync for {} (forward: {})",
            run.mode.name(),
            run.date_string(),
            self.options.forward
        );
        if let Some(since) = run.mode.update_timestamp() {
            tracing::info!("🕒 Fetching manifest changes since {}", since);
        }

        let groups = self.source.list_itineraries(run.target_date).await?;
        let mut report = SyncReport::new(run.target_date, run.mode.clone());
        let mut resolver = IdentityResolver::new(&self.destination, run.target_date);
        let mut processed = HashSet::new();

        for group in groups {
            let scope = format!("itineraries[{}]", group.keyword);
            report
                .failures
                .extend(rejected_failures(&scope, &group.rejected));

            for itinerary in group.itineraries {
                if !self.options.includes(itinerary.source_id) {
                    tracing::debug!("⏭️ Not interested in itinerary {}", itinerary.source_id);
                    continue;
                }
                // 同一航程可能出現在多個分類下；每次執行只處理一次
                if !processed.insert(itinerary.source_id) {
                    tracing::info!(
                        "⏭️ Itinerary {} already processed under another category ({})",
                        itinerary.source_id,
                        group.keyword
                    );
                    continue;
                }

                let itinerary_report = self.sync_itinerary(run, itinerary, &mut resolver).await;
                self.monitor.log_stats(&format!(
                    "Itinerary {}",
                    itinerary_report.itinerary.source_id
                ));
                report.itineraries.push(itinerary_report);
            }
        }

        let totals = report.counters();
        tracing::info!(
            "✅ Sync finished: {} itineraries, {} entries seen, {} new, {} failures",
            report.itineraries.len(),
            totals.seen,
            totals.new,
            report.failure_count()
        );
        self.monitor.log_final_stats();

        Ok(report)
    }

    async fn sync_itinerary(
        &self,
        run: &SyncRun,
        itinerary: Itinerary,
        resolver: &mut IdentityResolver<'_, D>,
    ) -> ItineraryReport {
        let source_id = itinerary.source_id;
        let scope = format!("itinerary {}", source_id);
        tracing::info!("🚢 Processing itinerary {} ({})", source_id, itinerary.route_name);

        let mut report = ItineraryReport::new(itinerary);

        let target = match self.resolve_target(run, &report.itinerary, resolver).await {
            Ok(target) => target,
            Err(e) => {
                tracing::error!("❌ {}: {} - manifests will not be forwarded", scope, e);
                report.failures.push(SyncFailure::new(&scope, &e));
                ForwardTarget::Unresolved
            }
        };
        if let ForwardTarget::Destination(id) = &target {
            report.itinerary.destination_id = Some(id.clone());
        }

        let groups = match self.source.list_ports(source_id).await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!("❌ {}: cannot list ports: {}", scope, e);
                report.failures.push(SyncFailure::new(&scope, &e));
                return report;
            }
        };

        for group in groups {
            report.failures.extend(rejected_failures(
                &format!("{} / ports[{}]", scope, group.key),
                &group.rejected,
            ));

            for port in group.ports {
                let port_report = self.sync_port(run, &report.itinerary, port, &target).await;
                report.ports.push(port_report);
            }
        }

        let totals = report.counters();
        tracing::info!(
            "==> Itinerary {}: {} manifest entries received, {} new",
            source_id,
            totals.seen,
            totals.new
        );
        report
    }

    async fn resolve_target(
        &self,
        run: &SyncRun,
        itinerary: &Itinerary,
        resolver: &mut IdentityResolver<'_, D>,
    ) -> Result<ForwardTarget> {
        match run.mode {
            SyncMode::Initial if !self.options.forward => Ok(ForwardTarget::LocalOnly),
            SyncMode::Initial => {
                if let Some(id) = resolver.remembered(itinerary.source_id) {
                    return Ok(ForwardTarget::Destination(id.to_string()));
                }
                let id = self.destination.create_itinerary(itinerary).await?;
                tracing::info!("🆔 Itinerary {} created as {}", itinerary.source_id, id);
                resolver.remember(itinerary.source_id, id.clone());
                Ok(ForwardTarget::Destination(id))
            }
            SyncMode::Update { .. } => {
                match resolver.resolve_itinerary_id(itinerary.source_id).await? {
                    ItineraryIdentity::Resolved(id) if self.options.forward => {
                        Ok(ForwardTarget::Destination(id))
                    }
                    ItineraryIdentity::Resolved(_) => Ok(ForwardTarget::LocalOnly),
                    ItineraryIdentity::NotFound => Err(SyncError::IdentityNotFound {
                        itinerary_id: itinerary.source_id,
                        date: run.date_string(),
                    }),
                }
            }
        }
    }

    async fn sync_port(
        &self,
        run: &SyncRun,
        itinerary: &Itinerary,
        port: Port,
        target: &ForwardTarget,
    ) -> PortReport {
        let scope = format!(
            "itinerary {} / port {}",
            itinerary.source_id, port.location_name
        );
        let mut report = PortReport::new(port);

        // 港口每次 initial 都會重建，目的系統沒有去重；不依賴航程是否建立成功
        if run.mode == SyncMode::Initial && self.options.forward {
            tracing::debug!("⚓ Posting port {}", report.port.location_name);
            if let Err(e) = self.destination.create_port(&report.port).await {
                tracing::warn!("⚠️ {}: port not created: {}", scope, e);
                report.failures.push(SyncFailure::new(&scope, &e));
            }
        }

        let batch = match self
            .source
            .fetch_manifest(
                itinerary.source_id,
                report.port.source_location_id,
                run.mode.update_timestamp(),
            )
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!("❌ {}: cannot fetch manifest: {}", scope, e);
                report.failures.push(SyncFailure::new(&scope, &e));
                return report;
            }
        };

        tracing::info!(
            "\tThere are {} entries in the manifest of itinerary {} / port {}",
            batch.len(),
            itinerary.source_id,
            report.port.location_name
        );

        report.counters.seen += batch.rejected.len();
        report
            .failures
            .extend(rejected_failures(&scope, &batch.rejected));

        for entry in &batch.entries {
            report.counters.seen += 1;

            match self.process_entry(run, &report.port, entry, target).await {
                Ok(EntryOutcome::Delivered) => report.counters.new += 1,
                Ok(EntryOutcome::AlreadyDelivered) => {
                    tracing::debug!("\t\t{} is already in the system, skip", entry.document_id);
                }
                Ok(EntryOutcome::OtherLeg) => {
                    tracing::debug!(
                        "\t\t{} boards at {}, not {}",
                        entry.document_id,
                        entry.origin_location_name,
                        report.port.location_name
                    );
                }
                Ok(EntryOutcome::Unresolved) => {}
                Err(e) => {
                    tracing::warn!("⚠️ {} / entry {}: {}", scope, entry.document_id, e);
                    report.failures.push(SyncFailure::new(
                        format!("{} / entry {}", scope, entry.document_id),
                        &e,
                    ));
                }
            }
        }

        tracing::info!(
            "\t====> new manifests at {}: {}, processed: {}",
            report.port.location_name,
            report.counters.new,
            report.counters.seen
        );
        report
    }

    async fn process_entry(
        &self,
        run: &SyncRun,
        port: &Port,
        entry: &ManifestEntry,
        target: &ForwardTarget,
    ) -> Result<EntryOutcome> {
        if let SyncMode::Update { .. } = run.mode {
            if entry.origin_location_name != port.location_name {
                return Ok(EntryOutcome::OtherLeg);
            }
        }

        let itinerary_destination_id = match target {
            ForwardTarget::Unresolved => return Ok(EntryOutcome::Unresolved),
            ForwardTarget::Destination(id) => Some(id.as_str()),
            ForwardTarget::LocalOnly => None,
        };

        // 查詢失敗必須往上傳，不能當作「不存在」
        if self.store.exists(&entry.document_id).await? {
            return Ok(EntryOutcome::AlreadyDelivered);
        }

        if let Some(id) = itinerary_destination_id {
            self.destination.create_manifest_entry(entry, id).await?;
        }

        if let Err(e) = self.store.record(entry).await {
            if itinerary_destination_id.is_some() {
                tracing::error!(
                    "❌ {} was forwarded but not recorded; it will be sent again next run",
                    entry.document_id
                );
            }
            return Err(e);
        }

        tracing::debug!("\t\t{} added", entry.document_id);
        Ok(EntryOutcome::Delivered)
    }
}

fn rejected_failures(scope: &str, rejected: &[RejectedRecord]) -> Vec<SyncFailure> {
    rejected
        .iter()
        .map(|record| {
            SyncFailure::new(
                scope,
                &SyncError::InvalidRecord {
                    message: format!("{}: {}", record.reason, record.raw),
                },
            )
        })
        .collect()
}
