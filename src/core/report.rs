use crate::domain::model::{Itinerary, Port, SyncMode};
use crate::utils::error::{ErrorCategory, SyncError};
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounters {
    /// 從來源取得的艙單筆數
    pub seen: usize,
    /// 實際轉送並記錄的筆數
    pub new: usize,
}

impl SyncCounters {
    pub fn add(&mut self, other: SyncCounters) {
        self.seen += other.seen;
        self.new += other.new;
    }
}

#[derive(Debug, Clone)]
pub struct SyncFailure {
    pub scope: String,
    pub category: ErrorCategory,
    pub message: String,
}

impl SyncFailure {
    pub fn new(scope: impl Into<String>, error: &SyncError) -> Self {
        Self {
            scope: scope.into(),
            category: error.category(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortReport {
    pub port: Port,
    pub counters: SyncCounters,
    pub failures: Vec<SyncFailure>,
}

impl PortReport {
    pub fn new(port: Port) -> Self {
        Self {
            port,
            counters: SyncCounters::default(),
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItineraryReport {
    pub itinerary: Itinerary,
    pub ports: Vec<PortReport>,
    pub failures: Vec<SyncFailure>,
}

impl ItineraryReport {
    pub fn new(itinerary: Itinerary) -> Self {
        Self {
            itinerary,
            ports: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn counters(&self) -> SyncCounters {
        let mut total = SyncCounters::default();
        for port in &self.ports {
            total.add(port.counters);
        }
        total
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncFailure> {
        self.failures
            .iter()
            .chain(self.ports.iter().flat_map(|p| p.failures.iter()))
    }

    pub fn port(&self, location_name: &str) -> Option<&PortReport> {
        self.ports
            .iter()
            .find(|p| p.port.location_name == location_name)
    }
}

/// 一次執行的結果：各港口與航程的計數及失敗清單
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub target_date: NaiveDate,
    pub mode: SyncMode,
    pub itineraries: Vec<ItineraryReport>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn new(target_date: NaiveDate, mode: SyncMode) -> Self {
        Self {
            target_date,
            mode,
            itineraries: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn counters(&self) -> SyncCounters {
        let mut total = SyncCounters::default();
        for itinerary in &self.itineraries {
            total.add(itinerary.counters());
        }
        total
    }

    pub fn itinerary(&self, source_id: i64) -> Option<&ItineraryReport> {
        self.itineraries
            .iter()
            .find(|i| i.itinerary.source_id == source_id)
    }

    pub fn all_failures(&self) -> impl Iterator<Item = &SyncFailure> {
        self.failures
            .iter()
            .chain(self.itineraries.iter().flat_map(|i| i.failures()))
    }

    pub fn failure_count(&self) -> usize {
        self.all_failures().count()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "📋 Sync summary for {} ({})",
            self.target_date.format("%Y-%m-%d"),
            self.mode.name()
        )?;

        for report in &self.itineraries {
            let itinerary = &report.itinerary;
            writeln!(
                f,
                "  Itinerary {} \"{}\" -> {}",
                itinerary.source_id,
                itinerary.route_name,
                itinerary.destination_id.as_deref().unwrap_or("(unresolved)")
            )?;
            for port in &report.ports {
                writeln!(
                    f,
                    "    {:<20} seen {:>4}  new {:>4}",
                    port.port.location_name, port.counters.seen, port.counters.new
                )?;
            }
            let totals = report.counters();
            writeln!(f, "    {:<20} seen {:>4}  new {:>4}", "TOTAL", totals.seen, totals.new)?;
        }

        let totals = self.counters();
        writeln!(
            f,
            "  All itineraries: seen {}, new {}, failures {}",
            totals.seen,
            totals.new,
            self.failure_count()
        )?;

        for failure in self.all_failures() {
            writeln!(
                f,
                "  ❌ [{:?}] {}: {}",
                failure.category, failure.scope, failure.message
            )?;
        }
        Ok(())
    }
}
