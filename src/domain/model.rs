use crate::utils::error::{Result, SyncError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 航程：來源系統的一次排定航行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub source_id: i64,
    /// 目的系統建立後才會有
    pub destination_id: Option<String>,
    pub departure: String,
    pub route_name: String,
}

/// 航程停靠的港口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub source_location_id: i64,
    pub location_name: String,
}

/// 單一乘客在某航程、某港口的艙單紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub document_id: String,
    pub passenger_name: String,
    pub sex: String,
    /// 原始值 ("Si" / "No")，原樣轉送
    pub resident: String,
    pub nationality: String,
    pub document_type: String,
    pub reservation_id: i64,
    pub reservation_status: i64,
    pub ticket_id: String,
    pub origin_location_name: String,
    pub destination_location_name: String,
    pub itinerary_source_id: Option<i64>,
    pub related_itinerary_source_id: Option<i64>,
}

/// 目的系統中已存在的航程 (`_id` + `refId`)
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationItinerary {
    pub id: String,
    pub ref_id: Option<i64>,
}

/// 在來源邊界被拒絕的紀錄
#[derive(Debug, Clone)]
pub struct RejectedRecord {
    pub reason: String,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct ItineraryGroup {
    pub keyword: String,
    pub itineraries: Vec<Itinerary>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct PortGroup {
    pub key: String,
    pub ports: Vec<Port>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct ManifestBatch {
    pub entries: Vec<ManifestEntry>,
    pub rejected: Vec<RejectedRecord>,
}

impl ManifestBatch {
    pub fn len(&self) -> usize {
        self.entries.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// 完整抓取當日艙單並在目的系統建立航程與港口
    Initial,
    /// 只抓取 `since` 之後異動的艙單，航程必須已存在於目的系統
    Update { since: String },
}

impl SyncMode {
    pub fn name(&self) -> &'static str {
        match self {
            SyncMode::Initial => "initial",
            SyncMode::Update { .. } => "update",
        }
    }

    pub fn update_timestamp(&self) -> Option<&str> {
        match self {
            SyncMode::Initial => None,
            SyncMode::Update { since } => Some(since),
        }
    }
}

const UPDATE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// 一次同步執行的參數；不會被持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRun {
    pub target_date: NaiveDate,
    pub mode: SyncMode,
}

impl SyncRun {
    pub fn initial(date: &str) -> Result<Self> {
        let target_date = parse_target_date(date)?;
        Ok(Self {
            target_date,
            mode: SyncMode::Initial,
        })
    }

    /// `timestamp` 形如 `2016-10-10 08:30`；日期部分即為目標日期
    pub fn update(timestamp: &str) -> Result<Self> {
        let timestamp = timestamp.trim();
        let parsed = UPDATE_TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())
            .ok_or_else(|| SyncError::InvalidConfigValueError {
                field: "update".to_string(),
                value: timestamp.to_string(),
                reason: "Expected \"YYYY-MM-DD HH:MM[:SS]\"".to_string(),
            })?;

        Ok(Self {
            target_date: parsed.date(),
            mode: SyncMode::Update {
                since: timestamp.to_string(),
            },
        })
    }

    pub fn date_string(&self) -> String {
        self.target_date.format("%Y-%m-%d").to_string()
    }
}

fn parse_target_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
        SyncError::InvalidConfigValueError {
            field: "date".to_string(),
            value: date.to_string(),
            reason: format!("Expected YYYY-MM-DD ({})", e),
        }
    })
}
