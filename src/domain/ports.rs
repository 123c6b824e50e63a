use crate::domain::model::{
    DestinationItinerary, Itinerary, ItineraryGroup, ManifestBatch, ManifestEntry, Port,
    PortGroup,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// 來源售票系統
#[async_trait]
pub trait SourceApi: Send + Sync {
    async fn list_itineraries(&self, date: NaiveDate) -> Result<Vec<ItineraryGroup>>;

    async fn list_ports(&self, itinerary_source_id: i64) -> Result<Vec<PortGroup>>;

    /// `update_timestamp` 為 `None` 時回傳完整的登船快照，否則只回傳該時間之後的異動
    async fn fetch_manifest(
        &self,
        itinerary_source_id: i64,
        port_source_location_id: i64,
        update_timestamp: Option<&str>,
    ) -> Result<ManifestBatch>;
}

/// 目的導航系統；只有建立，沒有更新
#[async_trait]
pub trait DestinationApi: Send + Sync {
    async fn create_itinerary(&self, itinerary: &Itinerary) -> Result<String>;

    async fn list_itineraries(&self, date: NaiveDate) -> Result<Vec<DestinationItinerary>>;

    async fn create_port(&self, port: &Port) -> Result<()>;

    async fn create_manifest_entry(
        &self,
        entry: &ManifestEntry,
        itinerary_destination_id: &str,
    ) -> Result<()>;
}

/// 已轉送艙單的本地紀錄，以 document id 為鍵
pub trait DedupStore: Send + Sync {
    fn exists(&self, document_id: &str)
        -> impl std::future::Future<Output = Result<bool>> + Send;

    /// 重複記錄同一個 document id 不是錯誤
    fn record(&self, entry: &ManifestEntry)
        -> impl std::future::Future<Output = Result<()>> + Send;
}
