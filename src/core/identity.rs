use crate::domain::model::DestinationItinerary;
use crate::domain::ports::DestinationApi;
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItineraryIdentity {
    Resolved(String),
    /// 目的系統沒有對應的航程；不是錯誤
    NotFound,
}

/// 將來源航程 id 對應到目的系統的 `_id`。
///
/// 目的系統當日的航程清單在一次執行中只查詢一次；查詢失敗不會被快取。
pub struct IdentityResolver<'a, D: DestinationApi> {
    destination: &'a D,
    date: NaiveDate,
    listing: Option<Vec<DestinationItinerary>>,
    resolved: HashMap<i64, String>,
}

impl<'a, D: DestinationApi> IdentityResolver<'a, D> {
    pub fn new(destination: &'a D, date: NaiveDate) -> Self {
        Self {
            destination,
            date,
            listing: None,
            resolved: HashMap::new(),
        }
    }

    /// 直接登記已知的對應 (例如剛建立的航程)
    pub fn remember(&mut self, itinerary_source_id: i64, destination_id: String) {
        self.resolved.insert(itinerary_source_id, destination_id);
    }

    /// 本次執行已知的對應；不查詢目的系統
    pub fn remembered(&self, itinerary_source_id: i64) -> Option<&str> {
        self.resolved.get(&itinerary_source_id).map(String::as_str)
    }

    pub async fn resolve_itinerary_id(
        &mut self,
        itinerary_source_id: i64,
    ) -> Result<ItineraryIdentity> {
        if let Some(id) = self.resolved.get(&itinerary_source_id) {
            return Ok(ItineraryIdentity::Resolved(id.clone()));
        }

        if self.listing.is_none() {
            let listing = self.destination.list_itineraries(self.date).await?;
            tracing::debug!(
                "🔎 Destination has {} itineraries on {}",
                listing.len(),
                self.date
            );
            self.listing = Some(listing);
        }

        let found = self
            .listing
            .as_deref()
            .and_then(|listing| find_by_ref_id(listing, itinerary_source_id));

        match found {
            Some(id) => {
                let id = id.to_string();
                self.resolved.insert(itinerary_source_id, id.clone());
                Ok(ItineraryIdentity::Resolved(id))
            }
            None => Ok(ItineraryIdentity::NotFound),
        }
    }
}

fn find_by_ref_id(listing: &[DestinationItinerary], itinerary_source_id: i64) -> Option<&str> {
    listing
        .iter()
        .find(|candidate| candidate.ref_id == Some(itinerary_source_id))
        .map(|candidate| candidate.id.as_str())
}
