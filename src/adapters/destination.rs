use crate::config::ApiConfig;
use crate::domain::model::{DestinationItinerary, Itinerary, ManifestEntry, Port};
use crate::domain::ports::DestinationApi;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

/// 導航系統 REST API 的客戶端
pub struct NavigationClient {
    config: ApiConfig,
    client: Client,
}

/// 建立航程的回應有兩種形狀：`{_id}` 或 `{op: {_id}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreatedResponse {
    Direct {
        #[serde(rename = "_id")]
        id: String,
    },
    Wrapped {
        op: CreatedOp,
    },
}

#[derive(Debug, Deserialize)]
struct CreatedOp {
    #[serde(rename = "_id")]
    id: String,
}

impl CreatedResponse {
    fn into_id(self) -> String {
        match self {
            CreatedResponse::Direct { id } => id,
            CreatedResponse::Wrapped { op } => op.id,
        }
    }
}

pub fn parse_created_id(body: &str) -> Result<String> {
    serde_json::from_str::<CreatedResponse>(body)
        .map(CreatedResponse::into_id)
        .map_err(|e| {
            SyncError::protocol(format!(
                "no '_id' or 'op._id' in creation response ({}): {}",
                e, body
            ))
        })
}

impl NavigationClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<Response> {
        let url = self.config.endpoint(path);
        tracing::debug!("📤 POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .form(form)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(SyncError::destination_unavailable)?;

        ensure_success("POST", &url, response)
    }
}

fn ensure_success(method: &str, url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SyncError::DestinationUnavailable {
            message: format!("{} {} returned {}", method, url, status),
        })
    }
}

fn parse_ref_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl DestinationApi for NavigationClient {
    async fn create_itinerary(&self, itinerary: &Itinerary) -> Result<String> {
        let form = [
            ("refId", itinerary.source_id.to_string()),
            ("depart", itinerary.departure.clone()),
            ("name", itinerary.route_name.clone()),
        ];

        let response = self.post_form("itineraries/", &form).await?;
        let body = response
            .text()
            .await
            .map_err(SyncError::destination_unavailable)?;

        parse_created_id(&body)
    }

    async fn list_itineraries(&self, date: NaiveDate) -> Result<Vec<DestinationItinerary>> {
        let url = self.config.endpoint("itineraries");
        let date = date.format("%Y-%m-%d").to_string();
        tracing::debug!("📡 GET {} date={}", url, date);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .query(&[("date", date)])
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(SyncError::destination_unavailable)?;
        let response = ensure_success("GET", &url, response)?;

        let body: Value = response.json().await.map_err(|e| {
            SyncError::protocol(format!("itinerary list is not valid JSON: {}", e))
        })?;
        let Value::Array(items) = body else {
            return Err(SyncError::protocol("itinerary list is not a JSON array"));
        };

        let itineraries = items
            .iter()
            .filter_map(|item| {
                let id = item.get("_id").and_then(Value::as_str);
                match id {
                    Some(id) => Some(DestinationItinerary {
                        id: id.to_string(),
                        ref_id: parse_ref_id(item.get("refId")),
                    }),
                    None => {
                        tracing::warn!("⚠️ Destination itinerary without '_id': {}", item);
                        None
                    }
                }
            })
            .collect();
        Ok(itineraries)
    }

    async fn create_port(&self, port: &Port) -> Result<()> {
        let form = [
            ("locationId", port.source_location_id.to_string()),
            ("locationName", port.location_name.clone()),
        ];
        self.post_form("seaports/", &form).await?;
        Ok(())
    }

    async fn create_manifest_entry(
        &self,
        entry: &ManifestEntry,
        itinerary_destination_id: &str,
    ) -> Result<()> {
        let form = [
            ("name", entry.passenger_name.clone()),
            ("sex", entry.sex.clone()),
            ("resident", entry.resident.clone()),
            ("nationality", entry.nationality.clone()),
            ("documentId", entry.document_id.clone()),
            ("documentType", entry.document_type.clone()),
            ("reservationId", entry.reservation_id.to_string()),
            ("reservationStatus", entry.reservation_status.to_string()),
            ("ticketId", entry.ticket_id.clone()),
            ("originName", entry.origin_location_name.clone()),
            ("destinationName", entry.destination_location_name.clone()),
            ("itinerary", itinerary_destination_id.to_string()),
        ];
        self.post_form("manifests/", &form).await?;
        Ok(())
    }
}
