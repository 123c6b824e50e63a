use crate::config::ApiConfig;
use crate::domain::model::{
    Itinerary, ItineraryGroup, ManifestBatch, ManifestEntry, Port, PortGroup, RejectedRecord,
};
use crate::domain::ports::SourceApi;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

const SNAPSHOT_ENVELOPE: &str = "manifiesto_embarque";
const DELTA_ENVELOPE: &str = "manifiesto_pasajero";

/// 售票系統 control API 的客戶端
pub struct TicketingClient {
    config: ApiConfig,
    client: Client,
}

impl TicketingClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.config.endpoint(path);
        tracing::debug!("📡 GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header("token", &self.config.token)
            .query(query)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(SyncError::source_unavailable)?;

        let status = response.status();
        tracing::debug!("📡 {} -> {}", url, status);
        if !status.is_success() {
            return Err(SyncError::SourceUnavailable {
                message: format!("GET {} returned {}", url, status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(SyncError::source_unavailable)?;
        serde_json::from_str(&body).map_err(|e| SyncError::SourceUnavailable {
            message: format!("GET {} returned malformed JSON: {}", url, e),
        })
    }
}

#[async_trait]
impl SourceApi for TicketingClient {
    async fn list_itineraries(&self, date: NaiveDate) -> Result<Vec<ItineraryGroup>> {
        let body = self
            .get_json("itineraries", &[("date", date.format("%Y-%m-%d").to_string())])
            .await?;

        let groups = split_groups(body, "itineraries")?
            .into_iter()
            .map(|(keyword, items)| {
                let (itineraries, rejected) = parse_each(items, WireItinerary::into_domain);
                ItineraryGroup {
                    keyword,
                    itineraries,
                    rejected,
                }
            })
            .collect();
        Ok(groups)
    }

    async fn list_ports(&self, itinerary_source_id: i64) -> Result<Vec<PortGroup>> {
        let body = self
            .get_json(
                "itinerary_ports",
                &[("itinerary", itinerary_source_id.to_string())],
            )
            .await?;

        let groups = split_groups(body, "ports")?
            .into_iter()
            .map(|(key, items)| {
                let (ports, rejected) = parse_each(items, WirePort::into_domain);
                PortGroup {
                    key,
                    ports,
                    rejected,
                }
            })
            .collect();
        Ok(groups)
    }

    async fn fetch_manifest(
        &self,
        itinerary_source_id: i64,
        port_source_location_id: i64,
        update_timestamp: Option<&str>,
    ) -> Result<ManifestBatch> {
        let mut query = vec![
            ("itinerary", itinerary_source_id.to_string()),
            ("port", port_source_location_id.to_string()),
        ];

        let (path, envelope) = match update_timestamp {
            None => ("embarks", SNAPSHOT_ENVELOPE),
            Some(since) => {
                query.push(("date", since.to_string()));
                ("itinerary_manifest", DELTA_ENVELOPE)
            }
        };

        let body = self.get_json(path, &query).await?;
        parse_manifest(body, envelope)
    }
}

/// 解開艙單外層；優先使用端點預期的 key，也接受另一種
pub fn parse_manifest(body: Value, preferred_envelope: &str) -> Result<ManifestBatch> {
    let Value::Object(mut map) = body else {
        return Err(SyncError::SourceUnavailable {
            message: "manifest response is not a JSON object".to_string(),
        });
    };

    let items = [preferred_envelope, SNAPSHOT_ENVELOPE, DELTA_ENVELOPE]
        .iter()
        .find_map(|key| map.remove(*key))
        .ok_or_else(|| SyncError::SourceUnavailable {
            message: format!("manifest response has no '{}' list", preferred_envelope),
        })?;

    let items = match items {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            return Err(SyncError::SourceUnavailable {
                message: format!("manifest envelope is not a list: {}", other),
            })
        }
    };

    let (entries, rejected) = parse_each(items, WireManifestEntry::into_domain);
    Ok(ManifestBatch { entries, rejected })
}

/// 來源以任意 key 分組回傳；保留回傳順序
fn split_groups(body: Value, what: &str) -> Result<Vec<(String, Vec<Value>)>> {
    match body {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| match value {
                Value::Array(items) => Ok((key, items)),
                Value::Null => Ok((key, Vec::new())),
                other => Err(SyncError::SourceUnavailable {
                    message: format!("{} group '{}' is not a list: {}", what, key, other),
                }),
            })
            .collect(),
        Value::Array(items) => Ok(vec![(String::new(), items)]),
        other => Err(SyncError::SourceUnavailable {
            message: format!("{} response has unexpected shape: {}", what, other),
        }),
    }
}

fn parse_each<W, T>(
    items: Vec<Value>,
    convert: impl Fn(W) -> std::result::Result<T, String>,
) -> (Vec<T>, Vec<RejectedRecord>)
where
    W: DeserializeOwned,
{
    let mut parsed = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();

    for raw in items {
        let outcome = serde_json::from_value::<W>(raw.clone())
            .map_err(|e| e.to_string())
            .and_then(&convert);
        match outcome {
            Ok(item) => parsed.push(item),
            Err(reason) => {
                tracing::warn!("⚠️ Rejected source record: {}", reason);
                rejected.push(RejectedRecord { reason, raw });
            }
        }
    }

    (parsed, rejected)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Ok(other.to_string()),
    }
}

// 數字欄位有時以字串送出 ("2")
fn optional_integer<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected integer, got {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected integer, got \"{}\"", s))),
        Some(other) => Err(de::Error::custom(format!("expected integer, got {}", other))),
    }
}

fn require(field: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("missing required field '{}'", field))
    } else {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WireItinerary {
    id_itinerario: i64,
    #[serde(deserialize_with = "optional_text", default)]
    zarpe: String,
    #[serde(deserialize_with = "optional_text", default)]
    nombre_ruta: String,
}

impl WireItinerary {
    fn into_domain(self) -> std::result::Result<Itinerary, String> {
        require("zarpe", &self.zarpe)?;
        Ok(Itinerary {
            source_id: self.id_itinerario,
            destination_id: None,
            departure: self.zarpe,
            route_name: self.nombre_ruta,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WirePort {
    id_ubicacion: i64,
    #[serde(deserialize_with = "optional_text", default)]
    nombre_ubicacion: String,
}

impl WirePort {
    fn into_domain(self) -> std::result::Result<Port, String> {
        require("nombre_ubicacion", &self.nombre_ubicacion)?;
        Ok(Port {
            source_location_id: self.id_ubicacion,
            location_name: self.nombre_ubicacion,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireManifestEntry {
    #[serde(deserialize_with = "string_or_number")]
    codigo_pasajero: String,
    #[serde(deserialize_with = "optional_text", default)]
    nombre_pasajero: String,
    #[serde(deserialize_with = "optional_text", default)]
    sexo: String,
    #[serde(deserialize_with = "optional_text", default)]
    residente: String,
    #[serde(deserialize_with = "optional_text", default)]
    nacionalidad: String,
    #[serde(deserialize_with = "optional_text", default)]
    nombre_cod_documento: String,
    id_detalle_reserva: i64,
    #[serde(deserialize_with = "optional_integer", default)]
    estado_detalle_reserva: Option<i64>,
    #[serde(deserialize_with = "optional_text", default)]
    ticket: String,
    #[serde(deserialize_with = "optional_text", default)]
    origen: String,
    #[serde(deserialize_with = "optional_text", default)]
    destino: String,
    #[serde(default)]
    id_itinerario: Option<i64>,
    #[serde(default)]
    id_itinerario_relacionado: Option<i64>,
}

impl WireManifestEntry {
    fn into_domain(self) -> std::result::Result<ManifestEntry, String> {
        require("codigo_pasajero", &self.codigo_pasajero)?;
        require("nombre_pasajero", &self.nombre_pasajero)?;
        require("origen", &self.origen)?;
        require("destino", &self.destino)?;

        Ok(ManifestEntry {
            document_id: self.codigo_pasajero.trim().to_string(),
            passenger_name: self.nombre_pasajero,
            sex: self.sexo,
            resident: self.residente,
            nationality: self.nacionalidad,
            document_type: self.nombre_cod_documento,
            reservation_id: self.id_detalle_reserva,
            reservation_status: self.estado_detalle_reserva.unwrap_or(0),
            ticket_id: self.ticket,
            origin_location_name: self.origen,
            destination_location_name: self.destino,
            itinerary_source_id: self.id_itinerario,
            related_itinerary_source_id: self.id_itinerario_relacionado,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> TicketingClient {
        TicketingClient::new(ApiConfig {
            base_url: server.base_url(),
            token: "source-token".to_string(),
            timeout_seconds: Some(5),
        })
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 10, 10).unwrap()
    }

    #[tokio::test]
    async fn test_list_itineraries_keeps_groups_in_order() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/itineraries")
                .query_param("date", "2016-10-10")
                .header("token", "source-token");
            then.status(200)
                .header("Content-Type", "application/json")
                .body(
                    r#"{
                        "ruta_205": [
                            {"id_itinerario": 1, "zarpe": "2016-10-10T01:00:00.000Z", "codigo_ruta": "205", "nombre_ruta": "Chaitén - Ayacara"},
                            {"id_itinerario": 2, "zarpe": "2016-10-11T01:00:00.000Z", "nombre_ruta": "Puerto Montt - Ayacara"}
                        ],
                        "ruta_101": [
                            {"zarpe": "2016-10-10T05:00:00.000Z"}
                        ]
                    }"#,
                );
        });

        let groups = client_for(&server).list_itineraries(date()).await.unwrap();

        api_mock.assert();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].keyword, "ruta_205");
        assert_eq!(groups[0].itineraries.len(), 2);
        assert_eq!(groups[0].itineraries[0].source_id, 1);
        assert_eq!(groups[0].itineraries[0].route_name, "Chaitén - Ayacara");
        assert!(groups[0].itineraries[0].destination_id.is_none());
        assert_eq!(groups[1].keyword, "ruta_101");
        assert!(groups[1].itineraries.is_empty());
        assert_eq!(groups[1].rejected.len(), 1);
    }

    #[tokio::test]
    async fn test_list_ports() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/itinerary_ports")
                .query_param("itinerary", "1");
            then.status(200).json_body(serde_json::json!({
                "1": [
                    {"id_ubicacion": 1, "nombre_ubicacion": "Chaiten"},
                    {"id_ubicacion": 3, "nombre_ubicacion": "Ayacara"}
                ]
            }));
        });

        let groups = client_for(&server).list_ports(1).await.unwrap();

        api_mock.assert();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].ports,
            vec![
                Port {
                    source_location_id: 1,
                    location_name: "Chaiten".to_string()
                },
                Port {
                    source_location_id: 3,
                    location_name: "Ayacara".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_snapshot_manifest() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/embarks")
                .query_param("itinerary", "1")
                .query_param("port", "3");
            then.status(200).json_body(serde_json::json!({
                "manifiesto_embarque": [
                    {
                        "codigo_pasajero": "111-1", "nombre_pasajero": "juan perez", "id_itinerario": 1,
                        "nombre_cod_documento": "Cédula de Identidad", "residente": "No",
                        "id_itinerario_relacionado": null, "sexo": "M", "id_detalle_reserva": 11111,
                        "destino": "Ayacara", "origen": "Chaiten", "ticket": 111, "nacionalidad": "Chileno(a)"
                    },
                    {
                        "codigo_pasajero": "", "nombre_pasajero": "sin documento",
                        "id_detalle_reserva": 1, "destino": "Ayacara", "origen": "Chaiten"
                    }
                ]
            }));
        });

        let batch = client_for(&server).fetch_manifest(1, 3, None).await.unwrap();

        api_mock.assert();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.rejected.len(), 1);

        let entry = &batch.entries[0];
        assert_eq!(entry.document_id, "111-1");
        assert_eq!(entry.ticket_id, "111");
        assert_eq!(entry.reservation_status, 0);
        assert_eq!(entry.related_itinerary_source_id, None);
        assert!(batch.rejected[0].reason.contains("codigo_pasajero"));
    }

    #[tokio::test]
    async fn test_fetch_delta_manifest_uses_update_endpoint() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/itinerary_manifest")
                .query_param("itinerary", "1828")
                .query_param("port", "5")
                .query_param("date", "2016-10-10 08:30");
            then.status(200).json_body(serde_json::json!({
                "manifiesto_pasajero": [
                    {
                        "codigo_pasajero": "333-3", "nombre_pasajero": "marcel gutierrez",
                        "id_detalle_reserva": 33333, "estado_detalle_reserva": 2,
                        "destino": "Ayacara", "origen": "Puerto Montt", "ticket": "333"
                    }
                ]
            }));
        });

        let batch = client_for(&server)
            .fetch_manifest(1828, 5, Some("2016-10-10 08:30"))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].reservation_status, 2);
        assert_eq!(batch.entries[0].origin_location_name, "Puerto Montt");
    }

    #[tokio::test]
    async fn test_non_success_status_is_source_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/itinerary_ports");
            then.status(500);
        });

        let err = client_for(&server).list_ports(1).await.unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_non_json_body_is_source_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/itineraries");
            then.status(200).body("<html>maintenance</html>");
        });

        let err = client_for(&server)
            .list_itineraries(date())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_manifest_without_envelope_is_malformed() {
        let err = parse_manifest(serde_json::json!({"otro": []}), SNAPSHOT_ENVELOPE).unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }));

        let batch =
            parse_manifest(serde_json::json!({"manifiesto_embarque": null}), SNAPSHOT_ENVELOPE)
                .unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_reservation_status_accepts_string_numbers() {
        let passenger = |status: serde_json::Value| {
            serde_json::json!({
                "codigo_pasajero": "111-1", "nombre_pasajero": "juan perez",
                "id_detalle_reserva": 11111, "estado_detalle_reserva": status,
                "destino": "Ayacara", "origen": "Chaiten", "ticket": "111"
            })
        };
        let body = serde_json::json!({
            "manifiesto_pasajero": [
                passenger(serde_json::json!("2")),
                passenger(serde_json::json!("")),
                passenger(serde_json::json!("anulado"))
            ]
        });

        let batch = parse_manifest(body, DELTA_ENVELOPE).unwrap();

        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[0].reservation_status, 2);
        assert_eq!(batch.entries[1].reservation_status, 0);
        assert_eq!(batch.rejected.len(), 1);
        assert!(batch.rejected[0].reason.contains("anulado"));
    }
}
