use crate::domain::model::ManifestEntry;
use crate::domain::ports::DedupStore;
use crate::utils::error::{Result, SyncError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS manifests (
    id INTEGER PRIMARY KEY,
    codigo_pasajero TEXT NOT NULL UNIQUE,
    destino TEXT,
    id_detalle_reserva INTEGER,
    estado_detalle_reserva INTEGER,
    id_itinerario INTEGER,
    id_itinerario_relacionado INTEGER,
    nacionalidad TEXT,
    nombre_cod_documento TEXT,
    nombre_pasajero TEXT,
    origen TEXT,
    residente TEXT,
    sexo TEXT,
    ticket TEXT,
    snapshot TEXT NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// 以 SQLite 保存已轉送的艙單；每個目標日期一個檔案
pub struct SqliteDedupStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDedupStore {
    /// 開啟或建立 store，必要時建立上層目錄
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        tracing::debug!("🗄️ Opened dedup store at {}", path.display());
        Self::initialize(conn)
    }

    /// 測試用
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 在 blocking 執行緒上使用連線，避免 SQLite I/O 卡住 async runtime
    async fn execute_blocking<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.conn.clone();

        task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| SyncError::DedupStoreError {
                message: format!("connection lock poisoned: {}", e),
            })?;
            f(&*conn)
        })
        .await
        .map_err(|e| SyncError::DedupStoreError {
            message: format!("store task failed: {}", e),
        })?
    }

    pub async fn count(&self) -> Result<usize> {
        let count: i64 = self
            .execute_blocking(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM manifests", [], |row| row.get(0))?)
            })
            .await?;
        Ok(count as usize)
    }

    /// 讀回轉送當下的完整快照
    pub async fn snapshot(&self, document_id: &str) -> Result<Option<ManifestEntry>> {
        let key = document_id.to_string();
        let raw: Option<String> = self
            .execute_blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT snapshot FROM manifests WHERE codigo_pasajero = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| SyncError::DedupStoreError {
                message: format!("corrupt snapshot for {}: {}", document_id, e),
            })
        })
        .transpose()
    }
}

impl DedupStore for SqliteDedupStore {
    async fn exists(&self, document_id: &str) -> Result<bool> {
        let key = document_id.to_string();
        self.execute_blocking(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM manifests WHERE codigo_pasajero = ?1",
                    params![key],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn record(&self, entry: &ManifestEntry) -> Result<()> {
        let snapshot = serde_json::to_string(entry).map_err(|e| SyncError::DedupStoreError {
            message: format!("cannot serialize {}: {}", entry.document_id, e),
        })?;

        let entry = entry.clone();
        self.execute_blocking(move |conn| {
            let inserted = conn.execute(
                r#"
                INSERT OR IGNORE INTO manifests (
                    codigo_pasajero, destino, id_detalle_reserva, estado_detalle_reserva,
                    id_itinerario, id_itinerario_relacionado, nacionalidad, nombre_cod_documento,
                    nombre_pasajero, origen, residente, sexo, ticket, snapshot
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
                params![
                    entry.document_id,
                    entry.destination_location_name,
                    entry.reservation_id,
                    entry.reservation_status,
                    entry.itinerary_source_id,
                    entry.related_itinerary_source_id,
                    entry.nationality,
                    entry.document_type,
                    entry.passenger_name,
                    entry.origin_location_name,
                    entry.resident,
                    entry.sex,
                    entry.ticket_id,
                    snapshot,
                ],
            )?;

            if inserted == 0 {
                tracing::debug!("🗄️ {} already recorded, ignoring", entry.document_id);
            }
            Ok(())
        })
        .await
    }
}
