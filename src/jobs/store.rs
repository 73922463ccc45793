//! # Store Relacional de Jobs
//! src/jobs/store.rs
//!
//! Persistencia durable e integridad referencial para Job/JobStatus
//! sobre SQLite. Dos tablas con foreign key y cascade delete: borrar un
//! job elimina todo su historial de estados.
//!
//! El store es el único punto de serialización entre writers
//! concurrentes: la conexión vive detrás de un `Mutex` y el handle se
//! comparte entre threads vía `Arc` (cada conexión HTTP corre en su
//! propio thread).

use crate::jobs::pagination::Cursor;
use crate::jobs::types::{JobRecord, JobWithStatuses, StatusRecord, StatusType};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errores del store
#[derive(Debug, Error)]
pub enum StoreError {
    /// El job referenciado no existe
    #[error("Job not found: {0}")]
    NotFound(i64),

    /// Falla del motor de almacenamiento
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// Falla de I/O al preparar el archivo de base de datos
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Store de jobs sobre SQLite
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
}

/// Timestamp actual en microsegundos desde epoch (UTC)
fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

impl JobStore {
    /// Abre (o crea) la base de datos en la ruta indicada
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Abre un store en memoria (para tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Crea el esquema si no existe y activa los foreign keys
    /// (SQLite no aplica ON DELETE CASCADE sin el pragma)
    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

             CREATE TABLE IF NOT EXISTS jobs (
                 id          INTEGER PRIMARY KEY AUTOINCREMENT,
                 name        TEXT NOT NULL,
                 created_at  INTEGER NOT NULL,
                 updated_at  INTEGER NOT NULL
             );

             CREATE TABLE IF NOT EXISTS job_statuses (
                 id          INTEGER PRIMARY KEY AUTOINCREMENT,
                 job_id      INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                 status_type TEXT NOT NULL,
                 timestamp   INTEGER NOT NULL
             );

             CREATE INDEX IF NOT EXISTS idx_job_statuses_job ON job_statuses(job_id);
             CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at, id);",
        )
    }

    /// Crea un job junto con su estado inicial PENDING, atómicamente.
    ///
    /// La invariante del dominio es que todo job tiene al menos un
    /// estado desde el momento de su creación, así que ambos inserts
    /// van en la misma transacción.
    pub fn create_job(&self, name: &str) -> Result<JobWithStatuses, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = now_micros();

        tx.execute(
            "INSERT INTO jobs (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, now],
        )?;
        let job_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO job_statuses (job_id, status_type, timestamp) VALUES (?1, ?2, ?3)",
            params![job_id, StatusType::Pending.as_str(), now],
        )?;
        let status_id = tx.last_insert_rowid();

        tx.commit()?;

        Ok(JobWithStatuses {
            job: JobRecord {
                id: job_id,
                name: name.to_string(),
                created_at: now,
                updated_at: now,
            },
            statuses: vec![StatusRecord {
                id: status_id,
                job_id,
                status_type: StatusType::Pending,
                timestamp: now,
            }],
        })
    }

    /// Agrega una transición de estado al historial de un job.
    ///
    /// Falla con `NotFound` si el job no existe. El historial es
    /// append-only: nunca se modifica una transición existente.
    pub fn create_status(
        &self,
        job_id: i64,
        status_type: StatusType,
    ) -> Result<StatusRecord, StoreError> {
        let conn = self.conn.lock().unwrap();

        let exists: bool = conn
            .query_row("SELECT 1 FROM jobs WHERE id = ?1", params![job_id], |_| Ok(true))
            .map(|_| true)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(other),
            })?;
        if !exists {
            return Err(StoreError::NotFound(job_id));
        }

        let now = now_micros();
        conn.execute(
            "INSERT INTO job_statuses (job_id, status_type, timestamp) VALUES (?1, ?2, ?3)",
            params![job_id, status_type.as_str(), now],
        )?;

        Ok(StatusRecord {
            id: conn.last_insert_rowid(),
            job_id,
            status_type,
            timestamp: now,
        })
    }

    /// Obtiene un job por id, con su historial completo precargado
    pub fn get_job(&self, id: i64) -> Result<Option<JobWithStatuses>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM jobs WHERE id = ?1")?;
        let job = match stmt.query_row(params![id], row_to_job) {
            Ok(job) => job,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut jobs = Self::attach_statuses(&conn, vec![job])?;
        Ok(jobs.pop())
    }

    /// Lista jobs ordenados del más nuevo al más viejo, con sus estados
    /// precargados en una sola query adicional (sin queries por job).
    ///
    /// El cursor marca la posición `(created_at, id)` del último
    /// elemento visto. Con `reverse = true` la query avanza hacia jobs
    /// más nuevos en orden ascendente; el caller es responsable de
    /// truncar a su límite y re-invertir para mostrar.
    ///
    /// Pide `limit` filas y retorna hasta esa cantidad; el caller pasa
    /// `limit + 1` si quiere detectar que existe una página más.
    pub fn list_jobs(
        &self,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<JobWithStatuses>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let jobs: Vec<JobRecord> = match cursor {
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, created_at, updated_at FROM jobs
                     ORDER BY created_at DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], row_to_job)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            Some(c) if !c.reverse => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, created_at, updated_at FROM jobs
                     WHERE created_at < ?1 OR (created_at = ?1 AND id < ?2)
                     ORDER BY created_at DESC, id DESC LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![c.ts, c.id, limit as i64], row_to_job)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            Some(c) => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, created_at, updated_at FROM jobs
                     WHERE created_at > ?1 OR (created_at = ?1 AND id > ?2)
                     ORDER BY created_at ASC, id ASC LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![c.ts, c.id, limit as i64], row_to_job)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(Self::attach_statuses(&conn, jobs)?)
    }

    /// Precarga los estados de un conjunto de jobs con una sola query
    fn attach_statuses(
        conn: &Connection,
        jobs: Vec<JobRecord>,
    ) -> rusqlite::Result<Vec<JobWithStatuses>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        // Los ids vienen de nuestras propias filas, interpolarlos es seguro
        let ids: Vec<String> = jobs.iter().map(|j| j.id.to_string()).collect();
        let sql = format!(
            "SELECT id, job_id, status_type, timestamp FROM job_statuses
             WHERE job_id IN ({}) ORDER BY timestamp ASC, id ASC",
            ids.join(",")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_status)?;

        let mut by_job: HashMap<i64, Vec<StatusRecord>> = HashMap::new();
        for row in rows {
            let status = row?;
            by_job.entry(status.job_id).or_default().push(status);
        }

        Ok(jobs
            .into_iter()
            .map(|job| JobWithStatuses {
                statuses: by_job.remove(&job.id).unwrap_or_default(),
                job,
            })
            .collect())
    }

    /// Actualiza los campos escalares mutables (hoy: solo `name`) y
    /// refresca `updated_at`
    pub fn update_job_fields(&self, id: i64, name: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let changed = conn.execute(
            "UPDATE jobs SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now_micros(), id],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Refresca solo `updated_at`, sin tocar otros campos
    /// (usado cuando un PATCH solo agrega una transición de estado)
    pub fn touch_updated_at(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let changed = conn.execute(
            "UPDATE jobs SET updated_at = ?1 WHERE id = ?2",
            params![now_micros(), id],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Elimina un job; el cascade del foreign key elimina su historial.
    /// Retorna `false` si el job no existía.
    pub fn delete_job(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Cantidad de estados registrados para un job (0 si no existe)
    pub fn count_statuses(&self, job_id: i64) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM job_statuses WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl Clone for JobStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Mapea una fila de `jobs` a su registro
fn row_to_job(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Mapea una fila de `job_statuses` a su registro
fn row_to_status(row: &Row<'_>) -> rusqlite::Result<StatusRecord> {
    let raw: String = row.get(2)?;
    let status_type = StatusType::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown status_type: {}", raw).into(),
        )
    })?;

    Ok(StatusRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        status_type,
        timestamp: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> JobStore {
        JobStore::open_in_memory().unwrap()
    }

    // ==================== Create ====================

    #[test]
    fn test_create_job_has_initial_pending_status() {
        let store = store();
        let job = store.create_job("deploy").unwrap();

        assert_eq!(job.job.name, "deploy");
        assert_eq!(job.job.created_at, job.job.updated_at);
        assert_eq!(job.statuses.len(), 1);
        assert_eq!(job.statuses[0].status_type, StatusType::Pending);
        assert_eq!(job.statuses[0].job_id, job.job.id);
    }

    #[test]
    fn test_create_job_assigns_increasing_ids() {
        let store = store();
        let first = store.create_job("a").unwrap();
        let second = store.create_job("b").unwrap();
        assert!(second.job.id > first.job.id);
    }

    // ==================== Statuses ====================

    #[test]
    fn test_create_status_appends() {
        let store = store();
        let job = store.create_job("build").unwrap();

        let status = store
            .create_status(job.job.id, StatusType::Running)
            .unwrap();
        assert_eq!(status.status_type, StatusType::Running);

        let reloaded = store.get_job(job.job.id).unwrap().unwrap();
        assert_eq!(reloaded.statuses.len(), 2);
    }

    #[test]
    fn test_create_status_unknown_job_is_not_found() {
        let store = store();
        let result = store.create_status(999, StatusType::Running);
        assert!(matches!(result, Err(StoreError::NotFound(999))));
    }

    #[test]
    fn test_statuses_loaded_in_ascending_order() {
        let store = store();
        let job = store.create_job("build").unwrap();
        store.create_status(job.job.id, StatusType::Running).unwrap();
        store.create_status(job.job.id, StatusType::Completed).unwrap();

        let reloaded = store.get_job(job.job.id).unwrap().unwrap();
        let ids: Vec<i64> = reloaded.statuses.iter().map(|s| s.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(reloaded.statuses[0].status_type, StatusType::Pending);
    }

    // ==================== Get ====================

    #[test]
    fn test_get_job_missing_is_none() {
        let store = store();
        assert!(store.get_job(42).unwrap().is_none());
    }

    // ==================== Update ====================

    #[test]
    fn test_update_job_fields_refreshes_updated_at() {
        let store = store();
        let job = store.create_job("old-name").unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));
        store.update_job_fields(job.job.id, "new-name").unwrap();

        let reloaded = store.get_job(job.job.id).unwrap().unwrap();
        assert_eq!(reloaded.job.name, "new-name");
        assert!(reloaded.job.updated_at > job.job.updated_at);
        assert_eq!(reloaded.job.created_at, job.job.created_at);
    }

    #[test]
    fn test_update_job_fields_missing_is_not_found() {
        let store = store();
        let result = store.update_job_fields(42, "x");
        assert!(matches!(result, Err(StoreError::NotFound(42))));
    }

    #[test]
    fn test_touch_updated_at_only() {
        let store = store();
        let job = store.create_job("build").unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));
        store.touch_updated_at(job.job.id).unwrap();

        let reloaded = store.get_job(job.job.id).unwrap().unwrap();
        assert_eq!(reloaded.job.name, "build");
        assert!(reloaded.job.updated_at > job.job.updated_at);
        // No se agregó ningún estado
        assert_eq!(reloaded.statuses.len(), 1);
    }

    #[test]
    fn test_touch_missing_is_not_found() {
        let store = store();
        assert!(matches!(
            store.touch_updated_at(42),
            Err(StoreError::NotFound(42))
        ));
    }

    // ==================== Delete ====================

    #[test]
    fn test_delete_job_cascades_statuses() {
        let store = store();
        let job = store.create_job("doomed").unwrap();
        store.create_status(job.job.id, StatusType::Running).unwrap();
        assert_eq!(store.count_statuses(job.job.id).unwrap(), 2);

        assert!(store.delete_job(job.job.id).unwrap());

        assert!(store.get_job(job.job.id).unwrap().is_none());
        // El cascade eliminó las filas de estado
        assert_eq!(store.count_statuses(job.job.id).unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let store = store();
        assert!(!store.delete_job(42).unwrap());
    }

    // ==================== List ====================

    #[test]
    fn test_list_jobs_newest_first() {
        let store = store();
        for name in ["a", "b", "c"] {
            store.create_job(name).unwrap();
        }

        let jobs = store.list_jobs(None, 10).unwrap();
        assert_eq!(jobs.len(), 3);
        // Más nuevo primero (empates de timestamp desempatados por id)
        assert_eq!(jobs[0].job.name, "c");
        assert_eq!(jobs[2].job.name, "a");
        // Estados precargados
        assert_eq!(jobs[0].statuses.len(), 1);
    }

    #[test]
    fn test_list_jobs_respects_limit() {
        let store = store();
        for i in 0..5 {
            store.create_job(&format!("job-{}", i)).unwrap();
        }

        let jobs = store.list_jobs(None, 2).unwrap();
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn test_list_jobs_forward_cursor_pages_without_overlap() {
        let store = store();
        for i in 0..5 {
            store.create_job(&format!("job-{}", i)).unwrap();
        }

        let first_page = store.list_jobs(None, 2).unwrap();
        let last = &first_page[1].job;

        let cursor = Cursor::next_after(last.created_at, last.id);
        let second_page = store.list_jobs(Some(&cursor), 2).unwrap();

        let first_ids: Vec<i64> = first_page.iter().map(|j| j.job.id).collect();
        let second_ids: Vec<i64> = second_page.iter().map(|j| j.job.id).collect();
        assert_eq!(second_ids.len(), 2);
        for id in &second_ids {
            assert!(!first_ids.contains(id));
        }
        // Siguen en orden descendente
        assert!(second_ids[0] > second_ids[1]);
        assert!(first_ids[1] > second_ids[0]);
    }

    #[test]
    fn test_list_jobs_reverse_cursor_returns_newer_rows_ascending() {
        let store = store();
        for i in 0..5 {
            store.create_job(&format!("job-{}", i)).unwrap();
        }

        // Posicionarse en el elemento más viejo
        let all = store.list_jobs(None, 10).unwrap();
        let oldest = &all.last().unwrap().job;

        let cursor = Cursor::previous_before(oldest.created_at, oldest.id);
        let rows = store.list_jobs(Some(&cursor), 2).unwrap();

        assert_eq!(rows.len(), 2);
        // Orden ascendente, empezando por el vecino inmediato del cursor
        assert!(rows[0].job.id < rows[1].job.id);
        assert!(rows[0].job.id > oldest.id || rows[0].job.created_at > oldest.created_at);
    }

    #[test]
    fn test_list_jobs_cursor_stable_under_concurrent_insert() {
        let store = store();
        for i in 0..4 {
            store.create_job(&format!("job-{}", i)).unwrap();
        }

        let first_page = store.list_jobs(None, 2).unwrap();
        let last = &first_page[1].job;
        let cursor = Cursor::next_after(last.created_at, last.id);

        // Un insert concurrente entre página y página
        store.create_job("concurrent").unwrap();

        // La segunda página no se desplaza: sigue siendo la misma
        let second_page = store.list_jobs(Some(&cursor), 2).unwrap();
        let names: Vec<&str> = second_page.iter().map(|j| j.job.name.as_str()).collect();
        assert_eq!(names, vec!["job-1", "job-0"]);
    }

    #[test]
    fn test_list_jobs_empty_store() {
        let store = store();
        assert!(store.list_jobs(None, 10).unwrap().is_empty());
    }
}
