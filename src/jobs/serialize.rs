//! # Serialización de Jobs
//! src/jobs/serialize.rs
//!
//! Proyección de lectura: convierte registros del store en payloads del
//! API. Nunca muta el store.
//!
//! Hay dos órdenes distintos sobre la misma colección de estados, y se
//! mantienen como dos funciones explícitas:
//! - `current_status`: el máximo por `(timestamp, id)` — el id desempata
//!   timestamps iguales, así el último insertado gana de forma
//!   determinista sin depender de la resolución del reloj
//! - `ordered_statuses`: historial ascendente, del más viejo al más nuevo

use crate::jobs::types::{JobWithStatuses, StatusRecord, StatusType};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Una entrada del historial de estados, como la ve el cliente
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    pub id: i64,
    pub status_type: StatusType,
    pub timestamp: String,
}

/// El estado actual derivado de un job
#[derive(Debug, Clone, Serialize)]
pub struct CurrentStatusPayload {
    pub status_type: StatusType,
    pub timestamp: String,
}

/// Un job serializado completo
#[derive(Debug, Clone, Serialize)]
pub struct JobPayload {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    /// `null` si el job no tuviera estados (no debería ocurrir, pero se
    /// maneja sin error)
    pub current_status: Option<CurrentStatusPayload>,
    pub statuses: Vec<StatusPayload>,
}

/// Selecciona el estado actual: máximo por `(timestamp, id)`
pub fn current_status(statuses: &[StatusRecord]) -> Option<&StatusRecord> {
    statuses.iter().max_by_key(|s| (s.timestamp, s.id))
}

/// Historial ordenado ascendente por `(timestamp, id)` (más viejo primero)
pub fn ordered_statuses(statuses: &[StatusRecord]) -> Vec<&StatusRecord> {
    let mut ordered: Vec<&StatusRecord> = statuses.iter().collect();
    ordered.sort_by_key(|s| (s.timestamp, s.id));
    ordered
}

/// Serializa un job con su historial al payload del API
pub fn serialize_job(job: &JobWithStatuses) -> JobPayload {
    let current = current_status(&job.statuses).map(|s| CurrentStatusPayload {
        status_type: s.status_type,
        timestamp: to_rfc3339(s.timestamp),
    });

    let statuses = ordered_statuses(&job.statuses)
        .into_iter()
        .map(|s| StatusPayload {
            id: s.id,
            status_type: s.status_type,
            timestamp: to_rfc3339(s.timestamp),
        })
        .collect();

    JobPayload {
        id: job.job.id,
        name: job.job.name.clone(),
        created_at: to_rfc3339(job.job.created_at),
        updated_at: to_rfc3339(job.job.updated_at),
        current_status: current,
        statuses,
    }
}

/// Convierte microsegundos desde epoch a RFC 3339 UTC
/// (ej: "2026-08-29T12:00:00.123456+00:00")
fn to_rfc3339(micros: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobRecord;

    fn status(id: i64, status_type: StatusType, timestamp: i64) -> StatusRecord {
        StatusRecord {
            id,
            job_id: 1,
            status_type,
            timestamp,
        }
    }

    fn job_with(statuses: Vec<StatusRecord>) -> JobWithStatuses {
        JobWithStatuses {
            job: JobRecord {
                id: 1,
                name: "build".to_string(),
                created_at: 1_700_000_000_000_000,
                updated_at: 1_700_000_005_000_000,
            },
            statuses,
        }
    }

    #[test]
    fn test_current_status_is_latest_timestamp() {
        let statuses = vec![
            status(1, StatusType::Pending, 100),
            status(2, StatusType::Running, 200),
            status(3, StatusType::Completed, 300),
        ];

        let current = current_status(&statuses).unwrap();
        assert_eq!(current.status_type, StatusType::Completed);
    }

    #[test]
    fn test_current_status_tie_broken_by_id() {
        // Mismo timestamp: gana el id más alto (el último insertado)
        let statuses = vec![
            status(1, StatusType::Pending, 100),
            status(2, StatusType::Running, 100),
        ];

        let current = current_status(&statuses).unwrap();
        assert_eq!(current.id, 2);
        assert_eq!(current.status_type, StatusType::Running);
    }

    #[test]
    fn test_current_status_empty_is_none() {
        assert!(current_status(&[]).is_none());
    }

    #[test]
    fn test_ordered_statuses_ascending() {
        let statuses = vec![
            status(3, StatusType::Completed, 300),
            status(1, StatusType::Pending, 100),
            status(2, StatusType::Running, 200),
        ];

        let ordered = ordered_statuses(&statuses);
        let ids: Vec<i64> = ordered.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_ordered_statuses_tie_broken_by_id() {
        let statuses = vec![
            status(2, StatusType::Running, 100),
            status(1, StatusType::Pending, 100),
        ];

        let ordered = ordered_statuses(&statuses);
        assert_eq!(ordered[0].id, 1);
        assert_eq!(ordered[1].id, 2);
    }

    #[test]
    fn test_serialize_job_shape() {
        let job = job_with(vec![
            status(1, StatusType::Pending, 1_700_000_000_000_000),
            status(2, StatusType::Running, 1_700_000_005_000_000),
        ]);

        let payload = serialize_job(&job);
        assert_eq!(payload.id, 1);
        assert_eq!(payload.name, "build");
        assert_eq!(payload.statuses.len(), 2);
        assert_eq!(payload.statuses[0].status_type, StatusType::Pending);
        assert_eq!(
            payload.current_status.as_ref().unwrap().status_type,
            StatusType::Running
        );

        // El JSON resultante usa los nombres de campo del API original
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("current_status").is_some());
        assert!(json.get("statuses").is_some());
        assert_eq!(json["statuses"][0]["status_type"], "PENDING");
    }

    #[test]
    fn test_serialize_job_without_statuses() {
        let payload = serialize_job(&job_with(vec![]));
        assert!(payload.current_status.is_none());
        assert!(payload.statuses.is_empty());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["current_status"].is_null());
    }

    #[test]
    fn test_timestamps_are_rfc3339() {
        let payload = serialize_job(&job_with(vec![status(
            1,
            StatusType::Pending,
            1_700_000_000_123_456,
        )]));

        // Parseable de vuelta con chrono
        let parsed = DateTime::parse_from_rfc3339(&payload.statuses[0].timestamp).unwrap();
        assert_eq!(parsed.timestamp_micros(), 1_700_000_000_123_456);
        assert!(payload.created_at.contains('T'));
    }
}
