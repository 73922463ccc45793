//! # Tipos del Dominio de Jobs
//! src/jobs/types.rs
//!
//! Define los registros que persiste el store y el enum cerrado de
//! tipos de estado. El historial de estados es append-only: un
//! `StatusRecord` nunca se muta ni se borra individualmente.

use serde::{Deserialize, Serialize};

/// Tipo de estado de un job
///
/// Enum cerrado: cualquier valor fuera de estas cuatro variantes se
/// rechaza antes de llegar al store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    /// Estado inicial de todo job recién creado
    Pending,

    /// Job en ejecución
    Running,

    /// Job completado exitosamente
    Completed,

    /// Job falló
    Failed,
}

impl StatusType {
    /// Las cuatro variantes, en el orden en que se listan al cliente
    pub const ALL: [StatusType; 4] = [
        StatusType::Pending,
        StatusType::Running,
        StatusType::Completed,
        StatusType::Failed,
    ];

    /// Parsea un tipo de estado desde su representación en el API
    ///
    /// # Ejemplo
    /// ```
    /// use joblister::jobs::types::StatusType;
    ///
    /// assert_eq!(StatusType::parse("RUNNING"), Some(StatusType::Running));
    /// assert_eq!(StatusType::parse("BOGUS"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(StatusType::Pending),
            "RUNNING" => Some(StatusType::Running),
            "COMPLETED" => Some(StatusType::Completed),
            "FAILED" => Some(StatusType::Failed),
            _ => None,
        }
    }

    /// Convierte el tipo de estado a su representación en el API
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusType::Pending => "PENDING",
            StatusType::Running => "RUNNING",
            StatusType::Completed => "COMPLETED",
            StatusType::Failed => "FAILED",
        }
    }

    /// Lista de valores válidos para mensajes de error
    /// ("PENDING, RUNNING, COMPLETED, FAILED")
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for StatusType {
    fn default() -> Self {
        StatusType::Pending
    }
}

/// Fila de la tabla `jobs`
///
/// Los timestamps son microsegundos desde epoch (UTC); el serializador
/// los convierte a RFC 3339 para el API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// ID único, asignado por el store
    pub id: i64,

    /// Nombre del job (único campo escalar mutable)
    pub name: String,

    /// Momento de creación, inmutable
    pub created_at: i64,

    /// Se refresca en cada mutación (incluyendo appends de estado)
    pub updated_at: i64,
}

/// Fila de la tabla `job_statuses`: una transición de estado inmutable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    /// ID único, asignado por el store
    pub id: i64,

    /// Job dueño de esta transición
    pub job_id: i64,

    /// Tipo de estado registrado
    pub status_type: StatusType,

    /// Momento del registro, inmutable; define el orden del historial
    pub timestamp: i64,
}

/// Un job junto con su historial completo de estados (precargado)
#[derive(Debug, Clone)]
pub struct JobWithStatuses {
    pub job: JobRecord,
    pub statuses: Vec<StatusRecord>,
}
