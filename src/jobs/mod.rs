//! # Sistema de Jobs
//!
//! El dominio del servidor: jobs con historial append-only de estados.
//!
//! ## Endpoints
//!
//! - `GET /health/` - Liveness check (no toca el store)
//! - `GET /api/jobs/` - Listar jobs con paginación por cursor
//! - `POST /api/jobs/` - Crear job (nace con un estado PENDING)
//! - `GET /api/jobs/{id}/` - Obtener un job con su historial completo
//! - `PATCH /api/jobs/{id}/` - Actualización combinada: campos y/o nueva
//!   transición de estado en un solo request
//! - `PUT /api/jobs/{id}/` - Reemplazo de los campos mutables
//! - `DELETE /api/jobs/{id}/` - Eliminar job y su historial

pub mod handlers;
pub mod pagination;
pub mod serialize;
pub mod store;
pub mod types;

pub use handlers::AppState;
pub use store::JobStore;
pub use types::{JobRecord, JobWithStatuses, StatusRecord, StatusType};
