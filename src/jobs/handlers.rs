//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Implementa los endpoints del API de jobs:
//! - GET    /health/
//! - GET    /api/jobs/
//! - POST   /api/jobs/
//! - GET    /api/jobs/{id}/
//! - PATCH  /api/jobs/{id}/
//! - PUT    /api/jobs/{id}/
//! - DELETE /api/jobs/{id}/
//!
//! Los handlers no conocen sockets ni threads: reciben un `Request` ya
//! parseado, los parámetros capturados del path y el estado compartido,
//! y retornan una `Response`. Toda validación ocurre antes de cualquier
//! mutación: un request inválido nunca deja el store a medio modificar.

use crate::http::{Request, Response, StatusCode};
use crate::jobs::pagination::{page_url, Cursor};
use crate::jobs::serialize;
use crate::jobs::store::{JobStore, StoreError};
use crate::jobs::types::{JobWithStatuses, StatusType};
use crate::router::PathParams;
use serde_json::{json, Value};

/// Estado compartido entre todos los handlers
///
/// Se clona por thread de conexión; el store interno comparte la misma
/// conexión detrás de un `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Store de jobs compartido
    pub store: JobStore,

    /// Tamaño de página por defecto del listado
    pub page_size: usize,

    /// Tope duro para el query param `page_size`
    pub max_page_size: usize,
}

impl AppState {
    pub fn new(store: JobStore, page_size: usize, max_page_size: usize) -> Self {
        Self {
            store,
            page_size,
            max_page_size,
        }
    }
}

// ==================== Handlers ====================

/// Handler para GET /health/
///
/// Liveness check: responde sin tocar el store, así sigue contestando
/// aunque la base de datos esté en mal estado.
pub fn health_handler(_req: &Request, _params: &PathParams, _state: &AppState) -> Response {
    Response::json(r#"{"status": "healthy"}"#)
}

/// Handler para GET /api/jobs/?cursor=TOKEN&page_size=N
///
/// Lista jobs del más nuevo al más viejo con paginación por cursor.
///
/// # Ejemplo de response
/// ```json
/// {"results": [...], "next": "/api/jobs/?cursor=...", "previous": null}
/// ```
pub fn list_jobs_handler(req: &Request, _params: &PathParams, state: &AppState) -> Response {
    // page_size inválido o ausente cae al default; nunca supera el tope
    let page_size = req
        .query_param("page_size")
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .map(|n| n.min(state.max_page_size))
        .unwrap_or(state.page_size);

    // Un cursor presente pero ilegible sí es un error del cliente
    let cursor = match req.query_param("cursor") {
        None => None,
        Some(token) => match Cursor::decode(token) {
            Some(cursor) => Some(cursor),
            None => return Response::error(StatusCode::BadRequest, "Invalid cursor."),
        },
    };

    // Pedimos una fila extra para saber si existe otra página
    let mut rows = match state.store.list_jobs(cursor.as_ref(), page_size + 1) {
        Ok(rows) => rows,
        Err(e) => return store_error_response(e),
    };
    let has_extra = rows.len() > page_size;
    rows.truncate(page_size);

    // En navegación reversa el store retorna ascendente desde el cursor;
    // una vez truncado, se invierte para mostrar más-nuevo-primero
    let (has_next, has_previous) = match cursor {
        None => (has_extra, false),
        Some(c) if !c.reverse => (has_extra, true),
        Some(_) => {
            rows.reverse();
            (true, has_extra)
        }
    };

    let next = if has_next {
        rows.last().map(|row| {
            let cursor = Cursor::next_after(row.job.created_at, row.job.id);
            page_url(&cursor, page_size)
        })
    } else {
        None
    };
    let previous = if has_previous {
        rows.first().map(|row| {
            let cursor = Cursor::previous_before(row.job.created_at, row.job.id);
            page_url(&cursor, page_size)
        })
    } else {
        None
    };

    let results: Vec<_> = rows.iter().map(serialize::serialize_job).collect();
    let body = json!({
        "results": results,
        "next": next,
        "previous": previous,
    });
    Response::json_value(StatusCode::Ok, &body)
}

/// Handler para POST /api/jobs/
///
/// Crea un job nuevo. El job nace con un estado PENDING registrado en la
/// misma operación.
///
/// # Body
/// ```json
/// {"name": "deploy"}
/// ```
pub fn create_job_handler(req: &Request, _params: &PathParams, state: &AppState) -> Response {
    let body = match parse_json_body(req) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let name = match validate_name(body.get("name"), true) {
        Ok(Some(name)) => name,
        // `required = true` garantiza que nunca llega None
        Ok(None) => return Response::field_error("name", "This field is required."),
        Err(response) => return response,
    };

    match state.store.create_job(&name) {
        Ok(job) => job_response(StatusCode::Created, &job),
        Err(e) => store_error_response(e),
    }
}

/// Handler para GET /api/jobs/{id}/
pub fn get_job_handler(_req: &Request, params: &PathParams, state: &AppState) -> Response {
    let id = match parse_id(params) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.store.get_job(id) {
        Ok(Some(job)) => job_response(StatusCode::Ok, &job),
        Ok(None) => not_found(id),
        Err(e) => store_error_response(e),
    }
}

/// Handler para PATCH /api/jobs/{id}/
///
/// Actualización combinada en un solo request:
/// - `status_type` presente → agrega una transición al historial
/// - `name` presente → actualiza el nombre
/// - claves desconocidas → se ignoran
///
/// `updated_at` se refresca siempre, incluso con un body vacío. La
/// validación completa ocurre antes de mutar: un `status_type` o `name`
/// inválido deja el job y su historial exactamente como estaban.
pub fn patch_job_handler(req: &Request, params: &PathParams, state: &AppState) -> Response {
    let id = match parse_id(params) {
        Ok(id) => id,
        Err(response) => return response,
    };

    // La existencia se verifica antes de mirar el body: un job
    // inexistente es 404 aunque el body también sea inválido
    match state.store.get_job(id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(id),
        Err(e) => return store_error_response(e),
    }

    let body = match parse_json_body(req) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let status_type = match body.get("status_type") {
        None => None,
        Some(raw) => {
            let parsed = raw.as_str().and_then(StatusType::parse);
            match parsed {
                Some(status) => Some(status),
                None => {
                    return Response::error(
                        StatusCode::BadRequest,
                        &format!(
                            "Invalid status_type. Must be one of: {}",
                            StatusType::valid_values()
                        ),
                    );
                }
            }
        }
    };

    let name = match validate_name(body.get("name"), false) {
        Ok(name) => name,
        Err(response) => return response,
    };

    // Validación completa: recién ahora se muta
    if let Some(status) = status_type {
        if let Err(e) = state.store.create_status(id, status) {
            return store_error_response(e);
        }
    }

    let result = match name {
        Some(name) => state.store.update_job_fields(id, &name),
        None => state.store.touch_updated_at(id),
    };
    if let Err(e) = result {
        return store_error_response(e);
    }

    reload_job(state, id)
}

/// Handler para PUT /api/jobs/{id}/
///
/// Reemplazo completo de los campos mutables del job. `name` es
/// requerido; `status_type` y cualquier otra clave desconocida se
/// ignoran (las transiciones de estado son exclusivas de PATCH).
pub fn put_job_handler(req: &Request, params: &PathParams, state: &AppState) -> Response {
    let id = match parse_id(params) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.store.get_job(id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(id),
        Err(e) => return store_error_response(e),
    }

    let body = match parse_json_body(req) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let name = match validate_name(body.get("name"), true) {
        Ok(Some(name)) => name,
        Ok(None) => return Response::field_error("name", "This field is required."),
        Err(response) => return response,
    };

    if let Err(e) = state.store.update_job_fields(id, &name) {
        return store_error_response(e);
    }

    reload_job(state, id)
}

/// Handler para DELETE /api/jobs/{id}/
///
/// Elimina el job y todo su historial de estados.
pub fn delete_job_handler(_req: &Request, params: &PathParams, state: &AppState) -> Response {
    let id = match parse_id(params) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.store.delete_job(id) {
        Ok(true) => Response::no_content(),
        Ok(false) => not_found(id),
        Err(e) => store_error_response(e),
    }
}

// ==================== Helpers ====================

/// Extrae el id numérico del path. Un id no numérico se trata igual que
/// un job inexistente: 404.
fn parse_id(params: &PathParams) -> Result<i64, Response> {
    let raw = params.get("id").map(String::as_str).unwrap_or("");
    raw.parse::<i64>().map_err(|_| {
        Response::error(StatusCode::NotFound, &format!("Job not found: {}", raw))
    })
}

/// Parsea el body como JSON. Un body ausente equivale a `{}` (un PATCH
/// vacío es válido: solo refresca `updated_at`).
fn parse_json_body(req: &Request) -> Result<Value, Response> {
    let raw = match req.body_string() {
        Some(raw) => raw,
        None => {
            return Err(Response::json_value(
                StatusCode::BadRequest,
                &json!({"detail": "JSON parse error - request body is not valid UTF-8"}),
            ));
        }
    };

    if raw.trim().is_empty() {
        return Ok(json!({}));
    }

    serde_json::from_str(&raw).map_err(|e| {
        Response::json_value(
            StatusCode::BadRequest,
            &json!({"detail": format!("JSON parse error - {}", e)}),
        )
    })
}

/// Valida el campo `name` del body.
///
/// Retorna `Ok(None)` cuando el campo está ausente y no es requerido.
/// Los mensajes replican los del backend original, con formato
/// `{"name": ["mensaje"]}`.
fn validate_name(value: Option<&Value>, required: bool) -> Result<Option<String>, Response> {
    let value = match value {
        None => {
            if required {
                return Err(Response::field_error("name", "This field is required."));
            }
            return Ok(None);
        }
        Some(value) => value,
    };

    if value.is_null() {
        return Err(Response::field_error("name", "This field may not be null."));
    }

    let name = match value.as_str() {
        Some(name) => name.trim(),
        None => return Err(Response::field_error("name", "Not a valid string.")),
    };

    if name.is_empty() {
        return Err(Response::field_error("name", "This field may not be blank."));
    }

    Ok(Some(name.to_string()))
}

/// Serializa un job como respuesta con el status indicado
fn job_response(status: StatusCode, job: &JobWithStatuses) -> Response {
    let payload = serialize::serialize_job(job);
    match serde_json::to_value(&payload) {
        Ok(value) => Response::json_value(status, &value),
        Err(e) => {
            log::error!("Failed to serialize job {}: {}", job.job.id, e);
            internal_error()
        }
    }
}

/// Relee un job recién mutado y lo retorna serializado (200 OK)
fn reload_job(state: &AppState, id: i64) -> Response {
    match state.store.get_job(id) {
        Ok(Some(job)) => job_response(StatusCode::Ok, &job),
        // Borrado por otro thread entre la mutación y la relectura
        Ok(None) => not_found(id),
        Err(e) => store_error_response(e),
    }
}

fn not_found(id: i64) -> Response {
    Response::error(StatusCode::NotFound, &format!("Job not found: {}", id))
}

fn internal_error() -> Response {
    Response::error(StatusCode::InternalServerError, "Internal server error")
}

/// Mapea errores del store a respuestas HTTP
///
/// El detalle de un error interno va al log, nunca al cliente.
fn store_error_response(error: StoreError) -> Response {
    match error {
        StoreError::NotFound(id) => not_found(id),
        other => {
            log::error!("Store error: {}", other);
            internal_error()
        }
    }
}
