//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el router que mapea método + path a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! La tabla de rutas es explícita: cada entrada declara su método HTTP y
//! su patrón de path. Un patrón puede contener segmentos literales y
//! placeholders `{nombre}` que capturan el valor del segmento (ej:
//! `/api/jobs/{id}/`). Si ninguna ruta coincide, retorna 404 Not Found.
//!
//! El trailing slash es opcional: `/api/jobs` y `/api/jobs/` coinciden
//! con el mismo patrón (el estilo de URL del API usa trailing slash).

use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::AppState;
use std::collections::HashMap;

/// Parámetros capturados del path (ej: {"id": "7"})
pub type PathParams = HashMap<String, String>;

/// Tipo de función handler
///
/// Un handler recibe el Request, los parámetros capturados del path y el
/// estado compartido de la aplicación, y retorna una Response
pub type Handler = fn(&Request, &PathParams, &AppState) -> Response;

/// Una entrada de la tabla de rutas
struct Route {
    method: Method,
    /// Segmentos del patrón, sin slashes (ej: ["api", "jobs", "{id}"])
    pattern: Vec<String>,
    handler: Handler,
}

/// Router que mapea (método, path) a handlers
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use joblister::router::{PathParams, Router};
    /// use joblister::http::{Method, Request, Response};
    /// use joblister::jobs::AppState;
    ///
    /// fn health_handler(_req: &Request, _params: &PathParams, _state: &AppState) -> Response {
    ///     Response::json(r#"{"status": "healthy"}"#)
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/health/", health_handler);
    /// ```
    pub fn register(&mut self, method: Method, pattern: &str, handler: Handler) {
        self.routes.push(Route {
            method,
            pattern: segments_of(pattern),
            handler,
        });
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    ///
    /// Si no encuentra una ruta que coincida en método y path, retorna
    /// 404 Not Found.
    pub fn route(&self, request: &Request, state: &AppState) -> Response {
        let path_segments = segments_of(request.path());

        for route in &self.routes {
            if route.method != request.method() {
                continue;
            }
            if let Some(params) = match_pattern(&route.pattern, &path_segments) {
                let mut response = (route.handler)(request, &params, state);
                self.add_common_headers(&mut response);
                return response;
            }
        }

        // No se encontró handler para este (método, path)
        let mut response = Response::error(
            StatusCode::NotFound,
            &format!("Route not found: {}", request.path()),
        );
        self.add_common_headers(&mut response);
        response
    }

    /// Agrega headers comunes a todas las respuestas
    fn add_common_headers(&self, response: &mut Response) {
        response.add_header("Server", "joblister/0.1");
        response.add_header("Connection", "close");
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Divide un path en segmentos, ignorando slashes vacíos
/// (así `/api/jobs` y `/api/jobs/` producen los mismos segmentos)
fn segments_of(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Intenta hacer match de un patrón contra los segmentos del path.
/// Retorna los parámetros capturados si coincide.
fn match_pattern(pattern: &[String], path: &[String]) -> Option<PathParams> {
    if pattern.len() != path.len() {
        return None;
    }

    let mut params = PathParams::new();
    for (pat, seg) in pattern.iter().zip(path.iter()) {
        if pat.starts_with('{') && pat.ends_with('}') {
            let name = &pat[1..pat.len() - 1];
            params.insert(name.to_string(), seg.clone());
        } else if pat != seg {
            return None;
        }
    }

    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::jobs::JobStore;

    fn test_handler(_req: &Request, _params: &PathParams, _state: &AppState) -> Response {
        Response::json(r#"{"test": "ok"}"#)
    }

    fn id_handler(_req: &Request, params: &PathParams, _state: &AppState) -> Response {
        Response::json(&format!(r#"{{"id": "{}"}}"#, params["id"]))
    }

    fn state() -> AppState {
        AppState::new(JobStore::open_in_memory().unwrap(), 20, 100)
    }

    fn get(path: &str) -> Request {
        let raw = format!("GET {} HTTP/1.0\r\n\r\n", path);
        Request::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert_eq!(router.routes.len(), 0);
    }

    #[test]
    fn test_register_route() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", test_handler);

        assert_eq!(router.routes.len(), 1);
    }

    #[test]
    fn test_route_found() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", test_handler);

        let response = router.route(&get("/test"), &state());
        assert_eq!(response.status(), StatusCode::Ok);
    }

    #[test]
    fn test_route_not_found() {
        let router = Router::new();

        let response = router.route(&get("/nonexistent"), &state());
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_route_wrong_method_is_not_found() {
        let mut router = Router::new();
        router.register(Method::POST, "/test", test_handler);

        let response = router.route(&get("/test"), &state());
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_route_trailing_slash_optional() {
        let mut router = Router::new();
        router.register(Method::GET, "/api/jobs/", test_handler);

        assert_eq!(router.route(&get("/api/jobs/"), &state()).status(), StatusCode::Ok);
        assert_eq!(router.route(&get("/api/jobs"), &state()).status(), StatusCode::Ok);
    }

    #[test]
    fn test_route_captures_path_param() {
        let mut router = Router::new();
        router.register(Method::GET, "/api/jobs/{id}/", id_handler);

        let response = router.route(&get("/api/jobs/42/"), &state());
        assert_eq!(response.status(), StatusCode::Ok);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("\"42\""));
    }

    #[test]
    fn test_route_param_does_not_match_extra_segments() {
        let mut router = Router::new();
        router.register(Method::GET, "/api/jobs/{id}/", id_handler);

        let response = router.route(&get("/api/jobs/42/extra/"), &state());
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_multiple_routes() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", test_handler);
        router.register(Method::GET, "/health/", test_handler);

        assert_eq!(router.route(&get("/test"), &state()).status(), StatusCode::Ok);
        assert_eq!(router.route(&get("/health/"), &state()).status(), StatusCode::Ok);
    }

    #[test]
    fn test_common_headers_added() {
        let mut router = Router::new();
        router.register(Method::GET, "/test", test_handler);

        let response = router.route(&get("/test"), &state());
        assert_eq!(response.headers().get("Connection"), Some(&"close".to_string()));
        assert!(response.headers().contains_key("Server"));
    }
}
