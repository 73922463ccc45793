//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Este módulo implementa un parser HTTP/1.0 desde cero.
//!
//! ## Formato de un Request HTTP/1.0
//!
//! ```text
//! PATCH /api/jobs/7/?x=1 HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 25\r\n
//! \r\n
//! {"status_type":"RUNNING"}
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.0`
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: presente cuando el método envía datos (POST/PATCH/PUT)

use std::collections::HashMap;
use thiserror::Error;

/// Métodos HTTP soportados por la API de jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// POST - Crear un recurso
    POST,

    /// PATCH - Actualización parcial de un recurso
    PATCH,

    /// PUT - Reemplazo completo de los campos mutables
    PUT,

    /// DELETE - Eliminar un recurso
    DELETE,
}

impl Method {
    /// Parsea un método HTTP desde un string
    ///
    /// # Errores
    ///
    /// Retorna error si el método no es soportado
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PATCH" => Ok(Method::PATCH),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PATCH => "PATCH",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }
}

/// Representa un request HTTP/1.0 parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// Path de la petición (ej: "/api/jobs/")
    path: String,

    /// Query parameters parseados (ej: {"page_size": "20"})
    query_params: HashMap<String, String>,

    /// Headers HTTP (ej: {"Content-Length": "25"})
    headers: HashMap<String, String>,

    /// Versión HTTP
    version: String,

    /// Body del request
    body: Vec<u8>,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request incompleto o truncado
    #[error("Incomplete HTTP request")]
    IncompleteRequest,

    /// Formato inválido de la request line
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// Método HTTP no soportado
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Versión HTTP incorrecta
    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    /// Header malformado
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,
}

/// Verifica si el buffer ya contiene un request completo.
///
/// Completo significa: headers terminados (doble CRLF) y, si hay header
/// `Content-Length`, esa cantidad de bytes de body ya recibidos. El loop
/// de lectura del servidor usa esto para saber cuándo dejar de leer.
pub fn is_complete(buffer: &[u8]) -> bool {
    let header_end = match find_header_end(buffer) {
        Some(pos) => pos,
        None => return false,
    };

    let content_length = content_length_of(&buffer[..header_end]).unwrap_or(0);
    buffer.len() >= header_end + 4 + content_length
}

/// Busca la posición del doble CRLF que separa headers de body
fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Extrae el valor de Content-Length de la sección de headers (case-insensitive)
fn content_length_of(head: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(head).ok()?;
    for line in text.split("\r\n").skip(1) {
        if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim();
            if name.eq_ignore_ascii_case("Content-Length") {
                return line[colon_pos + 1..].trim().parse().ok();
            }
        }
    }
    None
}

impl Request {
    /// Parsea un request HTTP/1.0 desde bytes
    ///
    /// # Retorna
    ///
    /// * `Ok(Request)` - Request parseado exitosamente
    /// * `Err(ParseError)` - Error durante el parsing
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use joblister::http::Request;
    ///
    /// let raw = b"GET /api/jobs/?page_size=5 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/api/jobs/");
    /// assert_eq!(request.query_param("page_size"), Some("5"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        // Separar headers de body por el doble CRLF
        let header_end = find_header_end(buffer).ok_or(ParseError::IncompleteRequest)?;
        let head = std::str::from_utf8(&buffer[..header_end])
            .map_err(|_| ParseError::InvalidRequestLine)?;

        if head.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let lines: Vec<&str> = head.split("\r\n").collect();

        // 1. Parsear la request line (primera línea)
        let (method, path, query_params, version) = Self::parse_request_line(lines[0])?;

        // 2. Parsear headers (resto de líneas)
        let headers = Self::parse_headers(&lines[1..])?;

        // 3. Extraer el body según Content-Length
        let body = Self::parse_body(buffer, header_end + 4, &headers);

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    /// Parsea la request line (primera línea del request)
    ///
    /// Formato: `PATCH /path?query HTTP/1.0`
    fn parse_request_line(
        line: &str,
    ) -> Result<(Method, String, HashMap<String, String>, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        // Parsear método
        let method = Method::from_str(parts[0])?;

        // Parsear path y query
        let (path, query_params) = Self::parse_path_and_query(parts[1]);

        // Validar versión HTTP
        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, query_params, version))
    }

    /// Parsea el path y extrae los query parameters
    ///
    /// Ejemplo: "/api/jobs/?cursor=abc&page_size=2"
    /// Retorna: ("/api/jobs/", {"cursor": "abc", "page_size": "2"})
    fn parse_path_and_query(path_with_query: &str) -> (String, HashMap<String, String>) {
        if let Some(query_start) = path_with_query.find('?') {
            let path = path_with_query[..query_start].to_string();
            let query_string = &path_with_query[query_start + 1..];
            let query_params = Self::parse_query_string(query_string);
            (path, query_params)
        } else {
            // No hay query parameters
            (path_with_query.to_string(), HashMap::new())
        }
    }

    /// Parsea una query string en un HashMap
    ///
    /// Ejemplo: "cursor=abc&page_size=2"
    /// Retorna: {"cursor": "abc", "page_size": "2"}
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for param in query.split('&') {
            if param.is_empty() {
                continue;
            }

            if let Some(eq_pos) = param.find('=') {
                let key = &param[..eq_pos];
                let value = &param[eq_pos + 1..];

                let decoded_value = Self::url_decode(value);

                params.insert(key.to_string(), decoded_value);
            } else {
                // Parámetro sin valor (ej: "?debug")
                params.insert(param.to_string(), String::new());
            }
        }

        params
    }

    /// Decodifica una URL (convierte %20 a espacio, etc.)
    ///
    /// Implementación básica - suficiente para los tokens de cursor
    /// (base64 url-safe) y valores numéricos que usa esta API
    fn url_decode(s: &str) -> String {
        s.replace("%20", " ").replace('+', " ")
    }

    /// Parsea los headers HTTP
    ///
    /// Cada header tiene formato: "Name: Value"
    fn parse_headers(lines: &[&str]) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            if let Some(colon_pos) = line.find(':') {
                let name = line[..colon_pos].trim().to_string();
                let value = line[colon_pos + 1..].trim().to_string();
                headers.insert(name, value);
            } else {
                // Header sin ':' es inválido
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
        }

        Ok(headers)
    }

    /// Extrae el body del request respetando Content-Length
    fn parse_body(buffer: &[u8], body_start: usize, headers: &HashMap<String, String>) -> Vec<u8> {
        if body_start >= buffer.len() {
            return Vec::new();
        }

        let available = &buffer[body_start..];
        let declared = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(available.len());

        available[..declared.min(available.len())].to_vec()
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el path del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// # Ejemplo
    /// ```
    /// use joblister::http::Request;
    ///
    /// let raw = b"GET /api/jobs/?page_size=42 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.query_param("page_size"), Some("42"));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Obtiene el body del request como String
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}
