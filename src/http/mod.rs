//! # Módulo HTTP
//!
//! Este módulo implementa el protocolo HTTP/1.0 desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing de requests HTTP/1.0 (con body para POST/PATCH/PUT)
//! - Construcción de responses HTTP
//! - Manejo de status codes
//! - Extracción de query parameters
//!
//! ### Formato de Request
//!
//! ```text
//! PATCH /api/jobs/7/ HTTP/1.0\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 25\r\n
//! \r\n
//! {"status_type":"RUNNING"}
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! \r\n
//! {"ok": true}
//! ```

pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{Method, Request};
pub use response::Response;
pub use status::StatusCode;
