//! # joblister
//! src/lib.rs
//!
//! API HTTP/1.0 de seguimiento de jobs. Cada job mantiene un historial
//! append-only de transiciones de estado; el "estado actual" se deriva
//! en tiempo de lectura como la transición más reciente.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing y manejo del protocolo HTTP/1.0
//! - `server`: Lógica del servidor TCP y manejo de conexiones
//! - `router`: Tabla de rutas explícita (método + path → handler)
//! - `jobs`: El dominio: tipos, store SQLite, serialización, paginación
//!   por cursor y handlers HTTP
//!
//! ## Ejemplo de uso
//!
//! ```ignore
//! use joblister::config::Config;
//! use joblister::server::Server;
//!
//! let config = Config::default();
//! let server = Server::bind(config).expect("Error al iniciar servidor");
//! server.run().expect("Error fatal");
//! ```

pub mod http;
pub mod config;
pub mod server;
pub mod router;
pub mod jobs;
