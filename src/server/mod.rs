//! # Módulo del Servidor
//!
//! Contiene la implementación del servidor TCP concurrente.

pub mod tcp;

pub use tcp::Server;
