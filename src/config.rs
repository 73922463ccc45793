//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./joblister --port 8080 --db-path ./data/joblister.db --page-size 20
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 DB_PATH=/var/lib/joblister.db ./joblister
//! ```

use clap::Parser;

/// Configuración del servidor joblister
#[derive(Debug, Clone, Parser)]
#[command(name = "joblister")]
#[command(about = "API HTTP/1.0 de seguimiento de jobs con historial de estados")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Ruta del archivo SQLite de persistencia
    #[arg(long = "db-path", default_value = "./data/joblister.db", env = "DB_PATH")]
    pub db_path: String,

    // === Paginación ===
    /// Tamaño de página por defecto para el listado de jobs
    #[arg(long = "page-size", default_value = "20", env = "PAGE_SIZE")]
    pub page_size: usize,

    /// Tamaño de página máximo que puede pedir un cliente
    #[arg(long = "max-page-size", default_value = "100", env = "MAX_PAGE_SIZE")]
    pub max_page_size: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use joblister::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("Default page size must be >= 1".to_string());
        }
        if self.max_page_size == 0 {
            return Err("Max page size must be >= 1".to_string());
        }
        if self.page_size > self.max_page_size {
            return Err("Default page size must not exceed max page size".to_string());
        }
        if self.db_path.trim().is_empty() {
            return Err("Database path must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            db_path: "./data/joblister.db".to_string(),
            page_size: 20,
            max_page_size: 100,
        }
    }
}
