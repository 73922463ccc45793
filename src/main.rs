//! # joblister - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor. Inicializa logging, parsea la
//! configuración CLI/env y arranca el loop de conexiones.

use joblister::config::Config;
use joblister::server::Server;
use log::{error, info};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::new();

    if let Err(e) = config.validate() {
        error!("Configuración inválida: {}", e);
        std::process::exit(1);
    }

    info!("joblister HTTP/1.0 Server");
    info!("   Dirección: {}", config.address());
    info!("   Base de datos: {}", config.db_path);
    info!(
        "   Paginación: page_size={} (máximo {})",
        config.page_size, config.max_page_size
    );

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!("No se pudo iniciar el servidor: {}", e);
            std::process::exit(1);
        }
    };

    // Esto bloqueará el thread principal
    if let Err(e) = server.run() {
        error!("Error fatal: {}", e);
        std::process::exit(1);
    }
}
