//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor HTTP/1.0 que atiende múltiples conexiones simultáneas: cada
//! conexión aceptada se procesa en su propio thread. El estado compartido
//! (router y store) viaja a los threads vía `Arc`/`Clone`.
//!
//! El body de un request se lee hasta satisfacer `Content-Length` (o
//! hasta EOF), así que un PATCH cuyo body llega en un paquete TCP
//! separado de los headers se procesa igual de bien.

use crate::config::Config;
use crate::http::{request, Method, Request, Response, StatusCode};
use crate::jobs::{handlers, AppState, JobStore};
use crate::router::Router;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Tope de tamaño de request (headers + body)
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Servidor HTTP/1.0 concurrente
pub struct Server {
    router: Arc<Router>,
    state: AppState,
    listener: TcpListener,
}

impl Server {
    /// Abre el store, construye la tabla de rutas y hace bind del socket.
    ///
    /// Con `port = 0` el sistema asigna un puerto efímero (útil para
    /// tests); el puerto real se consulta con [`Server::local_addr`].
    pub fn bind(config: Config) -> std::io::Result<Self> {
        let store = JobStore::open(&config.db_path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        let state = AppState::new(store, config.page_size, config.max_page_size);

        let listener = TcpListener::bind(config.address())?;

        Ok(Self {
            router: Arc::new(Self::build_router()),
            state,
            listener,
        })
    }

    /// Dirección real en la que escucha el servidor
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Tabla de rutas del API
    fn build_router() -> Router {
        let mut router = Router::new();

        router.register(Method::GET, "/health/", handlers::health_handler);

        router.register(Method::GET, "/api/jobs/", handlers::list_jobs_handler);
        router.register(Method::POST, "/api/jobs/", handlers::create_job_handler);

        router.register(Method::GET, "/api/jobs/{id}/", handlers::get_job_handler);
        router.register(Method::PATCH, "/api/jobs/{id}/", handlers::patch_job_handler);
        router.register(Method::PUT, "/api/jobs/{id}/", handlers::put_job_handler);
        router.register(Method::DELETE, "/api/jobs/{id}/", handlers::delete_job_handler);

        router
    }

    /// Loop principal: acepta conexiones y lanza un thread por cada una
    pub fn run(&self) -> std::io::Result<()> {
        log::info!("Listening on {}", self.listener.local_addr()?);
        log::info!("Concurrency mode: one thread per connection");

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let state = self.state.clone();

                    let peer_addr = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());
                    log::debug!("New connection from {}", peer_addr);

                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(stream, router, state) {
                            log::error!("Connection error ({}): {}", peer_addr, e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Failed to accept connection: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Procesa una conexión completa: lee el request, lo despacha al
    /// router y escribe la respuesta. Una conexión, un request (HTTP/1.0
    /// sin keep-alive).
    fn handle_connection(
        mut stream: TcpStream,
        router: Arc<Router>,
        state: AppState,
    ) -> std::io::Result<()> {
        let start = Instant::now();
        let request_id = generate_request_id(&start);

        let buffer = match Self::read_request(&mut stream)? {
            Some(buffer) => buffer,
            // El peer cerró sin enviar nada
            None => return Ok(()),
        };

        let (mut response, method_and_path) = match Request::parse(&buffer) {
            Ok(request) => {
                let method_and_path =
                    format!("{} {}", request.method().as_str(), request.path());
                (router.route(&request, &state), method_and_path)
            }
            Err(e) => {
                log::warn!("Parse error [req_id: {}]: {}", &request_id[..8], e);
                (
                    Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e)),
                    "<unparseable>".to_string(),
                )
            }
        };

        // Headers de observabilidad
        response.add_header("X-Request-Id", &request_id);
        response.add_header("X-Worker-Thread", &format!("{:?}", thread::current().id()));
        response.add_header("X-Worker-Pid", &std::process::id().to_string());

        stream.write_all(&response.to_bytes())?;
        stream.flush()?;

        let latency = start.elapsed();
        log::info!(
            "{} -> {} ({:.2}ms) [req_id: {}]",
            method_and_path,
            response.status(),
            latency.as_secs_f64() * 1000.0,
            &request_id[..8]
        );

        Ok(())
    }

    /// Lee del socket hasta tener un request completo (headers + body
    /// según `Content-Length`), hasta EOF, o hasta el tope de tamaño.
    ///
    /// Retorna `None` si el peer cerró sin enviar ningún byte.
    fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<Vec<u8>>> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 8192];

        loop {
            let bytes_read = stream.read(&mut chunk)?;
            if bytes_read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..bytes_read]);

            if request::is_complete(&buffer) {
                break;
            }
            if buffer.len() > MAX_REQUEST_BYTES {
                break;
            }
        }

        if buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(buffer))
    }
}

/// Genera un ID único por request para correlacionar logs
fn generate_request_id(start: &Instant) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    start.elapsed().as_nanos().hash(&mut hasher);
    thread::current().id().hash(&mut hasher);
    std::process::id().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
