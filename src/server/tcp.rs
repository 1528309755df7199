//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread de accept y un pool fijo de workers comunicados por una
//! `TaskQueue` de conexiones:
//!
//! ```text
//!            ┌──────────────┐   push    ┌───────────┐   pop   ┌──────────┐
//! clientes → │ accept loop  │ ────────→ │ TaskQueue │ ──────→ │ worker-N │
//!            └──────────────┘           └───────────┘         └──────────┘
//! ```
//!
//! El accept loop nunca procesa requests: solo encola. Si la cola tiene
//! capacidad y está llena, responde 503 en el momento y cierra.
//!
//! `start` no bloquea y devuelve un [`ServerHandle`]; `run` es
//! `start` + `join` para el binario.

use super::dispatch::{AppState, Middleware};
use super::pool::WorkerPool;
use super::queue::{QueueFull, TaskQueue};
use crate::config::Config;
use crate::context::RequestContext;
use crate::http::{Method, Request, Response, StatusCode};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::router::{HandlerResult, PathParams, RouteError, Router};
use crate::static_files::StaticFiles;
use crate::templates::Templates;
use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Body de la respuesta cuando la cola está llena
const UNAVAILABLE_BODY: &str = "<h1>503 Service Unavailable</h1>";

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Servidor HTTP/1.1 con pool de workers
pub struct Server {
    config: Config,
    router: Router,
    middleware: Vec<Middleware>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            router: Router::new(),
            middleware: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registra un handler para `pattern` y `methods`.
    ///
    /// Un par (patrón, métodos) repetido devuelve `RouteError::DuplicateRoute`
    /// y debe tratarse como error fatal de arranque.
    pub fn route<F>(
        &mut self,
        pattern: &str,
        methods: &[Method],
        handler: F,
    ) -> Result<(), RouteError>
    where
        F: Fn(&RequestContext<'_>, &PathParams) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.register(pattern, methods, handler)
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Agrega un hook que corre antes de estáticos y routing, en orden de
    /// registro
    pub fn use_middleware<F>(&mut self, middleware: F)
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(middleware));
    }

    /// Hace bind, arranca los workers y el accept loop. No bloquea.
    ///
    /// Una configuración inválida (ver [`Config::validate`]) falla con
    /// `ErrorKind::InvalidInput` antes de hacer bind.
    pub fn start(self) -> io::Result<ServerHandle> {
        let Server {
            config,
            router,
            middleware,
        } = self;

        config
            .validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(config.address())?;
        let local_addr = listener.local_addr()?;

        let metrics = MetricsCollector::new();
        let state = Arc::new(AppState {
            router,
            middleware,
            templates: Templates::new(&config.template_folder),
            static_files: StaticFiles::new(config.static_prefix.as_str(), &config.static_folder),
            metrics: metrics.clone(),
            read_buffer_size: config.read_buffer_size,
            max_request_bytes: config.max_request_bytes,
            read_timeout: config.read_timeout(),
            expose_error_details: !config.hide_error_details,
        });

        let queue = TaskQueue::with_capacity(config.queue_bound());
        let pool = WorkerPool::spawn(config.max_threads, queue.clone(), {
            let metrics = metrics.clone();
            move |stream: TcpStream| {
                let _busy = metrics.worker_busy();
                state.handle_connection(stream);
            }
        })?;

        let stop = Arc::new(AtomicBool::new(false));
        let acceptor = thread::Builder::new().name("acceptor".to_string()).spawn({
            let stop = Arc::clone(&stop);
            let metrics = metrics.clone();
            move || accept_loop(listener, queue, stop, metrics)
        });
        let acceptor = match acceptor {
            Ok(handle) => handle,
            Err(e) => {
                pool.shutdown();
                return Err(e);
            }
        };

        tracing::info!(address = %local_addr, workers = config.max_threads, "server listening");

        Ok(ServerHandle {
            local_addr,
            stop,
            acceptor,
            pool,
            metrics,
        })
    }

    /// Arranca y bloquea hasta que el servidor se detenga
    pub fn run(self) -> io::Result<()> {
        self.start()?.join()
    }
}

/// Servidor en ejecución
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    acceptor: JoinHandle<()>,
    pool: WorkerPool<TcpStream>,
    metrics: MetricsCollector,
}

impl ServerHandle {
    /// Dirección real de escucha (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_depth: self.pool.queue().len(),
            ..self.metrics.snapshot()
        }
    }

    /// Collector compartido con los workers. Sigue siendo legible después
    /// de `shutdown`, cuando ya no queda ningún request en vuelo.
    pub fn metrics_collector(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    /// Deja de aceptar conexiones, termina las ya encoladas y espera a
    /// todos los workers
    pub fn shutdown(self) -> io::Result<()> {
        tracing::info!(address = %self.local_addr, "shutting down");
        self.stop.store(true, Ordering::SeqCst);

        // El accept loop está bloqueado en accept(): una conexión local lo
        // despierta para que vea el flag
        if let Err(e) = TcpStream::connect(wake_address(self.local_addr)) {
            tracing::warn!(error = %e, "could not wake accept loop");
        }

        self.join()
    }

    /// Espera a que el accept loop termine y apaga el pool
    pub fn join(self) -> io::Result<()> {
        let joined = self.acceptor.join();
        self.pool.shutdown();

        joined.map_err(|_| io::Error::other("accept thread panicked"))?;
        tracing::info!("server stopped");
        Ok(())
    }
}

fn accept_loop(
    listener: TcpListener,
    queue: TaskQueue<TcpStream>,
    stop: Arc<AtomicBool>,
    metrics: MetricsCollector,
) {
    let mut consecutive_errors: u32 = 0;

    for stream in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        match stream {
            Ok(stream) => {
                consecutive_errors = 0;
                if let Err(full) = queue.push(stream) {
                    reject(full, &metrics);
                }
            }
            Err(e) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                let pause = accept_backoff(consecutive_errors);
                tracing::error!(
                    error = %e,
                    retry_in_ms = pause.as_millis() as u64,
                    "failed to accept connection"
                );
                // Errores persistentes (ej: EMFILE) no deben girar en vacío
                thread::sleep(pause);
            }
        }
    }

    tracing::debug!("accept loop stopped");
}

/// Responde 503 sin pasar por los workers
fn reject(full: QueueFull<TcpStream>, metrics: &MetricsCollector) {
    let QueueFull { item: mut stream, capacity } = full;
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    tracing::warn!(peer = %peer, capacity, "queue full, rejecting connection");
    metrics.record_rejected();

    let response = Response::html(UNAVAILABLE_BODY).with_status(StatusCode::ServiceUnavailable);
    let written = stream
        .write_all(&response.to_bytes())
        .and_then(|_| stream.flush());
    if let Err(e) = written {
        tracing::debug!(peer = %peer, error = %e, "failed to write 503");
    }
}

/// Pausa tras `consecutive_errors` fallos seguidos de accept: se duplica
/// desde 10ms hasta un máximo de 1s
fn accept_backoff(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(7);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1 << exponent)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Dirección para conectarse al propio listener
fn wake_address(local_addr: SocketAddr) -> SocketAddr {
    let ip = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local_addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn test_config() -> Config {
        Config {
            port: 0,
            max_threads: 2,
            static_folder: "does-not-exist".to_string(),
            template_folder: "does-not-exist".to_string(),
            ..Config::default()
        }
    }

    fn send(addr: SocketAddr, raw: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(raw).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_serves_and_shuts_down() {
        let mut server = Server::new(test_config());
        server
            .route("/hello", &[Method::GET], |_, _| Ok(Response::text("hi")))
            .unwrap();

        let handle = server.start().unwrap();
        let text = send(handle.local_addr(), b"GET /hello HTTP/1.1\r\n\r\n");

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\nhi"));

        handle.shutdown().unwrap();
    }

    #[test]
    fn test_duplicate_route_is_reported() {
        let mut server = Server::new(test_config());
        server.route("/a", &[Method::GET], |_, _| Ok(Response::text("1"))).unwrap();

        let err = server
            .route("/a", &[Method::GET], |_, _| Ok(Response::text("2")))
            .unwrap_err();
        assert!(matches!(err, RouteError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_peer_closed_immediately() {
        let handle = Server::new(test_config()).start().unwrap();

        // El worker debe descartar la conexión vacía sin responder
        drop(TcpStream::connect(handle.local_addr()).unwrap());

        let text = send(handle.local_addr(), b"GET /missing HTTP/1.1\r\n\r\n");
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));

        handle.shutdown().unwrap();
    }

    #[test]
    fn test_metrics_after_shutdown() {
        let mut server = Server::new(test_config());
        server.route("/ok", &[Method::GET], |_, _| Ok(Response::text("ok"))).unwrap();
        let handle = server.start().unwrap();
        let addr = handle.local_addr();

        send(addr, b"GET /ok HTTP/1.1\r\n\r\n");
        send(addr, b"GET /ok HTTP/1.1\r\n\r\n");
        send(addr, b"GET /nope HTTP/1.1\r\n\r\n");

        // Los workers terminan de registrar antes de que shutdown retorne
        let metrics = handle.metrics_collector();
        handle.shutdown().unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.count(StatusCode::Ok), 2);
        assert_eq!(snapshot.count(StatusCode::NotFound), 1);
        assert_eq!(snapshot.busy_workers, 0);
    }

    #[test]
    fn test_middleware_runs_before_router() {
        let mut server = Server::new(test_config());
        server.route("/ok", &[Method::GET], |_, _| Ok(Response::text("ok"))).unwrap();
        server.use_middleware(|request| {
            (request.path() == "/ok" && request.query_param("block").is_some())
                .then(|| Response::text("blocked").with_status(StatusCode::Forbidden))
        });

        let handle = server.start().unwrap();
        let text = send(handle.local_addr(), b"GET /ok?block=1 HTTP/1.1\r\n\r\n");
        assert!(text.starts_with("HTTP/1.1 403 Forbidden\r\n"));

        let text = send(handle.local_addr(), b"GET /ok HTTP/1.1\r\n\r\n");
        assert!(text.ends_with("ok"));

        handle.shutdown().unwrap();
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let no_workers = Server::new(Config {
            max_threads: 0,
            ..test_config()
        });
        let err = no_workers.start().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let empty_prefix = Server::new(Config {
            static_prefix: String::new(),
            ..test_config()
        });
        let err = empty_prefix.start().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_accept_backoff_grows_and_caps() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), Duration::from_secs(1));
        assert_eq!(accept_backoff(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_wake_address() {
        let any: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        assert_eq!(wake_address(any), "127.0.0.1:8080".parse().unwrap());

        let any6: SocketAddr = "[::]:9000".parse().unwrap();
        assert_eq!(wake_address(any6), "[::1]:9000".parse().unwrap());

        let bound: SocketAddr = "10.0.0.5:80".parse().unwrap();
        assert_eq!(wake_address(bound), bound);
    }
}
