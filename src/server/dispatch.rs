//! # Dispatch de Conexiones
//! src/server/dispatch.rs
//!
//! Lo que hace un worker con cada conexión:
//!
//! ```text
//! leer request → parsear → middleware → estáticos | router → handler
//!              → serializar response → write → close
//! ```
//!
//! Cualquier fallo (request malformado, ruta inexistente, error o pánico
//! del handler, respuesta inválida) se convierte en una respuesta HTTP en
//! este borde. Nada se propaga hacia el worker.

use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::http::{read_request, Request, Response};
use crate::metrics::MetricsCollector;
use crate::router::Router;
use crate::static_files::StaticFiles;
use crate::templates::Templates;
use std::any::Any;
use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hook que corre antes del routing. Retornar `Some` corta la cadena y
/// responde directamente.
pub type Middleware = Arc<dyn Fn(&Request) -> Option<Response> + Send + Sync>;

/// Estado compartido (solo lectura) por todos los workers
pub struct AppState {
    pub router: Router,
    pub middleware: Vec<Middleware>,
    pub templates: Templates,
    pub static_files: StaticFiles,
    pub metrics: MetricsCollector,
    pub read_buffer_size: usize,
    pub max_request_bytes: usize,
    pub read_timeout: Option<Duration>,
    pub expose_error_details: bool,
}

impl AppState {
    /// Atiende una conexión completa: un request, una response, close
    pub fn handle_connection(&self, mut stream: TcpStream) {
        let start = Instant::now();
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        if let Err(e) = stream.set_read_timeout(self.read_timeout) {
            tracing::warn!(peer = %peer, error = %e, "could not set read timeout");
        }

        let raw = match read_request(&mut stream, self.read_buffer_size, self.max_request_bytes) {
            Ok(Some(raw)) => Ok(raw),
            Ok(None) => {
                tracing::debug!(peer = %peer, "connection closed without data");
                return;
            }
            Err(e) => Err(DispatchError::from(e)),
        };

        let response = match raw.and_then(|raw| self.dispatch(&raw)) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    peer = %peer,
                    status = %err.status(),
                    error = %err,
                    "request failed"
                );
                err.into_response(self.expose_error_details)
            }
        };

        let written = stream
            .write_all(&response.to_bytes())
            .and_then(|_| stream.flush());
        if let Err(e) = written {
            tracing::warn!(peer = %peer, error = %e, "failed to write response");
        }
        // El cierre lo completa el drop del stream
        let _ = stream.shutdown(Shutdown::Write);

        let latency = start.elapsed();
        self.metrics.record_request(response.status(), latency);

        tracing::debug!(
            peer = %peer,
            status = %response.status(),
            latency_ms = latency.as_secs_f64() * 1000.0,
            "request served"
        );
    }

    /// Convierte los bytes de un request en la response a enviar
    pub fn dispatch(&self, raw: &[u8]) -> Result<Response, DispatchError> {
        let request = Request::parse(raw)?;
        tracing::debug!(
            method = %request.method(),
            endpoint = request.endpoint(),
            "request parsed"
        );

        for middleware in &self.middleware {
            if let Some(response) = guarded(|| middleware(&request))? {
                return checked(response);
            }
        }

        let path = request.path();

        if self.static_files.handles(path) {
            return Ok(self.static_files.serve(path)?.into_response());
        }

        let found = self
            .router
            .match_route(path, request.method())
            .ok_or_else(|| DispatchError::RoutingMiss {
                method: request.method().to_string(),
                path: path.to_string(),
            })?;

        let ctx = RequestContext::new(&request, &self.templates);
        let response = guarded(|| (found.handler())(&ctx, &found.params))?
            .map_err(|e| DispatchError::HandlerFailure(e.to_string()))?;

        checked(response)
    }
}

/// Ejecuta código de la aplicación convirtiendo un pánico en
/// `HandlerFailure`
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, DispatchError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| DispatchError::HandlerFailure(panic_message(payload.as_ref())))
}

fn checked(response: Response) -> Result<Response, DispatchError> {
    response
        .validate()
        .map_err(DispatchError::InvalidHandlerResult)?;
    Ok(response)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
