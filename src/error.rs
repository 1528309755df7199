//! # Errores por Request
//! src/error.rs
//!
//! Todo lo que puede fallar mientras un worker atiende una conexión termina
//! en un `DispatchError`, que siempre se convierte en una respuesta HTTP
//! bien formada. Ningún error de este tipo sale del worker.
//!
//! | Error                  | Status |
//! |------------------------|--------|
//! | `MalformedRequest`     | 500    |
//! | `RoutingMiss`          | 404    |
//! | `HandlerFailure`       | 500    |
//! | `StaticFileNotFound`   | 404    |
//! | `InvalidHandlerResult` | 500    |
//! | `Io`                   | 500    |
//!
//! Los errores de registro de rutas (`RouteError`) son los únicos que pueden
//! abortar el arranque, y viven en el router.

use crate::http::{ParseError, ReadError, Response, StatusCode};
use crate::static_files::StaticFileError;
use crate::templates::TemplateError;
use thiserror::Error;

/// Body fijo de los 404
pub const NOT_FOUND_BODY: &str = "<h1>404 Not Found</h1>";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Malformed request: {0}")]
    MalformedRequest(#[from] ParseError),

    #[error("No route for {method} {path}")]
    RoutingMiss { method: String, path: String },

    #[error("{0}")]
    HandlerFailure(String),

    #[error("Static file not found: {0}")]
    StaticFileNotFound(String),

    #[error("Invalid handler result: {0}")]
    InvalidHandlerResult(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RoutingMiss { .. } | DispatchError::StaticFileNotFound(_) => {
                StatusCode::NotFound
            }
            DispatchError::MalformedRequest(_)
            | DispatchError::HandlerFailure(_)
            | DispatchError::InvalidHandlerResult(_)
            | DispatchError::Io(_) => StatusCode::InternalServerError,
        }
    }

    /// Construye la respuesta fija para este error.
    ///
    /// Con `expose_detail == false` los 500 no incluyen el mensaje.
    pub fn into_response(self, expose_detail: bool) -> Response {
        let status = self.status();

        if status == StatusCode::NotFound {
            return Response::html(NOT_FOUND_BODY).with_status(status);
        }

        let body = if expose_detail {
            format!("<h1>{}: {}</h1>", status, self)
        } else {
            format!("<h1>{}</h1>", status)
        };
        Response::html(body).with_status(status)
    }
}

impl From<ReadError> for DispatchError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Io(e) => DispatchError::Io(e),
            ReadError::TooLarge(limit) => {
                DispatchError::MalformedRequest(ParseError::TooLarge(limit))
            }
        }
    }
}

impl From<StaticFileError> for DispatchError {
    fn from(err: StaticFileError) -> Self {
        match err {
            StaticFileError::NotFound(path) => DispatchError::StaticFileNotFound(path),
            other => DispatchError::HandlerFailure(other.to_string()),
        }
    }
}

impl From<TemplateError> for DispatchError {
    fn from(err: TemplateError) -> Self {
        DispatchError::HandlerFailure(err.to_string())
    }
}
