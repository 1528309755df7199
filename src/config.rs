//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./http_framework --port 8080 \
//!   --max-threads 8 \
//!   --static-folder ./static \
//!   --template-folder ./templates
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 MAX_THREADS=8 ./http_framework
//! ```

use clap::Parser;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max threads must be >= 1")]
    NoWorkers,

    #[error("read buffer size must be >= 1")]
    EmptyReadBuffer,

    #[error("max request bytes must be >= 1")]
    EmptyRequestLimit,

    #[error("static prefix must start and end with '/': {0:?}")]
    InvalidStaticPrefix(String),
}

/// Configuración del framework
#[derive(Debug, Clone, Parser)]
#[command(name = "http_framework")]
#[command(about = "Framework HTTP/1.1 minimalista con pool de workers")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Número de workers del pool
    #[arg(long = "max-threads", default_value = "5", env = "MAX_THREADS")]
    pub max_threads: usize,

    /// Directorio raíz de los archivos estáticos
    #[arg(long = "static-folder", default_value = "static", env = "STATIC_FOLDER")]
    pub static_folder: String,

    /// Directorio raíz de las plantillas
    #[arg(long = "template-folder", default_value = "templates", env = "TEMPLATE_FOLDER")]
    pub template_folder: String,

    /// Prefijo de URL reservado para archivos estáticos
    #[arg(long = "static-prefix", default_value = "/static/", env = "STATIC_PREFIX")]
    pub static_prefix: String,

    // === Límites ===
    /// Tamaño del buffer de cada `read` sobre el socket
    #[arg(long = "read-buffer-size", default_value = "8192", env = "READ_BUFFER_SIZE")]
    pub read_buffer_size: usize,

    /// Tamaño máximo de un request (headers + body)
    #[arg(long = "max-request-bytes", default_value = "1048576", env = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    /// Capacidad de la cola de conexiones (0 = sin límite).
    /// Con la cola llena la conexión se rechaza con 503.
    #[arg(long = "queue-capacity", default_value = "0", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Timeout de lectura del socket en milisegundos (0 = sin timeout)
    #[arg(long = "read-timeout-ms", default_value = "0", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// No incluir el mensaje del error en el body de los 500
    #[arg(long = "hide-error-details", env = "HIDE_ERROR_DETAILS")]
    pub hide_error_details: bool,
}

impl Config {
    /// Parsea argumentos CLI (y variables de entorno)
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// ```
    /// use http_framework::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `None` si no hay timeout configurado
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    /// `None` si la cola no tiene límite
    pub fn queue_bound(&self) -> Option<usize> {
        (self.queue_capacity > 0).then_some(self.queue_capacity)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::EmptyReadBuffer);
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::EmptyRequestLimit);
        }
        if !self.static_prefix.starts_with('/') || !self.static_prefix.ends_with('/') {
            return Err(ConfigError::InvalidStaticPrefix(self.static_prefix.clone()));
        }

        Ok(())
    }

    /// Deja la configuración efectiva en el log
    pub fn log_summary(&self) {
        tracing::info!(
            address = %self.address(),
            max_threads = self.max_threads,
            queue_capacity = self.queue_capacity,
            "network"
        );
        tracing::info!(
            static_prefix = %self.static_prefix,
            static_folder = %self.static_folder,
            template_folder = %self.template_folder,
            "assets"
        );
        tracing::info!(
            read_buffer_size = self.read_buffer_size,
            max_request_bytes = self.max_request_bytes,
            read_timeout_ms = self.read_timeout_ms,
            hide_error_details = self.hide_error_details,
            "limits"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_threads: 5,
            static_folder: "static".to_string(),
            template_folder: "templates".to_string(),
            static_prefix: "/static/".to_string(),
            read_buffer_size: 8192,
            max_request_bytes: 1024 * 1024,
            queue_capacity: 0,
            read_timeout_ms: 0,
            hide_error_details: false,
        }
    }
}
