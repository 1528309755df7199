//! # HTTP Framework
//! src/lib.rs
//!
//! Framework HTTP/1.1 implementado desde cero sobre `std::net`: parsing de
//! requests, routing con placeholders, construcción de respuestas y un
//! pool fijo de workers alimentado por una cola FIFO compartida.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing de requests, respuestas y códigos de estado
//! - `router`: Patrones `/user/<name>` y tabla de rutas
//! - `server`: Accept loop, cola de conexiones y pool de workers
//! - `error`: Errores por request y su respuesta HTTP
//! - `templates` / `static_files`: Plantillas y archivos en disco
//! - `metrics`: Contadores y latencias por request
//! - `config`: Configuración por CLI y variables de entorno
//! - `app`: Rutas de la aplicación de demostración
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use http_framework::config::Config;
//! use http_framework::http::{Method, Response};
//! use http_framework::server::Server;
//!
//! let mut server = Server::new(Config::default());
//! server
//!     .route("/user/<username>", &[Method::GET], |_ctx, params| {
//!         Ok(Response::text(format!("Hello {}", params.get("username").unwrap_or(""))))
//!     })
//!     .expect("ruta duplicada");
//!
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod metrics;
pub mod router;
pub mod server;
pub mod static_files;
pub mod templates;
