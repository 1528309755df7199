//! # Módulo HTTP
//!
//! Implementación del framing HTTP/1.1 desde cero, sin librerías de alto
//! nivel:
//!
//! - Lectura de un request completo desde el socket (`reader`)
//! - Parsing de requests (`request`)
//! - Construcción y serialización de responses (`response`)
//! - Códigos de estado (`status`)
//!
//! Una conexión lleva exactamente un request y una response: no hay
//! keep-alive ni chunked transfer encoding.
//!
//! ### Formato de Request
//!
//! ```text
//! GET /user/alice HTTP/1.1\r\n
//! Host: localhost\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 11\r\n
//! \r\n
//! Hello alice
//! ```

pub mod reader;
pub mod request;
pub mod response;
pub mod status;

pub use reader::{read_request, ReadError};
pub use request::{Method, ParseError, Request};
pub use response::{Body, Response};
pub use status::StatusCode;
