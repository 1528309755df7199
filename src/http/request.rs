//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser de requests HTTP/1.x escrito desde cero.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /user/alice?lang=es HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! 1. **Request Line**: exactamente tres tokens `METHOD TARGET PROTOCOL`
//! 2. **Headers**: `Name: Value`, separados por la primera aparición de `": "`
//! 3. **Línea vacía**: separa headers del body
//! 4. **Body**: todo lo que sigue, re-unido con `\r\n`
//!
//! No se valida la semántica de los headers (por ejemplo, que
//! `Content-Length` coincida con el tamaño del body).

use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Terminador de línea del protocolo
pub const CRLF: &str = "\r\n";

/// Métodos HTTP estándar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
}

impl Method {
    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,

    /// Los bytes no son UTF-8 válido
    #[error("Request is not valid UTF-8")]
    InvalidEncoding,

    /// La request line no tiene exactamente tres tokens
    #[error("Invalid request line: {0:?}")]
    InvalidRequestLine(String),

    /// Método HTTP no reconocido
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// El target no empieza con "/"
    #[error("Invalid request target: {0}")]
    InvalidTarget(String),

    /// Versión distinta de HTTP/1.0 o HTTP/1.1
    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    /// Header sin el separador ": "
    #[error("Invalid header: {0:?}")]
    InvalidHeader(String),

    /// El request supera el límite configurado
    #[error("Request exceeds {0} bytes")]
    TooLarge(usize),
}

/// Request HTTP parseado. Inmutable una vez construido.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Target exacto de la request line (ej: "/user/alice?lang=es")
    endpoint: String,

    /// Endpoint sin query string (ej: "/user/alice"), usado por el router
    path: String,

    query_params: HashMap<String, String>,

    /// Protocolo tal cual llegó (ej: "HTTP/1.1")
    protocol: String,

    /// Headers con las claves tal cual llegaron (case-sensitive)
    headers: HashMap<String, String>,

    /// Body; string vacío cuando no hay contenido
    body: String,
}

impl Request {
    /// Parsea un request HTTP desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use http_framework::http::{Method, Request};
    ///
    /// let raw = b"GET /user/alice?lang=es HTTP/1.1\r\nHost: localhost\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), Method::GET);
    /// assert_eq!(request.endpoint(), "/user/alice?lang=es");
    /// assert_eq!(request.path(), "/user/alice");
    /// assert_eq!(request.query_param("lang"), Some("es"));
    /// assert_eq!(request.header("Host"), Some("localhost"));
    /// assert_eq!(request.body(), "");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(buffer).map_err(|_| ParseError::InvalidEncoding)?;
        Self::parse_str(text)
    }

    /// Igual que [`Request::parse`] pero sobre texto ya decodificado
    pub fn parse_str(text: &str) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let lines: Vec<&str> = text.split(CRLF).collect();

        // 1. Request line
        let (method, endpoint, protocol) = Self::parse_request_line(lines[0])?;
        let (path, query_params) = Self::parse_path_and_query(&endpoint);

        // 2. Headers, hasta la primera línea vacía
        let blank = lines.iter().skip(1).position(|line| line.is_empty()).map(|i| i + 1);
        let header_end = blank.unwrap_or(lines.len());
        let headers = Self::parse_headers(&lines[1..header_end])?;

        // 3. Body
        let body = match blank {
            Some(i) if i + 1 < lines.len() => lines[i + 1..].join(CRLF),
            _ => String::new(),
        };

        Ok(Request {
            method,
            endpoint,
            path,
            query_params,
            protocol,
            headers,
            body,
        })
    }

    /// Formato: `METHOD TARGET PROTOCOL`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let [method, target, protocol] = parts.as_slice() else {
            return Err(ParseError::InvalidRequestLine(line.to_string()));
        };

        let method = method.parse::<Method>()?;

        if !target.starts_with('/') {
            return Err(ParseError::InvalidTarget(target.to_string()));
        }

        if *protocol != "HTTP/1.0" && *protocol != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(protocol.to_string()));
        }

        Ok((method, target.to_string(), protocol.to_string()))
    }

    /// Separa path y query string
    ///
    /// "/search?q=rust&page=2" → ("/search", {"q": "rust", "page": "2"})
    fn parse_path_and_query(endpoint: &str) -> (String, HashMap<String, String>) {
        match endpoint.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse_query_string(query)),
            None => (endpoint.to_string(), HashMap::new()),
        }
    }

    fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|param| !param.is_empty())
            .map(|param| match param.split_once('=') {
                Some((key, value)) => (url_decode(key), url_decode(value)),
                // Parámetro sin valor (ej: "?debug")
                None => (url_decode(param), String::new()),
            })
            .collect()
    }

    /// Cada header se parte en la primera aparición de ": "
    fn parse_headers(lines: &[&str]) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::with_capacity(lines.len());

        for line in lines {
            let Some((name, value)) = line.split_once(": ") else {
                return Err(ParseError::InvalidHeader(line.to_string()));
            };
            headers.insert(name.to_string(), value.to_string());
        }

        Ok(headers)
    }

    // === Accessors ===

    pub fn method(&self) -> Method {
        self.method
    }

    /// Target exacto, incluyendo query string
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Path sin query string
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Búsqueda exacta (las claves son case-sensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Valor de `Content-Length`, si existe y es un número válido
    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")?.trim().parse().ok()
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Decodifica `%XX` y `+` en query strings. Secuencias inválidas se
/// dejan tal cual.
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
