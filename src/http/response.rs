//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Un `Response` es el triple (status, content-type, body) que devuelve un
//! handler. `to_bytes` lo serializa al formato exacto del wire:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 11\r\n
//! \r\n
//! Hello alice
//! ```
//!
//! `Content-Length` se calcula siempre sobre los bytes codificados del body
//! (UTF-8 para texto), nunca sobre la cantidad de caracteres.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use http_framework::http::{Response, StatusCode};
//!
//! let response = Response::text("héllo").with_status(StatusCode::Created);
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 201 Created\r\n"));
//! ```

use super::StatusCode;
use serde::Serialize;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Body de una respuesta: texto o binario, nada más.
///
/// Solo se construye vía `From`, así que cualquier otro tipo es un error
/// de compilación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

impl Body {
    /// Bytes tal cual se envían por el socket
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Text(text) => text.as_bytes(),
            Body::Binary(bytes) => bytes,
        }
    }

    /// Largo en bytes codificados
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Binary(bytes)
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Body::Binary(bytes.to_vec())
    }
}

/// Respuesta HTTP producida por un handler
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    content_type: String,
    body: Body,

    /// Headers extra, en orden de inserción, después de Content-Length
    headers: Vec<(String, String)>,
}

impl Response {
    /// Crea una respuesta con status, content-type y body explícitos
    pub fn new(body: impl Into<Body>, status: StatusCode, content_type: &str) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body: body.into(),
            headers: Vec::new(),
        }
    }

    /// 200 OK, `text/plain`
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into(), StatusCode::Ok, TEXT_PLAIN)
    }

    /// 200 OK, `text/html`
    pub fn html(html: impl Into<String>) -> Self {
        Self::new(html.into(), StatusCode::Ok, TEXT_HTML)
    }

    /// 200 OK, `application/json`
    ///
    /// ```
    /// use http_framework::http::Response;
    /// use serde_json::json;
    ///
    /// let response = Response::json(&json!({"key": "value"})).unwrap();
    /// assert_eq!(response.body().as_bytes(), br#"{"key":"value"}"#);
    /// ```
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        Ok(Self::new(body, StatusCode::Ok, APPLICATION_JSON))
    }

    /// 200 OK, `application/octet-stream`
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self::new(bytes, StatusCode::Ok, OCTET_STREAM)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Agrega un header extra. `Content-Type` y `Content-Length` los
    /// controla el builder y no se pueden pisar desde aquí.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Verifica que la respuesta se pueda serializar sin romper el framing
    pub fn validate(&self) -> Result<(), String> {
        if self.content_type.trim().is_empty() {
            return Err("empty Content-Type".to_string());
        }
        if has_line_break(&self.content_type) {
            return Err(format!("line break in Content-Type {:?}", self.content_type));
        }

        for (name, value) in &self.headers {
            if name.trim().is_empty() || has_line_break(name) || has_line_break(value) {
                return Err(format!("invalid header {:?}: {:?}", name, value));
            }
            if name.eq_ignore_ascii_case("Content-Length")
                || name.eq_ignore_ascii_case("Content-Type")
            {
                return Err(format!("header {} is managed by the framework", name));
            }
        }

        Ok(())
    }

    /// Serializa la respuesta al formato HTTP/1.1
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.body.as_bytes();

        let mut head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status,
            self.content_type,
            body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut result = Vec::with_capacity(head.len() + body.len());
        result.extend_from_slice(head.as_bytes());
        result.extend_from_slice(body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains('\r') || s.contains('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(response: &Response) -> String {
        String::from_utf8(response.to_bytes()).unwrap()
    }

    #[test]
    fn test_exact_wire_format() {
        let response = Response::text("Hello alice");
        assert_eq!(
            wire(&response),
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 11\r\n\r\nHello alice"
        );
    }

    #[test]
    fn test_content_length_counts_utf8_bytes() {
        for text in ["", "a", "héllo", "日本語", "emoji 🦀"] {
            let response = Response::text(text);
            let expected = format!("Content-Length: {}\r\n", text.len());
            assert!(wire(&response).contains(&expected), "body {:?}", text);
        }
        // 5 caracteres, 6 bytes
        assert!(wire(&Response::text("héllo")).contains("Content-Length: 6\r\n"));
    }

    #[test]
    fn test_binary_body() {
        let data = vec![0x00, 0x01, 0xFF, b'\r', b'\n'];
        let response = Response::bytes(data.clone());
        let bytes = response.to_bytes();

        let head: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
                            Content-Length: 5\r\n\r\n";
        assert!(bytes.starts_with(head));
        assert!(bytes.ends_with(&data));
        assert_eq!(response.body(), &Body::Binary(data));
    }

    #[test]
    fn test_empty_body() {
        let response = Response::html("");
        assert!(wire(&response).ends_with("Content-Length: 0\r\n\r\n"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_custom_status_and_content_type() {
        let response = Response::new("<a/>", StatusCode::NotFound, "application/xml");
        let text = wire(&response);
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Type: application/xml\r\n"));
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(&json!({"error": "not found"}))
            .unwrap()
            .with_status(StatusCode::NotFound);
        let text = wire(&response);
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.ends_with(r#"{"error":"not found"}"#));
    }

    #[test]
    fn test_json_empty_object() {
        let response = Response::json(&json!({})).unwrap();
        assert_eq!(response.body(), &Body::Text("{}".to_string()));
    }

    #[test]
    fn test_extra_headers_follow_content_length() {
        let response = Response::text("ok").with_header("X-Trace", "abc");
        assert_eq!(
            wire(&response),
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\
             X-Trace: abc\r\n\r\nok"
        );
    }

    // ==================== Validación ====================

    #[test]
    fn test_validate_ok() {
        assert!(Response::html("<h1>hi</h1>").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_header_injection() {
        let response = Response::text("x").with_header("X-Evil", "a\r\nSet-Cookie: b");
        assert!(response.validate().is_err());

        let response = Response::text("x").with_content_type("text/plain\r\nX: y");
        assert!(response.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_managed_headers() {
        let response = Response::text("x").with_header("content-length", "99");
        assert!(response.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_content_type() {
        let response = Response::text("x").with_content_type("  ");
        assert!(response.validate().is_err());
    }
}
