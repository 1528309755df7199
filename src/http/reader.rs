//! # Lectura de Requests desde el socket
//! src/http/reader.rs
//!
//! Lee un request completo de una conexión: primero hasta encontrar el fin
//! de headers (`\r\n\r\n`) y después exactamente `Content-Length` bytes de
//! body. Un request no se trunca porque no entró en un solo `read`.

use std::io::{ErrorKind, Read};
use thiserror::Error;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errores de lectura
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),

    /// El request (headers + body declarado) supera el límite
    #[error("Request exceeds {0} bytes")]
    TooLarge(usize),
}

/// Lee un request de `stream`.
///
/// Retorna `Ok(None)` si el peer cerró sin enviar nada.
pub fn read_request<R: Read>(
    stream: &mut R,
    read_buffer_size: usize,
    max_request_bytes: usize,
) -> Result<Option<Vec<u8>>, ReadError> {
    let mut chunk = vec![0u8; read_buffer_size.max(1)];
    let mut buffer: Vec<u8> = Vec::with_capacity(read_buffer_size);
    let mut head_end = None;

    // 1. Headers
    while head_end.is_none() {
        let n = read_chunk(stream, &mut chunk)?;
        if n == 0 {
            break;
        }

        // Solo hace falta re-escanear el final, el terminador puede quedar partido
        let scan_from = buffer.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
        buffer.extend_from_slice(&chunk[..n]);

        head_end = find_terminator(&buffer[scan_from..]).map(|pos| scan_from + pos);

        if head_end.is_none() && buffer.len() > max_request_bytes {
            return Err(ReadError::TooLarge(max_request_bytes));
        }
    }

    if buffer.is_empty() {
        return Ok(None);
    }

    let Some(head_end) = head_end else {
        // EOF sin terminador: el parser decide qué hacer con lo que llegó
        return Ok(Some(buffer));
    };

    // 2. Body declarado
    let body_start = head_end + HEADER_TERMINATOR.len();
    let declared = declared_content_length(&buffer[..head_end]).unwrap_or(0);

    // Un Content-Length enorme no debe desbordar la suma
    let expected = match body_start.checked_add(declared) {
        Some(expected) if expected <= max_request_bytes => expected,
        _ => return Err(ReadError::TooLarge(max_request_bytes)),
    };

    while buffer.len() < expected {
        let n = read_chunk(stream, &mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    // Requests pipelined no se soportan: lo que sobra se descarta
    buffer.truncate(expected);

    Ok(Some(buffer))
}

fn read_chunk<R: Read>(stream: &mut R, chunk: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Busca `Content-Length` en el bloque de headers (sin distinguir mayúsculas)
fn declared_content_length(head: &[u8]) -> Option<usize> {
    let head = String::from_utf8_lossy(head);

    head.split("\r\n").skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader que entrega los datos de a pedazos fijos, como un socket lento
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let end = (self.pos + self.step.min(buf.len())).min(self.data.len());
            let n = end - self.pos;
            buf[..n].copy_from_slice(&self.data[self.pos..end]);
            self.pos = end;
            Ok(n)
        }
    }

    #[test]
    fn test_reads_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n".to_vec();
        let mut cursor = Cursor::new(raw.clone());
        let read = read_request(&mut cursor, 8192, 1024).unwrap();
        assert_eq!(read, Some(raw));
    }

    #[test]
    fn test_empty_connection() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_request(&mut cursor, 8192, 1024).unwrap().is_none());
    }

    #[test]
    fn test_body_larger_than_buffer_is_reassembled() {
        let body = "x".repeat(5000);
        let raw = format!(
            "POST /upload HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let mut trickle = Trickle {
            data: raw.clone().into_bytes(),
            pos: 0,
            step: 7,
        };

        let read = read_request(&mut trickle, 64, 1 << 20).unwrap().unwrap();
        assert_eq!(read, raw.into_bytes());
    }

    #[test]
    fn test_terminator_split_across_reads() {
        let raw = b"GET /a HTTP/1.1\r\n\r\n".to_vec();
        let mut trickle = Trickle {
            data: raw.clone(),
            pos: 0,
            step: 1,
        };
        assert_eq!(read_request(&mut trickle, 16, 1024).unwrap(), Some(raw));
    }

    #[test]
    fn test_lowercase_content_length() {
        let raw = b"POST / HTTP/1.1\r\ncontent-length: 3\r\n\r\nabc".to_vec();
        let mut trickle = Trickle {
            data: raw.clone(),
            pos: 0,
            step: 4,
        };
        assert_eq!(read_request(&mut trickle, 16, 1024).unwrap(), Some(raw));
    }

    #[test]
    fn test_huge_content_length_is_too_large() {
        let raw = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", usize::MAX);
        let mut cursor = Cursor::new(raw.into_bytes());
        assert!(matches!(
            read_request(&mut cursor, 8192, 1024),
            Err(ReadError::TooLarge(1024))
        ));
    }

    #[test]
    fn test_extra_bytes_after_body_are_dropped() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nokGET / HTTP/1.1\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let read = read_request(&mut cursor, 8192, 1024).unwrap().unwrap();
        assert!(read.ends_with(b"\r\n\r\nok"));
    }

    #[test]
    fn test_short_body_stops_at_eof() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc".to_vec();
        let mut cursor = Cursor::new(raw.clone());
        assert_eq!(read_request(&mut cursor, 8192, 1024).unwrap(), Some(raw));
    }

    #[test]
    fn test_headers_too_large() {
        let raw = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "a".repeat(4096));
        let mut cursor = Cursor::new(raw.into_bytes());
        assert!(matches!(
            read_request(&mut cursor, 512, 1024),
            Err(ReadError::TooLarge(1024))
        ));
    }

    #[test]
    fn test_declared_body_too_large() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 999999\r\n\r\n".to_vec();
        let mut cursor = Cursor::new(raw);
        assert!(matches!(
            read_request(&mut cursor, 8192, 1024),
            Err(ReadError::TooLarge(_))
        ));
    }

    #[test]
    fn test_eof_without_terminator_returns_data() {
        let raw = b"GET / HTTP/1.1".to_vec();
        let mut cursor = Cursor::new(raw.clone());
        assert_eq!(read_request(&mut cursor, 8192, 1024).unwrap(), Some(raw));
    }
}
