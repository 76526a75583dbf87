use crate::constants::server::{MAX_BODY_BYTES, MAX_HEADER_BYTES, MAX_HEADERS};
use bytes::{Bytes, BytesMut};
use http::Method;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// A parsed request. Only what the routes need is kept.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub query: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Client closed the connection before sending a request")]
    Closed,

    #[error("Request head not received within {0:?}")]
    Timeout(Duration),

    #[error("Request head exceeds {} bytes", MAX_HEADER_BYTES)]
    HeadTooLarge,

    #[error("Request body exceeds {} bytes", MAX_BODY_BYTES)]
    BodyTooLarge,

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

struct Head {
    method: Method,
    target: String,
    content_length: usize,
    len: usize,
}

/// Reads one request from `reader`.
///
/// The head must arrive within `head_timeout`; the body is read up to
/// `Content-Length`.
pub async fn read_request<R>(
    reader: &mut R,
    head_timeout: Duration,
) -> Result<Request, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(4096);
    let head = tokio::time::timeout(head_timeout, read_head(reader, &mut buf))
        .await
        .map_err(|_| RequestError::Timeout(head_timeout))??;

    if head.content_length > MAX_BODY_BYTES {
        return Err(RequestError::BodyTooLarge);
    }
    let mut body = buf.split_off(head.len);
    while body.len() < head.content_length {
        if reader.read_buf(&mut body).await? == 0 {
            return Err(RequestError::Malformed(
                "body shorter than Content-Length".to_string(),
            ));
        }
    }
    body.truncate(head.content_length);

    let (path, query) = match head.target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (head.target, None),
    };

    Ok(Request {
        method: head.method,
        path,
        query,
        body: body.freeze(),
    })
}

async fn read_head<R>(reader: &mut R, buf: &mut BytesMut) -> Result<Head, RequestError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(head) = parse_head(buf)? {
            return Ok(head);
        }
        if buf.len() >= MAX_HEADER_BYTES {
            return Err(RequestError::HeadTooLarge);
        }
        if reader.read_buf(buf).await? == 0 {
            return if buf.is_empty() {
                Err(RequestError::Closed)
            } else {
                Err(RequestError::Malformed("incomplete request head".to_string()))
            };
        }
    }
}

fn parse_head(buf: &[u8]) -> Result<Option<Head>, RequestError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut headers);
    let len = match request.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(RequestError::Malformed(e.to_string())),
    };

    let method = request
        .method
        .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
        .ok_or_else(|| RequestError::Malformed("invalid method".to_string()))?;
    let target = request
        .path
        .ok_or_else(|| RequestError::Malformed("missing request target".to_string()))?
        .to_string();

    let mut content_length = 0;
    for header in request.headers.iter() {
        if header.name.eq_ignore_ascii_case(http::header::CONTENT_LENGTH.as_str()) {
            content_length = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| RequestError::Malformed("invalid Content-Length".to_string()))?;
        }
    }

    Ok(Some(Head {
        method,
        target,
        content_length,
        len,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    #[tokio::test]
    async fn test_parse_get_with_query() {
        let mut raw: &[u8] = b"GET /api/lifts?fresh=1 HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let request = read_request(&mut raw, timeout()).await.unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/api/lifts");
        assert_eq!(request.query.as_deref(), Some("fresh=1"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_parse_post_with_body() {
        let mut raw: &[u8] =
            b"POST /api/lifts/refresh HTTP/1.1\r\nContent-Length: 2\r\nContent-Type: application/json\r\n\r\n{}";
        let request = read_request(&mut raw, timeout()).await.unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(&request.body[..], b"{}");
    }

    #[tokio::test]
    async fn test_empty_connection_is_closed() {
        let mut raw: &[u8] = b"";
        assert!(matches!(
            read_request(&mut raw, timeout()).await,
            Err(RequestError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_garbage_is_malformed() {
        let mut raw: &[u8] = b"NOT A REQUEST\r\n\r\n";
        assert!(matches!(
            read_request(&mut raw, timeout()).await,
            Err(RequestError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let head = format!(
            "POST /api/lifts/refresh HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_BYTES + 1
        );
        let mut raw = head.as_bytes();
        assert!(matches!(
            read_request(&mut raw, timeout()).await,
            Err(RequestError::BodyTooLarge)
        ));
    }

    #[tokio::test]
    async fn test_oversized_head_is_rejected() {
        let head = format!(
            "GET /health HTTP/1.1\r\nX-Padding: {}\r\n",
            "a".repeat(MAX_HEADER_BYTES)
        );
        let mut raw = head.as_bytes();
        assert!(matches!(
            read_request(&mut raw, timeout()).await,
            Err(RequestError::HeadTooLarge)
        ));
    }

    #[tokio::test]
    async fn test_slow_head_times_out() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let _ = client.write_all(b"GET /health HTTP/1.1\r\n").await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let result = read_request(&mut server, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(RequestError::Timeout(_))));
    }
}
