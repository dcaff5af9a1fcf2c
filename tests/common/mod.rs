//! Shared utilities for integration testing: tiny programmable origins.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What the mock origin saw in the request head.
#[derive(Debug, Clone, Default)]
pub struct SeenRequest {
    pub user_agent: String,
}

/// One canned origin response.
#[derive(Debug, Clone)]
pub struct OriginReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl OriginReply {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.to_string(),
        }
    }

    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/html",
            body: String::new(),
        }
    }
}

/// Start a programmable mock origin. The callback decides the reply from
/// the request head.
pub async fn start_origin<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OriginReply> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let mut head = String::new();
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) => break,
                                Ok(n) => {
                                    head.push_str(&String::from_utf8_lossy(&buf[..n]));
                                    if head.contains("\r\n\r\n") {
                                        break;
                                    }
                                }
                                Err(_) => return,
                            }
                        }

                        let seen = SeenRequest {
                            user_agent: header_value(&head, "user-agent"),
                        };
                        let reply = f(seen).await;
                        let status_text = match reply.status {
                            200 => "200 OK",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            999 => "999 Request Denied",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            reply.content_type,
                            reply.body.len(),
                            reply.body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

fn header_value(head: &str, name: &str) -> String {
    head.lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case(name) {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_default()
}
