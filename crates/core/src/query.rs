use crate::error::QueryError;
use crate::models::{QueryAnswer, QueryRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait QueryService {
    async fn ask(&self, request: &QueryRequest<'_>) -> Result<QueryAnswer, QueryError>;
}

pub struct HttpQueryClient {
    endpoint: Url,
    client: Client,
}

impl HttpQueryClient {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, QueryError> {
        let endpoint = Url::parse(endpoint)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            endpoint,
            client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QueryService for HttpQueryClient {
    async fn ask(&self, request: &QueryRequest<'_>) -> Result<QueryAnswer, QueryError> {
        debug!(
            endpoint = %self.endpoint,
            document_id = %request.document.id,
            "sending query"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        decode_answer(&body)
    }
}

/// Fails closed: anything that is not `{answer: string, sources: [{text, page}]}`
/// is a malformed response.
pub fn decode_answer(body: &[u8]) -> Result<QueryAnswer, QueryError> {
    serde_json::from_slice::<QueryAnswer>(body)
        .map_err(|error| QueryError::MalformedResponse(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Source};
    use chrono::Utc;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn document() -> Document {
        Document {
            id: "d".to_string(),
            title: "t.pdf".to_string(),
            description: None,
            created_at: Utc::now(),
            file_size: 1,
            pages: 1,
            contents: vec!["x".to_string()],
        }
    }

    /// Reads one HTTP request and returns its body.
    async fn read_request_body(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let read = socket.read(&mut chunk).await.expect("request should be readable");
            if read == 0 {
                return String::new();
            }
            buffer.extend_from_slice(&chunk[..read]);

            let Some(header_end) = buffer.windows(4).position(|window| window == b"\r\n\r\n")
            else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let body_start = header_end + 4;
            if buffer.len() >= body_start + length {
                return String::from_utf8_lossy(&buffer[body_start..body_start + length])
                    .into_owned();
            }
        }
    }

    /// Serves one canned response and hands back the request body it saw.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("listener has an address");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("client should connect");
            let request_body = read_request_body(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("response should be written");
            let _ = socket.shutdown().await;
            request_body
        });

        (format!("http://{address}/query"), handle)
    }

    #[tokio::test]
    async fn request_carries_document_and_query_in_wire_form() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"answer":"A","sources":[{"text":"T","page":2}]}"#,
        )
        .await;
        let client = HttpQueryClient::new(&endpoint, None).expect("client should build");
        let document = document();

        let answer = client
            .ask(&QueryRequest {
                document: &document,
                query: "What is X?",
            })
            .await
            .expect("query should succeed");
        let sent: Value = serde_json::from_str(&server.await.expect("server task should finish"))
            .expect("request body should be json");

        assert_eq!(answer.answer, "A");
        assert_eq!(answer.sources[0].page, 2);
        assert_eq!(sent["query"], "What is X?");
        assert_eq!(sent["document"]["id"], "d");
        assert_eq!(sent["document"]["fileSize"], 1);
        assert_eq!(sent["document"]["contents"][0], "x");
        assert!(sent["document"]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn server_error_status_is_reported() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "{}").await;
        let client = HttpQueryClient::new(&endpoint, None).expect("client should build");
        let document = document();

        let result = client
            .ask(&QueryRequest {
                document: &document,
                query: "What is X?",
            })
            .await;
        let _ = server.await;

        assert!(matches!(result, Err(QueryError::Status { status: 500 })));
    }

    #[tokio::test]
    async fn refused_connection_is_an_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("listener has an address");
        drop(listener);

        let client = HttpQueryClient::new(&format!("http://{address}/query"), None)
            .expect("client should build");
        let document = document();

        let result = client
            .ask(&QueryRequest {
                document: &document,
                query: "What is X?",
            })
            .await;

        assert!(matches!(result, Err(QueryError::Http(_))));
    }

    #[test]
    fn well_formed_answer_decodes() {
        let body = br#"{"answer":"A","sources":[{"text":"T","page":2}],"trace":"ignored"}"#;
        let answer = decode_answer(body).expect("answer should decode");

        assert_eq!(answer.answer, "A");
        assert_eq!(
            answer.sources,
            vec![Source {
                text: "T".to_string(),
                page: 2
            }]
        );
    }

    #[test]
    fn missing_sources_is_malformed() {
        let result = decode_answer(br#"{"answer":"A"}"#);
        assert!(matches!(result, Err(QueryError::MalformedResponse(_))));
    }

    #[test]
    fn negative_page_is_malformed() {
        let result = decode_answer(br#"{"answer":"A","sources":[{"text":"T","page":-1}]}"#);
        assert!(matches!(result, Err(QueryError::MalformedResponse(_))));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let result = decode_answer(b"<html>Internal Server Error</html>");
        assert!(matches!(result, Err(QueryError::MalformedResponse(_))));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(matches!(
            HttpQueryClient::new("not a url", None),
            Err(QueryError::Url(_))
        ));
    }

    #[test]
    fn client_keeps_configured_endpoint() {
        let client = HttpQueryClient::new("http://localhost:8000/query", Some(Duration::from_secs(5)))
            .expect("client should build");
        assert_eq!(client.endpoint().path(), "/query");
    }
}
