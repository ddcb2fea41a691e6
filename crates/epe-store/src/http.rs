// crates/epe-store/src/http.rs
//
// HTTP client for the witness/annotation REST store.
// Uses reqwest against the `/api/...` surface; implements `EditionStore`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};

use epe_core::error::EditionError;
use epe_core::remote::{
    AlignmentQuery, AnnotationId, AnnotationUpdate, LogListing, NewAnnotation, PairAlignment,
    StoredAnnotation, StoredWitness, StoredWitnessSummary, WitnessRename,
};
use epe_core::traits::EditionStore;

/// Which response statuses count as success for a request.
#[derive(Debug, Clone, Copy)]
enum Expect {
    /// Any 2xx.
    Success,
    /// Exactly this status; other 2xx codes are failures too.
    Exactly(StatusCode),
}

impl Expect {
    fn accepts(self, status: StatusCode) -> bool {
        match self {
            Expect::Success => status.is_success(),
            Expect::Exactly(expected) => status == expected,
        }
    }
}

/// Client for a remote witness store.
#[derive(Debug, Clone)]
pub struct HttpEditionStore {
    /// Base URL of the store (e.g., "http://127.0.0.1:8000").
    pub base_url: String,
    client: reqwest::Client,
}

impl HttpEditionStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Client with a per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, EditionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EditionError::RemoteRequest(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `{base_url}/api/{segments...}` with every segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, EditionError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| EditionError::RemoteRequest(format!("Invalid store URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| EditionError::RemoteRequest(format!("Invalid store URL {}", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Send a prepared request and enforce the expected status.
    ///
    /// A rejected response becomes `RemoteRequest` carrying its body verbatim,
    /// or the status line when the body is empty.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        expect: Expect,
        action: &str,
    ) -> Result<Response, EditionError> {
        let response = request
            .send()
            .await
            .map_err(|e| EditionError::RemoteRequest(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if !expect.accepts(status) {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(action, status = status.as_u16(), "Store rejected request");
            let message = if body.trim().is_empty() {
                format!("{} failed ({})", action, status)
            } else {
                body
            };
            return Err(EditionError::RemoteRequest(message));
        }

        Ok(response)
    }

    async fn json<T: serde::de::DeserializeOwned>(
        response: Response,
        action: &str,
    ) -> Result<T, EditionError> {
        response.json().await.map_err(|e| {
            EditionError::Serialization(format!("{} response parse failed: {}", action, e))
        })
    }

    async fn text(response: Response, action: &str) -> Result<String, EditionError> {
        response
            .text()
            .await
            .map_err(|e| EditionError::RemoteRequest(format!("{} body read failed: {}", action, e)))
    }
}

#[async_trait]
impl EditionStore for HttpEditionStore {
    async fn list_witnesses(&self) -> Result<Vec<StoredWitnessSummary>, EditionError> {
        let url = self.url(&["witnesses"])?;
        let response = self
            .send(self.client.get(url), Expect::Success, "List witnesses")
            .await?;
        Self::json(response, "List witnesses").await
    }

    async fn get_witness(&self, id: &str) -> Result<StoredWitness, EditionError> {
        let url = self.url(&["witnesses", id])?;
        let response = self
            .send(self.client.get(url), Expect::Success, "Get witness")
            .await?;
        Self::json(response, "Get witness").await
    }

    async fn import_witness(&self, payload: &serde_json::Value) -> Result<(), EditionError> {
        let url = self.url(&["witnesses"])?;
        self.send(self.client.post(url).json(payload), Expect::Success, "Import witness")
            .await?;
        tracing::info!("Witness uploaded");
        Ok(())
    }

    async fn rename_witness(&self, id: &str, label: &str) -> Result<(), EditionError> {
        let url = self.url(&["witnesses", id])?;
        let body = WitnessRename {
            label: label.to_string(),
        };
        self.send(
            self.client.patch(url).json(&body),
            Expect::Exactly(StatusCode::OK),
            "Rename witness",
        )
        .await?;
        Ok(())
    }

    async fn delete_witness(&self, id: &str) -> Result<(), EditionError> {
        let url = self.url(&["witnesses", id])?;
        self.send(
            self.client.delete(url),
            Expect::Exactly(StatusCode::NO_CONTENT),
            "Delete witness",
        )
        .await?;
        Ok(())
    }

    async fn export_witness(&self, id: &str) -> Result<String, EditionError> {
        let url = self.url(&["export", id])?;
        let response = self
            .send(self.client.get(url), Expect::Success, "Export witness")
            .await?;
        Self::text(response, "Export witness").await
    }

    async fn alignments(&self, query: &AlignmentQuery) -> Result<PairAlignment, EditionError> {
        let url = self.url(&["alignments"])?;
        let response = self
            .send(self.client.get(url).query(query), Expect::Success, "Align witnesses")
            .await?;
        Self::json(response, "Align witnesses").await
    }

    async fn list_annotations(
        &self,
        witness_id: &str,
    ) -> Result<Vec<StoredAnnotation>, EditionError> {
        let url = self.url(&["annotations"])?;
        let response = self
            .send(
                self.client.get(url).query(&[("witness_id", witness_id)]),
                Expect::Success,
                "List annotations",
            )
            .await?;
        Self::json(response, "List annotations").await
    }

    async fn create_annotation(&self, annotation: &NewAnnotation) -> Result<(), EditionError> {
        let url = self.url(&["annotations"])?;
        self.send(
            self.client.post(url).json(annotation),
            Expect::Success,
            "Create annotation",
        )
        .await?;
        Ok(())
    }

    async fn update_annotation(&self, id: &AnnotationId, text: &str) -> Result<(), EditionError> {
        let url = self.url(&["annotations", id.as_str()])?;
        let body = AnnotationUpdate {
            annotation: text.to_string(),
        };
        self.send(
            self.client.put(url).json(&body),
            Expect::Exactly(StatusCode::OK),
            "Update annotation",
        )
        .await?;
        Ok(())
    }

    async fn delete_annotation(&self, id: &AnnotationId) -> Result<(), EditionError> {
        let url = self.url(&["annotations", id.as_str()])?;
        self.send(
            self.client.delete(url),
            Expect::Exactly(StatusCode::NO_CONTENT),
            "Delete annotation",
        )
        .await?;
        Ok(())
    }

    async fn logs(&self) -> Result<Vec<String>, EditionError> {
        let url = self.url(&["logs"])?;
        let response = self
            .send(self.client.get(url), Expect::Success, "List logs")
            .await?;
        let listing: LogListing = Self::json(response, "List logs").await?;
        Ok(listing.logs)
    }

    async fn export_logs(&self) -> Result<String, EditionError> {
        let url = self.url(&["logs", "export"])?;
        let response = self
            .send(self.client.get(url), Expect::Success, "Export logs")
            .await?;
        Self::text(response, "Export logs").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Start a one-shot mock store that answers with `status` and `body`.
    /// The join handle yields the request line it received.
    async fn mock_store(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let mut request_line = String::new();
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]);
                request_line = head.lines().next().unwrap_or_default().to_string();
                let _ = stream.write_all(response.as_bytes()).await;
            }
            request_line
        });

        (base_url, handle)
    }

    #[tokio::test]
    async fn list_witnesses_parses_summaries() {
        let (base_url, handle) =
            mock_store("200 OK", r#"[{"id":"w1","label":"Paris"},{"id":"w2","label":"Cairo"}]"#).await;
        let store = HttpEditionStore::new(&base_url);

        let witnesses = store.list_witnesses().await.unwrap();
        assert_eq!(witnesses.len(), 2);
        assert_eq!(witnesses[1].label, "Cairo");
        assert_eq!(handle.await.unwrap(), "GET /api/witnesses HTTP/1.1");
    }

    #[tokio::test]
    async fn witness_ids_are_percent_encoded() {
        let (base_url, handle) = mock_store("404 Not Found", "Witness not found").await;
        let store = HttpEditionStore::new(&format!("{}/", base_url));

        let err = store.get_witness("ms a/1").await.unwrap_err();
        assert_eq!(err, EditionError::RemoteRequest("Witness not found".into()));
        assert_eq!(handle.await.unwrap(), "GET /api/witnesses/ms%20a%2F1 HTTP/1.1");
    }

    #[tokio::test]
    async fn import_accepts_any_2xx() {
        let (base_url, handle) = mock_store("201 Created", r#"{"status":"ok"}"#).await;
        let store = HttpEditionStore::new(&base_url);

        let payload = serde_json::json!({"id": "w3", "label": "New"});
        store.import_witness(&payload).await.unwrap();
        assert_eq!(handle.await.unwrap(), "POST /api/witnesses HTTP/1.1");
    }

    #[tokio::test]
    async fn failed_import_surfaces_body_verbatim() {
        let (base_url, _handle) =
            mock_store("400 Bad Request", "Witness with this ID already exists").await;
        let store = HttpEditionStore::new(&base_url);

        let err = store.import_witness(&serde_json::json!({})).await.unwrap_err();
        assert_eq!(
            err,
            EditionError::RemoteRequest("Witness with this ID already exists".into())
        );
    }

    #[tokio::test]
    async fn rename_requires_exactly_200() {
        let (base_url, _handle) = mock_store("202 Accepted", "").await;
        let store = HttpEditionStore::new(&base_url);

        match store.rename_witness("w1", "Renamed").await.unwrap_err() {
            EditionError::RemoteRequest(msg) => assert!(msg.contains("202")),
            other => panic!("Expected RemoteRequest error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_requires_204() {
        let (base_url, handle) = mock_store("204 No Content", "").await;
        let store = HttpEditionStore::new(&base_url);
        store.delete_annotation(&AnnotationId::from(4)).await.unwrap();
        assert_eq!(handle.await.unwrap(), "DELETE /api/annotations/4 HTTP/1.1");

        let (base_url, _handle) = mock_store("200 OK", "{}").await;
        let store = HttpEditionStore::new(&base_url);
        assert!(store.delete_witness("w1").await.is_err());
    }

    #[tokio::test]
    async fn alignment_query_carries_sections() {
        let body = r#"{"alignments":[
            {"position":1,"base":{"id":"t1","text":"a"},"witness":{"id":"u1","text":"b"}},
            {"position":2,"base":{"id":"t2","text":"c"},"witness":{"id":null,"text":"[—]"}}
        ]}"#;
        let (base_url, handle) = mock_store("200 OK", body).await;
        let store = HttpEditionStore::new(&base_url);

        let query = AlignmentQuery::new("w1", "w2").with_sections(Some("s1".into()), None);
        let result = store.alignments(&query).await.unwrap();
        assert_eq!(result.alignments.len(), 2);
        assert!(result.alignments[0].differs());
        assert_eq!(result.alignments[1].witness.id, None);
        assert_eq!(
            handle.await.unwrap(),
            "GET /api/alignments?base=w1&witness=w2&base_section=s1 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn list_annotations_queries_by_witness() {
        let (base_url, handle) = mock_store(
            "200 OK",
            r#"[{"id":1,"witness_id":"w1","token_id":"t1","annotation":"sic","timestamp":"2024-05-01T12:00:00.123456"}]"#,
        )
        .await;
        let store = HttpEditionStore::new(&base_url);

        let list = store.list_annotations("w1").await.unwrap();
        assert_eq!(list[0].id, Some(AnnotationId::from(1)));
        assert_eq!(list[0].annotation, "sic");
        assert_eq!(
            handle.await.unwrap(),
            "GET /api/annotations?witness_id=w1 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn logs_unwraps_listing() {
        let (base_url, _handle) =
            mock_store("200 OK", r#"{"logs":["2024-05-01T12:00:00 GET /api/witnesses 200 "]}"#).await;
        let store = HttpEditionStore::new(&base_url);
        let logs = store.logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].contains("GET /api/witnesses 200"));
    }

    #[tokio::test]
    async fn connection_error_is_remote_request() {
        let store = HttpEditionStore::with_timeout("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        match store.list_witnesses().await.unwrap_err() {
            EditionError::RemoteRequest(msg) => assert!(msg.contains("request failed")),
            other => panic!("Expected RemoteRequest error, got: {:?}", other),
        }
    }
}
