use std::path::Path;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Client, RequestBuilder, Response};
use serde_json::json;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use crate::conf::Endpoint;
use crate::error::{PipelineError, Result};
use crate::models::bulk::{BulkItem, BulkQuery, BulkResponse, ErrorCause, ErrorResponse};
use crate::models::server_info::ServerInfo;
use crate::reconciler::{RecordOutcome, SubmissionResult};

const NDJSON: &str = "application/x-ndjson";
const JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub struct EsClient {
    endpoint: Endpoint,
    http_client: Client,
    retries: usize,
}

/// Raw answer of the bulk endpoint, before decoding.
#[derive(Debug)]
pub struct BulkReply {
    pub url: String,
    pub status: u16,
    pub success: bool,
    pub body: Vec<u8>,
}

fn inject_auth(request_builder: RequestBuilder, endpoint: &Endpoint) -> RequestBuilder {
    if endpoint.has_basic_auth() {
        request_builder.basic_auth(endpoint.get_username(), endpoint.get_password())
    } else {
        request_builder
    }
}

pub fn build_http_client(endpoint: &Endpoint) -> Result<Client> {
    let mut builder = Client::builder();
    if endpoint.is_insecure() {
        warn!("TLS verification disabled for {}", endpoint.get_url());
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(path) = endpoint.get_root_certificates() {
        for cert in load_certificates(path)? {
            builder = builder.add_root_certificate(cert);
        }
    }
    if let Some(seconds) = endpoint.get_timeout_seconds() {
        builder = builder.timeout(Duration::from_secs(seconds));
    }
    builder
        .build()
        .map_err(|e| PipelineError::Config(format!("cannot build HTTP client: {}", e)))
}

/// Every readable PEM file in `path` (files that fail to parse are skipped).
fn load_certificates(path: &Path) -> Result<Vec<Certificate>> {
    let entries = std::fs::read_dir(path).map_err(|e| {
        PipelineError::Config(format!("cannot read root certificates {:?}: {}", path, e))
    })?;
    let mut certs = Vec::new();
    for entry in entries.flatten() {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        if let Ok(content) = std::fs::read(&file_path) {
            match Certificate::from_pem(&content) {
                Ok(cert) => certs.push(cert),
                Err(e) => debug!("Skipping {:?}: {}", file_path, e),
            }
        }
    }
    Ok(certs)
}

/// Reason of an Elasticsearch error body, or the body itself if it isn't one.
fn error_reason(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(response) => {
            let cause: ErrorCause = response.error.into();
            let reason = cause.deepest_reason().unwrap_or_default().to_string();
            if cause.kind.is_empty() {
                reason
            } else {
                format!("{}: {}", cause.kind, reason)
            }
        }
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

/// Decodes a bulk reply for a batch that carried `ids`, in that order.
pub fn decode_bulk_response(reply: &BulkReply, ids: &[String]) -> Result<SubmissionResult> {
    if !reply.success {
        let response: ErrorResponse =
            serde_json::from_slice(&reply.body).map_err(|e| PipelineError::decode(&reply.url, e))?;
        return Ok(SubmissionResult::WholeFailure {
            status: reply.status,
            error: response.error.into(),
            records: ids.len(),
        });
    }

    let response: BulkResponse =
        serde_json::from_slice(&reply.body).map_err(|e| PipelineError::decode(&reply.url, e))?;
    if response.items.len() != ids.len() {
        return Err(PipelineError::decode(
            &reply.url,
            format!(
                "{} items in response for {} submitted documents",
                response.items.len(),
                ids.len()
            ),
        ));
    }

    let outcomes = response
        .items
        .into_iter()
        .map(BulkItem::into_status)
        .zip(ids)
        .map(|(item, submitted_id)| RecordOutcome {
            id: item.id.unwrap_or_else(|| submitted_id.clone()),
            status: item.status,
            result: item.result,
            error: item.error,
        })
        .collect();
    Ok(SubmissionResult::Itemized(outcomes))
}

impl EsClient {
    pub fn new(endpoint: Endpoint, http_client: Client) -> Self {
        Self {
            endpoint,
            http_client,
            retries: 0,
        }
    }

    pub fn from_endpoint(endpoint: Endpoint) -> Result<Self> {
        let http_client = build_http_client(&endpoint)?;
        Ok(Self::new(endpoint, http_client))
    }

    /// Retries requests that never got an HTTP answer. Zero keeps transport errors fatal
    /// on the first attempt.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn get_url(&self) -> &String {
        self.endpoint.get_url()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.get_url().trim_end_matches('/'), path)
    }

    async fn execute<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.retries);
        let mut attempt = 0usize;
        Retry::start(strategy, || {
            attempt += 1;
            if attempt > 1 {
                warn!("Retrying {} (attempt {} of {})", url, attempt, self.retries + 1);
            }
            inject_auth(build(), &self.endpoint).send()
        })
        .await
        .map_err(|source| PipelineError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn read_body(url: &str, response: Response) -> Result<Vec<u8>> {
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|source| PipelineError::Transport {
                url: url.to_string(),
                source,
            })
    }

    pub async fn server_info(&self) -> Result<ServerInfo> {
        let url = self.url("/");
        let response = self.execute(&url, || self.http_client.get(&url)).await?;
        let success = response.status().is_success();
        let status = response.status().as_u16();
        let body = Self::read_body(&url, response).await?;
        if !success {
            return Err(PipelineError::decode(
                &url,
                format!("[{}] {}", status, error_reason(&body)),
            ));
        }
        serde_json::from_slice(&body).map_err(|e| PipelineError::decode(&url, e))
    }

    pub async fn print_server_info(&self, prefix: &str) -> Option<ServerInfo> {
        match self.server_info().await {
            Ok(server_info) => {
                info!(
                    "{}: hostname={}, name={}, uuid={:?}, version={}",
                    prefix,
                    server_info.get_hostname(),
                    server_info.get_name(),
                    server_info.get_uuid(),
                    server_info.get_version(),
                );
                Some(server_info)
            }
            Err(e) => {
                warn!("{}: cannot read server info: {}", prefix, e);
                None
            }
        }
    }

    /// Deletes `name`. Returns `false` when the index did not exist.
    pub async fn delete_index(&self, name: &str) -> Result<bool> {
        let url = self.url(&format!("/{}", name));
        let response = self.execute(&url, || self.http_client.delete(&url)).await?;
        let status = response.status();
        let body = Self::read_body(&url, response).await?;
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(PipelineError::IndexLifecycle {
                action: "delete",
                index: name.to_string(),
                status: status.as_u16(),
                reason: error_reason(&body),
            })
        }
    }

    pub async fn create_index(
        &self,
        name: &str,
        number_of_shards: Option<u64>,
        number_of_replicas: Option<u64>,
    ) -> Result<()> {
        let url = self.url(&format!("/{}", name));
        let mut settings = serde_json::Map::new();
        if let Some(shards) = number_of_shards {
            settings.insert("number_of_shards".to_string(), json!(shards));
        }
        if let Some(replicas) = number_of_replicas {
            settings.insert("number_of_replicas".to_string(), json!(replicas));
        }
        let body = if settings.is_empty() {
            None
        } else {
            Some(json!({ "settings": { "index": settings } }).to_string())
        };

        let response = self
            .execute(&url, || {
                let request = self.http_client.put(&url);
                match &body {
                    Some(body) => request.header(CONTENT_TYPE, JSON).body(body.clone()),
                    None => request,
                }
            })
            .await?;
        let status = response.status();
        let response_body = Self::read_body(&url, response).await?;
        if !status.is_success() {
            return Err(PipelineError::IndexLifecycle {
                action: "create",
                index: name.to_string(),
                status: status.as_u16(),
                reason: error_reason(&response_body),
            });
        }
        Ok(())
    }

    /// POSTs an NDJSON payload to `/{index}/_bulk`. Only transport failures are errors here.
    pub async fn bulk(&self, index: &str, query: &BulkQuery, payload: Vec<u8>) -> Result<BulkReply> {
        let url = self.url(&format!("/{}/_bulk", index));
        let response = self
            .execute(&url, || {
                self.http_client
                    .post(&url)
                    .query(query)
                    .header(CONTENT_TYPE, NDJSON)
                    .body(payload.clone())
            })
            .await?;
        let status = response.status();
        let body = Self::read_body(&url, response).await?;
        Ok(BulkReply {
            url,
            status: status.as_u16(),
            success: status.is_success(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> BulkReply {
        BulkReply {
            url: "http://localhost:9200/articles/_bulk".to_string(),
            status,
            success: (200..300).contains(&status),
            body: body.as_bytes().to_vec(),
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn error_status_becomes_whole_failure() {
        let reply = reply(
            400,
            r#"{"error":{"type":"illegal_argument_exception","reason":"The bulk request must be terminated by a newline [\\n]"},"status":400}"#,
        );
        let result = decode_bulk_response(&reply, &ids(&["1", "2", "3"])).unwrap();
        match result {
            SubmissionResult::WholeFailure {
                status,
                error,
                records,
            } => {
                assert_eq!(status, 400);
                assert_eq!(records, 3);
                assert_eq!(error.kind, "illegal_argument_exception");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn success_status_becomes_itemized_in_order() {
        let reply = reply(
            200,
            r#"{"took":3,"errors":true,"items":[
                {"index":{"_index":"articles","_id":"1","status":201,"result":"created"}},
                {"index":{"_index":"articles","_id":"2","status":400,
                  "error":{"type":"mapper_parsing_exception","reason":"failed to parse"}}}
            ]}"#,
        );
        let result = decode_bulk_response(&reply, &ids(&["1", "2"])).unwrap();
        let SubmissionResult::Itemized(outcomes) = result else {
            panic!("expected itemized result");
        };
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].id, "1");
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].status, 400);
        assert!(!outcomes[1].is_success());
    }

    #[test]
    fn missing_item_id_falls_back_to_submitted_id() {
        let reply = reply(200, r#"{"errors":false,"items":[{"index":{"status":201}}]}"#);
        let SubmissionResult::Itemized(outcomes) = decode_bulk_response(&reply, &ids(&["42"])).unwrap()
        else {
            panic!("expected itemized result");
        };
        assert_eq!(outcomes[0].id, "42");
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let html = reply(200, "<html>bad gateway</html>");
        let err = decode_bulk_response(&html, &ids(&["1"])).unwrap_err();
        assert!(matches!(err, PipelineError::ResponseDecode { .. }));

        let gateway = reply(502, "upstream unavailable");
        let err = decode_bulk_response(&gateway, &ids(&["1"])).unwrap_err();
        assert!(matches!(err, PipelineError::ResponseDecode { .. }));
    }

    #[test]
    fn item_count_mismatch_is_a_decode_error() {
        let reply = reply(200, r#"{"errors":false,"items":[{"index":{"_id":"1","status":201}}]}"#);
        let err = decode_bulk_response(&reply, &ids(&["1", "2"])).unwrap_err();
        assert!(matches!(err, PipelineError::ResponseDecode { ref reason, .. } if reason.contains("1 items")));
    }

    #[test]
    fn error_reason_prefers_typed_body() {
        let body = br#"{"error":{"type":"resource_already_exists_exception","reason":"index [articles/x] already exists"},"status":400}"#;
        assert_eq!(
            error_reason(body),
            "resource_already_exists_exception: index [articles/x] already exists"
        );
        assert_eq!(error_reason(b" Forbidden "), "Forbidden");
    }
}
