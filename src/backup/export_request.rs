// dgraph-backup/src/backup/export_request.rs
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{info, warn};
use url::Url;

use crate::config::{ExportFormat, ExportSettings};
use crate::errors::PipelineError;

/// Text the export endpoint includes in its body when it accepts an export.
pub const EXPORT_SUCCESS_MARKER: &str = "Success";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Success,
    Failure(String),
}

/// True only if `body` contains the exact, case-sensitive success marker.
pub fn is_export_success(body: &str) -> bool {
    body.contains(EXPORT_SUCCESS_MARKER)
}

/// Interprets the synchronous acknowledgement of an export request. Only a
/// 200 whose body carries the success marker counts as accepted.
pub fn interpret_response(status: StatusCode, body: &str) -> ExportOutcome {
    if status != StatusCode::OK {
        return ExportOutcome::Failure(format!("unexpected HTTP status {}", status));
    }
    if is_export_success(body) {
        ExportOutcome::Success
    } else {
        ExportOutcome::Failure(format!("response did not report success: {}", body.trim()))
    }
}

/// `<host>/admin/export?format=<format>`
pub fn export_url(host: &Url, format: ExportFormat) -> anyhow::Result<Url> {
    let mut url = host.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("dgraph-host cannot be used as a base URL: {}", host))?
        .pop_if_empty()
        .push("admin")
        .push("export");
    url.query_pairs_mut()
        .clear()
        .append_pair("format", format.as_str());
    Ok(url)
}

/// Asks the database to start an export. Acceptance is reported, not
/// completion; the caller observes completion separately.
#[async_trait]
pub trait ExportTrigger: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn request_export(&self) -> Result<ExportOutcome, PipelineError>;
}

pub struct HttpExportTrigger {
    client: reqwest::Client,
    url: Url,
}

impl HttpExportTrigger {
    pub fn new(settings: &ExportSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: export_url(&settings.dgraph_host, settings.format)?,
        })
    }
}

#[async_trait]
impl ExportTrigger for HttpExportTrigger {
    fn endpoint(&self) -> &str {
        self.url.as_str()
    }

    async fn request_export(&self) -> Result<ExportOutcome, PipelineError> {
        info!(url = %self.url, "Requesting export");
        let transport = |source| PipelineError::ExportTransport {
            url: self.url.to_string(),
            source,
        };

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        let outcome = interpret_response(status, &body);
        match &outcome {
            ExportOutcome::Success => info!("Data export accepted"),
            ExportOutcome::Failure(reason) => warn!(%status, "Export not accepted: {}", reason),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn settings_for(host: &str, format: ExportFormat) -> ExportSettings {
        ExportSettings {
            dgraph_host: Url::parse(host).unwrap(),
            format,
            export_path: PathBuf::from("./export"),
            archive_dir: PathBuf::from("."),
            file_prefix: "dgraph-backup".to_string(),
            hostname: "node1".to_string(),
            http_timeout: Duration::from_secs(5),
        }
    }

    /// Serves one canned HTTP response and hands back the request line.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_success_detection_is_exact() {
        assert!(is_export_success(r#"{"code": "Success", "message": "Export completed."}"#));
        assert!(!is_export_success(""));
        assert!(!is_export_success("success"));
        assert!(!is_export_success("SUCCESS"));
        assert!(!is_export_success("{not json"));
    }

    #[test]
    fn test_non_200_is_failure_even_with_marker() {
        let outcome = interpret_response(StatusCode::INTERNAL_SERVER_ERROR, "Success");
        assert!(matches!(outcome, ExportOutcome::Failure(_)));
        assert_eq!(interpret_response(StatusCode::OK, "Success"), ExportOutcome::Success);
    }

    #[test]
    fn test_export_url_shape() -> anyhow::Result<()> {
        let host = Url::parse("http://localhost:8080")?;
        assert_eq!(
            export_url(&host, ExportFormat::Rdf)?.as_str(),
            "http://localhost:8080/admin/export?format=rdf"
        );
        let nested = Url::parse("https://db.internal/dgraph/")?;
        assert_eq!(
            export_url(&nested, ExportFormat::Json)?.as_str(),
            "https://db.internal/dgraph/admin/export?format=json"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_request_export_reads_marker_from_body() -> anyhow::Result<()> {
        let (host, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"code": "Success", "message": "Export completed."}"#,
        )
        .await;
        let trigger = HttpExportTrigger::new(&settings_for(&host, ExportFormat::Rdf))?;

        let outcome = trigger.request_export().await?;
        assert_eq!(outcome, ExportOutcome::Success);
        assert_eq!(server.await?, "GET /admin/export?format=rdf HTTP/1.1");
        Ok(())
    }

    #[tokio::test]
    async fn test_request_export_without_marker_is_failure() -> anyhow::Result<()> {
        let (host, server) = serve_once("HTTP/1.1 200 OK", r#"{"errors": ["busy"]}"#).await;
        let trigger = HttpExportTrigger::new(&settings_for(&host, ExportFormat::Json))?;

        let outcome = trigger.request_export().await?;
        assert!(matches!(outcome, ExportOutcome::Failure(_)));
        server.await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let trigger =
            HttpExportTrigger::new(&settings_for(&format!("http://{}", addr), ExportFormat::Json))?;
        let err = trigger.request_export().await.unwrap_err();
        assert!(matches!(err, PipelineError::ExportTransport { .. }));
        Ok(())
    }
}
