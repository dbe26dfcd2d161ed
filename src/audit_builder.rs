use std::path::Path;

use chrono::Utc;
use serde_json::json;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::warn;

pub enum What {
    DeleteIndex,
    CreateIndex,
    BulkRequest,
    BulkResponseOk,
    BulkResponseErr,
}

impl What {
    pub fn as_str(&self) -> &'static str {
        match self {
            What::DeleteIndex => "DeleteIndex",
            What::CreateIndex => "CreateIndex",
            What::BulkRequest => "BulkRequest",
            What::BulkResponseOk => "BulkResponseOk",
            What::BulkResponseErr => "BulkResponseErr",
        }
    }
}

/// Append-only NDJSON audit file. Never fails the run: a file that can't be
/// opened or written is reported once and then ignored.
pub struct AuditBuilder {
    file_handler: Option<File>,
}

impl AuditBuilder {
    pub async fn new(file_name: &Path) -> Self {
        if let Some(parent) = file_name.parent() {
            let _ = fs::create_dir_all(parent).await;
        }

        let file_handler = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_name)
            .await
        {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Audit file {:?} disabled: {}", file_name, e);
                None
            }
        };

        Self { file_handler }
    }

    pub fn disabled() -> Self {
        Self { file_handler: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.file_handler.is_some()
    }

    pub async fn record(&mut self, what: What, batch: Option<usize>, body: &str) {
        if self.file_handler.is_none() {
            return;
        }
        let line = json!({
            "ts": Utc::now().to_rfc3339(),
            "what": what.as_str(),
            "batch": batch,
            "body": body,
        })
        .to_string();
        if let Err(e) = self.append_to_file(&line).await {
            warn!("Audit write failed, disabling audit: {}", e);
            self.file_handler = None;
        }
    }

    async fn append_to_file(&mut self, data: &str) -> std::io::Result<()> {
        if let Some(file) = self.file_handler.as_mut() {
            file.write_all(data.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await?;
        }
        Ok(())
    }
}
