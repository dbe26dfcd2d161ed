use std::time::Instant;

use serde_json::json;
use tracing::info;

use crate::audit_builder::{AuditBuilder, What};
use crate::conf::Config;
use crate::error::Result;
use crate::es_client::EsClient;
use crate::models::bulk::BulkQuery;
use crate::models::record::generate_articles;
use crate::pipeline::Pipeline;
use crate::reporter::{summarize, Report};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub debug: bool,
}

/// Generates the configured articles, re-creates the index and bulk loads them.
pub async fn run(config: &Config, options: &RunOptions) -> Result<Report> {
    config.validate()?;
    let endpoint = config.get_endpoint();
    let index = config.get_index();
    let bulk = config.get_bulk();
    let generator = config.get_generator();

    let client = EsClient::from_endpoint(endpoint)?.with_retries(bulk.get_retries());
    let mut audit = match config.get_audit().get_file() {
        Some(path) => AuditBuilder::new(path).await,
        None => AuditBuilder::disabled(),
    };

    let articles = generate_articles(generator.get_count(), generator.get_broken_ids());
    info!("Generated {} articles", articles.len());

    let mut requires_doc_type = false;
    if !options.dry_run {
        if let Some(server_info) = client.print_server_info("Cluster").await {
            requires_doc_type = server_info.requires_doc_type();
        }

        if index.is_recreate() {
            let name = index.get_name();
            let deleted = client.delete_index(name).await?;
            audit
                .record(What::DeleteIndex, None, &json!({ "index": name, "deleted": deleted }).to_string())
                .await;
            info!("Index {} {}", name, if deleted { "deleted" } else { "not found" });

            client
                .create_index(name, index.get_number_of_shards(), index.get_number_of_replicas())
                .await?;
            audit
                .record(What::CreateIndex, None, &json!({ "index": name }).to_string())
                .await;
            info!("Index {} created", name);
        }
    }

    let mut pipeline = Pipeline::new(client, index.get_name(), bulk.get_batch_size())
        .with_query(BulkQuery {
            refresh: bulk.get_refresh().clone(),
            pipeline: bulk.get_pipeline().clone(),
        })
        .with_audit(audit)
        .dry_run(options.dry_run)
        .debug(options.debug);
    if requires_doc_type {
        pipeline = pipeline.with_doc_type("_doc");
    }

    let started = Instant::now();
    let stats = pipeline.run(articles).await?;
    Ok(summarize(&stats, started.elapsed()))
}
