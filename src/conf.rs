use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use twelf::{config, Layer};

use crate::error::PipelineError;

pub const DEFAULT_URL: &str = "http://localhost:9200";
pub const DEFAULT_INDEX_NAME: &str = "articles";
pub const DEFAULT_BATCH_SIZE: usize = 75;
pub const DEFAULT_COUNT: u64 = 1000;
const REDACTED_VALUE: &str = "***";

#[config]
#[derive(Debug, Default)]
pub struct Config {
    endpoint: Option<Endpoint>,
    index: Option<Index>,
    bulk: Option<Bulk>,
    generator: Option<Generator>,
    audit: Option<Audit>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Endpoint {
    #[serde(default = "default_url")]
    url: String,
    #[serde(default)]
    basic_auth: Option<BasicAuth>,
    #[serde(default)]
    root_certificates: Option<PathBuf>,
    #[serde(default)]
    insecure: bool,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct BasicAuth {
    username: String,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Index {
    #[serde(default = "default_index_name")]
    name: String,
    #[serde(default = "default_true")]
    recreate: bool,
    #[serde(default)]
    number_of_shards: Option<u64>,
    #[serde(default)]
    number_of_replicas: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Bulk {
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default)]
    retries: usize,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    pipeline: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Generator {
    #[serde(default = "default_count")]
    count: u64,
    #[serde(default)]
    broken_ids: Vec<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Audit {
    #[serde(default)]
    file: Option<PathBuf>,
}

fn default_url() -> String {
    std::env::var("ELASTICSEARCH_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_URL.to_string())
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_count() -> u64 {
    DEFAULT_COUNT
}

fn default_true() -> bool {
    true
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: default_url(),
            basic_auth: None,
            root_certificates: None,
            insecure: false,
            timeout_seconds: None,
        }
    }
}

impl Default for Index {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            recreate: true,
            number_of_shards: None,
            number_of_replicas: None,
        }
    }
}

impl Default for Bulk {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retries: 0,
            refresh: None,
            pipeline: None,
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            broken_ids: vec![],
        }
    }
}

impl Config {
    /// Loads the config file, TOML unless the extension says JSON.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let layer = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Layer::Json(path.to_path_buf()),
            _ => Layer::Toml(path.to_path_buf()),
        };
        Config::with_layers(&[layer])
            .map_err(|e| PipelineError::Config(format!("cannot load {:?}: {}", path, e)))
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.get_bulk().get_batch_size() == 0 {
            return Err(PipelineError::Config(
                "bulk.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.get_index().get_name().trim().is_empty() {
            return Err(PipelineError::Config(
                "index.name must not be empty".to_string(),
            ));
        }
        if self.get_endpoint().get_url().trim().is_empty() {
            return Err(PipelineError::Config(
                "endpoint.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_endpoint(&self) -> Endpoint {
        self.endpoint.clone().unwrap_or_default()
    }
    pub fn get_index(&self) -> Index {
        self.index.clone().unwrap_or_default()
    }
    pub fn get_bulk(&self) -> Bulk {
        self.bulk.clone().unwrap_or_default()
    }
    pub fn get_generator(&self) -> Generator {
        self.generator.clone().unwrap_or_default()
    }
    pub fn get_audit(&self) -> Audit {
        self.audit.clone().unwrap_or_default()
    }

    pub fn set_url(&mut self, url: String) {
        let mut endpoint = self.get_endpoint();
        endpoint.url = url;
        self.endpoint = Some(endpoint);
    }
    pub fn set_index_name(&mut self, name: String) {
        let mut index = self.get_index();
        index.name = name;
        self.index = Some(index);
    }
    pub fn set_batch_size(&mut self, batch_size: usize) {
        let mut bulk = self.get_bulk();
        bulk.batch_size = batch_size;
        self.bulk = Some(bulk);
    }
    pub fn set_count(&mut self, count: u64) {
        let mut generator = self.get_generator();
        generator.count = count;
        self.generator = Some(generator);
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED_VALUE))
            .finish()
    }
}

impl BasicAuth {
    pub fn new(username: String, password: Option<String>) -> Self {
        Self { username, password }
    }
    pub fn get_username(&self) -> &String {
        &self.username
    }
    pub fn get_password(&self) -> &Option<String> {
        &self.password
    }
}

impl Endpoint {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
    pub fn with_basic_auth(mut self, basic_auth: BasicAuth) -> Self {
        self.basic_auth = Some(basic_auth);
        self
    }
    pub fn get_url(&self) -> &String {
        &self.url
    }
    pub fn get_root_certificates(&self) -> &Option<PathBuf> {
        &self.root_certificates
    }
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }
    pub fn get_timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }
    pub fn has_basic_auth(&self) -> bool {
        self.basic_auth.is_some()
    }
    pub fn get_username(&self) -> String {
        if let Some(basic_auth) = &self.basic_auth {
            basic_auth.get_username().clone()
        } else {
            String::default()
        }
    }
    pub fn get_password(&self) -> Option<String> {
        if let Some(basic_auth) = &self.basic_auth {
            return basic_auth.get_password().clone();
        }
        None
    }
}

impl Index {
    pub fn get_name(&self) -> &String {
        &self.name
    }
    pub fn is_recreate(&self) -> bool {
        self.recreate
    }
    pub fn get_number_of_shards(&self) -> Option<u64> {
        self.number_of_shards
    }
    pub fn get_number_of_replicas(&self) -> Option<u64> {
        self.number_of_replicas
    }
}

impl Bulk {
    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }
    pub fn get_retries(&self) -> usize {
        self.retries
    }
    pub fn get_refresh(&self) -> &Option<String> {
        &self.refresh
    }
    pub fn get_pipeline(&self) -> &Option<String> {
        &self.pipeline
    }
}

impl Generator {
    pub fn get_count(&self) -> u64 {
        self.count
    }
    pub fn get_broken_ids(&self) -> &Vec<u64> {
        &self.broken_ids
    }
}

impl Audit {
    pub fn get_file(&self) -> &Option<PathBuf> {
        &self.file
    }
}
