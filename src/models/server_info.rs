use semver::Version as Semver;
use serde::{Deserialize, Serialize};

/// Answer of `GET /`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerInfo {
    #[serde(rename = "name")]
    hostname: String,
    #[serde(rename = "cluster_name")]
    name: String,
    #[serde(rename = "cluster_uuid")]
    uuid: Option<String>,
    version: Version,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Version {
    number: String,
    #[serde(default)]
    lucene_version: Option<String>,
}

impl ServerInfo {
    pub fn get_hostname(&self) -> &String {
        &self.hostname
    }
    pub fn get_name(&self) -> &String {
        &self.name
    }
    pub fn get_uuid(&self) -> &Option<String> {
        &self.uuid
    }
    pub fn get_version(&self) -> &String {
        &self.version.number
    }
    pub fn get_lucene_version(&self) -> &Option<String> {
        &self.version.lucene_version
    }

    /// `None` for version strings semver can't parse (e.g. `8.0.0-SNAPSHOT-foo`).
    pub fn get_version_major(&self) -> Option<u64> {
        Semver::parse(&self.version.number)
            .ok()
            .map(|version| version.major)
    }

    /// Mapping types were removed in 7.x; older clusters need `_type` on every action.
    pub fn requires_doc_type(&self) -> bool {
        matches!(self.get_version_major(), Some(major) if major < 7)
    }
}
