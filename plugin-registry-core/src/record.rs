use serde::{Deserialize, Serialize};

/// Manifest file as declared by a plugin author inside its domain folder.
///
/// Only the fields the registry consumes are modeled; unknown keys are
/// ignored at parse time. Every field is optional so that validation can
/// report a precise mismatch instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    pub domain: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub zip_filename: Option<String>,
}

/// Manifest-derived fields carried into the published record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_filename: Option<String>,
}

impl From<&Manifest> for ManifestInfo {
    fn from(manifest: &Manifest) -> Self {
        Self {
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            version: manifest.version.clone(),
            zip_filename: manifest.zip_filename.clone(),
        }
    }
}

/// One resolved plugin, as persisted in `data.json`.
///
/// Field declaration order is the serialization order and is a hard output
/// contract: `manifest` and `domain` first, the remainder alphabetical, so
/// that successive snapshots diff cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRecord {
    pub manifest: ManifestInfo,
    pub domain: String,
    pub etag_release: Option<String>,
    pub etag_repository: Option<String>,
    pub last_fetched: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_prerelease: Option<String>,
    pub last_updated: Option<String>,
    pub last_version: Option<String>,
    pub open_issues: u64,
    pub repository: String,
    pub stargazers_count: u64,
    pub topics: Vec<String>,
}
