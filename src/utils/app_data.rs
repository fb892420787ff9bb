use crate::error::{Result, SearchError};
use crate::index::hash::{DEFAULT_MAX_KEY_LEN, KeySigning};
use crate::index::types::DEFAULT_BUCKET_COUNT;
use crate::record::extract::DEFAULT_MAX_FIELD_LEN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "trackseek";
const CONFIG_FILE: &str = "config.json";

/// Well-known pipe the front-end writes queries into
pub const DEFAULT_REQUEST_PIPE: &str = "/tmp/ui_to_search_pipe";

/// Well-known pipe the front-end reads answers from
pub const DEFAULT_RESPONSE_PIPE: &str = "/tmp/search_to_ui_pipe";

/// Smallest response buffer accepted; leaves room for at least the head of
/// one result block after the terminator byte.
pub const MIN_RESPONSE_LEN: usize = 64;

/// Search engine configuration.
///
/// Every field has a default, so a partial (or empty) JSON object is valid.
/// The sizes are buffer sizes: one byte of each is reserved for a
/// terminator, matching the front-end and index builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Bucket table + chain nodes
    pub index_path: PathBuf,
    /// Catalogue records (quoted CSV)
    pub dataset_path: PathBuf,
    pub request_pipe: PathBuf,
    pub response_pipe: PathBuf,
    /// Number of buckets the index was built with
    pub bucket_count: usize,
    /// Field separator in requests
    pub separator: char,
    pub max_record_len: usize,
    pub max_field_len: usize,
    pub max_key_len: usize,
    pub max_request_len: usize,
    pub max_response_len: usize,
    pub key_signing: KeySigning,
    /// Cached responses kept by the server (0 disables the cache)
    pub cache_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("spotify.index"),
            dataset_path: PathBuf::from("spotify_data.csv"),
            request_pipe: PathBuf::from(DEFAULT_REQUEST_PIPE),
            response_pipe: PathBuf::from(DEFAULT_RESPONSE_PIPE),
            bucket_count: DEFAULT_BUCKET_COUNT,
            separator: '|',
            max_record_len: 8192,
            max_field_len: DEFAULT_MAX_FIELD_LEN,
            max_key_len: DEFAULT_MAX_KEY_LEN,
            max_request_len: 1024,
            max_response_len: 65536,
            key_signing: KeySigning::Signed,
            cache_size: 0,
        }
    }
}

impl SearchConfig {
    /// Load config from `path`, or from the app config directory when `path`
    /// is `None`. A missing default config file yields the defaults; a
    /// missing explicit one is an error.
    ///
    /// The result is not validated; callers apply their overrides first and
    /// then call [`SearchConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match get_config_path() {
                Some(default_path) if default_path.exists() => Self::from_file(&default_path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(SearchError::InvalidConfig("bucket_count must be positive".to_string()));
        }

        // Buffer sizes include the reserved terminator byte
        let buffers = [
            ("max_record_len", self.max_record_len),
            ("max_field_len", self.max_field_len),
            ("max_key_len", self.max_key_len),
            ("max_request_len", self.max_request_len),
            ("max_response_len", self.max_response_len),
        ];
        for (name, value) in buffers {
            if value < 2 {
                return Err(SearchError::InvalidConfig(format!("{name} is too small: {value}")));
            }
        }
        if self.max_response_len < MIN_RESPONSE_LEN {
            return Err(SearchError::InvalidConfig(format!(
                "max_response_len must be at least {MIN_RESPONSE_LEN}, got {}",
                self.max_response_len
            )));
        }

        if matches!(self.separator, ',' | '"' | '\0') {
            return Err(SearchError::InvalidConfig(format!(
                "separator {:?} clashes with the record or wire format",
                self.separator
            )));
        }
        if self.request_pipe == self.response_pipe {
            return Err(SearchError::InvalidConfig(
                "request and response pipes must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config location: `<config dir>/trackseek/config.json`
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}
