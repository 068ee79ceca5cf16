//! Parsing helpers for the structured text formats flightdeck reads.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Structured text formats understood by [`load_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Pick a format from a file extension.
    ///
    /// Files without an extension are treated as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

        match extension.as_deref() {
            None | Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some(other) => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: other.to_string(),
            }),
        }
    }
}

/// Read a whole file into a string.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::file_read_failed(path, e.to_string()))
}

/// Parse a JSON document.
pub fn parse_json<T: DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input).map_err(|e| Error::json_parse_failed(e.to_string()))
}

/// Parse a YAML document.
pub fn parse_yaml<T: DeserializeOwned>(input: &str) -> Result<T> {
    serde_yaml::from_str(input).map_err(|e| Error::yaml_parse_failed(e.to_string()))
}

/// Parse a TOML document.
pub fn parse_toml<T: DeserializeOwned>(input: &str) -> Result<T> {
    toml::from_str(input).map_err(|e| Error::toml_parse_failed(e.to_string()))
}

/// Parse `input` as the given format.
pub fn parse_as<T: DeserializeOwned>(format: Format, input: &str) -> Result<T> {
    match format {
        Format::Json => parse_json(input),
        Format::Yaml => parse_yaml(input),
        Format::Toml => parse_toml(input),
    }
}

/// Read and parse a file, choosing the format from its extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = Format::from_path(path)?;
    let contents = read_to_string(path)?;
    tracing::debug!(path = %path.display(), ?format, "Loading file");
    parse_as(format, &contents)
}
