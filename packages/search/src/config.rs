//! Loading [`SearchConfig`] from TOML files.

use std::path::{Path, PathBuf};

use geosearch_search_models::SearchConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "GEOSEARCH_CONFIG";

/// Configuration file used when [`CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "geosearch.toml";

/// Errors from loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid configuration.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The configuration path from [`CONFIG_ENV_VAR`], or
/// [`DEFAULT_CONFIG_PATH`].
#[must_use]
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Reads and parses the configuration at `path`.
///
/// # Errors
///
/// * If the file cannot be read
/// * If the contents are not a valid configuration
pub fn load_config(path: impl AsRef<Path>) -> Result<SearchConfig, ConfigError> {
    let path = path.as_ref();
    log::debug!("Loading search config from {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Toml`] if the text is not a valid configuration.
pub fn parse_config(contents: &str) -> Result<SearchConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use geosearch_search_models::BackendConfig;

    use super::*;

    #[test]
    fn parses_backend_table() {
        let config = parse_config(
            r#"
            languages = ["en", "de", "fr"]
            default_language = "de"

            [backend]
            type = "open_search"
            base_url = "http://localhost:9200"
            index = "photon"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_language, "de");
        assert!(matches!(
            config.backend,
            BackendConfig::OpenSearch { ref index, .. } if index == "photon"
        ));
    }

    #[test]
    fn missing_backend_is_an_error() {
        assert!(matches!(
            parse_config("languages = [\"en\"]"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_backend_type_is_an_error() {
        assert!(matches!(
            parse_config("[backend]\ntype = \"solr\"\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("geosearch_missing_config.toml");
        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "geosearch_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[backend]\ntype = \"tantivy\"\nindex_dir = \"data/place_index\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            config.backend,
            BackendConfig::Tantivy { ref index_dir, .. } if index_dir == "data/place_index"
        ));
    }
}
