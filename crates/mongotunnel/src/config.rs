//! Configuration loading

use std::path::Path;

use anyhow::{Context, Result};
use mongotunnel_common::config::Config;

/// Load configuration from file, or defaults when the file does not exist
pub async fn load(path: &Path) -> Result<Config> {
    Config::load_or_default(path)
        .await
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_broken_file_names_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[proxy").unwrap();

        let err = load(file.path()).await.unwrap_err();
        assert!(format!("{err}").contains(&file.path().display().to_string()));
    }
}
