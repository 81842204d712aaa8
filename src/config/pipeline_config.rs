use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;

/// Pipeline configuration: the object store holding both raw prefixes and
/// the warehouse output, plus the input/output locations themselves.
/// Credentials never live in the file; they are pulled from environment
/// variables whose names the file may override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub store: StoreSection,
    pub input: InputSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    pub endpoint: String,
    pub bucket_name: String,
    pub region: Option<String>,
    pub path_style: Option<bool>,
    pub env_access_key: Option<String>,
    pub env_secret_key: Option<String>,
    #[serde(skip)]
    access_key: Option<String>,
    #[serde(skip)]
    secret_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSection {
    /// Prefix holding song metadata records.
    pub song_prefix: String,
    /// Prefix holding listening-event log records, partitioned by date in
    /// the path structure.
    pub log_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Prefix under which the five warehouse tables are written.
    pub prefix: String,
}

impl PipelineConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;

        let mut config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;

        config.store.load_credentials()?;

        Ok(config)
    }
}

impl StoreSection {
    pub fn load_credentials(&mut self) -> Result<()> {
        let access_key_var = self
            .env_access_key
            .as_deref()
            .unwrap_or("WAREHOUSE_ACCESS_KEY");
        let secret_key_var = self
            .env_secret_key
            .as_deref()
            .unwrap_or("WAREHOUSE_SECRET_KEY");

        self.access_key = env::var(access_key_var)
            .with_context(|| format!("Missing environment variable: {}", access_key_var))?
            .into();

        self.secret_key = env::var(secret_key_var)
            .with_context(|| format!("Missing environment variable: {}", secret_key_var))?
            .into();

        Ok(())
    }

    pub fn access_key(&self) -> Result<&str> {
        self.access_key
            .as_deref()
            .ok_or_else(|| anyhow!("Access key not loaded"))
    }

    pub fn secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| anyhow!("Secret key not loaded"))
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or("us-east-1")
    }

    pub fn is_path_style(&self) -> bool {
        self.path_style.unwrap_or(true)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(anyhow!("Store endpoint cannot be empty"));
        }

        if self.bucket_name.is_empty() {
            return Err(anyhow!("Store bucket name cannot be empty"));
        }

        if self.access_key.is_none() {
            return Err(anyhow!("Store access key not loaded"));
        }

        if self.secret_key.is_none() {
            return Err(anyhow!("Store secret key not loaded"));
        }

        Ok(())
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            bucket_name: "songplay-warehouse".to_string(),
            region: Some("us-east-1".to_string()),
            path_style: Some(true),
            env_access_key: None,
            env_secret_key: None,
            access_key: None,
            secret_key: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store: StoreSection::default(),
            input: InputSection {
                song_prefix: "song_data/".to_string(),
                log_prefix: "log_data/".to_string(),
            },
            output: OutputSection {
                prefix: "warehouse/".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.store.endpoint, "http://localhost:9000");
        assert_eq!(config.store.region(), "us-east-1");
        assert!(config.store.is_path_style());
        assert_eq!(config.input.song_prefix, "song_data/");
        assert_eq!(config.output.prefix, "warehouse/");
    }

    #[test]
    fn test_credentials_loading() {
        unsafe {
            env::set_var("TEST_WAREHOUSE_ACCESS_KEY", "test_access");
            env::set_var("TEST_WAREHOUSE_SECRET_KEY", "test_secret");
        }

        let mut store = StoreSection::default();
        store.env_access_key = Some("TEST_WAREHOUSE_ACCESS_KEY".to_string());
        store.env_secret_key = Some("TEST_WAREHOUSE_SECRET_KEY".to_string());

        let result = store.load_credentials();
        assert!(result.is_ok());
        assert_eq!(store.access_key().unwrap(), "test_access");
        assert_eq!(store.secret_key().unwrap(), "test_secret");
        assert!(store.validate().is_ok());

        unsafe {
            env::remove_var("TEST_WAREHOUSE_ACCESS_KEY");
            env::remove_var("TEST_WAREHOUSE_SECRET_KEY");
        }
    }

    #[test]
    fn test_validation_rejects_missing_credentials() {
        let store = StoreSection::default();
        assert!(store.validate().is_err());
    }

    #[test]
    fn test_config_toml_parsing() {
        let toml_str = r#"
            [store]
            endpoint = "http://localhost:9000"
            bucket_name = "warehouse"

            [input]
            song_prefix = "song_data/"
            log_prefix = "log_data/2018/11/"

            [output]
            prefix = "warehouse/"
        "#;

        let config: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.bucket_name, "warehouse");
        assert_eq!(config.input.log_prefix, "log_data/2018/11/");
    }
}
