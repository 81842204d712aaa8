use anyhow::{Result, anyhow};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use tracing::info;

use crate::config::StoreSection;

/// S3/MinIO-backed object store holding both the raw record prefixes and
/// the warehouse output.
pub struct ObjectStore {
    bucket: Bucket,
}

impl ObjectStore {
    pub fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket_name: &str,
    ) -> Result<Self> {
        let region = Region::Custom {
            region: "us-east-1".to_owned(),
            endpoint: endpoint.to_owned(),
        };

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)?;

        let bucket = Bucket::new(bucket_name, region, credentials)?;

        // Path-style access, required for MinIO
        let bucket = *bucket.with_path_style();

        Ok(ObjectStore { bucket })
    }

    pub fn from_config(config: &StoreSection) -> Result<Self> {
        config.validate()?;

        let region = Region::Custom {
            region: config.region().to_owned(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = Credentials::new(
            Some(config.access_key()?),
            Some(config.secret_key()?),
            None,
            None,
            None,
        )?;

        let bucket = Bucket::new(&config.bucket_name, region, credentials)?;

        let bucket = if config.is_path_style() {
            *bucket.with_path_style()
        } else {
            *bucket
        };

        Ok(ObjectStore { bucket })
    }

    pub async fn ensure_bucket(&self) -> Result<()> {
        match self.bucket.exists().await {
            Ok(true) => {
                info!("Bucket '{}' already exists", self.bucket.name);
            }
            Ok(false) => {
                let config = s3::BucketConfiguration::default();
                let response = s3::Bucket::create(
                    &self.bucket.name,
                    self.bucket.region.clone(),
                    self.bucket.credentials().await?,
                    config,
                )
                .await;
                match response {
                    Ok(_) => {
                        info!("Created bucket: {}", self.bucket.name);
                    }
                    Err(e) => {
                        return Err(anyhow!("Failed to create bucket: {}", e));
                    }
                }
            }
            Err(e) => {
                return Err(anyhow!("Failed to check bucket existence: {}", e));
            }
        }
        Ok(())
    }

    /// All `.json` object keys under a prefix, in ascending key order so
    /// every run stages records in the same sequence.
    pub async fn list_json_objects(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_objects_with_suffix(prefix, ".json").await
    }

    /// All `.parquet` object keys under a prefix (every partition of one
    /// table), in ascending key order.
    pub async fn list_parquet_objects(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_objects_with_suffix(prefix, ".parquet").await
    }

    async fn list_objects_with_suffix(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        let list = self.bucket.list(prefix.to_string(), None).await?;

        let mut keys = Vec::new();
        for result in list {
            for object in result.contents {
                if object.key.ends_with(suffix) {
                    keys.push(object.key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self.bucket.get_object(key).await?;

        if response.status_code() == 200 {
            Ok(response.bytes().to_vec())
        } else {
            Err(anyhow!(
                "Failed to get object {}: HTTP {}",
                key,
                response.status_code()
            ))
        }
    }

    pub async fn get_text(&self, key: &str) -> Result<String> {
        let bytes = self.get_object(key).await?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Object {} is not valid UTF-8: {}", key, e))
    }

    pub async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let response = self.bucket.put_object(key, data).await?;

        if response.status_code() == 200 {
            Ok(())
        } else {
            Err(anyhow!(
                "Failed to store object {}: HTTP {}",
                key,
                response.status_code()
            ))
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket.name
    }
}
