use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};

use super::{config::StorageConfig, ObjectStore};

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(config: StorageConfig) -> Self {
        debug!(endpoint = ?config.endpoint, region = %config.region, "Initializing object store");

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "battlelog-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Object store client initialized for bucket: {}", config.bucket);

        Self {
            client,
            bucket: config.bucket,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        debug!("Downloading s3://{}/{}", self.bucket, key);

        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(service_error)
                    .with_context(|| format!("Failed to download from S3: {}", key));
            },
        };

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, key);
        Ok(Some(data))
    }

    #[instrument(skip(self, body))]
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        debug!("Uploading {} bytes to s3://{}/{}", body.len(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("Failed to upload to S3: {}", key))?;

        info!("Successfully uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
