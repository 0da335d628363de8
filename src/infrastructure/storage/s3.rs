use anyhow::{anyhow, Result};
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tracing::info;

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(endpoint: &str, bucket: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("Connected to S3 (MinIO), bucket '{}'", bucket);

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to get s3://{}/{}: {}", self.bucket, key, e))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("Failed to read body of {}: {}", key, e))?;

        Ok(data.into_bytes().to_vec())
    }

    pub async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to put s3://{}/{}: {}", self.bucket, key, e))?;

        Ok(())
    }

    pub async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to delete s3://{}/{}: {}", self.bucket, key, e))?;

        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow!("Failed to head {}: {}", key, service_err))
                }
            }
        }
    }

    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| anyhow!("Failed to list {}: {}", prefix, e))?;

            for object in resp.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            match resp.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }

    /// Immediate "subdirectory" names under `prefix`, via delimiter listing.
    pub async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));

        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .delimiter("/")
            .send()
            .await
            .map_err(|e| anyhow!("Failed to list {}: {}", prefix, e))?;

        let dirs = resp
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .filter_map(|p| {
                p.strip_prefix(&prefix)
                    .map(|rest| rest.trim_end_matches('/').to_string())
            })
            .filter(|d| !d.is_empty())
            .collect();

        Ok(dirs)
    }

    pub async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        for key in self.list_keys(&prefix).await? {
            self.delete_object(&key).await?;
        }
        Ok(())
    }
}
