use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use super::{storage_key, FileStore, StorageError, StoredObject};
use crate::config::StorageConfig;

/// S3 (or MinIO) backed file store.
///
/// Built even when credentials are absent so the server can start; every
/// request then fails with `StorageError::NotConfigured`.
pub struct S3FileStore {
    inner: Result<Configured, &'static str>,
}

struct Configured {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3FileStore {
    pub async fn from_config(config: &StorageConfig) -> Self {
        let inner = match (
            &config.access_key_id,
            &config.secret_access_key,
            &config.bucket,
        ) {
            (None, _, _) => Err("AWS_ACCESS_KEY_ID"),
            (_, None, _) => Err("AWS_SECRET_ACCESS_KEY"),
            (_, _, None) => Err("S3_BUCKET"),
            (Some(access_key), Some(secret_key), Some(bucket)) => Ok(Configured {
                client: build_client(config, access_key, secret_key).await,
                bucket: bucket.clone(),
            }),
        };

        match &inner {
            Ok(c) => info!("S3 client initialized (bucket: {})", c.bucket),
            Err(missing) => info!("S3 client not configured ({missing} missing); uploads disabled"),
        }

        Self { inner }
    }

    fn configured(&self) -> Result<&Configured, StorageError> {
        self.inner
            .as_ref()
            .map_err(|missing| StorageError::NotConfigured(*missing))
    }
}

/// Constructs an S3 client configured for MinIO (custom endpoint) or AWS.
async fn build_client(
    config: &StorageConfig,
    access_key: &str,
    secret_key: &str,
) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(access_key, secret_key, None, None, "intake-static");

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    // Path-style addressing keeps MinIO happy; AWS accepts it too.
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.endpoint.is_some())
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn put(
        &self,
        logical_name: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        let s3 = self.configured()?;
        let key = storage_key(logical_name)?;
        let size = bytes.len();

        s3.client
            .put_object()
            .bucket(&s3.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .set_content_type(content_type.map(str::to_owned))
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(e).to_string()))?;

        info!("Uploaded {size} bytes to s3://{}/{}", s3.bucket, key);
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let s3 = self.configured()?;

        let output = s3
            .client
            .get_object()
            .bucket(&s3.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(DisplayErrorContext(service_error).to_string())
                }
            })?;

        let content_type = output.content_type().map(str::to_owned);
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("reading object body failed: {e}")))?
            .into_bytes();

        Ok(StoredObject {
            key: key.to_string(),
            bytes,
            content_type,
        })
    }
}
