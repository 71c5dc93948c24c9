use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::models::UploadedMedia;

/// StorageService
///
/// Contract for the object-storage collaborator: presigned uploads and
/// resolution of an uploaded key into a playable URL. The real S3 client and
/// the test mock are swapped behind `Arc<dyn StorageService>`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in `Env::Local` to provision MinIO.
    async fn ensure_bucket_exists(&self);

    /// Generates a short-lived signed PUT URL for `key`, constrained to `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;

    /// Confirms `key` was uploaded and returns its public URL and duration
    /// (object metadata `duration`, seconds; 0 when absent).
    async fn resolve_upload(&self, key: &str) -> Result<UploadedMedia, String>;
}

/// S3StorageClient
///
/// AWS SDK client talking to MinIO locally and Supabase Storage in production.
/// Path-style addressing is required by both.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent, so this is safe to call at every startup.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        // Uploads must start within 10 minutes.
        let presigning = PresigningConfig::expires_in(Duration::from_secs(600))
            .map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }

    async fn resolve_upload(&self, key: &str) -> Result<UploadedMedia, String> {
        let key = sanitize_key(key);
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| format!("object '{}' is not available: {}", key, e))?;

        let duration = head
            .metadata()
            .and_then(|meta| meta.get("duration"))
            .and_then(|raw| raw.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(UploadedMedia {
            url: format!("{}/{}/{}", self.endpoint, self.bucket_name, key),
            duration,
        })
    }
}

/// sanitize_key
///
/// Drops `..`, `.` and empty segments from a client-supplied object key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-process stand-in for tests. Every resolved upload reports `duration`.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    pub duration: f64,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            duration: 42.5,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            duration: 0.0,
        }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }

    async fn resolve_upload(&self, key: &str) -> Result<UploadedMedia, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(UploadedMedia {
            url: format!("http://localhost:9000/mock-bucket/{}", sanitize_key(key)),
            duration: self.duration,
        })
    }
}

/// StorageState
///
/// Shared handle to the storage service held by the application state.
pub type StorageState = Arc<dyn StorageService>;
