//! Object storage for uploaded media and generated documents.
//!
//! Two backends: a local filesystem store for development and tests,
//! and an S3-compatible store speaking SigV4 (AWS S3, MinIO).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Object store returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage misconfigured: {0}")]
    Config(String),
}

/// Minimal object-store surface the application needs
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
    /// Public URL for the object, if the backend exposes one
    fn public_url(&self, key: &str) -> Option<String>;
}

/// Builds the configured backend
pub fn from_config(cfg: &StorageConfig) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match cfg.backend.to_ascii_lowercase().as_str() {
        "local" => Ok(Arc::new(LocalStorage::new(&cfg.local_root))),
        "s3" => {
            let bucket = cfg
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::Config("s3_bucket is required".into()))?;
            let region = cfg
                .s3_region
                .clone()
                .ok_or_else(|| StorageError::Config("s3_region is required".into()))?;
            let access_key = cfg
                .s3_access_key
                .clone()
                .ok_or_else(|| StorageError::Config("s3_access_key is required".into()))?;
            let secret_key = cfg
                .s3_secret_key
                .clone()
                .ok_or_else(|| StorageError::Config("s3_secret_key is required".into()))?;
            Ok(Arc::new(S3Storage::new(
                bucket,
                region,
                cfg.s3_endpoint.clone(),
                access_key,
                secret_key,
            )))
        }
        other => Err(StorageError::Config(format!(
            "unknown storage backend '{}'",
            other
        ))),
    }
}

/// Keys are relative paths like `products/<uuid>.png`. Reject anything
/// that could escape the root.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.len() > 512 {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    let path = Path::new(key);
    if path.is_absolute() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(StorageError::InvalidKey(key.to_string())),
        }
    }
    Ok(())
}

/// Filesystem-backed store rooted at a configurable directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(key = %key, "stored object locally");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> Option<String> {
        // Served by the application itself under /uploads
        Some(format!("/uploads/{}", key))
    }
}

/// S3-compatible store using SigV4 request signing over plain HTTP(S)
#[derive(Clone)]
pub struct S3Storage {
    bucket: String,
    region: String,
    endpoint: Option<String>,
    access_key: String,
    secret_key: String,
    client: reqwest::Client,
}

impl S3Storage {
    pub fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key: String,
        secret_key: String,
    ) -> Self {
        Self {
            bucket,
            region,
            endpoint,
            access_key,
            secret_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
        }
    }

    /// (url, host, canonical_uri) for a key. Custom endpoints use
    /// path-style addressing; AWS proper uses virtual-hosted style.
    fn object_url(&self, key: &str) -> (String, String, String) {
        let encoded = uri_encode_path(key);
        match &self.endpoint {
            Some(endpoint) => {
                let trimmed = endpoint.trim_end_matches('/');
                let host = trimmed
                    .trim_start_matches("http://")
                    .trim_start_matches("https://")
                    .to_string();
                let canonical_uri = format!("/{}/{}", self.bucket, encoded);
                (format!("{}{}", trimmed, canonical_uri), host, canonical_uri)
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", self.bucket, self.region);
                let canonical_uri = format!("/{}", encoded);
                (format!("https://{}{}", host, canonical_uri), host, canonical_uri)
            }
        }
    }

    /// SigV4 headers for a request with no query string
    fn signing_headers(
        &self,
        method: &str,
        host: &str,
        canonical_uri: &str,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let canonical_request = format!(
            "{method}\n{canonical_uri}\n\nhost:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n\nhost;x-amz-content-sha256;x-amz-date\n{payload_hash}"
        );

        let scope = format!("{}/{}/s3/aws4_request", date, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let k_date = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), date.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"s3");
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature={}",
            self.access_key, scope, signature
        );

        vec![
            ("x-amz-date".to_string(), amz_date),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("authorization".to_string(), authorization),
        ]
    }

    async fn send(
        &self,
        method: reqwest::Method,
        key: &str,
        body: Option<(Vec<u8>, &str)>,
    ) -> Result<reqwest::Response, StorageError> {
        validate_key(key)?;
        let (url, host, canonical_uri) = self.object_url(key);
        let payload_hash = match &body {
            Some((bytes, _)) => hex::encode(Sha256::digest(bytes)),
            None => hex::encode(Sha256::digest(b"")),
        };

        let headers =
            self.signing_headers(method.as_str(), &host, &canonical_uri, &payload_hash, Utc::now());

        let mut request = self.client.request(method, &url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some((bytes, content_type)) = body {
            request = request.header("content-type", content_type).body(bytes);
        }

        Ok(request.send().await?)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let response = self
            .send(reqwest::Method::PUT, key, Some((bytes, content_type)))
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream { status, body });
        }
        debug!(key = %key, bucket = %self.bucket, "stored object in s3");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.send(reqwest::Method::GET, key, None).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream { status, body });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self.send(reqwest::Method::DELETE, key, None).await?;
        // S3 DELETE is idempotent and returns 204 for unknown keys
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream { status, body });
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> Option<String> {
        let (url, _, _) = self.object_url(key);
        Some(url)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encode a key for use as a URI path. '/' separates segments
/// and stays literal; everything outside the unreserved set is encoded.
fn uri_encode_path(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_storage_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .put("products/test.png", b"fake image".to_vec(), "image/png")
            .await
            .unwrap();
        let bytes = storage.get("products/test.png").await.unwrap();
        assert_eq!(bytes, b"fake image");

        storage.delete("products/test.png").await.unwrap();
        assert!(matches!(
            storage.get("products/test.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_ok() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.delete("never/stored.bin").await.is_ok());
    }

    #[test]
    fn traversal_keys_are_rejected() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("products/7f3a.png").is_ok());
    }

    #[test]
    fn key_encoding_leaves_segments_intact() {
        assert_eq!(uri_encode_path("a/b-c_d.e"), "a/b-c_d.e");
        assert_eq!(uri_encode_path("a b"), "a%20b");
    }

    #[test]
    fn signing_headers_have_sigv4_shape() {
        let storage = S3Storage::new(
            "media".into(),
            "eu-central-1".into(),
            None,
            "AKIAEXAMPLE".into(),
            "secret".into(),
        );
        let now = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let payload_hash = hex::encode(Sha256::digest(b""));
        let headers = storage.signing_headers(
            "GET",
            "media.s3.eu-central-1.amazonaws.com",
            "/some/key.png",
            &payload_hash,
            now,
        );

        let amz_date = &headers.iter().find(|(n, _)| n == "x-amz-date").unwrap().1;
        assert_eq!(amz_date, "20250301T120000Z");

        let auth = &headers.iter().find(|(n, _)| n == "authorization").unwrap().1;
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20250301/eu-central-1/s3/aws4_request"));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        assert!(auth.contains("Signature="));
    }

    #[test]
    fn custom_endpoint_uses_path_style() {
        let storage = S3Storage::new(
            "media".into(),
            "us-east-1".into(),
            Some("http://localhost:9000".into()),
            "minio".into(),
            "minio123".into(),
        );
        let (url, host, canonical_uri) = storage.object_url("products/x.png");
        assert_eq!(url, "http://localhost:9000/media/products/x.png");
        assert_eq!(host, "localhost:9000");
        assert_eq!(canonical_uri, "/media/products/x.png");
    }
}
