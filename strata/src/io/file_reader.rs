// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Readers for the locations a loader configuration may point at.
//!
//! Model topology and weight files live on the local filesystem, in an S3 bucket
//! or behind an HTTP(S) URL. Every backend is exposed through the same trait so
//! the runtime does not care where a file came from.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::io::FileReaderResult;

/// Trait defining the interface for reading model files from one kind of location.
pub trait FileReader: Send + Sync {
    /// Reads the content of a file as a String
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the file (format depends on the implementation)
    fn read_string<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<String>> + Send + 'a>>;

    /// Reads the content of a file as bytes
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the file (format depends on the implementation)
    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<Vec<u8>>> + Send + 'a>>;
}

/// Reader for local filesystem files
#[derive(Debug, Default)]
pub struct LocalReader;

impl LocalReader {
    pub fn new() -> Self {
        LocalReader
    }
}

impl FileReader for LocalReader {
    fn read_string<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<String>> + Send + 'a>> {
        Box::pin(async move { Ok(tokio::fs::read_to_string(strip_file_scheme(path)).await?) })
    }

    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move { Ok(tokio::fs::read(strip_file_scheme(path)).await?) })
    }
}

fn strip_file_scheme(path: &str) -> &str {
    path.strip_prefix("file://").unwrap_or(path)
}

/// Reader for files stored in S3
#[derive(Debug)]
pub struct S3Reader {
    client: Arc<aws_sdk_s3::Client>,
}

impl S3Reader {
    /// Creates a new S3Reader
    ///
    /// # Arguments
    ///
    /// * `client` - An initialized AWS S3 client
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        S3Reader {
            client: Arc::new(client),
        }
    }

    /// Splits "s3://bucket-name/key/path" into (bucket, key)
    fn parse_s3_path(s3_path: &str) -> FileReaderResult<(String, String)> {
        let path = s3_path
            .strip_prefix("s3://")
            .ok_or("S3 path must start with s3://")?;
        let (bucket, key) = path
            .split_once('/')
            .ok_or("Invalid S3 path format, missing key")?;
        if bucket.is_empty() {
            return Err("Invalid S3 path format, missing bucket name".into());
        }
        if key.is_empty() {
            return Err("Invalid S3 path format, missing key".into());
        }

        Ok((bucket.to_string(), key.to_string()))
    }

    async fn get_object(
        client: Arc<aws_sdk_s3::Client>,
        path: &str,
    ) -> FileReaderResult<Vec<u8>> {
        let (bucket, key) = Self::parse_s3_path(path)?;
        let s3_response = client.get_object().bucket(bucket).key(key).send().await?;
        let bytes = s3_response.body.collect().await?;
        Ok(bytes.into_bytes().to_vec())
    }
}

impl FileReader for S3Reader {
    fn read_string<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<String>> + Send + 'a>> {
        let client = Arc::clone(&self.client);
        Box::pin(async move {
            let bytes = Self::get_object(client, path).await?;
            Ok(String::from_utf8(bytes)?)
        })
    }

    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<Vec<u8>>> + Send + 'a>> {
        let client = Arc::clone(&self.client);
        Box::pin(Self::get_object(client, path))
    }
}

/// Reader for files served over HTTP(S)
#[derive(Debug, Clone, Default)]
pub struct HttpReader {
    client: reqwest::Client,
}

impl HttpReader {
    pub fn new(client: reqwest::Client) -> Self {
        HttpReader { client }
    }

    async fn get(&self, url: &str) -> FileReaderResult<reqwest::Response> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response)
    }
}

impl FileReader for HttpReader {
    fn read_string<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<String>> + Send + 'a>> {
        Box::pin(async move { Ok(self.get(path).await?.text().await?) })
    }

    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = FileReaderResult<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.get(path).await?.bytes().await?.to_vec()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_local_reader_read_string() {
        let file = create_temp_file("{\"modelUrl\": \"model.onnx\"}");

        let reader = LocalReader::new();
        let content = reader
            .read_string(file.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(content, "{\"modelUrl\": \"model.onnx\"}");
    }

    #[tokio::test]
    async fn test_local_reader_read_bytes_with_file_scheme() {
        let file = create_temp_file("weights");
        let location = format!("file://{}", file.path().to_str().unwrap());

        let reader = LocalReader::new();
        let bytes = reader.read_bytes(&location).await.unwrap();

        assert_eq!(bytes, b"weights");
    }

    #[tokio::test]
    async fn test_local_reader_file_not_found() {
        let reader = LocalReader::new();
        let result = reader.read_bytes("non_existent_model.onnx").await;

        assert!(result.is_err());
    }

    #[test]
    fn test_s3_parse_path() {
        let (bucket, key) = S3Reader::parse_s3_path("s3://my-bucket/models/model.onnx").unwrap();

        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "models/model.onnx");

        assert!(S3Reader::parse_s3_path("invalid-path").is_err());
        assert!(S3Reader::parse_s3_path("s3://my-bucket").is_err());
        assert!(S3Reader::parse_s3_path("s3://my-bucket/").is_err());
        assert!(S3Reader::parse_s3_path("s3:///model.onnx").is_err());
    }
}
