// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

use crate::io::{FileReader, HttpReader, LocalReader, S3Reader};

/// Picks the reader matching a location's scheme.
#[derive(Debug, Default)]
pub struct ReaderSet {
    local: LocalReader,
    http: HttpReader,
    s3: Option<S3Reader>,
}

impl ReaderSet {
    /// Local and HTTP(S) locations only; `s3://` locations fail until an S3 client is attached.
    pub fn new() -> Self {
        ReaderSet::default()
    }

    pub fn with_s3(mut self, client: aws_sdk_s3::Client) -> Self {
        self.s3 = Some(S3Reader::new(client));
        self
    }

    /// Builds every reader, taking the S3 credentials and region from the environment.
    pub async fn from_env() -> Self {
        let aws_config = aws_config::load_from_env().await;
        ReaderSet::new().with_s3(aws_sdk_s3::Client::new(&aws_config))
    }

    pub fn reader_for(&self, location: &str) -> Option<&dyn FileReader> {
        if location.starts_with("s3://") {
            self.s3.as_ref().map(|reader| reader as &dyn FileReader)
        } else if location.starts_with("http://") || location.starts_with("https://") {
            Some(&self.http)
        } else {
            Some(&self.local)
        }
    }
}

/// Last path segment of a location, without query string or fragment.
pub fn file_name(location: &str) -> Option<&str> {
    let path = location
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(location);
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}
