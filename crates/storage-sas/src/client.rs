//! Blob container client over HTTP, authorized by a SAS container URL.

use std::ops::Range;
use std::path::Path;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Response, Url};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use reality_transfer_common::ProgressCallback;
use reality_transfer_storage::{BlobInfo, BlobProgress, ContainerClient, StorageError};

use crate::error::SasError;
use crate::protocol::{
    block_id, block_list_body, block_ranges, parse_list_page, ContainerUrl, ListPage, API_VERSION,
};
use crate::retry::with_retry;
use crate::settings::{SasSettings, MAX_BLOCKS_PER_BLOB};

const VERSION_HEADER: &str = "x-ms-version";
const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// ContainerClient implementation talking to the blob service directly.
///
/// Small blobs go up in one Put Blob; larger ones are staged as blocks,
/// several at a time, and committed with Put Block List. Downloads are
/// streamed chunk by chunk. Transient failures are retried per
/// [`RetrySettings`](crate::RetrySettings).
pub struct SasContainerClient {
    http: reqwest::Client,
    container: ContainerUrl,
    settings: SasSettings,
}

impl SasContainerClient {
    /// Create a client with default settings.
    ///
    /// # Arguments
    /// * `container_url` - Container URL including its SAS query
    pub fn new(container_url: &str) -> Result<Self, StorageError> {
        Self::with_settings(container_url, SasSettings::default())
    }

    /// Create a client with explicit settings.
    pub fn with_settings(container_url: &str, settings: SasSettings) -> Result<Self, StorageError> {
        let http: reqwest::Client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| StorageError::InvalidConfig {
                message: e.to_string(),
            })?;
        Self::from_client(http, container_url, settings)
    }

    /// Create a client from an existing HTTP client (shared connection pool).
    pub fn from_client(
        http: reqwest::Client,
        container_url: &str,
        settings: SasSettings,
    ) -> Result<Self, StorageError> {
        if settings.block_size == 0 {
            return Err(StorageError::InvalidConfig {
                message: "block size must be positive".to_string(),
            });
        }
        let container: ContainerUrl = ContainerUrl::parse(container_url)
            .map_err(|e| e.into_storage_error("", ""))?;

        Ok(Self {
            http,
            container,
            settings,
        })
    }

    /// Settings in use.
    pub fn settings(&self) -> &SasSettings {
        &self.settings
    }

    fn storage_error(&self, name: &str) -> impl Fn(SasError) -> StorageError + '_ {
        let name: String = name.to_string();
        move |err: SasError| err.into_storage_error(self.container.name(), &name)
    }

    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage, SasError> {
        let response: Response = self
            .http
            .get(self.container.list(prefix, marker))
            .header(VERSION_HEADER, API_VERSION)
            .send()
            .await
            .map_err(|e| SasError::from_request("List Blobs", e))?;
        let body: String = check_status("List Blobs", response)?
            .text()
            .await
            .map_err(|e| SasError::from_request("List Blobs", e))?;
        parse_list_page(&body)
    }

    async fn put_blob(&self, name: &str, data: Vec<u8>) -> Result<(), SasError> {
        let response: Response = self
            .http
            .put(self.container.blob(name)?)
            .header(VERSION_HEADER, API_VERSION)
            .header(BLOB_TYPE_HEADER, "BlockBlob")
            .body(data)
            .send()
            .await
            .map_err(|e| SasError::from_request("Put Blob", e))?;
        check_status("Put Blob", response).map(drop)
    }

    async fn put_block(&self, name: &str, index: usize, data: Vec<u8>) -> Result<(), SasError> {
        let mut url: Url = self.container.blob(name)?;
        url.query_pairs_mut()
            .append_pair("comp", "block")
            .append_pair("blockid", &block_id(index));

        let response: Response = self
            .http
            .put(url)
            .header(VERSION_HEADER, API_VERSION)
            .body(data)
            .send()
            .await
            .map_err(|e| SasError::from_request("Put Block", e))?;
        check_status("Put Block", response).map(drop)
    }

    async fn put_block_list(&self, name: &str, count: usize) -> Result<(), SasError> {
        let mut url: Url = self.container.blob(name)?;
        url.query_pairs_mut().append_pair("comp", "blocklist");

        let response: Response = self
            .http
            .put(url)
            .header(VERSION_HEADER, API_VERSION)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(block_list_body(count))
            .send()
            .await
            .map_err(|e| SasError::from_request("Put Block List", e))?;
        check_status("Put Block List", response).map(drop)
    }

    /// Upload `size` bytes from `source`, in one request or in blocks.
    async fn upload_source(
        &self,
        name: &str,
        source: &BlockSource<'_>,
        size: u64,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), SasError> {
        let retry = &self.settings.retry;

        if size <= self.settings.single_put_threshold {
            let data: Vec<u8> = source.read(0..size).await?;
            let data: &Vec<u8> = &data;
            with_retry(
                retry,
                "Put Blob",
                move || self.put_blob(name, data.clone()),
                || stop_requested(progress, size),
            )
            .await?;
            return report(progress, size, size);
        }

        let ranges: Vec<Range<u64>> = block_ranges(size, self.settings.block_size);
        let count: usize = ranges.len();
        if count as u64 > MAX_BLOCKS_PER_BLOB {
            return Err(SasError::ConfigError(format!(
                "{} needs {} blocks of {} bytes, more than the {} allowed",
                name, count, self.settings.block_size, MAX_BLOCKS_PER_BLOB
            )));
        }
        log::debug!("Staging {} in {} blocks", name, count);

        let mut staged = stream::iter(ranges.into_iter().enumerate())
            .map(move |(index, range)| async move {
                let data: Vec<u8> = source.read(range.clone()).await?;
                let data: &Vec<u8> = &data;
                with_retry(
                    retry,
                    "Put Block",
                    move || self.put_block(name, index, data.clone()),
                    || stop_requested(progress, size),
                )
                .await?;
                Ok::<u64, SasError>(range.end - range.start)
            })
            .buffered(self.settings.block_concurrency.max(1));

        let mut transferred: u64 = 0;
        while let Some(result) = staged.next().await {
            transferred += result?;
            report(progress, transferred, size)?;
        }

        with_retry(
            retry,
            "Put Block List",
            move || self.put_block_list(name, count),
            || stop_requested(progress, size),
        )
        .await
    }

    /// Stream blob `name` into `writer`.
    async fn download_into<W>(
        &self,
        name: &str,
        writer: &mut W,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), SasError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let response: Response = self
            .http
            .get(self.container.blob(name)?)
            .header(VERSION_HEADER, API_VERSION)
            .send()
            .await
            .map_err(|e| SasError::from_request("Get Blob", e))?;
        let mut response: Response = check_status("Get Blob", response)?;
        let total: u64 = response.content_length().unwrap_or(0);

        let mut transferred: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SasError::from_request("Get Blob", e))?
        {
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| SasError::IoError {
                    path: name.to_string(),
                    source: e,
                })?;
            transferred += chunk.len() as u64;
            report(progress, transferred, total.max(transferred))?;
        }

        writer.flush().await.map_err(|e| SasError::IoError {
            path: name.to_string(),
            source: e,
        })
    }
}

/// Where staged block data is read from.
enum BlockSource<'d> {
    Memory(&'d [u8]),
    File(&'d Path),
}

impl BlockSource<'_> {
    async fn read(&self, range: Range<u64>) -> Result<Vec<u8>, SasError> {
        match self {
            BlockSource::Memory(data) => Ok(data[range.start as usize..range.end as usize].to_vec()),
            BlockSource::File(path) => {
                let io_error = |e: std::io::Error| SasError::IoError {
                    path: path.display().to_string(),
                    source: e,
                };
                let mut file = tokio::fs::File::open(path).await.map_err(io_error)?;
                file.seek(std::io::SeekFrom::Start(range.start))
                    .await
                    .map_err(io_error)?;
                let mut buffer: Vec<u8> = vec![0u8; (range.end - range.start) as usize];
                file.read_exact(&mut buffer).await.map_err(io_error)?;
                Ok(buffer)
            }
        }
    }
}

/// Pass an error status on as `SasError::Status`.
fn check_status(operation: &'static str, response: Response) -> Result<Response, SasError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message: String = response
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
    Err(SasError::Status {
        operation,
        status: status.as_u16(),
        message,
    })
}

fn report(
    progress: Option<&dyn ProgressCallback<BlobProgress>>,
    bytes_transferred: u64,
    total_bytes: u64,
) -> Result<(), SasError> {
    match progress {
        Some(callback)
            if !callback.on_progress(&BlobProgress {
                bytes_transferred,
                total_bytes,
            }) =>
        {
            Err(SasError::Cancelled)
        }
        _ => Ok(()),
    }
}

/// Ask the caller whether to give up, without reporting new bytes.
fn stop_requested(
    progress: Option<&dyn ProgressCallback<BlobProgress>>,
    total_bytes: u64,
) -> bool {
    report(progress, 0, total_bytes).is_err()
}

#[async_trait]
impl ContainerClient for SasContainerClient {
    fn container_name(&self) -> &str {
        self.container.name()
    }

    async fn list_blobs(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError> {
        let mut blobs: Vec<BlobInfo> = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let current: Option<&str> = marker.as_deref();
            let page: ListPage = with_retry(
                &self.settings.retry,
                "List Blobs",
                move || self.list_page(prefix, current),
                || false,
            )
            .await
            .map_err(self.storage_error(prefix))?;

            log::debug!(
                "Listed {} blobs under '{}' in {}",
                page.blobs.len(),
                prefix,
                self.container.name()
            );
            blobs.extend(page.blobs);

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(blobs)
    }

    async fn upload_blob(
        &self,
        name: &str,
        data: &[u8],
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        self.upload_source(name, &BlockSource::Memory(data), data.len() as u64, progress)
            .await
            .map_err(self.storage_error(name))
    }

    async fn upload_blob_from_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        let size: u64 = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| StorageError::io(file_path, e))?
            .len();
        self.upload_source(name, &BlockSource::File(file_path), size, progress)
            .await
            .map_err(self.storage_error(name))
    }

    async fn download_blob(
        &self,
        name: &str,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<Vec<u8>, StorageError> {
        with_retry(
            &self.settings.retry,
            "Get Blob",
            move || async move {
                let mut buffer: Vec<u8> = Vec::new();
                self.download_into(name, &mut buffer, progress).await?;
                Ok::<Vec<u8>, SasError>(buffer)
            },
            || stop_requested(progress, 0),
        )
        .await
        .map_err(self.storage_error(name))
    }

    async fn download_blob_to_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        let result: Result<(), SasError> = with_retry(
            &self.settings.retry,
            "Get Blob",
            move || async move {
                let mut file = tokio::fs::File::create(file_path)
                    .await
                    .map_err(|e| SasError::IoError {
                        path: file_path.display().to_string(),
                        source: e,
                    })?;
                self.download_into(name, &mut file, progress).await
            },
            || stop_requested(progress, 0),
        )
        .await;

        if result.is_err() {
            // Do not leave a truncated blob behind.
            let _ = tokio::fs::remove_file(file_path).await;
        }
        result.map_err(self.storage_error(name))
    }
}
