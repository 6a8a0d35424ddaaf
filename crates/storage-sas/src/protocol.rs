//! Blob service wire details: URLs, List Blobs pages, block lists.

use std::ops::Range;

use reality_transfer_storage::BlobInfo;
use reqwest::Url;
use roxmltree::{Document, Node};

use crate::error::SasError;

/// Service version sent with every request.
pub(crate) const API_VERSION: &str = "2021-12-02";

/// A SAS-authorized container URL, e.g.
/// `https://account.blob.core.windows.net/dataset-id?sv=...&sig=...`.
#[derive(Debug, Clone)]
pub(crate) struct ContainerUrl {
    url: Url,
    name: String,
}

impl ContainerUrl {
    pub(crate) fn parse(raw: &str) -> Result<Self, SasError> {
        let invalid = |message: &str| SasError::InvalidUrl {
            url: redact(raw),
            message: message.to_string(),
        };

        let url: Url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(invalid("expected an http(s) URL"));
        }
        let name: String = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string)
            .ok_or_else(|| invalid("missing container name"))?;

        Ok(Self { url, name })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// URL of blob `name`; each `/`-separated part becomes a path segment.
    pub(crate) fn blob(&self, name: &str) -> Result<Url, SasError> {
        let mut url: Url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| SasError::InvalidUrl {
                url: redact(self.url.as_str()),
                message: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(name.split('/'));
        Ok(url)
    }

    /// URL of one List Blobs page.
    pub(crate) fn list(&self, prefix: &str, marker: Option<&str>) -> Url {
        let mut url: Url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container").append_pair("comp", "list");
            if !prefix.is_empty() {
                query.append_pair("prefix", prefix);
            }
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }
        url
    }
}

/// URL with its query (the SAS signature) removed, for messages and logs.
pub(crate) fn redact(raw: &str) -> String {
    match raw.split_once('?') {
        Some((base, _)) => format!("{}?<sas>", base),
        None => raw.to_string(),
    }
}

/// One page of a List Blobs response.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ListPage {
    pub(crate) blobs: Vec<BlobInfo>,
    pub(crate) next_marker: Option<String>,
}

/// Parse an `EnumerationResults` document.
pub(crate) fn parse_list_page(body: &str) -> Result<ListPage, SasError> {
    let body: &str = body.trim_start_matches('\u{feff}');
    let document: Document = Document::parse(body).map_err(|e| SasError::Listing(e.to_string()))?;
    let root: Node = document.root_element();
    if !root.has_tag_name("EnumerationResults") {
        return Err(SasError::Listing(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    let mut page = ListPage::default();
    if let Some(blobs) = child(root, "Blobs") {
        for blob in blobs.children().filter(|n| n.has_tag_name("Blob")) {
            let name: &str = child(blob, "Name")
                .and_then(|n| n.text())
                .ok_or_else(|| SasError::Listing("<Blob> without <Name>".to_string()))?;
            let size: u64 = match child(blob, "Properties")
                .and_then(|p| child(p, "Content-Length"))
                .and_then(|n| n.text())
            {
                Some(text) => text.trim().parse().map_err(|_| {
                    SasError::Listing(format!("bad Content-Length '{}' for {}", text, name))
                })?,
                None => 0,
            };
            page.blobs.push(BlobInfo::new(name, size));
        }
    }
    page.next_marker = child(root, "NextMarker")
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|marker| !marker.is_empty())
        .map(str::to_string);

    Ok(page)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Byte ranges of the blocks `size` bytes are staged in.
pub(crate) fn block_ranges(size: u64, block_size: u64) -> Vec<Range<u64>> {
    let block_size: u64 = block_size.max(1);
    (0..size.div_ceil(block_size))
        .map(|index| {
            let start: u64 = index * block_size;
            start..(start + block_size).min(size)
        })
        .collect()
}

/// Id of block `index`.
///
/// Ids of one blob must share a length and be base64; eight decimal
/// digits are both.
pub(crate) fn block_id(index: usize) -> String {
    format!("{:08}", index)
}

/// Put Block List body committing `count` blocks in order.
pub(crate) fn block_list_body(count: usize) -> String {
    let mut body = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?><BlockList>");
    for index in 0..count {
        body.push_str("<Latest>");
        body.push_str(&block_id(index));
        body.push_str("</Latest>");
    }
    body.push_str("</BlockList>");
    body
}
