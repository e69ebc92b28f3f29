//! Confluence REST types.
//!
//! Only the fields the export uses are modelled; serde ignores everything else.
//! Every field is optional because the API omits whatever was not expanded.

use serde::{Deserialize, Serialize};

/// One page of `GET /rest/api/content`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContentBatch {
    /// Number of results in this batch as reported by the server.
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub results: Vec<PageRecord>,
}

impl ContentBatch {
    /// Reported batch size, falling back to the number of results when the field is absent.
    pub fn len(&self) -> usize {
        self.size.unwrap_or(self.results.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 || self.results.is_empty()
    }
}

/// A page as returned with `expand=body.storage,version,children.attachment`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub body: Option<Body>,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub children: Option<Children>,
}

impl PageRecord {
    /// Storage-format markup, or `""` when the body was not expanded.
    pub fn storage_body(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.storage.as_ref())
            .map(|s| s.value.as_str())
            .unwrap_or("")
    }

    pub fn attachments(&self) -> &[AttachmentRecord] {
        self.children
            .as_ref()
            .and_then(|c| c.attachment.as_ref())
            .map(|a| a.results.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Body {
    #[serde(default)]
    pub storage: Option<Storage>,
}

/// Storage format representation (HTML with `ac:` macro elements).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Storage {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Version {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub by: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Children {
    #[serde(default)]
    pub attachment: Option<AttachmentList>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttachmentList {
    #[serde(default)]
    pub results: Vec<AttachmentRecord>,
}

/// Attachment reference nested under a page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttachmentRecord {
    /// File name, including its extension.
    #[serde(default)]
    pub title: String,
    #[serde(rename = "_links", default)]
    pub links: AttachmentLinks,
}

impl AttachmentRecord {
    pub fn download_link(&self) -> &str {
        &self.links.download
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttachmentLinks {
    /// Relative (`/download/attachments/...`) or absolute download link.
    #[serde(default)]
    pub download: String,
}
