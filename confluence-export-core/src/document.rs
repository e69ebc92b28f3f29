//! Builds the exportable [`Document`] for one page.

use serde::{Deserialize, Serialize};

use crate::attachment::AttachmentText;
use crate::content::PageText;
use crate::model::PageRecord;

/// Page metadata, serialized in this field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub id: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub url: String,
    pub version: Option<u64>,
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
}

/// One page ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: PageMetadata,
    #[serde(rename = "pageContent")]
    pub page_content: String,
}

/// Web URL of a page.
pub fn page_url(base_url: &str, space_key: &str, page_id: &str, cloud: bool) -> String {
    let base_url = base_url.trim_end_matches('/');
    if cloud {
        format!("{base_url}/wiki/spaces/{space_key}/pages/{page_id}")
    } else {
        format!("{base_url}/spaces/{space_key}/pages/{page_id}")
    }
}

/// Combine page text and attachment texts into one [`Document`].
///
/// Attachments whose text is empty are left out.
pub fn assemble_document(
    page: &PageRecord,
    page_text: &PageText,
    attachments: &[AttachmentText],
    base_url: &str,
    space_key: &str,
    cloud: bool,
) -> Document {
    let mut page_content = page_text.combined();
    for attachment in attachments.iter().filter(|a| !a.text.is_empty()) {
        page_content.push_str(&format!(
            "\n\n--- Attachment: {} ---\nDownload URL: {}\n{}",
            attachment.title, attachment.download_url, attachment.text
        ));
    }

    let version = page.version.as_ref();
    let metadata = PageMetadata {
        id: page.id.clone(),
        status: page.status.clone(),
        title: page.title.clone(),
        content_type: page.content_type.clone(),
        url: page_url(
            base_url,
            space_key,
            page.id.as_deref().unwrap_or_default(),
            cloud,
        ),
        version: version.and_then(|v| v.number),
        updated_by: version
            .and_then(|v| v.by.as_ref())
            .and_then(|by| by.display_name.clone()),
        updated_at: version.and_then(|v| v.when.clone()),
    };

    Document {
        metadata,
        page_content,
    }
}
