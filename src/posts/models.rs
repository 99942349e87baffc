/// Post data model and request payloads
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One wildlife tracking profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub common_name: String,
    pub scientific_name: String,
    pub animal_type: String,
    pub tracker_type: String,
    pub enclosure_type: String,
    pub attachment_type: String,
    pub data_types: Vec<String>,
    pub recommendations: String,
    /// Main image, always set after creation
    pub post_image: String,
    pub tracker_image: Option<String>,
    pub enclosure_image: Option<String>,
    pub attachment_image: Option<String>,
    pub author: String,
    pub author_id: String,
    /// Creation timestamp
    pub date: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
    pub report_count: i64,
}

/// Payload for creating a post
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub common_name: String,
    #[serde(default)]
    pub scientific_name: String,
    #[serde(default)]
    pub animal_type: String,
    #[serde(default)]
    pub tracker_type: String,
    #[serde(default)]
    pub enclosure_type: String,
    #[serde(default)]
    pub attachment_type: String,
    #[serde(default)]
    pub data_types: Vec<String>,
    #[serde(default)]
    pub recommendations: String,
    pub post_image: String,
    #[serde(default)]
    pub tracker_image: Option<String>,
    #[serde(default)]
    pub enclosure_image: Option<String>,
    #[serde(default)]
    pub attachment_image: Option<String>,
}

/// Payload for updating a post
///
/// Every field is optional; omitted fields keep their current value.
/// Image fields in particular are preserved when absent from the payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: Option<String>,
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub animal_type: Option<String>,
    pub tracker_type: Option<String>,
    pub enclosure_type: Option<String>,
    pub attachment_type: Option<String>,
    pub data_types: Option<Vec<String>>,
    pub recommendations: Option<String>,
    pub post_image: Option<String>,
    pub tracker_image: Option<String>,
    pub enclosure_image: Option<String>,
    pub attachment_image: Option<String>,
}

/// The three image fields that may be cleared after creation
///
/// The main image is deliberately not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionalImageField {
    TrackerImage,
    EnclosureImage,
    AttachmentImage,
}

impl OptionalImageField {
    pub fn column(&self) -> &'static str {
        match self {
            OptionalImageField::TrackerImage => "tracker_image",
            OptionalImageField::EnclosureImage => "enclosure_image",
            OptionalImageField::AttachmentImage => "attachment_image",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "trackerImage" => Ok(OptionalImageField::TrackerImage),
            "enclosureImage" => Ok(OptionalImageField::EnclosureImage),
            "attachmentImage" => Ok(OptionalImageField::AttachmentImage),
            "postImage" => Err(AppError::Validation(
                "The main post image cannot be removed".to_string(),
            )),
            _ => Err(AppError::Validation(format!("Unknown image field: {}", s))),
        }
    }
}

/// 1-indexed pagination request
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl Page {
    /// Clamp out-of-range values instead of passing them to the store
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// One page of posts plus totals
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedPosts {
    pub items: Vec<Post>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: u32,
    pub limit: u32,
}

/// Number of pages needed to hold `total` items
pub fn total_pages(total: i64, limit: u32) -> i64 {
    let limit = i64::from(limit.max(1));
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        let page = Page { page: 0, limit: 0 }.clamped();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);

        let page = Page { page: 3, limit: 5000 }.clamped();
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }

    #[test]
    fn test_optional_image_field_parsing() {
        assert_eq!(
            OptionalImageField::from_str("trackerImage").unwrap().column(),
            "tracker_image"
        );
        assert!(OptionalImageField::from_str("postImage").is_err());
        assert!(OptionalImageField::from_str("banner").is_err());
    }

    #[test]
    fn test_update_payload_omitted_fields_deserialize_to_none() {
        let update: PostUpdate = serde_json::from_str(r#"{"title": "New title"}"#).unwrap();
        assert_eq!(update.title.as_deref(), Some("New title"));
        assert!(update.tracker_image.is_none());
        assert!(update.data_types.is_none());
    }
}
