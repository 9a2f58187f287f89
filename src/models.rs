//! Record types shared by the upload pipeline, the stores, and the viewer.
//!
//! The serialized field names (`authorId`, `likeCount`, `type`, ...) are the
//! on-disk document shape; renaming a field here changes what every backend
//! stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document id of the one synthetic author every migrated project points at.
pub const AUTHOR_ID: &str = "softcon-author";

/// One entry of the input export after boundary validation.
///
/// Every field of the export is optional and loosely typed; this struct holds
/// the values that survived the truthiness rules in
/// [`read_raw_project`](crate::transform::read_raw_project). `original` keeps
/// the untouched object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawProject {
    pub uid: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text_content: Option<String>,
    pub member_names: Vec<String>,
    pub representative_image: Option<String>,
    /// `images`, one slot per source element; `None` where the element is
    /// not a string.
    pub images: Vec<Option<String>>,
    pub git_repository: Option<String>,
    pub presentation_url: Option<String>,
    pub video_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    /// `url`, verbatim. `Value::Null` when the field is missing.
    pub url: Value,
    pub original: Value,
}

/// Normalized project document stored in `softcon_projects`.
///
/// `createdAt`/`updatedAt` are not part of the record: the store assigns them
/// on every write (see [`Stored`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub files: Vec<ProjectFile>,
    #[serde(default)]
    pub links: Vec<ProjectLink>,
    pub author_id: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub source_url: Value,
    #[serde(default)]
    pub original_data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub file_id: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub filename: String,
    pub url: String,
}

/// Attachment kind. The pipeline only produces `IMAGE`; the other kinds come
/// from records written by the upload UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileKind {
    Image,
    Pdf,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLink {
    pub link_id: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkKind {
    Github,
    Link,
    Youtube,
}

/// The author document in `users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRecord {
    pub display_name: String,
    pub role: Role,
    pub profile_image: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
}

/// A record read back from a store, with its key and server-assigned
/// timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub id: String,
    pub record: T,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub type StoredProject = Stored<ProjectRecord>;
pub type StoredAuthor = Stored<AuthorRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_serializes_with_document_field_names() {
        let record = ProjectRecord {
            title: "Demo".into(),
            subtitle: "sub".into(),
            content: String::new(),
            keywords: vec!["kim".into()],
            thumbnail: String::new(),
            files: vec![ProjectFile {
                file_id: "img-0".into(),
                kind: FileKind::Image,
                filename: "이미지 1".into(),
                url: "a.png".into(),
            }],
            links: vec![ProjectLink {
                link_id: "git".into(),
                kind: LinkKind::Github,
                title: "GitHub 저장소".into(),
                url: "https://github.com/x/y".into(),
            }],
            author_id: AUTHOR_ID.into(),
            like_count: 3,
            comment_count: 0,
            source_url: Value::Null,
            original_data: json!({"uid": "p1"}),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["authorId"], "softcon-author");
        assert_eq!(value["likeCount"], 3);
        assert_eq!(value["files"][0]["fileId"], "img-0");
        assert_eq!(value["files"][0]["type"], "IMAGE");
        assert_eq!(value["links"][0]["linkId"], "git");
        assert_eq!(value["links"][0]["type"], "GITHUB");
        assert!(value["sourceUrl"].is_null());
        assert_eq!(value["originalData"]["uid"], "p1");
    }

    #[test]
    fn author_omits_unset_user_id() {
        let author = AuthorRecord {
            display_name: "a".into(),
            role: Role::Admin,
            profile_image: "p".into(),
            email: "e".into(),
            user_id: None,
        };
        let value = serde_json::to_value(&author).unwrap();
        assert_eq!(value["role"], "ADMIN");
        assert!(value.get("userId").is_none());
    }

    #[test]
    fn project_reads_records_with_missing_optional_fields() {
        let record: ProjectRecord = serde_json::from_value(json!({
            "title": "t",
            "subtitle": "s",
            "content": "c",
            "authorId": "someone",
            "files": [{"fileId": "f", "type": "PDF", "filename": "a.pdf", "url": "u"}]
        }))
        .unwrap();
        assert!(record.links.is_empty());
        assert_eq!(record.files[0].kind, FileKind::Pdf);
        assert_eq!(record.like_count, 0);
    }
}
