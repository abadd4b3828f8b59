//! Records mirrored from the upstream content API.
//!
//! Both record types are immutable snapshots of upstream state; the store
//! replaces them wholesale on refresh and nothing mutates them locally.

use serde::Deserialize;
use time::OffsetDateTime;

/// Categorization label from the upstream CMS.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagRecord {
    pub id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl TagRecord {
    /// The upstream soft-deletes tags; an absent or epoch deletion timestamp
    /// both mean the tag was never deleted.
    pub fn is_active(&self) -> bool {
        match self.deleted_at {
            None => true,
            Some(ts) => ts == OffsetDateTime::UNIX_EPOCH,
        }
    }
}

/// Published post belonging to one or more tags.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostRecord {
    pub id: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub publish_date: Option<OffsetDateTime>,
    pub meta_description: String,
    pub url: String,
    pub post_summary: String,
    pub name: String,
    pub html_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_without_deletion_timestamp_is_active() {
        let tag: TagRecord = serde_json::from_str(
            r#"{"id": "42", "name": "launch", "created": "2024-03-01T09:00:00Z"}"#,
        )
        .expect("valid tag");
        assert!(tag.is_active());
        assert_eq!(tag.id, "42");
        assert_eq!(tag.name, "launch");
    }

    #[test]
    fn tag_with_epoch_deletion_timestamp_is_active() {
        let tag: TagRecord = serde_json::from_str(
            r#"{"id": "42", "name": "launch", "deletedAt": "1970-01-01T00:00:00Z"}"#,
        )
        .expect("valid tag");
        assert!(tag.is_active());
    }

    #[test]
    fn tag_with_real_deletion_timestamp_is_inactive() {
        let tag: TagRecord = serde_json::from_str(
            r#"{"id": "42", "name": "launch", "deletedAt": "2024-06-15T12:30:00Z"}"#,
        )
        .expect("valid tag");
        assert!(!tag.is_active());
    }

    #[test]
    fn post_decodes_from_upstream_field_names() {
        let post: PostRecord = serde_json::from_str(
            r#"{
                "id": "1",
                "publishDate": "2024-05-02T08:00:00+02:00",
                "metaDescription": "m1",
                "url": "http://x/1",
                "postSummary": "s1",
                "name": "post-one",
                "htmlTitle": "A"
            }"#,
        )
        .expect("valid post");
        assert_eq!(post.html_title, "A");
        assert_eq!(post.meta_description, "m1");
        assert!(post.publish_date.is_some());
    }

    #[test]
    fn post_tolerates_missing_optional_fields() {
        let post: PostRecord = serde_json::from_str(r#"{"id": "1"}"#).expect("valid post");
        assert!(post.publish_date.is_none());
        assert!(post.url.is_empty());
    }
}
