//! Atom feed generation for cached tag feeds.

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::domain::entities::PostRecord;

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml; charset=utf-8";

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
const EXTENSION_NAMESPACE: &str = "http://feedrelay.dev/xml/fr";

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Render the Atom document for one tag's cached posts.
///
/// The feed-level `updated` element is stamped at render time; entries keep
/// the cached order. Posts without a publish timestamp fall back to the
/// epoch rather than being dropped.
pub fn atom_feed(tag: &str, posts: &[PostRecord]) -> Result<String, SyndicationError> {
    let updated = OffsetDateTime::now_utc().format(&Rfc3339)?;

    let mut entries = String::new();
    for post in posts {
        let published = post
            .publish_date
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
            .format(&Rfc3339)?;
        entries.push_str(&format!(
            "  <entry>\n    <id>{}</id>\n    <title>{}</title>\n    <updated>{}</updated>\n    <link rel=\"alternate\" type=\"text/html\" href=\"{}\"/>\n    <fr:metadata>{}</fr:metadata>\n  </entry>\n",
            xml_escape(&post.id),
            xml_escape(&post.html_title),
            published,
            xml_escape(&post.url),
            xml_escape(&post.meta_description),
        ));
    }

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feed xmlns=\"{ATOM_NAMESPACE}\" xmlns:fr=\"{EXTENSION_NAMESPACE}\">\n  <title>Tag:{}</title>\n  <id>urn:feedrelay:tag:{}</id>\n  <updated>{}</updated>\n{}</feed>\n",
        xml_escape(tag),
        xml_escape(tag),
        updated,
        entries
    ))
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
