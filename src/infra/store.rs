//! In-memory feed store shared between the poller and the HTTP layer.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use crate::domain::entities::{PostRecord, TagRecord};
use crate::domain::error::DomainError;

/// Store for the current tag set and per-tag post lists.
///
/// The two data classes live behind independent locks: a tag refresh never
/// blocks post readers, and readers never block each other. Writers hold a
/// lock only long enough to swap the owned data in, never across an upstream
/// call.
#[derive(Default)]
pub struct FeedStore {
    tags: RwLock<HashMap<String, TagRecord>>,
    posts: RwLock<HashMap<String, Vec<PostRecord>>>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole tag set, keeping only active tags.
    pub fn set_tags(&self, tags: Vec<TagRecord>) {
        let mut guard = write(&self.tags, "set_tags");
        guard.clear();
        for tag in tags.into_iter().filter(TagRecord::is_active) {
            guard.insert(tag.id.clone(), tag);
        }
    }

    /// Snapshot of the currently active tags, order unspecified.
    pub fn tags(&self) -> Vec<TagRecord> {
        read(&self.tags, "tags").values().cloned().collect()
    }

    /// Replace the stored post list for one tag name.
    pub fn set_posts_for_tag(&self, tag_name: &str, posts: Vec<PostRecord>) {
        write(&self.posts, "set_posts_for_tag").insert(tag_name.to_string(), posts);
    }

    /// Posts cached for `tag_name`. A name that was never written is a
    /// `NotFound`, distinct from a successfully stored empty list.
    pub fn posts_for_tag(&self, tag_name: &str) -> Result<Vec<PostRecord>, DomainError> {
        read(&self.posts, "posts_for_tag")
            .get(tag_name)
            .cloned()
            .ok_or_else(|| DomainError::not_found("posts for tag"))
    }
}

fn read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = "infra::store",
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                "Recovered from poisoned store lock"
            );
            poisoned.into_inner()
        }
    }
}

fn write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = "infra::store",
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                "Recovered from poisoned store lock"
            );
            poisoned.into_inner()
        }
    }
}
