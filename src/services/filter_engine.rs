//! Bookmark filtering and the bookmark-to-tags index.
//!
//! The visible set is a pure function of the bookmark rows, the association
//! rows and the current [`FilterCriteria`]. [`FilterEngine`] caches the last
//! result and recomputes only when a mirror revision or the criteria move.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::bookmark::Bookmark;
use crate::types::tag::BookmarkTag;

/// Current folder, tag and text filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub tag_ids: BTreeSet<String>,
    #[serde(default)]
    pub query: String,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.folder_id.is_none() && self.tag_ids.is_empty() && self.query.is_empty()
    }
}

/// Bookmark id to the ids of its tags.
pub type TagIndex = HashMap<String, HashSet<String>>;

/// Groups association rows by bookmark id. Bookmarks without rows have no entry.
pub fn build_tag_index(rows: &[BookmarkTag]) -> TagIndex {
    let mut index = TagIndex::new();
    for row in rows {
        index
            .entry(row.bookmark_id.clone())
            .or_default()
            .insert(row.tag_id.clone());
    }
    index
}

/// Keeps bookmarks filed in exactly `folder_id`. `None` keeps everything.
pub fn filter_by_folder(bookmarks: Vec<Bookmark>, folder_id: Option<&str>) -> Vec<Bookmark> {
    match folder_id {
        Some(fid) => bookmarks
            .into_iter()
            .filter(|b| b.folder_id.as_deref() == Some(fid))
            .collect(),
        None => bookmarks,
    }
}

/// Keeps bookmarks carrying every tag in `tag_ids`.
pub fn filter_by_tags(bookmarks: Vec<Bookmark>, tag_ids: &BTreeSet<String>, index: &TagIndex) -> Vec<Bookmark> {
    if tag_ids.is_empty() {
        return bookmarks;
    }
    bookmarks
        .into_iter()
        .filter(|b| match index.get(&b.id) {
            Some(tags) => tag_ids.iter().all(|t| tags.contains(t)),
            None => false,
        })
        .collect()
}

/// Keeps bookmarks whose title or URL contains `query`, ignoring case.
pub fn filter_by_query(bookmarks: Vec<Bookmark>, query: &str) -> Vec<Bookmark> {
    if query.is_empty() {
        return bookmarks;
    }
    let needle = query.to_lowercase();
    bookmarks
        .into_iter()
        .filter(|b| b.title.to_lowercase().contains(&needle) || b.url.to_lowercase().contains(&needle))
        .collect()
}

/// Applies every filter in `criteria`, preserving input order.
pub fn visible(bookmarks: &[Bookmark], criteria: &FilterCriteria, index: &TagIndex) -> Vec<Bookmark> {
    let rows = filter_by_folder(bookmarks.to_vec(), criteria.folder_id.as_deref());
    let rows = filter_by_tags(rows, &criteria.tag_ids, index);
    filter_by_query(rows, &criteria.query)
}

/// Memoizing front for [`visible`].
#[derive(Debug, Default)]
pub struct FilterEngine {
    criteria: FilterCriteria,
    index: TagIndex,
    index_revision: Option<u64>,
    cache_key: Option<(u64, u64, FilterCriteria)>,
    cached: Vec<Bookmark>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    /// Rebuilds the tag index if the association mirror moved since the last call.
    pub fn tag_index(&mut self, associations: &[BookmarkTag], revision: u64) -> &TagIndex {
        if self.index_revision != Some(revision) {
            self.index = build_tag_index(associations);
            self.index_revision = Some(revision);
        }
        &self.index
    }

    /// The visible set for the current criteria.
    ///
    /// `bookmark_revision` and `association_revision` must change whenever the
    /// respective rows change.
    pub fn visible(
        &mut self,
        bookmarks: &[Bookmark],
        bookmark_revision: u64,
        associations: &[BookmarkTag],
        association_revision: u64,
    ) -> &[Bookmark] {
        let key = (bookmark_revision, association_revision, self.criteria.clone());
        if self.cache_key.as_ref() != Some(&key) {
            self.tag_index(associations, association_revision);
            self.cached = visible(bookmarks, &self.criteria, &self.index);
            self.cache_key = Some(key);
        }
        &self.cached
    }
}
