//! Per-user table operations for the bookmark store.
//!
//! Every mutation is scoped to the owning user and, once committed, published
//! on the matching [`ChangeFeed`](super::ChangeFeed) channel. The store never
//! cascades: dependent rows must be cleaned up by the caller first, and a
//! delete that would orphan a reference is refused by the foreign keys.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::connection::Database;
use crate::types::bookmark::{Bookmark, BookmarkPatch, NewBookmark};
use crate::types::change::ChangeEvent;
use crate::types::errors::StoreError;
use crate::types::folder::Folder;
use crate::types::tag::{BookmarkTag, Tag, TagPatch};

const BOOKMARK_COLUMNS: &str =
    "id, user_id, url, title, description, folder_id, created_at, updated_at";
const FOLDER_COLUMNS: &str = "id, user_id, name, created_at, updated_at";
const TAG_COLUMNS: &str = "id, user_id, name, color, created_at, updated_at";

/// Current time truncated to the microsecond precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    from_micros(Utc::now().timestamp_micros())
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).unwrap_or_default()
}

fn row_to_bookmark(row: &Row) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get(0)?,
        user_id: row.get(1)?,
        url: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        folder_id: row.get(5)?,
        created_at: from_micros(row.get(6)?),
        updated_at: from_micros(row.get(7)?),
    })
}

fn row_to_folder(row: &Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: from_micros(row.get(3)?),
        updated_at: from_micros(row.get(4)?),
    })
}

fn row_to_tag(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        created_at: from_micros(row.get(4)?),
        updated_at: from_micros(row.get(5)?),
    })
}

fn row_to_bookmark_tag(row: &Row) -> rusqlite::Result<BookmarkTag> {
    Ok(BookmarkTag {
        bookmark_id: row.get(0)?,
        tag_id: row.get(1)?,
        created_at: from_micros(row.get(2)?),
    })
}

fn find_bookmark(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Bookmark>, StoreError> {
    let sql = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = ?1 AND user_id = ?2");
    let found = conn.query_row(&sql, params![id, user_id], row_to_bookmark).optional()?;
    Ok(found)
}

fn find_folder(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Folder>, StoreError> {
    let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?1 AND user_id = ?2");
    let found = conn.query_row(&sql, params![id, user_id], row_to_folder).optional()?;
    Ok(found)
}

fn find_tag(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Tag>, StoreError> {
    let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1 AND user_id = ?2");
    let found = conn.query_row(&sql, params![id, user_id], row_to_tag).optional()?;
    Ok(found)
}

fn ensure_folder(conn: &Connection, user_id: &str, folder_id: Option<&str>) -> Result<(), StoreError> {
    if let Some(fid) = folder_id {
        if find_folder(conn, user_id, fid)?.is_none() {
            return Err(StoreError::FolderNotFound(fid.to_string()));
        }
    }
    Ok(())
}

/// Association rows whose bookmark belongs to `user_id`, narrowed by `filter_sql`.
fn select_associations(
    conn: &Connection,
    user_id: &str,
    filter_sql: &str,
    filter_value: Option<&str>,
) -> Result<Vec<BookmarkTag>, StoreError> {
    let sql = format!(
        "SELECT bt.bookmark_id, bt.tag_id, bt.created_at FROM bookmark_tags bt \
         JOIN bookmarks b ON b.id = bt.bookmark_id \
         WHERE b.user_id = ?1 {filter_sql} ORDER BY bt.created_at, bt.bookmark_id, bt.tag_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = match filter_value {
        Some(value) => stmt.query_map(params![user_id, value], row_to_bookmark_tag)?,
        None => stmt.query_map(params![user_id], row_to_bookmark_tag)?,
    };
    let result = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(result)
}

impl Database {
    // ─── Bookmarks ───

    /// All bookmarks of `user_id`, newest first.
    #[instrument(skip_all, level = "debug")]
    pub fn select_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.connection();
        let sql = format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE user_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], row_to_bookmark)?;
        let result = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(result)
    }

    pub fn select_bookmark(&self, user_id: &str, id: &str) -> Result<Option<Bookmark>, StoreError> {
        find_bookmark(&self.connection(), user_id, id)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn insert_bookmark(&self, user_id: &str, new: &NewBookmark) -> Result<Bookmark, StoreError> {
        let bookmark = {
            let conn = self.connection();
            ensure_folder(&conn, user_id, new.folder_id.as_deref())?;

            let ts = now();
            let bookmark = Bookmark {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                url: new.url.clone(),
                title: new.title.clone(),
                description: new.description.clone(),
                folder_id: new.folder_id.clone(),
                created_at: ts,
                updated_at: ts,
            };
            conn.execute(
                "INSERT INTO bookmarks (id, user_id, url, title, description, folder_id, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    bookmark.id,
                    bookmark.user_id,
                    bookmark.url,
                    bookmark.title,
                    bookmark.description,
                    bookmark.folder_id,
                    ts.timestamp_micros(),
                    ts.timestamp_micros()
                ],
            )?;
            bookmark
        };
        debug!(id = %bookmark.id, "bookmark inserted");
        self.feed().bookmarks.publish(user_id, ChangeEvent::Inserted(bookmark.clone()));
        Ok(bookmark)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn update_bookmark(
        &self,
        user_id: &str,
        id: &str,
        patch: &BookmarkPatch,
    ) -> Result<Bookmark, StoreError> {
        let bookmark = {
            let conn = self.connection();
            let mut bookmark = find_bookmark(&conn, user_id, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            if let Some(folder_id) = &patch.folder_id {
                ensure_folder(&conn, user_id, folder_id.as_deref())?;
                bookmark.folder_id = folder_id.clone();
            }
            if let Some(url) = &patch.url {
                bookmark.url = url.clone();
            }
            if let Some(title) = &patch.title {
                bookmark.title = title.clone();
            }
            if let Some(description) = &patch.description {
                bookmark.description = description.clone();
            }
            bookmark.updated_at = now();

            conn.execute(
                "UPDATE bookmarks SET url = ?1, title = ?2, description = ?3, folder_id = ?4, updated_at = ?5 \
                 WHERE id = ?6 AND user_id = ?7",
                params![
                    bookmark.url,
                    bookmark.title,
                    bookmark.description,
                    bookmark.folder_id,
                    bookmark.updated_at.timestamp_micros(),
                    id,
                    user_id
                ],
            )?;
            bookmark
        };
        self.feed().bookmarks.publish(user_id, ChangeEvent::Updated(bookmark.clone()));
        Ok(bookmark)
    }

    /// Clears `folder_id` on every bookmark of `user_id` in `folder_id`.
    #[instrument(skip_all, level = "debug")]
    pub fn clear_folder_references(&self, user_id: &str, folder_id: &str) -> Result<usize, StoreError> {
        let updated = {
            let conn = self.connection();
            let sql = format!(
                "SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE user_id = ?1 AND folder_id = ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id, folder_id], row_to_bookmark)?;
            let mut affected = rows.collect::<Result<Vec<_>, _>>()?;

            let ts = now();
            conn.execute(
                "UPDATE bookmarks SET folder_id = NULL, updated_at = ?1 WHERE user_id = ?2 AND folder_id = ?3",
                params![ts.timestamp_micros(), user_id, folder_id],
            )?;
            for bookmark in &mut affected {
                bookmark.folder_id = None;
                bookmark.updated_at = ts;
            }
            affected
        };
        let count = updated.len();
        for bookmark in updated {
            self.feed().bookmarks.publish(user_id, ChangeEvent::Updated(bookmark));
        }
        debug!(folder_id, count, "folder references cleared");
        Ok(count)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn delete_bookmark(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let bookmark = {
            let conn = self.connection();
            let bookmark = find_bookmark(&conn, user_id, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            conn.execute(
                "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            bookmark
        };
        self.feed().bookmarks.publish(user_id, ChangeEvent::Deleted(bookmark));
        Ok(())
    }

    // ─── Folders ───

    /// All folders of `user_id`, by name.
    #[instrument(skip_all, level = "debug")]
    pub fn select_folders(&self, user_id: &str) -> Result<Vec<Folder>, StoreError> {
        let conn = self.connection();
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ?1 ORDER BY LOWER(name), name, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], row_to_folder)?;
        let result = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(result)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn insert_folder(&self, user_id: &str, name: &str) -> Result<Folder, StoreError> {
        let ts = now();
        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: ts,
            updated_at: ts,
        };
        self.connection().execute(
            "INSERT INTO folders (id, user_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![folder.id, folder.user_id, folder.name, ts.timestamp_micros(), ts.timestamp_micros()],
        )?;
        self.feed().folders.publish(user_id, ChangeEvent::Inserted(folder.clone()));
        Ok(folder)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn rename_folder(&self, user_id: &str, id: &str, name: &str) -> Result<Folder, StoreError> {
        let folder = {
            let conn = self.connection();
            let mut folder = find_folder(&conn, user_id, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            folder.name = name.to_string();
            folder.updated_at = now();
            conn.execute(
                "UPDATE folders SET name = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                params![folder.name, folder.updated_at.timestamp_micros(), id, user_id],
            )?;
            folder
        };
        self.feed().folders.publish(user_id, ChangeEvent::Updated(folder.clone()));
        Ok(folder)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn delete_folder(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let folder = {
            let conn = self.connection();
            let folder = find_folder(&conn, user_id, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            conn.execute(
                "DELETE FROM folders WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            folder
        };
        self.feed().folders.publish(user_id, ChangeEvent::Deleted(folder));
        Ok(())
    }

    // ─── Tags ───

    /// All tags of `user_id`, by name.
    #[instrument(skip_all, level = "debug")]
    pub fn select_tags(&self, user_id: &str) -> Result<Vec<Tag>, StoreError> {
        let conn = self.connection();
        let sql = format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE user_id = ?1 ORDER BY LOWER(name), name, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], row_to_tag)?;
        let result = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(result)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn insert_tag(&self, user_id: &str, name: &str, color: &str) -> Result<Tag, StoreError> {
        let ts = now();
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            created_at: ts,
            updated_at: ts,
        };
        self.connection().execute(
            "INSERT INTO tags (id, user_id, name, color, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tag.id,
                tag.user_id,
                tag.name,
                tag.color,
                ts.timestamp_micros(),
                ts.timestamp_micros()
            ],
        )?;
        self.feed().tags.publish(user_id, ChangeEvent::Inserted(tag.clone()));
        Ok(tag)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn update_tag(&self, user_id: &str, id: &str, patch: &TagPatch) -> Result<Tag, StoreError> {
        let tag = {
            let conn = self.connection();
            let mut tag = find_tag(&conn, user_id, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if let Some(name) = &patch.name {
                tag.name = name.clone();
            }
            if let Some(color) = &patch.color {
                tag.color = color.clone();
            }
            tag.updated_at = now();
            conn.execute(
                "UPDATE tags SET name = ?1, color = ?2, updated_at = ?3 WHERE id = ?4 AND user_id = ?5",
                params![tag.name, tag.color, tag.updated_at.timestamp_micros(), id, user_id],
            )?;
            tag
        };
        self.feed().tags.publish(user_id, ChangeEvent::Updated(tag.clone()));
        Ok(tag)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn delete_tag(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let tag = {
            let conn = self.connection();
            let tag = find_tag(&conn, user_id, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            conn.execute("DELETE FROM tags WHERE id = ?1 AND user_id = ?2", params![id, user_id])?;
            tag
        };
        self.feed().tags.publish(user_id, ChangeEvent::Deleted(tag));
        Ok(())
    }

    // ─── Bookmark/tag associations ───

    /// All association rows whose bookmark belongs to `user_id`.
    #[instrument(skip_all, level = "debug")]
    pub fn select_bookmark_tags(&self, user_id: &str) -> Result<Vec<BookmarkTag>, StoreError> {
        select_associations(&self.connection(), user_id, "", None)
    }

    /// Links a bookmark to a tag. An existing pair is returned unchanged and not re-published.
    #[instrument(skip_all, level = "debug")]
    pub fn insert_bookmark_tag(
        &self,
        user_id: &str,
        bookmark_id: &str,
        tag_id: &str,
    ) -> Result<BookmarkTag, StoreError> {
        let (row, created) = {
            let conn = self.connection();
            if find_bookmark(&conn, user_id, bookmark_id)?.is_none() {
                return Err(StoreError::NotFound(bookmark_id.to_string()));
            }
            if find_tag(&conn, user_id, tag_id)?.is_none() {
                return Err(StoreError::TagNotFound(tag_id.to_string()));
            }
            let existing = conn
                .query_row(
                    "SELECT bookmark_id, tag_id, created_at FROM bookmark_tags WHERE bookmark_id = ?1 AND tag_id = ?2",
                    params![bookmark_id, tag_id],
                    row_to_bookmark_tag,
                )
                .optional()?;
            match existing {
                Some(row) => (row, false),
                None => {
                    let row = BookmarkTag {
                        bookmark_id: bookmark_id.to_string(),
                        tag_id: tag_id.to_string(),
                        created_at: now(),
                    };
                    conn.execute(
                        "INSERT INTO bookmark_tags (bookmark_id, tag_id, created_at) VALUES (?1, ?2, ?3)",
                        params![row.bookmark_id, row.tag_id, row.created_at.timestamp_micros()],
                    )?;
                    (row, true)
                }
            }
        };
        if created {
            self.feed().bookmark_tags.publish(user_id, ChangeEvent::Inserted(row.clone()));
        }
        Ok(row)
    }

    /// Removes one association. Returns false if the pair did not exist.
    #[instrument(skip_all, level = "debug")]
    pub fn delete_bookmark_tag(
        &self,
        user_id: &str,
        bookmark_id: &str,
        tag_id: &str,
    ) -> Result<bool, StoreError> {
        let removed = {
            let conn = self.connection();
            let rows = select_associations(&conn, user_id, "AND bt.bookmark_id = ?2", Some(bookmark_id))?;
            match rows.into_iter().find(|r| r.tag_id == tag_id) {
                Some(row) => {
                    conn.execute(
                        "DELETE FROM bookmark_tags WHERE bookmark_id = ?1 AND tag_id = ?2",
                        params![bookmark_id, tag_id],
                    )?;
                    Some(row)
                }
                None => None,
            }
        };
        match removed {
            Some(row) => {
                self.feed().bookmark_tags.publish(user_id, ChangeEvent::Deleted(row));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every association of one bookmark. Returns the number removed.
    #[instrument(skip_all, level = "debug")]
    pub fn delete_bookmark_tags_for_bookmark(
        &self,
        user_id: &str,
        bookmark_id: &str,
    ) -> Result<usize, StoreError> {
        let rows = {
            let conn = self.connection();
            let rows = select_associations(&conn, user_id, "AND bt.bookmark_id = ?2", Some(bookmark_id))?;
            if !rows.is_empty() {
                conn.execute("DELETE FROM bookmark_tags WHERE bookmark_id = ?1", params![bookmark_id])?;
            }
            rows
        };
        Ok(self.publish_association_deletes(user_id, rows))
    }

    /// Removes every association of one tag. Returns the number removed.
    #[instrument(skip_all, level = "debug")]
    pub fn delete_bookmark_tags_for_tag(&self, user_id: &str, tag_id: &str) -> Result<usize, StoreError> {
        let rows = {
            let conn = self.connection();
            if find_tag(&conn, user_id, tag_id)?.is_none() {
                return Ok(0);
            }
            let rows = select_associations(&conn, user_id, "AND bt.tag_id = ?2", Some(tag_id))?;
            if !rows.is_empty() {
                conn.execute("DELETE FROM bookmark_tags WHERE tag_id = ?1", params![tag_id])?;
            }
            rows
        };
        Ok(self.publish_association_deletes(user_id, rows))
    }

    fn publish_association_deletes(&self, user_id: &str, rows: Vec<BookmarkTag>) -> usize {
        let count = rows.len();
        for row in rows {
            self.feed().bookmark_tags.publish(user_id, ChangeEvent::Deleted(row));
        }
        count
    }
}
