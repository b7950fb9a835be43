use serde::{Deserialize, Serialize};

/// A single row change published by the store's change feed.
///
/// `Deleted` carries the row as it was before removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "row", rename_all = "snake_case")]
pub enum ChangeEvent<T> {
    Inserted(T),
    Updated(T),
    Deleted(T),
}

impl<T> ChangeEvent<T> {
    /// The row the event refers to.
    pub fn row(&self) -> &T {
        match self {
            ChangeEvent::Inserted(row) | ChangeEvent::Updated(row) | ChangeEvent::Deleted(row) => row,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted(_) => "inserted",
            ChangeEvent::Updated(_) => "updated",
            ChangeEvent::Deleted(_) => "deleted",
        }
    }
}
