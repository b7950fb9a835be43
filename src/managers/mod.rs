// Smart Bookmark data managers
// Each manager mirrors one table for the signed-in user and reports the outcome of its mutations as notices.

use std::fmt::Display;

use tracing::error;

use crate::services::notifier::Notifier;

pub mod bookmark_manager;
pub mod bookmark_tag_manager;
pub mod folder_manager;
pub mod mirror;
pub mod session_manager;
pub mod tag_manager;

/// Pushes a success or failure notice for `result` and logs failures.
pub(crate) fn report<T, E: Display>(
    notifier: &Notifier,
    result: Result<T, E>,
    success: &str,
    failure: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => notifier.success(success),
        Err(e) => {
            error!(error = %e, "{}", failure);
            notifier.error(failure);
        }
    }
    result
}
