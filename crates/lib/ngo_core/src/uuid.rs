//! Identifier generation.
//!
//! Principals get random v4 ids. Content documents get v7 ids so that their
//! natural order follows creation time.

use uuid::Uuid;

/// New principal id.
pub fn new_user_id() -> String {
    Uuid::new_v4().to_string()
}

/// New content document id (timestamp-sortable).
pub fn new_document_id() -> String {
    Uuid::now_v7().to_string()
}
