//! Id generation for server-created todos.

use crate::model::todo::TodoId;
use uuid::Uuid;

/// Source of collision-resistant opaque ids for appended todos.
pub trait IdGenerator {
    fn next_id(&self) -> TodoId;
}

/// Random UUID v4 ids in hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> TodoId {
        Uuid::new_v4().to_string()
    }
}
