/// Result of an insert keyed on a natural unique key.
///
/// Implementations use `ON CONFLICT DO NOTHING` (or an equivalent atomic
/// check) so that concurrent inserts of the same key yield exactly one
/// `Inserted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Row was inserted (first time seeing this key).
    Inserted,
    /// A row with the same key already exists; nothing was written.
    AlreadyExists,
}

impl InsertResult {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted)
    }

    /// Maps the row count of an `INSERT ... ON CONFLICT DO NOTHING`.
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 {
            InsertResult::AlreadyExists
        } else {
            InsertResult::Inserted
        }
    }
}
