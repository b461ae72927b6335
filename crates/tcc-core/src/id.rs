//! Identifier generation for transactions and tasks.

use uuid::Uuid;

/// Generate a new transaction or task id.
///
/// UUIDv7 embeds a millisecond timestamp in its high bits, so ids sort
/// roughly in creation order -- useful for `ORDER BY id` scans and for
/// reading log output in a sane sequence without a separate timestamp
/// column.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_are_version_7() {
        let id = new_id();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn ids_sort_in_creation_order() {
        let a = new_id();
        let b = new_id();
        assert!(a < b, "ids should be roughly monotonic");
    }
}
