//! Table mapping metadata.
//!
//! Describes how an entity lands in PostgreSQL so schema generation and the
//! in-memory repository agree on table, sequence and column layout.

/// Identifier sequence backing a table's primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSequence {
    pub name: &'static str,
    pub start: i64,
    /// Allocation size; ids advance by this much per insert
    pub increment: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub name: &'static str,
    pub sql_type: &'static str,
}

impl ColumnMapping {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            sql_type: "TEXT",
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            sql_type: "INTEGER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMapping {
    pub table: &'static str,
    pub id_column: &'static str,
    pub sequence: IdSequence,
    /// Non-key columns in insert order
    pub columns: &'static [ColumnMapping],
}

#[cfg(test)]
mod tests {
    use crate::models::Storm;

    #[test]
    fn test_sequence_starts_at_ten() {
        let sequence = Storm::MAPPING.sequence;
        assert_eq!(sequence.name, "storms_id_generator");
        assert_eq!((sequence.start, sequence.increment), (10, 1));
    }

    #[test]
    fn test_columns_in_insert_order() {
        assert_eq!(
            Storm::MAPPING
                .columns
                .iter()
                .map(|c| c.name)
                .collect::<Vec<_>>(),
            vec![
                "start_date",
                "end_date",
                "start_location",
                "end_location",
                "type",
                "intensity"
            ]
        );
    }
}
