use crate::protocol::types::SqlType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub name: String,
    pub sql_type: SqlType,
}

/// Fully materialised rows of one result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBuffer {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Vec<Option<Vec<u8>>>>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, name: String, sql_type: SqlType) {
        self.columns.push(ColumnMetadata { name, sql_type });
    }

    pub fn add_row(&mut self, row: Vec<Option<Vec<u8>>>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Zero-based index of the first column named `name`, ignoring case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_buffer_counts() {
        let mut buffer = RowBuffer::new();
        buffer.add_column("id".to_string(), SqlType::Integer);
        buffer.add_column("name".to_string(), SqlType::Varchar);
        buffer.add_row(vec![Some(b"1".to_vec()), Some(b"Alice".to_vec())]);
        buffer.add_row(vec![Some(b"2".to_vec()), None]);

        assert_eq!(buffer.column_count(), 2);
        assert_eq!(buffer.row_count(), 2);
    }

    #[test]
    fn test_column_index_is_case_insensitive() {
        let mut buffer = RowBuffer::new();
        buffer.add_column("GENERATED_KEY".to_string(), SqlType::Integer);

        assert_eq!(buffer.column_index("generated_key"), Some(0));
        assert_eq!(buffer.column_index("missing"), None);
    }
}
