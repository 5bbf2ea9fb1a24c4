use csv::ReaderBuilder;
use serde::Serialize;

use crate::error::Result;

/// Tab-separated result file parsed into a header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column; short rows yield `None`.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let index = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(String::as_str))
                .collect(),
        )
    }
}

pub fn parse_tsv(data: &[u8]) -> Result<ResultTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(data);

    let columns = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(ResultTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_rows() {
        let data = b"File.Name\tProtein.Group\tQ.Value\n\
                     run1.raw\tP12345\t0.001\n\
                     run1.raw\tQ67890\t0.004\n";
        let table = parse_tsv(data).unwrap();
        assert_eq!(table.columns, vec!["File.Name", "Protein.Group", "Q.Value"]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column("Protein.Group").unwrap(),
            vec![Some("P12345"), Some("Q67890")]
        );
        assert!(table.column("Missing").is_none());
    }

    #[test]
    fn test_quotes_are_literal_and_short_rows_tolerated() {
        let data = b"a\tb\n\"x\n1\t2\n";
        let table = parse_tsv(data).unwrap();
        assert_eq!(table.rows[0], vec!["\"x"]);
        assert_eq!(table.column("b").unwrap(), vec![None, Some("2")]);
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let table = parse_tsv(b"a\tb\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 2);
    }
}
