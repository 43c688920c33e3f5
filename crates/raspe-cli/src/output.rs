use anyhow::{bail, Result};
use raspe_core::Table;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => bail!("Unknown format: {other}"),
        }
    }
}

/// Write `table` to `writer`. CSV columns are the union of row columns;
/// missing cells are empty.
pub fn write_table(table: &Table, format: OutputFormat, mut writer: impl Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, table)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => {
            let columns = table.columns();
            let mut csv = csv::Writer::from_writer(writer);
            if !columns.is_empty() {
                csv.write_record(&columns)?;
            }
            for row in table.rows() {
                csv.write_record(columns.iter().map(|c| row.get(c).unwrap_or_default()))?;
            }
            csv.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use raspe_core::Row;

    fn table() -> Table {
        Table::from(vec![
            Row::new().with("link", "https://a").with("titulo", "Um, dois"),
            Row::new().with("link", "https://b").with("termo_busca", "x"),
        ])
    }

    #[test]
    fn test_format_names() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_csv_uses_column_union() {
        let mut out = Vec::new();
        write_table(&table(), OutputFormat::Csv, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "link,titulo,termo_busca\nhttps://a,\"Um, dois\",\nhttps://b,,x\n"
        );
    }

    #[test]
    fn test_json_rows() {
        let mut out = Vec::new();
        write_table(&table(), OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["titulo"], "Um, dois");
        assert_eq!(value[1]["termo_busca"], "x");
    }

    #[test]
    fn test_empty_table() {
        let mut out = Vec::new();
        write_table(&Table::new(), OutputFormat::Csv, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
