use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named series of values. Column 0 of a frame holds the independent
/// variable (x-axis or index); the remaining columns hold dependent series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub name: Option<String>,
    pub values: Vec<Value>,
}

/// Ordered sequence of equal-length columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    pub columns: Vec<Column>,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Create a Frame from a JSON array of `{name, values}` columns.
    pub fn from_json(value: &Value) -> Result<Self> {
        let frame: Frame = serde_json::from_value(value.clone())
            .map_err(|e| anyhow!("frame must be a JSON array of {{name, values}} columns: {e}"))?;
        frame.validate()?;
        Ok(frame)
    }

    /// Create a Frame from CSV with a header row. The first column becomes
    /// the independent variable; fields that parse as numbers become JSON
    /// numbers, everything else stays a string.
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| anyhow!("failed to read CSV headers: {e}"))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() {
            bail!("CSV input has no columns");
        }

        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column {
                name: Some(name),
                values: Vec::new(),
            })
            .collect();

        let mut row_count = 0usize;
        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| anyhow!("failed to read CSV record {}: {e}", idx + 1))?;
            if record.len() != columns.len() {
                bail!(
                    "CSV record {} has {} fields, expected {}",
                    idx + 1,
                    record.len(),
                    columns.len()
                );
            }
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.values.push(csv_value(field));
            }
            row_count += 1;
        }
        if row_count == 0 {
            bail!("CSV input must contain at least one data row");
        }

        Ok(Self { columns })
    }

    /// Check the frame invariant: every column has the same length as column 0.
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.columns.first() else {
            return Ok(());
        };
        let expected = first.values.len();
        for column in &self.columns[1..] {
            if column.values.len() != expected {
                bail!(
                    "column '{}' has {} values, expected {} (length of column 0)",
                    column.name.as_deref().unwrap_or("<unnamed>"),
                    column.values.len(),
                    expected
                );
            }
        }
        Ok(())
    }

    /// Number of rows, taken from column 0.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn csv_value(field: &str) -> Value {
    if let Ok(n) = field.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = field.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::from(field)
}
