use log::debug;

use crate::{
    data::Value,
    dataset::{Dataset, Row},
    error::SchemaError,
};

/// Splits `raw` on `delimiter` and trims every token. An empty string yields a
/// single empty token.
pub fn split_tokens<'a>(raw: &'a str, delimiter: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    raw.split(delimiter).map(str::trim)
}

/// One output row per token of the cell at `column`, every other cell cloned.
/// A null cell has no tokens and produces no rows.
pub fn unnest_row(row: Row, column: usize, delimiter: &str) -> Vec<Row> {
    let raw = match row[column].as_ref() {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.as_display(),
        None => return Vec::new(),
    };
    split_tokens(&raw, delimiter)
        .map(|token| {
            let mut expanded = row.clone();
            expanded[column] = Some(Value::String(token.to_string()));
            expanded
        })
        .collect()
}

pub fn unnest(dataset: Dataset, column: &str, delimiter: &str) -> Result<Dataset, SchemaError> {
    let idx = dataset.require(column)?;
    Ok(dataset.flat_map_rows(|row| unnest_row(row, idx, delimiter)))
}

/// Unnests each column in turn. The final row multiset does not depend on the
/// order; intermediate row counts do.
pub fn unnest_all<S: AsRef<str>>(
    dataset: Dataset,
    columns: &[S],
    delimiter: &str,
) -> Result<Dataset, SchemaError> {
    columns.iter().try_fold(dataset, |current, column| {
        let before = current.len();
        let expanded = unnest(current, column.as_ref(), delimiter)?;
        debug!(
            "Unnested '{}': {} -> {} row(s)",
            column.as_ref(),
            before,
            expanded.len()
        );
        Ok(expanded)
    })
}
