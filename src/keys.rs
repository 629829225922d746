use log::{debug, warn};

use crate::{
    data::Value,
    dataset::{Dataset, Row},
    error::{KeyError, SchemaError},
};

/// Length of the `tt` prefix carried by IMDb title identifiers.
pub const IMDB_PREFIX_LEN: usize = 2;

/// Name of the derived join key shared by every source.
pub const KEY_COLUMN: &str = "imdbid";

/// Strips the first `prefix_len` characters of an identifier.
///
/// The prefix is removed unconditionally, whatever it contains, so applying
/// this to an already-bare identifier removes two more digits: the operation
/// is not idempotent.
pub fn strip_prefix(value: &str, prefix_len: usize) -> Result<&str, KeyError> {
    match value.char_indices().nth(prefix_len) {
        Some((offset, _)) => Ok(&value[offset..]),
        None if value.chars().count() == prefix_len => Ok(""),
        None => Err(KeyError::TooShort {
            value: value.to_string(),
            prefix_len,
        }),
    }
}

pub fn normalize_key(value: &str) -> Result<&str, KeyError> {
    strip_prefix(value, IMDB_PREFIX_LEN)
}

/// Appends [`KEY_COLUMN`] derived from `source_column`.
///
/// Rows whose identifier is null or too short to carry the prefix cannot be
/// joined; they are dropped with a warning rather than failing the stage.
pub fn with_normalized_key(dataset: Dataset, source_column: &str) -> Result<Dataset, SchemaError> {
    let source = dataset.require(source_column)?;
    let (name, mut columns, rows) = dataset.into_parts();
    let existing = columns.iter().position(|c| c == KEY_COLUMN);
    if existing.is_none() {
        columns.push(KEY_COLUMN.to_string());
    }

    let mut skipped = 0usize;
    let mut keyed: Vec<Row> = Vec::with_capacity(rows.len());
    for mut row in rows {
        let key = match row[source].as_ref().map(Value::as_display) {
            Some(raw) => match normalize_key(&raw) {
                Ok(key) => Value::String(key.to_string()),
                Err(err) => {
                    skipped += 1;
                    debug!("{name}: {err}");
                    continue;
                }
            },
            None => {
                skipped += 1;
                continue;
            }
        };
        match existing {
            Some(idx) => row[idx] = Some(key),
            None => row.push(Some(key)),
        }
        keyed.push(row);
    }
    if skipped > 0 {
        warn!(
            "{name}: skipped {skipped} row(s) with a missing or malformed '{source_column}' identifier"
        );
    }
    Ok(Dataset::new(name, columns, keyed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_strips_tt_prefix() {
        assert_eq!(normalize_key("tt0133093"), Ok("0133093"));
        assert_eq!(normalize_key("tt"), Ok(""));
    }

    #[test]
    fn normalize_key_is_not_idempotent_on_bare_ids() {
        assert_eq!(normalize_key("0133093"), Ok("33093"));
    }

    #[test]
    fn normalize_key_rejects_short_identifiers() {
        assert_eq!(
            normalize_key("t"),
            Err(KeyError::TooShort {
                value: "t".to_string(),
                prefix_len: 2
            })
        );
    }

    #[test]
    fn with_normalized_key_skips_malformed_rows() {
        let raw = Dataset::from_literal(
            "budget",
            &["movie_id", "title"],
            vec![
                vec![Some(Value::from("tt0499549")), Some(Value::from("Avatar"))],
                vec![Some(Value::from("x")), Some(Value::from("Broken"))],
                vec![None, Some(Value::from("Unknown"))],
            ],
        );
        let keyed = with_normalized_key(raw, "movie_id").expect("keyed");
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed.value(0, KEY_COLUMN), Some(&Value::from("0499549")));
    }

    #[test]
    fn with_normalized_key_requires_source_column() {
        let raw = Dataset::from_literal("ratings", &["title"], Vec::new());
        assert!(with_normalized_key(raw, "imdb_title_id").is_err());
    }
}
