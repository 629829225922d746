//! Immutable in-memory tables and the relational operations the pipeline is
//! built from.
//!
//! A [`Dataset`] is a named list of columns plus rows of nullable [`Value`]
//! cells. Every operation returns a new dataset; inputs are never modified
//! behind a caller's back. Column references are resolved once, up front, and
//! a missing column is reported as a [`SchemaError`] before any row is
//! touched.
//!
//! Row-wise operations run on the current rayon pool and keep row order.

use std::collections::{HashMap, HashSet};

use log::debug;
use rayon::prelude::*;

use crate::{
    data::{Value, compare_cells, composite_key, key_fragment},
    error::SchemaError,
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Convenience constructor for literal tables, mostly used by tests.
    pub fn from_literal(name: &str, columns: &[&str], rows: Vec<Row>) -> Self {
        Self::new(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            rows,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_parts(self) -> (String, Vec<String>, Vec<Row>) {
        (self.name, self.columns, self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require(&self, name: &str) -> Result<usize, SchemaError> {
        self.column_index(name)
            .ok_or_else(|| SchemaError::MissingColumn {
                dataset: self.name.clone(),
                column: name.to_string(),
            })
    }

    pub fn require_all(&self, names: &[&str]) -> Result<Vec<usize>, SchemaError> {
        names.iter().map(|name| self.require(name)).collect()
    }

    /// Cell lookup by column name; `None` for nulls, unknown columns and
    /// out-of-range rows alike.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<Option<&Value>>, SchemaError> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_ref()).collect())
    }

    /// Appends a column computed from each row, or replaces it when a column
    /// of that name already exists.
    pub fn with_column<F>(self, name: &str, derive: F) -> Self
    where
        F: Fn(&[Option<Value>]) -> Option<Value> + Sync + Send,
    {
        let Dataset {
            name: dataset_name,
            mut columns,
            rows,
        } = self;
        let existing = columns.iter().position(|c| c == name);
        if existing.is_none() {
            columns.push(name.to_string());
        }
        let rows: Vec<Row> = rows
            .into_par_iter()
            .map(|mut row| {
                let value = derive(&row);
                match existing {
                    Some(idx) => row[idx] = value,
                    None => row.push(value),
                }
                row
            })
            .collect();
        Dataset {
            name: dataset_name,
            columns,
            rows,
        }
    }

    /// Rewrites one column cell by cell.
    pub fn map_column<F>(self, name: &str, map: F) -> Result<Self, SchemaError>
    where
        F: Fn(Option<&Value>) -> Option<Value> + Sync + Send,
    {
        let idx = self.require(name)?;
        Ok(self.with_column(name, |row| map(row[idx].as_ref())))
    }

    pub fn select(&self, names: &[&str]) -> Result<Self, SchemaError> {
        let indices = self.require_all(names)?;
        let rows: Vec<Row> = self
            .rows
            .par_iter()
            .map(|row| indices.iter().map(|idx| row[*idx].clone()).collect::<Row>())
            .collect();
        Ok(Dataset {
            name: self.name.clone(),
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Removes the named columns. Names that are not present are ignored.
    pub fn drop_columns(self, names: &[&str]) -> Self {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !names.contains(&c.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        if keep.len() == self.columns.len() {
            return self;
        }
        let columns = keep.iter().map(|idx| self.columns[*idx].clone()).collect();
        let rows: Vec<Row> = self
            .rows
            .into_par_iter()
            .map(|mut row| {
                keep.iter()
                    .map(|idx| row[*idx].take())
                    .collect::<Row>()
            })
            .collect();
        Dataset {
            name: self.name,
            columns,
            rows,
        }
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&[Option<Value>]) -> bool + Sync + Send,
    {
        let rows: Vec<Row> = self
            .rows
            .into_par_iter()
            .filter(|row| predicate(row))
            .collect();
        Dataset {
            name: self.name,
            columns: self.columns,
            rows,
        }
    }

    /// Expands every row into zero or more rows.
    pub fn flat_map_rows<F>(self, expand: F) -> Self
    where
        F: Fn(Row) -> Vec<Row> + Sync + Send,
    {
        let rows: Vec<Row> = self
            .rows
            .into_par_iter()
            .flat_map_iter(expand)
            .collect();
        Dataset {
            name: self.name,
            columns: self.columns,
            rows,
        }
    }

    /// Projects onto `names` and keeps the first occurrence of each distinct
    /// projected row.
    pub fn distinct(&self, names: &[&str]) -> Result<Self, SchemaError> {
        let projected = self.select(names)?;
        let mut seen = HashSet::with_capacity(projected.rows.len());
        let rows: Vec<Row> = projected
            .rows
            .into_iter()
            .filter(|row| seen.insert(composite_key(row.iter().map(Option::as_ref))))
            .collect();
        Ok(Dataset {
            name: projected.name,
            columns: projected.columns,
            rows,
        })
    }

    /// Stable multi-key sort; nulls sort first in ascending order.
    pub fn sort_by(self, keys: &[SortKey]) -> Result<Self, SchemaError> {
        let resolved = keys
            .iter()
            .map(|key| self.require(&key.column).map(|idx| (idx, key.descending)))
            .collect::<Result<Vec<_>, SchemaError>>()?;
        let mut rows = self.rows;
        rows.par_sort_by(|a, b| {
            resolved
                .iter()
                .map(|(idx, descending)| {
                    let ordering = compare_cells(a[*idx].as_ref(), b[*idx].as_ref());
                    if *descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Dataset {
            name: self.name,
            columns: self.columns,
            rows,
        })
    }

    /// Hash inner join: rows whose key has no partner on the other side, and
    /// rows whose key is null, are left out of the result.
    pub fn inner_join(&self, right: &Dataset, spec: &JoinSpec) -> Result<Self, SchemaError> {
        let left_key = self.require(&spec.left_key)?;
        let right_key = right.require(&spec.right_key)?;
        let output = spec.resolve(self, right)?;

        let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, row) in right.rows.iter().enumerate() {
            if let Some(value) = row[right_key].as_ref() {
                lookup
                    .entry(key_fragment(Some(value)))
                    .or_default()
                    .push(idx);
            }
        }

        let (lookup_ref, output_ref) = (&lookup, &output);
        let rows: Vec<Row> = self
            .rows
            .par_iter()
            .flat_map_iter(|left_row| {
                let matches = left_row[left_key]
                    .as_ref()
                    .and_then(|value| lookup_ref.get(&key_fragment(Some(value))))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                matches.iter().map(move |right_idx| {
                    let right_row = &right.rows[*right_idx];
                    output_ref
                        .iter()
                        .map(|(side, idx, _)| match side {
                            Side::Left => left_row[*idx].clone(),
                            Side::Right => right_row[*idx].clone(),
                        })
                        .collect::<Row>()
                })
            })
            .collect();

        let unmatched = self
            .rows
            .iter()
            .filter(|row| {
                row[left_key]
                    .as_ref()
                    .is_none_or(|value| !lookup.contains_key(&key_fragment(Some(value))))
            })
            .count();
        debug!(
            "Join {} x {} on {} = {}: {} row(s) out, {} left row(s) without a match",
            self.name,
            right.name,
            spec.left_key,
            spec.right_key,
            rows.len(),
            unmatched
        );

        Ok(Dataset {
            name: format!("{}_{}", self.name, right.name),
            columns: output.into_iter().map(|(_, _, name)| name).collect(),
            rows,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum JoinColumn {
    Named(Side, String),
    AllLeft,
}

/// Join keys and the projected output columns, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    left_key: String,
    right_key: String,
    output: Vec<JoinColumn>,
}

impl JoinSpec {
    pub fn on(left_key: &str, right_key: &str) -> Self {
        Self {
            left_key: left_key.to_string(),
            right_key: right_key.to_string(),
            output: Vec::new(),
        }
    }

    pub fn left(mut self, columns: &[&str]) -> Self {
        self.output.extend(
            columns
                .iter()
                .map(|c| JoinColumn::Named(Side::Left, c.to_string())),
        );
        self
    }

    pub fn right(mut self, columns: &[&str]) -> Self {
        self.output.extend(
            columns
                .iter()
                .map(|c| JoinColumn::Named(Side::Right, c.to_string())),
        );
        self
    }

    /// Every left column, in the left dataset's order.
    pub fn all_left(mut self) -> Self {
        self.output.push(JoinColumn::AllLeft);
        self
    }

    fn resolve(
        &self,
        left: &Dataset,
        right: &Dataset,
    ) -> Result<Vec<(Side, usize, String)>, SchemaError> {
        let mut resolved = Vec::new();
        for column in &self.output {
            match column {
                JoinColumn::AllLeft => resolved.extend(
                    left.columns
                        .iter()
                        .enumerate()
                        .map(|(idx, name)| (Side::Left, idx, name.clone())),
                ),
                JoinColumn::Named(Side::Left, name) => {
                    resolved.push((Side::Left, left.require(name)?, name.clone()))
                }
                JoinColumn::Named(Side::Right, name) => {
                    resolved.push((Side::Right, right.require(name)?, name.clone()))
                }
            }
        }
        let mut seen = HashSet::new();
        for (_, _, name) in &resolved {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    dataset: format!("{}_{}", left.name, right.name),
                    column: name.clone(),
                });
            }
        }
        Ok(resolved)
    }
}
