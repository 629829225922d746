//! The five raw inputs: where their columns come from, what each must
//! contain, and how they are read into [`Dataset`]s.
//!
//! CSV columns are typed by scanning the whole column (integer, then float,
//! then string); JSON cells keep their JSON types. A source missing one of
//! its required columns fails the load.

use std::{collections::BTreeSet, fmt, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::info;
use rayon::prelude::*;

use crate::{
    config::InputPaths,
    data::{ColumnType, TypeCandidate, Value, parse_typed_value, type_of},
    dataset::{Dataset, Row},
    io_utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Budget,
    ImdbMovies,
    ImdbRatings,
    Bechdel,
    Cpi,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Budget,
        SourceKind::ImdbMovies,
        SourceKind::ImdbRatings,
        SourceKind::Bechdel,
        SourceKind::Cpi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Budget => "budget",
            SourceKind::ImdbMovies => "imdb_movies",
            SourceKind::ImdbRatings => "imdb_ratings",
            SourceKind::Bechdel => "bechdel",
            SourceKind::Cpi => "cpi",
        }
    }

    /// Command line flag supplying this input's path.
    pub fn flag(self) -> &'static str {
        match self {
            SourceKind::Budget => "budget",
            SourceKind::ImdbMovies => "imdb-movies",
            SourceKind::ImdbRatings => "imdb-ratings",
            SourceKind::Bechdel => "bechdel",
            SourceKind::Cpi => "cpi",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            SourceKind::Budget => &[
                "movie_id",
                "title",
                "release_date",
                "budget",
                "domestic",
                "international",
                "worldwide",
            ],
            SourceKind::ImdbMovies => &[
                "imdb_title_id",
                "title",
                "genre",
                "duration",
                "country",
                "language",
                "avg_vote",
                "director",
                "writer",
            ],
            SourceKind::ImdbRatings => &[
                "imdb_title_id",
                "total_votes",
                "males_allages_avg_vote",
                "females_allages_avg_vote",
            ],
            SourceKind::Bechdel => &["imdbid", "year", "rating", "title"],
            SourceKind::Cpi => &["Year", "Annual"],
        }
    }

    fn is_json(self) -> bool {
        matches!(self, SourceKind::Bechdel)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSchema {
    pub source: SourceKind,
    pub rows: usize,
    pub columns: Vec<(String, ColumnType)>,
}

impl fmt::Display for SourceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} rows)", self.source, self.rows)?;
        writeln!(f, "root")?;
        for (name, column_type) in &self.columns {
            writeln!(f, " |-- {name}: {column_type} (nullable = true)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub dataset: Dataset,
    pub schema: SourceSchema,
}

pub fn load(kind: SourceKind, path: &Path, encoding: &'static Encoding) -> Result<LoadedSource> {
    let (dataset, types) = if kind.is_json() {
        load_json(kind.name(), path, encoding)?
    } else {
        load_csv(kind.name(), path, encoding)?
    };
    dataset
        .require_all(kind.required_columns())
        .with_context(|| format!("Validating columns of the {kind} input {path:?}"))?;
    let schema = SourceSchema {
        source: kind,
        rows: dataset.len(),
        columns: dataset.columns().iter().cloned().zip(types).collect(),
    };
    info!("Loaded {} row(s) from {kind} input {path:?}", dataset.len());
    Ok(LoadedSource { dataset, schema })
}

fn load_csv(
    name: &str,
    path: &Path,
    encoding: &'static Encoding,
) -> Result<(Dataset, Vec<ColumnType>)> {
    let delimiter = io_utils::resolve_input_delimiter(path);
    let (headers, records) = io_utils::read_csv_text(path, delimiter, encoding)?;

    let mut candidates = vec![TypeCandidate::default(); headers.len()];
    for record in &records {
        for (candidate, cell) in candidates.iter_mut().zip(record) {
            candidate.observe(cell);
        }
    }
    let types: Vec<ColumnType> = candidates.iter().map(TypeCandidate::decide).collect();

    let rows: Vec<Row> = records
        .into_par_iter()
        .map(|record| {
            record
                .iter()
                .zip(&types)
                .map(|(cell, ty)| parse_typed_value(cell, *ty))
                .collect::<Row>()
        })
        .collect();
    Ok((Dataset::new(name, headers, rows), types))
}

fn json_to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Float)),
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        other => Some(Value::String(other.to_string())),
    }
}

fn load_json(
    name: &str,
    path: &Path,
    encoding: &'static Encoding,
) -> Result<(Dataset, Vec<ColumnType>)> {
    let records = io_utils::read_json_records(path, encoding)?;
    let columns: Vec<String> = records
        .iter()
        .flat_map(|record| record.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows: Vec<Row> = records
        .par_iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| record.get(column).and_then(json_to_value))
                .collect::<Row>()
        })
        .collect();

    let types = (0..columns.len())
        .map(|idx| {
            let mut seen = rows.iter().filter_map(|row| row[idx].as_ref().map(type_of));
            let first = seen.next();
            let uniform = seen.all(|ty| Some(ty) == first);
            match (first, uniform) {
                (Some(ty), true) => ty,
                _ => ColumnType::String,
            }
        })
        .collect();
    Ok((Dataset::new(name, columns, rows), types))
}

/// All five inputs, validated.
#[derive(Debug, Clone)]
pub struct Sources {
    pub budget: Dataset,
    pub imdb_movies: Dataset,
    pub imdb_ratings: Dataset,
    pub bechdel: Dataset,
    pub cpi: Dataset,
}

pub fn load_all(inputs: &InputPaths, encoding: &'static Encoding) -> Result<Sources> {
    let load_kind = |kind: SourceKind| -> Result<Dataset> {
        let path = inputs.require(kind)?;
        load(kind, path, encoding).map(|loaded| loaded.dataset)
    };
    Ok(Sources {
        budget: load_kind(SourceKind::Budget)?,
        imdb_movies: load_kind(SourceKind::ImdbMovies)?,
        imdb_ratings: load_kind(SourceKind::ImdbRatings)?,
        bechdel: load_kind(SourceKind::Bechdel)?,
        cpi: load_kind(SourceKind::Cpi)?,
    })
}
