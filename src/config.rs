//! Pipeline configuration: a YAML file, overridden field by field from the
//! command line.
//!
//! ```yaml
//! inputs:
//!   budget: data/Mojo_budget_update.csv
//!   imdb_movies: data/IMDb_movies.csv
//!   imdb_ratings: data/IMDb_ratings.csv
//!   bechdel: data/bechdel.json
//!   cpi: data/cpi.csv
//! output_dir: out
//! reference:
//!   year: 2019
//!   index: 255.657
//! min_country_movies: 50
//! ```

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{InputArgs, RunArgs},
    error::ConfigError,
    inflation::ReferencePrice,
    sources::SourceKind,
};

pub const DEFAULT_UNNEST_COLUMNS: [&str; 5] = ["genre", "country", "language", "director", "writer"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputPaths {
    pub budget: Option<PathBuf>,
    pub imdb_movies: Option<PathBuf>,
    pub imdb_ratings: Option<PathBuf>,
    pub bechdel: Option<PathBuf>,
    pub cpi: Option<PathBuf>,
}

impl InputPaths {
    pub fn get(&self, kind: SourceKind) -> Option<&Path> {
        match kind {
            SourceKind::Budget => self.budget.as_deref(),
            SourceKind::ImdbMovies => self.imdb_movies.as_deref(),
            SourceKind::ImdbRatings => self.imdb_ratings.as_deref(),
            SourceKind::Bechdel => self.bechdel.as_deref(),
            SourceKind::Cpi => self.cpi.as_deref(),
        }
    }

    /// The path of `kind`, or the error naming the flag that would supply it.
    pub fn require(&self, kind: SourceKind) -> Result<&Path, ConfigError> {
        self.get(kind)
            .ok_or(ConfigError::MissingInput(kind.name(), kind.flag()))
    }

    fn override_with(&mut self, args: &InputArgs) {
        let pairs = [
            (&mut self.budget, &args.budget),
            (&mut self.imdb_movies, &args.imdb_movies),
            (&mut self.imdb_ratings, &args.imdb_ratings),
            (&mut self.bechdel, &args.bechdel),
            (&mut self.cpi, &args.cpi),
        ];
        for (slot, value) in pairs {
            if let Some(path) = value {
                *slot = Some(path.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub inputs: InputPaths,
    pub output_dir: PathBuf,
    pub reference: ReferencePrice,
    pub min_country_movies: usize,
    pub multi_value_delimiter: String,
    pub unnest_columns: Vec<String>,
    pub threads: Option<usize>,
    pub input_encoding: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            output_dir: PathBuf::from("output"),
            reference: ReferencePrice::default(),
            min_country_movies: 50,
            multi_value_delimiter: ",".to_string(),
            unnest_columns: DEFAULT_UNNEST_COLUMNS.iter().map(|c| c.to_string()).collect(),
            threads: None,
            input_encoding: None,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))
    }

    /// Loads the file named by `--config` (if any) and applies the input flags.
    pub fn from_input_args(args: &InputArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.inputs.override_with(args);
        if let Some(encoding) = &args.input_encoding {
            config.input_encoding = Some(encoding.clone());
        }
        Ok(config)
    }

    pub fn from_run_args(args: &RunArgs) -> Result<Self> {
        let mut config = Self::from_input_args(&args.inputs)?;
        if let Some(dir) = &args.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(year) = args.reference_year {
            config.reference.year = year;
        }
        if let Some(index) = args.reference_index {
            config.reference.index = index;
        }
        if let Some(min) = args.min_country_movies {
            config.min_country_movies = min;
        }
        if let Some(threads) = args.threads {
            config.threads = Some(threads);
        }
        if let Some(delimiter) = &args.multi_value_delimiter {
            config.multi_value_delimiter = delimiter.clone();
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in SourceKind::ALL {
            self.inputs.require(kind)?;
        }
        if !(self.reference.index.is_finite() && self.reference.index > 0.0) {
            return Err(ConfigError::InvalidReferenceIndex(self.reference.index));
        }
        if self.multi_value_delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ConfigError::OutputNotDirectory(self.output_dir.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let yaml = "inputs:\n  cpi: cpi.csv\nreference:\n  year: 2020\n  index: 258.811\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.inputs.cpi, Some(PathBuf::from("cpi.csv")));
        assert_eq!(config.reference.year, 2020);
        assert_eq!(config.min_country_movies, 50);
        assert_eq!(config.unnest_columns.len(), 5);
    }

    #[test]
    fn yaml_rejects_unknown_fields() {
        let yaml = "reference_index: 1.0\n";
        assert!(serde_yaml::from_str::<PipelineConfig>(yaml).is_err());
    }

    #[test]
    fn validate_names_the_missing_input() {
        let mut config = PipelineConfig::default();
        config.inputs.budget = Some(PathBuf::from("budget.csv"));
        let err = config.validate().expect_err("missing inputs");
        assert!(err.to_string().contains("--imdb-movies"), "{err}");
    }

    #[test]
    fn validate_rejects_non_positive_reference_index() {
        let mut config = PipelineConfig::default();
        for kind in SourceKind::ALL {
            let path = Some(PathBuf::from(format!("{}.csv", kind.name())));
            match kind {
                SourceKind::Budget => config.inputs.budget = path,
                SourceKind::ImdbMovies => config.inputs.imdb_movies = path,
                SourceKind::ImdbRatings => config.inputs.imdb_ratings = path,
                SourceKind::Bechdel => config.inputs.bechdel = path,
                SourceKind::Cpi => config.inputs.cpi = path,
            }
        }
        config.reference.index = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidReferenceIndex(_))
        ));
    }
}
