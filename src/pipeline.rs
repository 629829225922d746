//! The join pipeline: two enriched datasets built from the five sources, and
//! the batch run that writes them together with every analysis table.
//!
//! Stages are fail-fast. Each output is written atomically once its stage
//! completes, so a later failure leaves earlier outputs in place.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    analysis,
    config::PipelineConfig,
    data::{Value, coerce_float, coerce_int},
    dataset::{Dataset, JoinSpec, SortKey},
    error::SchemaError,
    inflation::ReferencePrice,
    io_utils,
    keys::{KEY_COLUMN, with_normalized_key},
    labels::{binary_pass, test_result_label},
    sources::{self, Sources},
    unnest::unnest_all,
};

pub const TEST_RESULT: &str = "test_result";
pub const BINARY_PASS: &str = "binary_pass";

const MONEY_COLUMNS: [&str; 4] = ["budget", "domestic", "international", "worldwide"];

/// Raw monetary column and the inflation-adjusted column derived from it.
const ADJUSTED_COLUMNS: [(&str, &str); 4] = [
    ("budget", "adj_budget"),
    ("domestic", "adj_domgross"),
    ("international", "adj_intgross"),
    ("worldwide", "adj_wldgross"),
];

/// Adjusted gross column and the return-on-investment column derived from it.
const ROI_COLUMNS: [(&str, &str); 3] = [
    ("adj_domgross", "dom_roi"),
    ("adj_intgross", "int_roi"),
    ("adj_wldgross", "total_roi"),
];

/// Columns that never survive into the financial table.
const FINANCIAL_DROPPED: [&str; 4] = ["release_date", "Annual", "country", "language"];

const CPI_INDEX: &str = "Annual";

/// Gross over budget. A missing or zero budget has no ratio.
pub fn return_on_investment(gross: Option<f64>, budget: Option<f64>) -> Option<f64> {
    let budget = budget.filter(|b| *b != 0.0)?;
    let roi = gross? / budget;
    roi.is_finite().then_some(roi)
}

/// Adds `test_result` from the integer `rating` column. Ratings outside 0..=3
/// get a null label and are counted in a warning.
pub fn label_bechdel(dataset: Dataset) -> Result<Dataset, SchemaError> {
    let rating = dataset.require("rating")?;
    let out_of_domain = dataset
        .rows()
        .iter()
        .filter(|row| coerce_int(row[rating].as_ref()).and_then(test_result_label).is_none())
        .count();
    if out_of_domain > 0 {
        warn!(
            "{}: {out_of_domain} row(s) with a missing or out-of-range rating have no test result",
            dataset.name()
        );
    }
    Ok(dataset.with_column(TEST_RESULT, |row| {
        coerce_int(row[rating].as_ref())
            .and_then(test_result_label)
            .map(Value::from)
    }))
}

fn with_binary_pass(dataset: Dataset) -> Result<Dataset, SchemaError> {
    let rating = dataset.require("rating")?;
    Ok(dataset.with_column(BINARY_PASS, |row| {
        coerce_int(row[rating].as_ref()).map(|r| Value::Integer(binary_pass(r)))
    }))
}

/// Cells of `column` that hold a value but do not read as a finite number.
pub fn unparseable_cells(dataset: &Dataset, column: &str) -> Result<usize, SchemaError> {
    let idx = dataset.require(column)?;
    Ok(dataset
        .rows()
        .iter()
        .filter(|row| row[idx].is_some() && coerce_float(row[idx].as_ref()).is_none())
        .count())
}

fn coerce_to_float(dataset: Dataset, columns: &[&str]) -> Result<Dataset, SchemaError> {
    columns.iter().try_fold(dataset, |current, column| {
        let unparseable = unparseable_cells(&current, column)?;
        if unparseable > 0 {
            warn!(
                "{}: {unparseable} non-numeric '{column}' cell(s) read as null",
                current.name()
            );
        }
        current.map_column(column, |value| coerce_float(value).map(Value::Float))
    })
}

/// Bechdel x budget x CPI, restated at `reference` prices, labeled, with
/// return on investment.
pub fn build_financial(
    bechdel: &Dataset,
    budget: &Dataset,
    cpi: &Dataset,
    reference: ReferencePrice,
) -> Result<Dataset, SchemaError> {
    let budget = with_normalized_key(budget.clone(), "movie_id")?;
    let budget = coerce_to_float(budget, &MONEY_COLUMNS)?;

    let joined = bechdel
        .inner_join(
            &budget,
            &JoinSpec::on(KEY_COLUMN, KEY_COLUMN)
                .left(&[KEY_COLUMN, "year"])
                .right(&["title"])
                .left(&["rating"])
                .right(&["release_date"])
                .right(&MONEY_COLUMNS),
        )?
        .sort_by(&[SortKey::asc("year")])?;
    info!("Financial join matched {} row(s)", joined.len());

    let priced = joined.inner_join(
        cpi,
        &JoinSpec::on("year", "Year").all_left().right(&[CPI_INDEX]),
    )?;
    let cpi_idx = priced.require(CPI_INDEX)?;
    let mut adjusted = priced;
    for (raw, target) in ADJUSTED_COLUMNS {
        let raw_idx = adjusted.require(raw)?;
        adjusted = adjusted.with_column(target, |row| {
            let value = coerce_float(row[raw_idx].as_ref())?;
            let origin = coerce_float(row[cpi_idx].as_ref())?;
            reference.adjust(value, origin).map(Value::Float)
        });
    }

    let mut financial = label_bechdel(adjusted)?.drop_columns(&FINANCIAL_DROPPED);
    let budget_idx = financial.require("adj_budget")?;
    for (gross, target) in ROI_COLUMNS {
        let gross_idx = financial.require(gross)?;
        financial = financial.with_column(target, |row| {
            return_on_investment(
                coerce_float(row[gross_idx].as_ref()),
                coerce_float(row[budget_idx].as_ref()),
            )
            .map(Value::Float)
        });
    }
    Ok(financial.renamed("financial"))
}

/// Bechdel x IMDb movies x IMDb ratings, labeled and unnested on every
/// multi-valued column.
pub fn build_descriptive(
    bechdel: &Dataset,
    movies: &Dataset,
    ratings: &Dataset,
    delimiter: &str,
    unnest_columns: &[String],
) -> Result<Dataset, SchemaError> {
    let movies = with_normalized_key(movies.clone(), "imdb_title_id")?;
    let ratings = with_normalized_key(ratings.clone(), "imdb_title_id")?;

    let joined = bechdel
        .inner_join(
            &movies,
            &JoinSpec::on(KEY_COLUMN, KEY_COLUMN)
                .left(&[KEY_COLUMN, "year"])
                .right(&["title"])
                .left(&["rating"])
                .right(&[
                    "genre", "duration", "country", "language", "avg_vote", "director", "writer",
                ]),
        )?
        .sort_by(&[SortKey::asc("year")])?;
    let rated = joined.inner_join(
        &ratings,
        &JoinSpec::on(KEY_COLUMN, KEY_COLUMN).all_left().right(&[
            "total_votes",
            "males_allages_avg_vote",
            "females_allages_avg_vote",
        ]),
    )?;
    info!("Descriptive join matched {} film(s)", rated.len());

    let labeled = coerce_to_float(label_bechdel(rated)?, &["avg_vote"])?;
    let expanded = unnest_all(labeled, unnest_columns, delimiter)?;
    info!("Descriptive rows after unnesting: {}", expanded.len());
    Ok(with_binary_pass(expanded)?.renamed("descriptive"))
}

/// Owns the configuration and the worker pool every stage runs on.
pub struct Session {
    config: PipelineConfig,
    pool: ThreadPool,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().context("Building worker pool")?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn label(&self, bechdel: &Dataset) -> Result<Dataset, SchemaError> {
        self.pool.install(|| label_bechdel(bechdel.clone()))
    }

    pub fn financial(&self, sources: &Sources) -> Result<Dataset, SchemaError> {
        self.pool.install(|| {
            build_financial(
                &sources.bechdel,
                &sources.budget,
                &sources.cpi,
                self.config.reference,
            )
        })
    }

    pub fn descriptive(&self, sources: &Sources) -> Result<Dataset, SchemaError> {
        self.pool.install(|| {
            build_descriptive(
                &sources.bechdel,
                &sources.imdb_movies,
                &sources.imdb_ratings,
                &self.config.multi_value_delimiter,
                &self.config.unnest_columns,
            )
        })
    }

    /// Builds both branches concurrently.
    pub fn enrich(
        &self,
        sources: &Sources,
    ) -> (Result<Dataset, SchemaError>, Result<Dataset, SchemaError>) {
        self.pool
            .install(|| rayon::join(|| self.financial(sources), || self.descriptive(sources)))
    }

    pub fn analyze(
        &self,
        labeled: &Dataset,
        financial: &Dataset,
        descriptive: &Dataset,
    ) -> Result<analysis::AnalysisTables, SchemaError> {
        self.pool.install(|| {
            analysis::run_all(
                labeled,
                financial,
                descriptive,
                self.config.min_country_movies,
                self.config.reference.year,
            )
        })
    }

    /// Runs the whole batch and returns the paths written, in write order.
    pub fn run(&self) -> Result<Vec<PathBuf>> {
        let config = &self.config;
        config.validate()?;
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("Creating output directory {:?}", config.output_dir))?;
        let encoding = io_utils::resolve_encoding(config.input_encoding.as_deref())?;
        let mut written = Vec::new();

        let sources = sources::load_all(&config.inputs, encoding).context("Stage 'load' failed")?;

        let labeled = self.label(&sources.bechdel).context("Stage 'label' failed")?;
        written.push(write_output(&config.output_dir, "label", "bechdel_labeled", &labeled)?);

        let (financial, descriptive) = self.enrich(&sources);
        let financial = financial.context("Stage 'financial' failed")?;
        written.push(write_output(&config.output_dir, "financial", "financial", &financial)?);
        let descriptive = descriptive.context("Stage 'descriptive' failed")?;
        written.push(write_output(
            &config.output_dir,
            "descriptive",
            "descriptive",
            &descriptive,
        )?);

        let tables = self
            .analyze(&labeled, &financial, &descriptive)
            .context("Stage 'analysis' failed")?;
        for (stem, table) in tables.into_named() {
            written.push(write_output(&config.output_dir, "analysis", stem, &table)?);
        }
        info!(
            "Wrote {} table(s) to {:?}",
            written.len(),
            config.output_dir
        );
        Ok(written)
    }
}

fn write_output(dir: &Path, stage: &str, stem: &str, dataset: &Dataset) -> Result<PathBuf> {
    let path = dir.join(format!("{stem}.csv"));
    io_utils::write_dataset(&path, dataset)
        .with_context(|| format!("Stage '{stage}' failed: writing {path:?}"))?;
    info!("{stem}: {} row(s) -> {path:?}", dataset.len());
    Ok(path)
}

/// Runs the batch described by `config` on a fresh [`Session`].
pub fn run(config: PipelineConfig) -> Result<Vec<PathBuf>> {
    Session::new(config)?.run()
}
