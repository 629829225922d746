//! The research questions, each answered by one or more grouped tables over
//! the enriched datasets.

use crate::{
    aggregate::{Aggregate, GroupQuery},
    data::{Value, coerce_float, coerce_int},
    dataset::{Dataset, JoinSpec, SortKey},
    error::SchemaError,
    keys::KEY_COLUMN,
    labels::{decade_bucket, score_bucket},
    pipeline::{BINARY_PASS, TEST_RESULT},
};

pub const PERCENT_PASS: &str = "percent_pass";

/// Every output table, in the order they are written.
#[derive(Debug, Clone)]
pub struct AnalysisTables {
    pub time_trend: Dataset,
    pub country_pass: Dataset,
    pub genre_pass: Dataset,
    pub rating_pass: RatingPass,
    pub median_budget: Dataset,
    pub median_domestic_gross: Dataset,
    pub median_international_gross: Dataset,
    pub median_domestic_roi: Dataset,
    pub median_international_roi: Dataset,
}

impl AnalysisTables {
    pub fn into_named(self) -> Vec<(&'static str, Dataset)> {
        vec![
            ("time_trend", self.time_trend),
            ("country_pass", self.country_pass),
            ("genre_pass", self.genre_pass),
            ("rating_pass", self.rating_pass.overall),
            ("male_rating_pass", self.rating_pass.male),
            ("female_rating_pass", self.rating_pass.female),
            ("median_budget", self.median_budget),
            ("median_domestic_gross", self.median_domestic_gross),
            ("median_international_gross", self.median_international_gross),
            ("median_domestic_roi", self.median_domestic_roi),
            ("median_international_roi", self.median_international_roi),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct RatingPass {
    pub overall: Dataset,
    pub male: Dataset,
    pub female: Dataset,
}

/// Share of each test result within each decade of release.
///
/// Columns: `year_group, test_result, percent`. Within a decade the
/// percentages sum to one.
pub fn time_trend(bechdel: &Dataset) -> Result<Dataset, SchemaError> {
    let year = bechdel.require("year")?;
    let grouped = bechdel.clone().with_column("year_group", |row| {
        coerce_int(row[year].as_ref()).map(|y| Value::from(decade_bucket(y)))
    });

    let counts = GroupQuery::by(&["year_group", TEST_RESULT])
        .agg("num", Aggregate::count(KEY_COLUMN))
        .execute(&grouped)?;
    let totals = GroupQuery::by(&["year_group"])
        .agg("total", Aggregate::sum("num"))
        .execute(&counts)?;

    let joined = counts.inner_join(
        &totals,
        &JoinSpec::on("year_group", "year_group")
            .all_left()
            .right(&["total"]),
    )?;
    let (num_idx, total_idx) = (joined.require("num")?, joined.require("total")?);
    joined
        .with_column("percent", |row| {
            let num = coerce_float(row[num_idx].as_ref())?;
            let total = coerce_float(row[total_idx].as_ref()).filter(|t| *t > 0.0)?;
            Some(Value::Float(num / total))
        })
        .select(&["year_group", TEST_RESULT, "percent"])?
        .sort_by(&[SortKey::asc("year_group"), SortKey::asc(TEST_RESULT)])
        .map(|table| table.renamed("time_trend"))
}

/// Pass rate per production country, counting each film once per country.
/// Countries with `min_movies` films or fewer are left out.
pub fn country_pass(descriptive: &Dataset, min_movies: usize) -> Result<Dataset, SchemaError> {
    let films = descriptive.distinct(&["country", BINARY_PASS, KEY_COLUMN])?;
    let rates = GroupQuery::by(&["country"])
        .agg(PERCENT_PASS, Aggregate::mean(BINARY_PASS))
        .agg("number_of_movies", Aggregate::count_distinct(KEY_COLUMN))
        .order_by(SortKey::desc(PERCENT_PASS))
        .execute(&films)?;
    let movies = rates.require("number_of_movies")?;
    Ok(rates
        .filter(|row| {
            coerce_int(row[movies].as_ref()).is_some_and(|n| n > min_movies as i64)
        })
        .renamed("country_pass"))
}

/// Pass rate per genre over the fully unnested rows.
pub fn genre_pass(descriptive: &Dataset) -> Result<Dataset, SchemaError> {
    GroupQuery::by(&["genre"])
        .agg(PERCENT_PASS, Aggregate::mean(BINARY_PASS))
        .order_by(SortKey::desc(PERCENT_PASS))
        .execute(descriptive)
        .map(|table| table.renamed("genre_pass"))
}

const VOTE_BUCKETS: [(&str, &str); 3] = [
    ("avg_vote", "rating_group"),
    ("males_allages_avg_vote", "male_group"),
    ("females_allages_avg_vote", "female_group"),
];

/// Pass rate per star bucket of the overall, male and female vote averages.
pub fn rating_pass(descriptive: &Dataset) -> Result<RatingPass, SchemaError> {
    let mut films = descriptive.distinct(&[
        KEY_COLUMN,
        "avg_vote",
        "total_votes",
        "males_allages_avg_vote",
        "females_allages_avg_vote",
        BINARY_PASS,
    ])?;
    for (vote, bucket) in VOTE_BUCKETS {
        let idx = films.require(vote)?;
        films = films.with_column(bucket, |row| {
            coerce_float(row[idx].as_ref())
                .and_then(score_bucket)
                .map(Value::from)
        });
    }

    let by_bucket = |bucket: &str| -> Result<Dataset, SchemaError> {
        let idx = films.require(bucket)?;
        let bucketed = films.clone().filter(|row| row[idx].is_some());
        GroupQuery::by(&[bucket])
            .agg(PERCENT_PASS, Aggregate::mean(BINARY_PASS))
            .order_by(SortKey::asc(bucket))
            .order_by(SortKey::desc(PERCENT_PASS))
            .execute(&bucketed)
    };
    Ok(RatingPass {
        overall: by_bucket("rating_group")?.renamed("rating_pass"),
        male: by_bucket("male_group")?.renamed("male_rating_pass"),
        female: by_bucket("female_group")?.renamed("female_rating_pass"),
    })
}

/// Median of `column` per test result, ascending by the median.
pub fn median_by_result(
    financial: &Dataset,
    column: &str,
    alias: &str,
) -> Result<Dataset, SchemaError> {
    GroupQuery::by(&[TEST_RESULT])
        .agg(alias, Aggregate::median(column))
        .order_by(SortKey::asc(alias))
        .execute(financial)
}

pub fn run_all(
    bechdel: &Dataset,
    financial: &Dataset,
    descriptive: &Dataset,
    min_country_movies: usize,
    reference_year: i32,
) -> Result<AnalysisTables, SchemaError> {
    Ok(AnalysisTables {
        time_trend: time_trend(bechdel)?,
        country_pass: country_pass(descriptive, min_country_movies)?,
        genre_pass: genre_pass(descriptive)?,
        rating_pass: rating_pass(descriptive)?,
        median_budget: median_by_result(
            financial,
            "adj_budget",
            &format!("median_budget_{reference_year}"),
        )?,
        median_domestic_gross: median_by_result(
            financial,
            "adj_domgross",
            &format!("median_domgross_{reference_year}"),
        )?,
        median_international_gross: median_by_result(
            financial,
            "adj_intgross",
            &format!("median_intgross_{reference_year}"),
        )?,
        median_domestic_roi: median_by_result(financial, "dom_roi", "median_dom_roi")?,
        median_international_roi: median_by_result(financial, "int_roi", "median_int_roi")?,
    })
}
