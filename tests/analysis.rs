mod common;

use std::collections::BTreeMap;

use bechdel_insights::{
    analysis::{self, PERCENT_PASS},
    config::{InputPaths, PipelineConfig},
    data::{Value, coerce_float, coerce_int},
    dataset::Dataset,
    pipeline::{Session, TEST_RESULT},
    sources,
};
use common::TestWorkspace;

struct Enriched {
    labeled: Dataset,
    financial: Dataset,
    descriptive: Dataset,
}

fn enriched() -> Enriched {
    let workspace = TestWorkspace::new();
    let paths = workspace.write_sources();
    let config = PipelineConfig {
        inputs: InputPaths {
            budget: Some(paths.budget),
            imdb_movies: Some(paths.imdb_movies),
            imdb_ratings: Some(paths.imdb_ratings),
            bechdel: Some(paths.bechdel),
            cpi: Some(paths.cpi),
        },
        ..PipelineConfig::default()
    };
    let loaded = sources::load_all(&config.inputs, encoding_rs::UTF_8).expect("load");
    let session = Session::new(config).expect("session");
    let labeled = session.label(&loaded.bechdel).expect("label");
    let (financial, descriptive) = session.enrich(&loaded);
    Enriched {
        labeled,
        financial: financial.expect("financial"),
        descriptive: descriptive.expect("descriptive"),
    }
}

fn strings(dataset: &Dataset, column: &str) -> Vec<String> {
    dataset
        .column_values(column)
        .expect("column")
        .into_iter()
        .map(|v| v.map(Value::as_display).unwrap_or_default())
        .collect()
}

fn floats(dataset: &Dataset, column: &str) -> Vec<Option<f64>> {
    dataset
        .column_values(column)
        .expect("column")
        .into_iter()
        .map(coerce_float)
        .collect()
}

#[test]
fn time_trend_percentages_sum_to_one_per_decade() {
    let data = enriched();
    let trend = analysis::time_trend(&data.labeled).expect("time trend");
    assert_eq!(trend.columns(), ["year_group", TEST_RESULT, "percent"]);

    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for (group, percent) in strings(&trend, "year_group")
        .into_iter()
        .zip(floats(&trend, "percent"))
    {
        *sums.entry(group).or_default() += percent.expect("percent");
    }
    assert_eq!(
        sums.keys().map(String::as_str).collect::<Vec<_>>(),
        ["1880-1920", "1990s", "2000s", "2010s"]
    );
    for (group, sum) in sums {
        assert!((sum - 1.0).abs() < 1e-9, "{group}: {sum}");
    }

    let groups = strings(&trend, "year_group");
    assert!(groups.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn country_pass_respects_the_minimum_film_count() {
    let data = enriched();
    let none = analysis::country_pass(&data.descriptive, 50).expect("country");
    assert!(none.is_empty());

    let countries = analysis::country_pass(&data.descriptive, 1).expect("country");
    assert_eq!(countries.columns(), ["country", PERCENT_PASS, "number_of_movies"]);
    let counts: Vec<i64> = countries
        .column_values("number_of_movies")
        .expect("counts")
        .into_iter()
        .map(|v| coerce_int(v).expect("count"))
        .collect();
    assert!(counts.iter().all(|n| *n > 1), "{counts:?}");

    let mut names = strings(&countries, "country");
    names.sort();
    assert_eq!(names, ["UK", "USA"]);

    // USA: Avatar and Titanic pass out of four films.
    for rate in floats(&countries, PERCENT_PASS) {
        assert_eq!(rate, Some(0.5));
    }

    // UK has exactly two films, which is not more than two.
    let at_boundary = analysis::country_pass(&data.descriptive, 2).expect("country");
    assert_eq!(strings(&at_boundary, "country"), ["USA"]);
}

#[test]
fn genre_pass_is_ordered_by_rate_descending() {
    let data = enriched();
    let genres = analysis::genre_pass(&data.descriptive).expect("genre");
    let rates: Vec<f64> = floats(&genres, PERCENT_PASS)
        .into_iter()
        .map(|r| r.expect("rate"))
        .collect();
    assert!(rates.windows(2).all(|pair| pair[0] >= pair[1]), "{rates:?}");
    assert!(rates.iter().all(|r| (0.0..=1.0).contains(r)));

    let names = strings(&genres, "genre");
    let romance = names.iter().position(|g| g == "Romance").expect("Romance");
    assert_eq!(rates[romance], 1.0);
    let sci_fi = names.iter().position(|g| g == "Sci-Fi").expect("Sci-Fi");
    assert_eq!(rates[sci_fi], 0.0);
}

#[test]
fn rating_pass_buckets_each_vote_column_and_skips_nulls() {
    let data = enriched();
    let rating = analysis::rating_pass(&data.descriptive).expect("rating");

    assert_eq!(
        strings(&rating.overall, "rating_group"),
        ["7 stars", "8 stars", "less than 4"]
    );
    assert_eq!(
        floats(&rating.overall, PERCENT_PASS),
        [Some(1.0), Some(0.0), Some(0.0)]
    );
    // 9.3 is beyond the top bucket and is left out.
    assert_eq!(strings(&rating.male, "male_group"), ["7 stars", "8 stars"]);
    assert_eq!(
        strings(&rating.female, "female_group"),
        ["4 stars", "7 stars", "8 stars"]
    );
}

#[test]
fn median_budget_uses_the_lower_middle_value() {
    let data = enriched();
    let medians =
        analysis::median_by_result(&data.financial, "adj_budget", "median_budget_2019")
            .expect("median");
    assert_eq!(
        strings(&medians, TEST_RESULT),
        [
            "Pass 0:Fewer than two women",
            "Pass 1:Women don't talk to each other",
            "Pass 3:Passes Bechdel Test",
        ]
    );
    let values = floats(&medians, "median_budget_2019");
    assert_eq!(values[0], Some(0.0));
    let pass = values[2].expect("pass median");
    assert!((pass - 237e6 * 255.657 / 214.537).abs() < 1.0, "{pass}");
}

#[test]
fn run_all_names_median_columns_after_the_reference_year() {
    let data = enriched();
    let tables = analysis::run_all(&data.labeled, &data.financial, &data.descriptive, 50, 2020)
        .expect("analysis");
    let named = tables.into_named();
    assert_eq!(named.len(), 11);
    let (_, gross) = named
        .iter()
        .find(|(stem, _)| *stem == "median_domestic_gross")
        .expect("domestic gross table");
    assert_eq!(gross.columns(), [TEST_RESULT, "median_domgross_2020"]);
}
