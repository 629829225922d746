use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Join film budget, IMDb and Bechdel test datasets into analytical tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full batch: join, enrich, aggregate and write every output table
    Run(RunArgs),
    /// Load each input and print the column types inferred for it
    Schema(SchemaArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// YAML pipeline configuration; flags given alongside override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Budget and box office CSV (movie_id, budget, domestic, international, worldwide)
    #[arg(long)]
    pub budget: Option<PathBuf>,
    /// IMDb movie metadata CSV
    #[arg(long = "imdb-movies")]
    pub imdb_movies: Option<PathBuf>,
    /// IMDb ratings CSV
    #[arg(long = "imdb-ratings")]
    pub imdb_ratings: Option<PathBuf>,
    /// Bechdel test ratings JSON (array or one object per line)
    #[arg(long)]
    pub bechdel: Option<PathBuf>,
    /// Consumer price index CSV (Year, Annual)
    #[arg(long)]
    pub cpi: Option<PathBuf>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
    /// Directory receiving the output tables
    #[arg(short, long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Year whose price level monetary values are restated in
    #[arg(long = "reference-year")]
    pub reference_year: Option<i32>,
    /// Price index of the reference year
    #[arg(long = "reference-index")]
    pub reference_index: Option<f64>,
    /// Countries need more than this many distinct films to be reported
    #[arg(long = "min-country-movies")]
    pub min_country_movies: Option<usize>,
    /// Separator inside multi-valued IMDb columns
    #[arg(long = "multi-value-delimiter")]
    pub multi_value_delimiter: Option<String>,
    /// Worker threads (defaults to one per core)
    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
}
