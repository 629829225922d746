#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const BUDGET_CSV: &str = "\
movie_id,title,release_date,budget,domestic,international,worldwide
tt0499549,Avatar,2009-12-18,237000000,760507625,2029017235,2789524860
tt1375666,Inception,2010-07-16,160000000,292576195,535700000,828276195
tt0120338,Titanic,1997-12-19,200000000,659363944,1548844451,2208208395
tt0000001,No Bechdel Row,2010-01-01,1000,2000,3000,5000
tt0111161,Free Budget,2010-05-01,0,100,200,300
";

pub const IMDB_MOVIES_CSV: &str = "\
imdb_title_id,title,genre,duration,country,language,avg_vote,director,writer
tt0499549,Avatar,\"Action, Adventure, Fantasy\",162,\"USA, UK\",\"English, Spanish\",7.8,James Cameron,James Cameron
tt1375666,Inception,\"Action, Sci-Fi\",148,\"USA, UK\",\"English, Japanese, French\",8.8,Christopher Nolan,Christopher Nolan
tt0120338,Titanic,\"Drama, Romance\",194,USA,\"English, Swedish, Italian\",7.8,James Cameron,James Cameron
tt0111161,Free Budget,Drama,142,USA,English,3.5,Frank Darabont,\"Stephen King, Frank Darabont\"
tt0000002,Silent,Drama,60,USA,None,6.1,Unknown,Unknown
";

pub const IMDB_RATINGS_CSV: &str = "\
imdb_title_id,total_votes,males_allages_avg_vote,females_allages_avg_vote
tt0499549,1100000,7.8,7.6
tt1375666,2000000,8.8,8.6
tt0120338,1000000,7.7,8.1
tt0111161,2200000,9.3,4.2
";

pub const BECHDEL_JSON: &str = r#"[
{"imdbid":"0499549","year":2009,"rating":3,"title":"Avatar","id":1},
{"imdbid":"1375666","year":2010,"rating":1,"title":"Inception","id":2},
{"imdbid":"0120338","year":1997,"rating":3,"title":"Titanic","id":3},
{"imdbid":"0111161","year":2010,"rating":0,"title":"Free Budget","id":4},
{"imdbid":"9999999","year":2012,"rating":2,"title":"Nowhere","id":5},
{"imdbid":"0000002","year":1915,"rating":0,"title":"Silent","id":6}
]"#;

pub const CPI_CSV: &str = "\
Year,Annual
1997,160.5
2009,214.537
2010,218.056
2012,229.594
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes the five sample inputs and returns their paths.
    pub fn write_sources(&self) -> SourcePaths {
        SourcePaths {
            budget: self.write("Mojo_budget_update.csv", BUDGET_CSV),
            imdb_movies: self.write("IMDb_movies.csv", IMDB_MOVIES_CSV),
            imdb_ratings: self.write("IMDb_ratings.csv", IMDB_RATINGS_CSV),
            bechdel: self.write("bechdel.json", BECHDEL_JSON),
            cpi: self.write("cpi.csv", CPI_CSV),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    pub fn read_output(&self, stem: &str) -> String {
        fs::read_to_string(self.output_dir().join(format!("{stem}.csv")))
            .unwrap_or_else(|err| panic!("read {stem}.csv: {err}"))
    }
}

pub struct SourcePaths {
    pub budget: PathBuf,
    pub imdb_movies: PathBuf,
    pub imdb_ratings: PathBuf,
    pub bechdel: PathBuf,
    pub cpi: PathBuf,
}

impl SourcePaths {
    /// The input flags accepted by both subcommands.
    pub fn args(&self) -> Vec<String> {
        [
            ("--budget", &self.budget),
            ("--imdb-movies", &self.imdb_movies),
            ("--imdb-ratings", &self.imdb_ratings),
            ("--bechdel", &self.bechdel),
            ("--cpi", &self.cpi),
        ]
        .into_iter()
        .flat_map(|(flag, path)| [flag.to_string(), path.display().to_string()])
        .collect()
    }
}

/// Parses CSV output written by the pipeline into header and text rows.
pub fn parse_csv(contents: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(contents.as_bytes());
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("record")
                .iter()
                .map(str::to_string)
                .collect::<Vec<String>>()
        })
        .collect();
    (headers, rows)
}

pub fn column<'a>(headers: &[String], rows: &'a [Vec<String>], name: &str) -> Vec<&'a str> {
    let idx = headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("column {name} missing from {headers:?}"));
    rows.iter().map(|row| row[idx].as_str()).collect()
}
