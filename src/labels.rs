//! Categorical labels derived from ratings, release years and vote averages.

use std::fmt;

/// The four Bechdel test outcomes, keyed by the 0..=3 rating code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestResult {
    FewerThanTwoWomen,
    WomenDontTalk,
    TalkOnlyAboutMen,
    Passes,
}

impl TestResult {
    pub const ALL: [TestResult; 4] = [
        TestResult::FewerThanTwoWomen,
        TestResult::WomenDontTalk,
        TestResult::TalkOnlyAboutMen,
        TestResult::Passes,
    ];

    pub fn from_rating(rating: i64) -> Option<Self> {
        match rating {
            0 => Some(TestResult::FewerThanTwoWomen),
            1 => Some(TestResult::WomenDontTalk),
            2 => Some(TestResult::TalkOnlyAboutMen),
            3 => Some(TestResult::Passes),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TestResult::FewerThanTwoWomen => "Pass 0:Fewer than two women",
            TestResult::WomenDontTalk => "Pass 1:Women don't talk to each other",
            TestResult::TalkOnlyAboutMen => "Pass 2:Women only talk about men",
            TestResult::Passes => "Pass 3:Passes Bechdel Test",
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn test_result_label(rating: i64) -> Option<&'static str> {
    TestResult::from_rating(rating).map(TestResult::label)
}

/// 1 for a full pass, 0 for everything else. Ratings above 3 are outside the
/// scale and count as not passing.
pub fn binary_pass(rating: i64) -> i64 {
    i64::from(rating == 3)
}

const DECADES: &[(i64, i64, &str)] = &[
    (1880, 1920, "1880-1920"),
    (1920, 1930, "1920s"),
    (1930, 1940, "1930s"),
    (1940, 1950, "1940s"),
    (1950, 1960, "1950s"),
    (1960, 1970, "1960s"),
    (1970, 1980, "1970s"),
    (1980, 1990, "1980s"),
    (1990, 2000, "1990s"),
    (2000, 2010, "2000s"),
];

/// Bucket for every year outside the explicit ranges, including years before
/// 1880 and implausible future years.
pub const FALLBACK_DECADE: &str = "2010s";

pub fn decade_bucket(year: i64) -> &'static str {
    DECADES
        .iter()
        .find(|(start, end, _)| (*start..*end).contains(&year))
        .map_or(FALLBACK_DECADE, |(_, _, label)| *label)
}

const SCORE_BUCKETS: &[(f64, f64, &str)] = &[
    (0.0, 4.0, "less than 4"),
    (4.0, 5.0, "4 stars"),
    (5.0, 6.0, "5 stars"),
    (6.0, 7.0, "6 stars"),
    (7.0, 8.0, "7 stars"),
    (8.0, 9.0, "8 stars"),
];

/// Half-open star bucket for a vote average. Scores below 0, at or above 9,
/// or NaN have no bucket.
pub fn score_bucket(score: f64) -> Option<&'static str> {
    SCORE_BUCKETS
        .iter()
        .find(|(low, high, _)| (*low..*high).contains(&score))
        .map(|(_, _, label)| *label)
}
