//! Grouped aggregation over a [`Dataset`].
//!
//! A [`GroupQuery`] names its group columns, its aggregates and its output
//! ordering as plain values. Rows are folded into per-shard accumulators on
//! the rayon pool and the shards are merged, so no accumulator is ever shared
//! between threads. Groups first appear in the order their first row appears
//! in the input; an explicit ordering is then applied with a stable sort.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::{
    data::{Value, coerce_float, composite_key, key_fragment},
    dataset::{Dataset, Row, SortKey},
    error::SchemaError,
    percentile::PercentileAccumulator,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// Number of non-null cells.
    Count(String),
    Sum(String),
    Mean(String),
    CountDistinct(String),
    Percentile { column: String, quantile: f64 },
}

impl Aggregate {
    pub fn count(column: &str) -> Self {
        Aggregate::Count(column.to_string())
    }

    pub fn sum(column: &str) -> Self {
        Aggregate::Sum(column.to_string())
    }

    pub fn mean(column: &str) -> Self {
        Aggregate::Mean(column.to_string())
    }

    pub fn count_distinct(column: &str) -> Self {
        Aggregate::CountDistinct(column.to_string())
    }

    pub fn median(column: &str) -> Self {
        Aggregate::Percentile {
            column: column.to_string(),
            quantile: 0.5,
        }
    }

    fn column(&self) -> &str {
        match self {
            Aggregate::Count(c)
            | Aggregate::Sum(c)
            | Aggregate::Mean(c)
            | Aggregate::CountDistinct(c)
            | Aggregate::Percentile { column: c, .. } => c,
        }
    }

    fn accumulator(&self) -> Accumulator {
        match self {
            Aggregate::Count(_) => Accumulator::Count(0),
            Aggregate::Sum(_) => Accumulator::Sum(None),
            Aggregate::Mean(_) => Accumulator::Mean { sum: 0.0, count: 0 },
            Aggregate::CountDistinct(_) => Accumulator::Distinct(HashSet::new()),
            Aggregate::Percentile { quantile, .. } => Accumulator::Percentile {
                values: PercentileAccumulator::new(),
                quantile: *quantile,
            },
        }
    }
}

#[derive(Debug, Clone)]
enum Accumulator {
    Count(usize),
    Sum(Option<f64>),
    Mean { sum: f64, count: usize },
    Distinct(HashSet<String>),
    Percentile {
        values: PercentileAccumulator,
        quantile: f64,
    },
}

impl Accumulator {
    fn update(&mut self, value: Option<&Value>) {
        match self {
            Accumulator::Count(count) => {
                if value.is_some() {
                    *count += 1;
                }
            }
            Accumulator::Sum(total) => {
                if let Some(v) = coerce_float(value) {
                    *total = Some(total.unwrap_or(0.0) + v);
                }
            }
            Accumulator::Mean { sum, count } => {
                if let Some(v) = coerce_float(value) {
                    *sum += v;
                    *count += 1;
                }
            }
            Accumulator::Distinct(seen) => {
                if value.is_some() {
                    seen.insert(key_fragment(value));
                }
            }
            Accumulator::Percentile { values, .. } => values.push(coerce_float(value)),
        }
    }

    fn merge(&mut self, other: Accumulator) {
        match (self, other) {
            (Accumulator::Count(a), Accumulator::Count(b)) => *a += b,
            (Accumulator::Sum(a), Accumulator::Sum(b)) => {
                if let Some(b) = b {
                    *a = Some(a.unwrap_or(0.0) + b);
                }
            }
            (
                Accumulator::Mean { sum, count },
                Accumulator::Mean {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += other_sum;
                *count += other_count;
            }
            (Accumulator::Distinct(a), Accumulator::Distinct(b)) => a.extend(b),
            (Accumulator::Percentile { values, .. }, Accumulator::Percentile { values: b, .. }) => {
                values.merge(b)
            }
            _ => unreachable!("accumulators of one group share their layout"),
        }
    }

    fn finish(&self) -> Option<Value> {
        match self {
            Accumulator::Count(count) => Some(Value::Integer(*count as i64)),
            Accumulator::Sum(total) => total.map(Value::Float),
            Accumulator::Mean { sum, count } => {
                (*count > 0).then(|| Value::Float(*sum / *count as f64))
            }
            Accumulator::Distinct(seen) => Some(Value::Integer(seen.len() as i64)),
            Accumulator::Percentile { values, quantile } => {
                values.quantile(*quantile).map(Value::Float)
            }
        }
    }
}

struct Group {
    first_row: usize,
    key: Row,
    accumulators: Vec<Accumulator>,
}

impl Group {
    fn merge(&mut self, other: Group) {
        if other.first_row < self.first_row {
            self.first_row = other.first_row;
            self.key = other.key;
        }
        for (mine, theirs) in self.accumulators.iter_mut().zip(other.accumulators) {
            mine.merge(theirs);
        }
    }
}

/// `GROUP BY` with named aggregates and an output ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupQuery {
    group_by: Vec<String>,
    aggregates: Vec<(String, Aggregate)>,
    order_by: Vec<SortKey>,
}

impl GroupQuery {
    pub fn by(columns: &[&str]) -> Self {
        Self {
            group_by: columns.iter().map(|c| c.to_string()).collect(),
            aggregates: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn agg(mut self, alias: &str, aggregate: Aggregate) -> Self {
        self.aggregates.push((alias.to_string(), aggregate));
        self
    }

    pub fn order_by(mut self, key: SortKey) -> Self {
        self.order_by.push(key);
        self
    }

    pub fn execute(&self, dataset: &Dataset) -> Result<Dataset, SchemaError> {
        let group_idx = self
            .group_by
            .iter()
            .map(|c| dataset.require(c))
            .collect::<Result<Vec<_>, _>>()?;
        let agg_idx = self
            .aggregates
            .iter()
            .map(|(_, agg)| dataset.require(agg.column()))
            .collect::<Result<Vec<_>, _>>()?;

        let new_group = |first_row: usize, row: &Row| Group {
            first_row,
            key: group_idx.iter().map(|idx| row[*idx].clone()).collect(),
            accumulators: self
                .aggregates
                .iter()
                .map(|(_, agg)| agg.accumulator())
                .collect(),
        };

        let groups = dataset
            .rows()
            .par_iter()
            .enumerate()
            .fold(HashMap::<String, Group>::new, |mut shard, (row_idx, row)| {
                let key = composite_key(group_idx.iter().map(|idx| row[*idx].as_ref()));
                let group = shard
                    .entry(key)
                    .or_insert_with(|| new_group(row_idx, row));
                for (acc, idx) in group.accumulators.iter_mut().zip(&agg_idx) {
                    acc.update(row[*idx].as_ref());
                }
                shard
            })
            .reduce(HashMap::new, |mut left, right| {
                for (key, group) in right {
                    match left.get_mut(&key) {
                        Some(existing) => existing.merge(group),
                        None => {
                            left.insert(key, group);
                        }
                    }
                }
                left
            });

        let mut groups: Vec<Group> = groups.into_values().collect();
        groups.sort_by_key(|group| group.first_row);

        let rows = groups
            .into_iter()
            .map(|group| {
                let mut row = group.key;
                row.extend(group.accumulators.iter().map(Accumulator::finish));
                row
            })
            .collect();
        let columns = self
            .group_by
            .iter()
            .cloned()
            .chain(self.aggregates.iter().map(|(alias, _)| alias.clone()))
            .collect();
        Dataset::new(dataset.name(), columns, rows).sort_by(&self.order_by)
    }
}
