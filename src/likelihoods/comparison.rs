//! One observed-versus-expected tuple and the per-year collection of them.
use std::collections::BTreeMap;

/// Per observation year, the comparisons produced in that year.
pub type Comparisons = BTreeMap<u32, Vec<Comparison>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Category (or combined category) label the values refer to.
    pub category: String,
    pub age: Option<u32>,
    pub length: Option<f64>,
    pub expected: f64,
    pub observed: f64,
    pub error_value: f64,
    pub process_error: f64,
    /// Zero floor applied to `expected` inside the likelihood.
    pub delta: f64,
    pub score: f64,
}

impl Comparison {
    pub fn new(
        category: impl Into<String>, expected: f64, observed: f64, error_value: f64, process_error: f64,
        delta: f64,
    ) -> Self {
        Self {
            category: category.into(),
            age: None,
            length: None,
            expected,
            observed,
            error_value,
            process_error,
            delta,
            score: 0.0,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }
}

/// Sum of every comparison score across years.
pub fn total_score(comparisons: &Comparisons) -> f64 {
    comparisons.values().flatten().map(|c| c.score).sum()
}
