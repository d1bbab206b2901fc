//! utils — small numeric and string helpers shared across the engine.
//!
//! Purpose
//! -------
//! Collect the zero-floor, factorial, and label-splitting helpers that
//! likelihoods, processes, and addressable lookups all rely on, so each
//! call site uses the exact same floor and tolerance semantics.
//!
//! Conventions
//! -----------
//! - `delta` is always a strictly positive floor supplied by the caller
//!   (a comparison's `delta`, or [`DEFAULT_DELTA`]).
//! - Tolerance comparisons use absolute differences.
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use statrs::function::gamma::ln_gamma;

/// Default zero-floor used where no per-comparison delta is configured.
pub const DEFAULT_DELTA: f64 = 1e-11;

/// Tolerance for "sums to one" style checks on user-supplied proportions.
pub const PROPORTION_TOLERANCE: f64 = 1e-5;

/// Smoothly floor `x` at `delta`.
///
/// Returns `x` when `x >= delta`; otherwise `delta / (2 - x/delta)`, which
/// stays strictly positive and is continuous at `x == delta`.
pub fn zero_fun(x: f64, delta: f64) -> f64 {
    if x >= delta { x } else { delta / (2.0 - (x / delta)) }
}

/// `ln(x!)` generalised through the gamma function.
pub fn ln_factorial(x: f64) -> f64 {
    ln_gamma(x + 1.0)
}

/// `true` if `a` and `b` differ by no more than `tol`.
pub fn is_close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Split a comma separated list, trimming whitespace and dropping empties.
pub fn split_list(input: &str) -> Vec<String> {
    input.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn parse_year<E: serde::de::Error>(key: &str) -> Result<u32, E> {
    key.trim().parse().map_err(|_| E::custom(format!("'{key}' is not a year")))
}

/// Deserialize a JSON object keyed by year strings.
///
/// Integer map keys do not survive the buffering serde applies to
/// internally tagged enums, so year tables go through string keys.
pub fn year_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<u32, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    BTreeMap::<String, V>::deserialize(deserializer)?
        .into_iter()
        .map(|(k, v)| Ok((parse_year(&k)?, v)))
        .collect()
}

/// [`year_map`] one level down: `{label: {year: value}}`.
pub fn labelled_year_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, BTreeMap<u32, V>>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    BTreeMap::<String, BTreeMap<String, V>>::deserialize(deserializer)?
        .into_iter()
        .map(|(label, inner)| {
            let years = inner
                .into_iter()
                .map(|(k, v)| Ok((parse_year(&k)?, v)))
                .collect::<Result<BTreeMap<_, _>, D::Error>>()?;
            Ok((label, years))
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<V> {
    One(V),
    Many(Vec<V>),
}

/// Deserialize either a single value or a list into a `Vec`.
pub fn one_or_many<'de, D, V>(deserializer: D) -> Result<Vec<V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Ok(match OneOrMany::<V>::deserialize(deserializer)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `zero_fun` passthrough and floor branches.
    // - `ln_factorial` against exact small factorials.
    // - `split_list` trimming.
    //
    // They intentionally DO NOT cover:
    // - Call sites in likelihoods and processes (tested there).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Values above the floor are returned unchanged.
    //
    // Given
    // -----
    // - x = 0.3, delta = 1e-5.
    //
    // Expect
    // ------
    // - Exactly 0.3.
    fn zero_fun_passes_through_values_above_delta() {
        // Arrange
        let x = 0.3;

        // Act
        let out = zero_fun(x, 1e-5);

        // Assert
        assert_eq!(out, 0.3);
    }

    #[test]
    // Purpose
    // -------
    // Values at or below zero are floored to a positive number.
    //
    // Given
    // -----
    // - x = 0 and x = -1, delta = 1e-5.
    //
    // Expect
    // ------
    // - zero_fun(0) == delta / 2; zero_fun(-1) is positive and below delta.
    fn zero_fun_floors_non_positive_values() {
        // Arrange
        let delta = 1e-5;

        // Act
        let at_zero = zero_fun(0.0, delta);
        let negative = zero_fun(-1.0, delta);

        // Assert
        assert!((at_zero - delta / 2.0).abs() < 1e-20);
        assert!(negative > 0.0 && negative < delta);
    }

    #[test]
    // Purpose
    // -------
    // `ln_factorial` agrees with exact factorials.
    //
    // Given
    // -----
    // - x = 5 (5! = 120).
    //
    // Expect
    // ------
    // - ln(120) within 1e-10.
    fn ln_factorial_matches_exact_factorial() {
        // Act
        let out = ln_factorial(5.0);

        // Assert
        assert!((out - 120.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // `split_list` trims and removes empty entries.
    //
    // Given
    // -----
    // - " 1995, 1996,,1997 ".
    //
    // Expect
    // ------
    // - ["1995", "1996", "1997"].
    fn split_list_trims_entries() {
        // Act
        let out = split_list(" 1995, 1996,,1997 ");

        // Assert
        assert_eq!(out, vec!["1995", "1996", "1997"]);
    }

    #[test]
    // Purpose
    // -------
    // Year tables parse from string keys and reject non-years.
    //
    // Given
    // -----
    // - {"1998": 1.5} and {"abc": 1.0}.
    //
    // Expect
    // ------
    // - {1998: 1.5}; an error for the second.
    fn year_map_parses_string_keys() {
        // Arrange
        #[derive(Deserialize)]
        struct Table {
            #[serde(deserialize_with = "year_map")]
            values: BTreeMap<u32, f64>,
        }

        // Act
        let ok: Table = serde_json::from_str(r#"{"values": {"1998": 1.5}}"#).unwrap();
        let bad = serde_json::from_str::<Table>(r#"{"values": {"abc": 1.0}}"#);

        // Assert
        assert_eq!(ok.values[&1998], 1.5);
        assert!(bad.is_err());
    }
}
