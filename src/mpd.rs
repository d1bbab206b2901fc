//! mpd — the point-estimate file handed from estimation to MCMC.
//!
//! Layout (whitespace separated, one section per line):
//!
//! ```text
//! *mpd
//! estimate_values:
//! process[recruitment].r0 process[mortality].m
//! 997386 0.065
//! covariance_matrix:
//! 1.5 0.1
//! 0.1 0.02
//! *end
//! ```
//!
//! The covariance section is optional. Values are written with Rust's
//! shortest round-trip formatting, so reading a written file reproduces
//! it exactly. `* MPD` is accepted as the header too.
use std::{fmt, fs, path::Path, str::FromStr};

use ndarray::Array2;

use crate::model::errors::{ModelError, ModelResult};

const HEADER: &str = "*mpd";
const VALUES: &str = "estimate_values:";
const COVARIANCE: &str = "covariance_matrix:";
const END: &str = "*end";

#[derive(Debug, Clone, PartialEq)]
pub struct Mpd {
    /// Canonical addressable names, in estimate order.
    pub parameters: Vec<String>,
    pub values: Vec<f64>,
    pub covariance: Option<Array2<f64>>,
}

impl Mpd {
    pub fn write_to(&self, path: &Path) -> ModelResult<()> {
        fs::write(path, self.to_string())
            .map_err(|e| ModelError::Io { path: path.display().to_string(), reason: e.to_string() })
    }

    pub fn read_from(path: &Path) -> ModelResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ModelError::Io { path: path.display().to_string(), reason: e.to_string() })?;
        text.parse()
    }
}

impl fmt::Display for Mpd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADER}")?;
        writeln!(f, "{VALUES}")?;
        writeln!(f, "{}", self.parameters.join(" "))?;
        writeln!(f, "{}", join_values(self.values.iter()))?;
        if let Some(cov) = &self.covariance {
            writeln!(f, "{COVARIANCE}")?;
            for row in cov.rows() {
                writeln!(f, "{}", join_values(row.iter()))?;
            }
        }
        writeln!(f, "{END}")
    }
}

impl FromStr for Mpd {
    type Err = ModelError;

    /// Errors
    /// ------
    /// - `Mpd` naming the 1-based line for a missing section, a value
    ///   count that does not match the names, a covariance row of the wrong
    ///   length, or an unparsable number.
    fn from_str(text: &str) -> ModelResult<Self> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())).filter(|(_, l)| !l.is_empty());
        let mut next = |expected: &str| {
            lines.next().ok_or_else(|| ModelError::Mpd { line: 0, reason: format!("missing {expected}") })
        };

        let (line, header) = next("the header")?;
        if !header.replace(' ', "").eq_ignore_ascii_case(HEADER) {
            return Err(mpd_error(line, format!("expected '{HEADER}', found '{header}'")));
        }
        expect_line(next(VALUES)?, VALUES)?;
        let (_, names) = next("the parameter names")?;
        let parameters: Vec<String> = names.split_whitespace().map(str::to_string).collect();
        let (line, raw) = next("the estimate values")?;
        let values = parse_row(line, raw)?;
        if values.len() != parameters.len() {
            return Err(mpd_error(
                line,
                format!("{} values for {} parameters", values.len(), parameters.len()),
            ));
        }

        let mut covariance = None;
        let section = lines.next();
        match section {
            None => {}
            Some((_, END)) => {}
            Some(found) => {
                expect_line(found, COVARIANCE)?;
                let n = parameters.len();
                let mut cov = Array2::<f64>::zeros((n, n));
                for i in 0..n {
                    let (line, raw) = lines
                        .next()
                        .ok_or_else(|| ModelError::Mpd { line: 0, reason: format!("missing covariance row {}", i + 1) })?;
                    let row = parse_row(line, raw)?;
                    if row.len() != n {
                        return Err(mpd_error(line, format!("covariance row has {} values, expected {n}", row.len())));
                    }
                    for (j, v) in row.into_iter().enumerate() {
                        cov[[i, j]] = v;
                    }
                }
                covariance = Some(cov);
            }
        }
        Ok(Self { parameters, values, covariance })
    }
}

// ---- Helper methods ----

fn mpd_error(line: usize, reason: String) -> ModelError {
    ModelError::Mpd { line, reason }
}

fn expect_line((line, found): (usize, &str), expected: &str) -> ModelResult<()> {
    if found != expected {
        return Err(mpd_error(line, format!("expected '{expected}', found '{found}'")));
    }
    Ok(())
}

fn parse_row(line: usize, raw: &str) -> ModelResult<Vec<f64>> {
    raw.split_whitespace()
        .map(|token| token.parse::<f64>().map_err(|_| mpd_error(line, format!("'{token}' is not a number"))))
        .collect()
}

fn join_values<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Exact text layout and parse of a written file.
    // - Files without a covariance section.
    // - Line-numbered errors for malformed input.
    //
    // They intentionally DO NOT cover:
    // - Loading into a model (see the model tests).
    // -------------------------------------------------------------------------

    fn sample() -> Mpd {
        Mpd {
            parameters: vec!["process[recruitment].r0".to_string(), "process[mortality].m".to_string()],
            values: vec![997386.0, 0.065],
            covariance: Some(array![[1.5, 0.1], [0.1, 0.02]]),
        }
    }

    #[test]
    // Purpose
    // -------
    // The written text has the documented layout and parses back exactly.
    //
    // Given
    // -----
    // - Two estimates with a covariance matrix.
    //
    // Expect
    // ------
    // - The expected lines; `parse(to_string(m)) == m`.
    fn written_layout_parses_back() {
        // Arrange
        let mpd = sample();

        // Act
        let text = mpd.to_string();
        let back: Mpd = text.parse().unwrap();

        // Assert
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "*mpd");
        assert_eq!(lines[2], "process[recruitment].r0 process[mortality].m");
        assert_eq!(lines[3], "997386 0.065");
        assert_eq!(lines[4], "covariance_matrix:");
        assert_eq!(lines.last(), Some(&"*end"));
        assert_eq!(back, mpd);
    }

    #[test]
    // Purpose
    // -------
    // A file may stop after the values, with or without `*end`, and the
    // `* MPD` header spelling is accepted.
    //
    // Given
    // -----
    // - "* MPD / estimate_values: / a / 1" with and without "*end".
    //
    // Expect
    // ------
    // - Values without covariance in both cases.
    fn covariance_section_is_optional() {
        for text in ["* MPD\nestimate_values:\nprocess[a].b\n1\n", "*mpd\nestimate_values:\nprocess[a].b\n1\n*end\n"] {
            // Act
            let mpd: Mpd = text.parse().unwrap();

            // Assert
            assert_eq!(mpd.values, vec![1.0]);
            assert!(mpd.covariance.is_none());
        }
    }

    #[test]
    // Purpose
    // -------
    // Malformed files fail on the offending line.
    //
    // Given
    // -----
    // - Two names with one value; a short covariance row; a bad number.
    //
    // Expect
    // ------
    // - `Mpd` errors at lines 4, 7 and 4.
    fn malformed_files_report_line() {
        let cases = [
            ("*mpd\nestimate_values:\na b\n1\n", 4),
            ("*mpd\nestimate_values:\na b\n1 2\ncovariance_matrix:\n1 0\n0\n", 7),
            ("*mpd\nestimate_values:\na\nx1\n", 4),
        ];
        for (text, expected) in cases {
            match text.parse::<Mpd>() {
                Err(ModelError::Mpd { line, .. }) => assert_eq!(line, expected, "{text}"),
                other => panic!("expected Mpd error, got {other:?}"),
            }
        }
    }
}
