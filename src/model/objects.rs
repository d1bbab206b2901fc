//! model::objects — addressable parameter names and lookup.
//!
//! Purpose
//! -------
//! Parse the persisted parameter-path grammar
//! `type[label].parameter{index}` and resolve it to a live value inside
//! one of the model's objects.
//!
//! Key behaviors
//! -------------
//! - [`AddressableName::parse`] splits on `[`/`]` into exactly three
//!   tokens, then splits the parameter on `{`/`}` for an optional index.
//!   Type and parameter are lower-cased; label and index are kept verbatim.
//! - Index lists (`{1995,1996}`) and inclusive integer ranges
//!   (`{1995:1997}`) expand into one name per element.
//! - Objects implement [`Addressable`] to hand out `&mut f64` for their
//!   named parameters.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`AddressableName::full_name`] reproduces the canonical string exactly;
//!   it is written to MPD files and chain output.
//! - Year-keyed parameters are indexed by year, plain vectors by 1-based
//!   position.
use std::{collections::BTreeMap, fmt};

use crate::model::errors::{ModelError, ModelResult};

const SYNTAX_HINT: &str = "The correct syntax is 'block[label].variable{index}'";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressableType {
    Process,
    DerivedQuantity,
    AgeLength,
    LengthWeight,
    AgeingError,
    InitialisationPhase,
    Estimate,
    Catchability,
    Selectivity,
    TimeVarying,
    Observation,
    Likelihood,
}

impl AddressableType {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "process" => Self::Process,
            "derived_quantity" => Self::DerivedQuantity,
            "age_length" => Self::AgeLength,
            "length_weight" => Self::LengthWeight,
            "ageing_error" => Self::AgeingError,
            "initialisation_phase" => Self::InitialisationPhase,
            "estimate" => Self::Estimate,
            "catchability" => Self::Catchability,
            "selectivity" => Self::Selectivity,
            "time_varying" => Self::TimeVarying,
            "observation" => Self::Observation,
            "likelihood" => Self::Likelihood,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::DerivedQuantity => "derived_quantity",
            Self::AgeLength => "age_length",
            Self::LengthWeight => "length_weight",
            Self::AgeingError => "ageing_error",
            Self::InitialisationPhase => "initialisation_phase",
            Self::Estimate => "estimate",
            Self::Catchability => "catchability",
            Self::Selectivity => "selectivity",
            Self::TimeVarying => "time_varying",
            Self::Observation => "observation",
            Self::Likelihood => "likelihood",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressableName {
    pub kind: AddressableType,
    pub label: String,
    pub parameter: String,
    pub index: Option<String>,
}

impl AddressableName {
    /// Parse `type[label].parameter{index}`.
    ///
    /// Errors
    /// ------
    /// - `InvalidAddressable` for anything that does not split into the
    ///   three bracket tokens, an empty label or parameter, a missing `.`,
    ///   an unterminated index, or an unknown type.
    pub fn parse(input: &str) -> ModelResult<Self> {
        let invalid = |reason: String| ModelError::InvalidAddressable {
            name: input.to_string(),
            reason,
        };
        let generic = || invalid(format!("The syntax for {input} is invalid. {SYNTAX_HINT}"));
        let tokens: Vec<&str> = input.split(['[', ']']).collect();
        if tokens.len() != 3 || tokens[0].is_empty() || tokens[1].is_empty() {
            return Err(generic());
        }
        let kind_token = tokens[0].to_lowercase();
        let kind = AddressableType::from_token(&kind_token).ok_or_else(|| {
            invalid(format!("Parameter type '{kind_token}' in {input} is not supported"))
        })?;
        let member = tokens[2].strip_prefix('.').ok_or_else(generic)?;
        let (parameter, index) = match member.split_once('{') {
            Some((param, rest)) => {
                let idx = rest.strip_suffix('}').ok_or_else(generic)?;
                if idx.is_empty() || idx.contains(['{', '}']) {
                    return Err(generic());
                }
                (param.to_lowercase(), Some(idx.to_string()))
            }
            None => {
                if member.contains('}') {
                    return Err(generic());
                }
                (member.to_lowercase(), None)
            }
        };
        if parameter.is_empty() {
            return Err(generic());
        }
        Ok(Self { kind, label: tokens[1].to_string(), parameter, index })
    }

    /// Canonical `type[label].parameter{index}` form.
    pub fn full_name(&self) -> String {
        match &self.index {
            Some(index) => {
                format!("{}[{}].{}{{{}}}", self.kind.as_str(), self.label, self.parameter, index)
            }
            None => format!("{}[{}].{}", self.kind.as_str(), self.label, self.parameter),
        }
    }

    /// One name per element of a list or range index; a scalar name
    /// expands to itself.
    pub fn expand_indices(&self) -> ModelResult<Vec<AddressableName>> {
        let Some(index) = &self.index else {
            return Ok(vec![self.clone()]);
        };
        let mut out = Vec::new();
        for item in index.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((lo, hi)) = item.split_once(':') {
                let parse = |s: &str| {
                    s.trim().parse::<i64>().map_err(|_| ModelError::InvalidAddressable {
                        name: self.full_name(),
                        reason: format!("range bound '{s}' is not an integer"),
                    })
                };
                let (lo, hi) = (parse(lo)?, parse(hi)?);
                if hi < lo {
                    return Err(ModelError::InvalidAddressable {
                        name: self.full_name(),
                        reason: format!("range {lo}:{hi} is empty"),
                    });
                }
                for i in lo..=hi {
                    out.push(self.with_index(i.to_string()));
                }
            } else {
                out.push(self.with_index(item.to_string()));
            }
        }
        Ok(out)
    }

    fn with_index(&self, index: String) -> Self {
        Self { index: Some(index), ..self.clone() }
    }
}

impl fmt::Display for AddressableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// An object whose parameters can be estimated or asserted by name.
pub trait Addressable {
    /// Live value for `parameter` (already lower-cased) at `index`, or
    /// `None` if this object has no such addressable.
    fn addressable_mut(&mut self, parameter: &str, index: Option<&str>) -> Option<&mut f64>;
}

// ---- Helper methods ----

/// A scalar addressable; any index is a miss.
pub fn scalar<'a>(value: &'a mut f64, index: Option<&str>) -> Option<&'a mut f64> {
    match index {
        None => Some(value),
        Some(_) => None,
    }
}

/// 1-based positional element of a vector addressable.
pub fn vector_element<'a>(values: &'a mut [f64], index: Option<&str>) -> Option<&'a mut f64> {
    let position: usize = index?.trim().parse().ok()?;
    values.get_mut(position.checked_sub(1)?)
}

/// Year-keyed element of a map addressable.
pub fn year_element<'a>(values: &'a mut BTreeMap<u32, f64>, index: Option<&str>) -> Option<&'a mut f64> {
    let year: u32 = index?.trim().parse().ok()?;
    values.get_mut(&year)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Parsing and canonical re-rendering of addressable names.
    // - Rejection of malformed syntax and unknown types.
    // - Index list and range expansion.
    // - The scalar/vector/year lookup helpers.
    //
    // They intentionally DO NOT cover:
    // - Resolution against a built model (see model.rs and integration tests).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Well formed names round trip through `full_name` exactly.
    //
    // Given
    // -----
    // - "process[Recruitment].R0" and "process[recruitment].ycs_values{1995}".
    //
    // Expect
    // ------
    // - Type/parameter lower-cased, label verbatim, index captured.
    fn parse_splits_type_label_parameter_index() {
        // Act
        let plain = AddressableName::parse("Process[Recruitment].R0").unwrap();
        let indexed = AddressableName::parse("process[recruitment].ycs_values{1995}").unwrap();

        // Assert
        assert_eq!(plain.kind, AddressableType::Process);
        assert_eq!(plain.label, "Recruitment");
        assert_eq!(plain.parameter, "r0");
        assert_eq!(plain.index, None);
        assert_eq!(plain.full_name(), "process[Recruitment].r0");
        assert_eq!(indexed.index.as_deref(), Some("1995"));
        assert_eq!(indexed.full_name(), "process[recruitment].ycs_values{1995}");
    }

    #[test]
    // Purpose
    // -------
    // Index text keeps its case so labels used as indices still resolve.
    //
    // Given
    // -----
    // - "process[Fishing].U_Max{TrawlNorth}".
    //
    // Expect
    // ------
    // - Parameter lower-cased, index and full name keep "TrawlNorth".
    fn parse_keeps_index_case() {
        // Act
        let name = AddressableName::parse("process[Fishing].U_Max{TrawlNorth}").unwrap();

        // Assert
        assert_eq!(name.parameter, "u_max");
        assert_eq!(name.index.as_deref(), Some("TrawlNorth"));
        assert_eq!(name.full_name(), "process[Fishing].u_max{TrawlNorth}");
        assert_eq!(AddressableName::parse(&name.full_name()).unwrap(), name);
    }

    #[test]
    // Purpose
    // -------
    // Malformed syntax yields the canonical syntax hint.
    //
    // Given
    // -----
    // - Missing brackets, missing dot, unterminated index.
    //
    // Expect
    // ------
    // - `InvalidAddressable` mentioning 'block[label].variable{index}'.
    fn parse_rejects_malformed_syntax() {
        for bad in ["process.r0", "process[recruitment]r0", "process[recruitment].r0{1995"] {
            // Act
            let err = AddressableName::parse(bad).unwrap_err();

            // Assert
            match err {
                ModelError::InvalidAddressable { reason, .. } => {
                    assert!(reason.contains("block[label].variable{index}"), "{reason}")
                }
                other => panic!("expected InvalidAddressable, got {other:?}"),
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Unknown object types are rejected.
    //
    // Given
    // -----
    // - "report[x].y".
    //
    // Expect
    // ------
    // - `InvalidAddressable` naming the type.
    fn parse_rejects_unknown_type() {
        // Act
        let err = AddressableName::parse("report[x].y").unwrap_err();

        // Assert
        match err {
            ModelError::InvalidAddressable { reason, .. } => assert!(reason.contains("report")),
            other => panic!("expected InvalidAddressable, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Lists and ranges expand into per-element names.
    //
    // Given
    // -----
    // - "{1995,1997:1998}".
    //
    // Expect
    // ------
    // - Indices 1995, 1997, 1998 in order.
    fn expand_indices_handles_lists_and_ranges() {
        // Arrange
        let name = AddressableName::parse("process[rec].ycs_values{1995,1997:1998}").unwrap();

        // Act
        let expanded = name.expand_indices().unwrap();

        // Assert
        let indices: Vec<_> = expanded.iter().filter_map(|n| n.index.clone()).collect();
        assert_eq!(indices, vec!["1995", "1997", "1998"]);
    }

    #[test]
    // Purpose
    // -------
    // Lookup helpers honour their index conventions.
    //
    // Given
    // -----
    // - A scalar, a 3-vector, and a year map.
    //
    // Expect
    // ------
    // - Scalar rejects indices, vectors are 1-based, maps key by year.
    fn lookup_helpers_follow_index_conventions() {
        // Arrange
        let mut s = 1.0;
        let mut v = vec![1.0, 2.0, 3.0];
        let mut m = BTreeMap::from([(2000_u32, 5.0)]);

        // Act / Assert
        assert!(scalar(&mut s, None).is_some());
        assert!(scalar(&mut s, Some("1")).is_none());
        assert_eq!(vector_element(&mut v, Some("1")).copied(), Some(1.0));
        assert!(vector_element(&mut v, Some("0")).is_none());
        assert_eq!(year_element(&mut m, Some("2000")).copied(), Some(5.0));
        assert!(year_element(&mut m, Some("2001")).is_none());
    }
}
