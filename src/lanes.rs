use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum LaneError {
    #[error("combine should be one of: cross, zip; {0}")]
    InvalidCombine(String),
    #[error("empty country code in lane ({from:?}, {to:?})")]
    EmptyCountry { from: String, to: String },
}

/// An origin-destination country pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Lane {
    pub from: String,
    pub to: String,
}

impl Lane {
    pub fn new(from: &str, to: &str) -> Result<Lane, LaneError> {
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(LaneError::EmptyCountry {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Lane {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// How the origin and destination lists are paired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Every origin with every destination.
    Cross,
    /// Positional pairing, stops at the shorter list.
    Zip,
}

impl FromStr for Combine {
    type Err = LaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cross" => Ok(Combine::Cross),
            "zip" => Ok(Combine::Zip),
            _ => Err(LaneError::InvalidCombine(s.to_string())),
        }
    }
}

impl fmt::Display for Combine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combine::Cross => write!(f, "cross"),
            Combine::Zip => write!(f, "zip"),
        }
    }
}

/// Build the list of lanes to query, in request order.
pub fn combine_lanes(
    from_countries: &[String],
    to_countries: &[String],
    combine: Combine,
) -> Result<Vec<Lane>, LaneError> {
    let pairs: Vec<(&String, &String)> = match combine {
        Combine::Cross => from_countries
            .iter()
            .cartesian_product(to_countries.iter())
            .collect(),
        Combine::Zip => from_countries.iter().zip(to_countries.iter()).collect(),
    };
    pairs
        .into_iter()
        .map(|(from, to)| Lane::new(from, to))
        .collect()
}
