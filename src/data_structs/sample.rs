use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// A sample identifier of the form `individual.sample`.
///
/// An individual may contribute several samples (tissue types, replicates);
/// the dotted form is the key the API uses everywhere, so the identifier
/// must split into exactly two parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SampleId {
    individual: String,
    sample:     String,
}

impl SampleId {
    pub fn new(individual: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            individual: individual.into(),
            sample:     sample.into(),
        }
    }

    pub fn individual(&self) -> &str {
        &self.individual
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// True when both identifiers belong to the same individual.
    pub fn same_individual(&self, other: &SampleId) -> bool {
        self.individual == other.individual
    }
}

impl FromStr for SampleId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((individual, sample))
                if !individual.is_empty() && !sample.is_empty() && !sample.contains('.') =>
            {
                Ok(Self::new(individual, sample))
            },
            _ => bail!("sample identifier `{s}` is not of the form individual.sample"),
        }
    }
}

impl Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.individual, self.sample)
    }
}

impl TryFrom<String> for SampleId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SampleId> for String {
    fn from(value: SampleId) -> Self {
        value.to_string()
    }
}
