use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FlagError;

/// QC flag attached to a measured or calculated value.
///
/// Only `Good`, `AssumedGood`, `Questionable` and `Bad` carry a severity.
/// The remaining variants are markers used by ingestion and manual QC; they
/// rank below `Good` and are equally significant among themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Flag {
    NoQc,
    Good,
    AssumedGood,
    Questionable,
    Bad,
    Needed,
    Ignored,
}

impl Flag {
    pub const ORDERED: [Flag; 4] = [Flag::Good, Flag::AssumedGood, Flag::Questionable, Flag::Bad];

    pub fn code(self) -> i32 {
        match self {
            Flag::NoQc => 0,
            Flag::Good => 2,
            Flag::AssumedGood => -2,
            Flag::Questionable => 3,
            Flag::Bad => 4,
            Flag::Needed => -10,
            Flag::Ignored => -1002,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, FlagError> {
        match code {
            0 => Ok(Flag::NoQc),
            2 => Ok(Flag::Good),
            -2 => Ok(Flag::AssumedGood),
            3 => Ok(Flag::Questionable),
            4 => Ok(Flag::Bad),
            -10 => Ok(Flag::Needed),
            -1002 => Ok(Flag::Ignored),
            other => Err(FlagError::UnknownCode(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::NoQc => "NO_QC",
            Flag::Good => "GOOD",
            Flag::AssumedGood => "ASSUMED_GOOD",
            Flag::Questionable => "QUESTIONABLE",
            Flag::Bad => "BAD",
            Flag::Needed => "NEEDED",
            Flag::Ignored => "IGNORED",
        }
    }

    /// Severity rank. Markers share rank 0.
    pub fn significance(self) -> u8 {
        match self {
            Flag::Good => 1,
            Flag::AssumedGood => 2,
            Flag::Questionable => 3,
            Flag::Bad => 4,
            Flag::NoQc | Flag::Needed | Flag::Ignored => 0,
        }
    }

    pub fn is_severity(self) -> bool {
        self.significance() > 0
    }

    pub fn more_significant_than(self, other: Flag) -> bool {
        self.significance() > other.significance()
    }

    pub fn equal_significance(self, other: Flag) -> bool {
        self.significance() == other.significance()
    }

    pub fn is_good(self) -> bool {
        matches!(self, Flag::Good | Flag::AssumedGood)
    }

    /// Worst flag in `flags`; the first one wins on ties.
    pub fn most_significant<I>(flags: I) -> Option<Flag>
    where
        I: IntoIterator<Item = Flag>,
    {
        flags.into_iter().fold(None, |worst, flag| match worst {
            Some(current) if !flag.more_significant_than(current) => Some(current),
            _ => Some(flag),
        })
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for Flag {
    type Error = FlagError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Flag::from_code(code)
    }
}

impl From<Flag> for i32 {
    fn from(flag: Flag) -> Self {
        flag.code()
    }
}
