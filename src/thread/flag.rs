use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use enumflags2::{BitFlags, bitflags};
use log::trace;
use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq as _};
use thiserror::Error;

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ThreadFlag {
    Read,
    Starred,
    Important,
}

impl ThreadFlag {
    pub fn format(flags: BitFlags<Self>) -> String {
        flags
            .iter()
            .map(|flag| flag.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serializes a flag set as a list of names, e.g. `["read","starred"]`.
    pub(crate) fn serialize_set<S: Serializer>(
        flags: &BitFlags<Self>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(flags.len()))?;
        for flag in flags.iter() {
            seq.serialize_element(&flag.to_string())?;
        }
        seq.end()
    }

    pub(crate) fn deserialize_set<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BitFlags<Self>, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut flags = BitFlags::empty();
        for name in names {
            match name.parse::<Self>() {
                Ok(flag) => flags |= flag,
                Err(UnknownFlagError { flag }) => {
                    trace!("ignoring unhandled thread flag {flag}");
                }
            }
        }
        Ok(flags)
    }
}

impl Display for ThreadFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadFlag::Read => write!(f, "read"),
            ThreadFlag::Starred => write!(f, "starred"),
            ThreadFlag::Important => write!(f, "important"),
        }
    }
}

#[derive(Error, Debug)]
#[error("unknown thread flag {flag}")]
pub struct UnknownFlagError {
    flag: String,
}

impl FromStr for ThreadFlag {
    type Err = UnknownFlagError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(ThreadFlag::Read),
            "starred" => Ok(ThreadFlag::Starred),
            "important" => Ok(ThreadFlag::Important),
            _ => Err(Self::Err {
                flag: value.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    #[case("read", ThreadFlag::Read)]
    #[case("starred", ThreadFlag::Starred)]
    #[case("important", ThreadFlag::Important)]
    fn test_flag_parses_its_display_form(#[case] name: &str, #[case] flag: ThreadFlag) {
        assert_eq!(flag, assert_ok!(name.parse::<ThreadFlag>()));
        assert_eq!(name, flag.to_string());
    }

    #[rstest]
    fn test_unknown_flag_is_rejected() {
        assert_err!("snoozed".parse::<ThreadFlag>());
    }

    #[rstest]
    fn test_format_joins_flags() {
        let flags = ThreadFlag::Read | ThreadFlag::Important;
        assert_eq!("read important", ThreadFlag::format(flags));
    }
}
