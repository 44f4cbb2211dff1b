//! Access levels and the sub-permissions of custom access.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown value {value:?}, expected one of [{}]", .expected.join(", "))]
pub struct UnknownValue {
    pub value: String,
    pub expected: &'static [&'static str],
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $s:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $s)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const NAMES: &'static [&'static str] = &[$($s),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $s,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($name::$variant),)+
                    _ => Err(UnknownValue {
                        value: s.to_string(),
                        expected: Self::NAMES,
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Access level of a team on a workspace
    pub enum AccessType {
        Admin => "admin",
        Read => "read",
        Plan => "plan",
        Write => "write",
        Custom => "custom",
    }
}

impl AccessType {
    /// Only custom access has individually settable permissions.
    pub fn is_custom(&self) -> bool {
        matches!(self, AccessType::Custom)
    }
}

string_enum! {
    pub enum RunsPermission {
        Read => "read",
        Plan => "plan",
        Apply => "apply",
    }
}

string_enum! {
    pub enum VariablesPermission {
        None => "none",
        Read => "read",
        Write => "write",
    }
}

string_enum! {
    pub enum StateVersionsPermission {
        None => "none",
        ReadOutputs => "read-outputs",
        Read => "read",
        Write => "write",
    }
}

string_enum! {
    pub enum SentinelMocksPermission {
        None => "none",
        Read => "read",
    }
}
