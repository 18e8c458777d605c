//! Channel roles.

use std::fmt;

/// The two independently connected roles of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Ambulance driver: receives offers, broadcasts position.
    Driver,
    /// Caller: observes dispatch and ambulance position.
    Rider,
}

impl Role {
    /// Channel namespace the role connects to.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Driver => "/drivers",
            Self::Rider => "/users",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Rider => "rider",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
