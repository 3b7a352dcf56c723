//! The closed set of tools the assistant may call.
//!
//! ```rust
//! use ptooling::ToolKind;
//!
//! let kind: ToolKind = "getWeather".parse().expect("known tool");
//! assert_eq!(kind, ToolKind::Weather);
//! assert!("launchRocket".parse::<ToolKind>().is_err());
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    Weather,
    GenerateImage,
    UpdateMemory,
}

impl ToolKind {
    /// Every tool, in advertisement order.
    pub const ALL: [ToolKind; 3] = [Self::Weather, Self::GenerateImage, Self::UpdateMemory];

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Weather => "getWeather",
            Self::GenerateImage => "generateImage",
            Self::UpdateMemory => "updateMemory",
        }
    }
}

impl Display for ToolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == value)
            .ok_or_else(|| ToolError::not_found(format!("tool '{value}' is not registered")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolErrorKind;

    #[test]
    fn wire_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.wire_name().parse::<ToolKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_names_are_not_found() {
        let err = "getweather".parse::<ToolKind>().expect_err("case sensitive");
        assert_eq!(err.kind, ToolErrorKind::NotFound);
    }
}
