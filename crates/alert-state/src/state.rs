use std::fmt;

/// Signal computed for an alerting entity during one evaluation run.
///
/// Each variant carries a stable numeric id used by the persisted encoding.
/// "Never observed" is not a variant: it's represented as `None` wherever an
/// `Option<AlertState>` appears.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertState {
    Good,
    Bad,
    Warn,
    Unknown,
    Missing,
}

impl AlertState {
    pub const ALL: [AlertState; 5] = [
        AlertState::Good,
        AlertState::Bad,
        AlertState::Warn,
        AlertState::Unknown,
        AlertState::Missing,
    ];

    pub fn id(self) -> u8 {
        match self {
            AlertState::Good => 0,
            AlertState::Bad => 1,
            AlertState::Warn => 2,
            AlertState::Unknown => 3,
            AlertState::Missing => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<AlertState> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Lower-case name, as used within transition tokens.
    pub fn name(self) -> &'static str {
        match self {
            AlertState::Good => "good",
            AlertState::Bad => "bad",
            AlertState::Warn => "warn",
            AlertState::Unknown => "unknown",
            AlertState::Missing => "missing",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

impl std::str::FromStr for AlertState {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::UnknownState(s.to_string()))
    }
}
