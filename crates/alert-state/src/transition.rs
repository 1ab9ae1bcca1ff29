use crate::AlertState;
use std::collections::BTreeSet;
use std::fmt;

/// TransitionConfig is the set of state changes which are alert-worthy.
///
/// It's built from tokens which name an edge as `<from>To<To>`, for example
/// `goodToBad` or `missingToGood`. Duplicate tokens are idempotent, and an
/// empty config is valid (no transition is ever alert-worthy).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TransitionConfig {
    edges: BTreeSet<(AlertState, AlertState)>,
}

impl TransitionConfig {
    pub fn new<I, S>(tokens: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let edges = tokens
            .into_iter()
            .map(|token| parse_token(token.as_ref()))
            .collect::<crate::Result<BTreeSet<_>>>()?;

        Ok(Self { edges })
    }

    /// Build a TransitionConfig directly from (from, to) edges.
    pub fn from_edges(edges: impl IntoIterator<Item = (AlertState, AlertState)>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    pub fn is_allowed(&self, from: AlertState, to: AlertState) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn edges(&self) -> impl Iterator<Item = (AlertState, AlertState)> + '_ {
        self.edges.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Normalized tokens of this config, in edge order.
    pub fn tokens(&self) -> Vec<String> {
        self.edges().map(|(from, to)| token(from, to)).collect()
    }
}

fn token(from: AlertState, to: AlertState) -> String {
    let to = to.name();
    format!("{}To{}{}", from.name(), to[..1].to_ascii_uppercase(), &to[1..])
}

fn parse_token(s: &str) -> crate::Result<(AlertState, AlertState)> {
    for from in AlertState::ALL {
        for to in AlertState::ALL {
            if token(from, to).eq_ignore_ascii_case(s.trim()) {
                return Ok((from, to));
            }
        }
    }
    Err(crate::Error::InvalidTransition(s.to_string()))
}

impl TryFrom<Vec<String>> for TransitionConfig {
    type Error = crate::Error;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(tokens)
    }
}

impl From<TransitionConfig> for Vec<String> {
    fn from(config: TransitionConfig) -> Self {
        config.tokens()
    }
}

impl fmt::Display for TransitionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(","))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use AlertState::*;

    #[test]
    fn test_parse_tokens() {
        let config = TransitionConfig::new(["goodToBad", "badToGood", "missingToWarn"]).unwrap();

        assert!(config.is_allowed(Good, Bad));
        assert!(config.is_allowed(Bad, Good));
        assert!(config.is_allowed(Missing, Warn));
        assert!(!config.is_allowed(Warn, Missing));
        assert!(!config.is_allowed(Good, Warn));

        assert_eq!(
            config.tokens(),
            vec!["goodToBad", "badToGood", "missingToWarn"]
        );
        assert_eq!(config.to_string(), "goodToBad,badToGood,missingToWarn");
    }

    #[test]
    fn test_duplicates_and_empty() {
        let config = TransitionConfig::new(["goodToBad", "goodToBad", "GoodToBad"]).unwrap();
        assert_eq!(config.edges().count(), 1);

        let empty = TransitionConfig::new(Vec::<String>::new()).unwrap();
        assert!(empty.is_empty());
        for from in AlertState::ALL {
            for to in AlertState::ALL {
                assert!(!empty.is_allowed(from, to));
            }
        }
    }

    #[test]
    fn test_invalid_tokens() {
        for bad in ["goodTo", "goodtobad2", "criticalToGood", "good_to_bad", ""] {
            let err = TransitionConfig::new([bad]).unwrap_err();
            assert!(
                matches!(err, crate::Error::InvalidTransition(ref t) if t == bad),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn test_serde_as_token_list() {
        let config: TransitionConfig =
            serde_json::from_str(r#"["warnToBad", "unknownToGood"]"#).unwrap();
        assert!(config.is_allowed(Warn, Bad));
        assert!(config.is_allowed(Unknown, Good));

        assert_eq!(
            serde_json::to_string(&config).unwrap(),
            r#"["warnToBad","unknownToGood"]"#
        );

        assert!(serde_json::from_str::<TransitionConfig>(r#"["nope"]"#).is_err());
    }
}
