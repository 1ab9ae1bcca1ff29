use crate::{TransitionConfig, DO_NOT_NAG};

/// AlertConfig is the subset of an alert configuration which drives its
/// state store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    pub namespace: String,
    pub alert_id: i64,
    /// Seconds between repeated notifications of an unresolved alert.
    /// Zero (`DO_NOT_NAG`) disables repeats.
    #[serde(default = "default_nag_interval")]
    pub nag_interval_secs: i64,
    /// Transition tokens (like `goodToBad`) which are alert-worthy.
    #[serde(default)]
    pub transitions: TransitionConfig,
    /// Name of the state store, used in logs and metrics.
    #[serde(default)]
    pub store_identity: String,
}

fn default_nag_interval() -> i64 {
    DO_NOT_NAG
}

impl AlertConfig {
    pub fn new(namespace: impl Into<String>, alert_id: i64, transitions: TransitionConfig) -> Self {
        let namespace = namespace.into();
        Self {
            store_identity: format!("{namespace}/{alert_id}"),
            namespace,
            alert_id,
            nag_interval_secs: DO_NOT_NAG,
            transitions,
        }
    }

    pub fn with_nag_interval_secs(mut self, secs: i64) -> Self {
        self.nag_interval_secs = secs;
        self
    }
}
