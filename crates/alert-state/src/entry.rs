use crate::AlertState;
use std::collections::BTreeMap;

/// AlertStateEntry is the tracked state of a single alerting entity,
/// and is the unit which is persisted and restored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStateEntry {
    /// Hash of the entity's (namespace, alert id, tags). See [`crate::state_id`].
    pub state_id: u64,
    /// Tags of the entity's time series. Absent if they weren't retained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    /// State observed in the most recent evaluation, or None if never observed.
    pub current_state: Option<AlertState>,
    /// State observed in the evaluation before that.
    pub previous_state: Option<AlertState>,
    /// Epoch seconds of the run in which this entity last raised an alert or
    /// changed state. Nag intervals are measured from here.
    pub last_seen_timestamp: i64,
    /// Nag interval of the store when the entity was last evaluated.
    /// Informational only: nags are always decided by the interval of the
    /// evaluating store, and a restored value is overwritten on next evaluation.
    pub nag_interval_sec: i64,
}

impl AlertStateEntry {
    pub fn is_good(&self) -> bool {
        self.current_state == Some(AlertState::Good)
    }
}
