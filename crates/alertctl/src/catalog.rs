use alert_state::AlertConfig;
use anyhow::Context;
use std::path::Path;

/// Catalog of alert configurations, as read from YAML:
///
/// ```yaml
/// alerts:
///   - namespace: Yamas
///     alertId: 42
///     nagIntervalSecs: 3600
///     transitions: [goodToBad, badToGood]
/// ```
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    pub alerts: Vec<AlertConfig>,
}

impl Catalog {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse catalog {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut catalog: Catalog = serde_yaml::from_str(content)?;

        for config in &mut catalog.alerts {
            if config.store_identity.is_empty() {
                config.store_identity = format!("{}/{}", config.namespace, config.alert_id);
            }
        }
        Ok(catalog)
    }
}
