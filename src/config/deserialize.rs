// ABOUTME: Custom serde deserializers for plan types.
// ABOUTME: Handles non-empty host and step lists and non-zero time limits.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::time::Duration;

use super::HostConfig;
use super::step::StepEntry;

pub fn deserialize_hosts<'de, D>(deserializer: D) -> Result<NonEmpty<HostConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<HostEntry> = Vec::deserialize(deserializer)?;
    let hosts = values
        .into_iter()
        .map(|entry| entry.into_host_config())
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(hosts).ok_or_else(|| serde::de::Error::custom("at least one host is required"))
}

pub fn deserialize_hosts_option<'de, D>(
    deserializer: D,
) -> Result<Option<NonEmpty<HostConfig>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<Vec<HostEntry>> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(values) => {
            let hosts = values
                .into_iter()
                .map(|entry| entry.into_host_config())
                .collect::<Result<Vec<_>, _>>()
                .map_err(serde::de::Error::custom)?;

            let nonempty = NonEmpty::from_vec(hosts).ok_or_else(|| {
                serde::de::Error::custom("destination hosts list cannot be empty")
            })?;
            Ok(Some(nonempty))
        }
    }
}

pub fn deserialize_steps<'de, D>(deserializer: D) -> Result<NonEmpty<StepEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let steps: Vec<StepEntry> = Vec::deserialize(deserializer)?;
    if let Some(position) = steps.iter().position(|s| s.command().trim().is_empty()) {
        return Err(serde::de::Error::custom(format!(
            "step {} has an empty command",
            position + 1
        )));
    }
    NonEmpty::from_vec(steps).ok_or_else(|| serde::de::Error::custom("at least one step is required"))
}

/// A humantime duration that must be greater than zero.
pub fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let duration: Duration = humantime_serde::deserialize(deserializer)?;
    if duration.is_zero() {
        return Err(serde::de::Error::custom("time limits must be greater than zero"));
    }
    Ok(duration)
}

pub fn deserialize_timeout_option<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let duration: Option<Duration> = humantime_serde::deserialize(deserializer)?;
    match duration {
        Some(d) if d.is_zero() => Err(serde::de::Error::custom(
            "time limits must be greater than zero",
        )),
        other => Ok(other),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HostEntry {
    Simple(String),
    Detailed(HostConfig),
}

impl HostEntry {
    fn into_host_config(self) -> Result<HostConfig, String> {
        match self {
            HostEntry::Simple(s) => HostConfig::parse(&s),
            HostEntry::Detailed(c) => Ok(c),
        }
    }
}
