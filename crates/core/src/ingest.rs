//! Ingestion boundary: turns loosely typed provider records into validated
//! [`CampaignStats`].
//!
//! Every counter is checked once here: negative values and rate numerators
//! larger than their denominators are rejected, so downstream metric code can
//! assume sane input and stay total.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CampaignResult, IngestError};
use crate::types::{CampaignContent, CampaignStats, Channel, Counters, LinkedInCounters};

/// Provider record as it arrives on the wire: signed counters, optional name
/// and channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawCampaignRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub sent: i64,
    #[serde(default)]
    pub opened: i64,
    #[serde(default)]
    pub clicked: i64,
    #[serde(default)]
    pub replied: i64,
    #[serde(default)]
    pub accepted: i64,
    #[serde(default)]
    pub converted: i64,
    #[serde(default)]
    pub linkedin: Option<RawLinkedInCounters>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawLinkedInCounters {
    #[serde(default)]
    pub sent: i64,
    #[serde(default)]
    pub accepted: i64,
    #[serde(default)]
    pub replied: i64,
}

impl TryFrom<RawCampaignRecord> for CampaignStats {
    type Error = IngestError;

    fn try_from(raw: RawCampaignRecord) -> Result<Self, Self::Error> {
        let id = raw.id.trim().to_string();
        if id.is_empty() {
            return Err(IngestError::MissingId);
        }

        let unsigned = |field: &'static str, value: i64| {
            u64::try_from(value).map_err(|_| IngestError::Negative {
                campaign: id.clone(),
                field,
                value,
            })
        };

        let counters = Counters {
            sent: unsigned("sent", raw.sent)?,
            opened: unsigned("opened", raw.opened)?,
            clicked: unsigned("clicked", raw.clicked)?,
            replied: unsigned("replied", raw.replied)?,
            accepted: unsigned("accepted", raw.accepted)?,
            converted: unsigned("converted", raw.converted)?,
        };
        let linkedin = match raw.linkedin {
            Some(li) => Some(LinkedInCounters {
                sent: unsigned("linkedin.sent", li.sent)?,
                accepted: unsigned("linkedin.accepted", li.accepted)?,
                replied: unsigned("linkedin.replied", li.replied)?,
            }),
            None => None,
        };

        let channel = raw
            .channel
            .unwrap_or_else(|| infer_channel(&counters, linkedin.as_ref()));

        let (counters, linkedin) = match (channel, linkedin) {
            (Channel::Mixed, linkedin) => (counters, linkedin),
            // A LinkedIn-only record may carry its numbers in the breakdown.
            (Channel::Linkedin, Some(li)) if counters.sent == 0 => (
                Counters {
                    sent: li.sent,
                    accepted: li.accepted,
                    replied: li.replied,
                    converted: counters.converted,
                    ..Default::default()
                },
                None,
            ),
            (_, Some(_)) => {
                debug!(campaign = %id, %channel, "Dropping LinkedIn breakdown from single-channel record");
                (counters, None)
            }
            (_, None) => (counters, None),
        };

        let name = raw
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name(&id));

        let stats = CampaignStats {
            id,
            name,
            channel,
            counters,
            linkedin,
        };
        validate(&stats)?;
        Ok(stats)
    }
}

fn infer_channel(counters: &Counters, linkedin: Option<&LinkedInCounters>) -> Channel {
    let linkedin_active =
        linkedin.is_some_and(|li| li.sent > 0 || li.accepted > 0 || li.replied > 0);
    match (counters.sent > 0, linkedin_active) {
        (true, true) => Channel::Mixed,
        (false, true) => Channel::Linkedin,
        _ if counters.accepted > 0 && counters.opened == 0 && counters.clicked == 0 => {
            Channel::Linkedin
        }
        _ => Channel::Email,
    }
}

fn default_name(id: &str) -> String {
    let short: String = id.chars().take(8).collect();
    format!("Campaign {short}")
}

/// Check that every rate applicable to the campaign's channel has a
/// numerator no larger than its denominator.
pub fn validate(stats: &CampaignStats) -> Result<(), IngestError> {
    if stats.id.trim().is_empty() {
        return Err(IngestError::MissingId);
    }

    let check = |numerator: &'static str, n: u64, denominator: &'static str, d: u64| {
        if n > d {
            Err(IngestError::Inconsistent {
                campaign: stats.id.clone(),
                numerator,
                numerator_value: n,
                denominator,
                denominator_value: d,
            })
        } else {
            Ok(())
        }
    };

    let c = &stats.counters;
    if stats.channel.has_email() {
        check("opened", c.opened, "sent", c.sent)?;
        check("clicked", c.clicked, "sent", c.sent)?;
        check("replied", c.replied, "sent", c.sent)?;
    }
    if stats.channel.has_linkedin() {
        let li = stats.linkedin_counters();
        let (sent, accepted, replied) = match stats.linkedin {
            Some(_) => ("linkedin.sent", "linkedin.accepted", "linkedin.replied"),
            None => ("sent", "accepted", "replied"),
        };
        check(accepted, li.accepted, sent, li.sent)?;
        check(replied, li.replied, accepted, li.accepted)?;
    }
    check("converted", c.converted, "sent", c.sent)?;
    Ok(())
}

/// Map a nested engagement-stats payload from the campaign-data provider to a
/// flat record. The channel is left for inference.
pub fn from_engagement_stats(
    id: &str,
    name: Option<&str>,
    payload: &Value,
) -> Result<RawCampaignRecord, IngestError> {
    let engagement = payload.get("engagementStats").unwrap_or(payload);
    if !engagement.is_object() {
        return Err(IngestError::Malformed {
            campaign: id.to_string(),
            reason: "expected an object".to_string(),
        });
    }

    let count = |path: &[&str]| -> Result<Option<i64>, IngestError> {
        match lookup(engagement, path) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => as_count(value).map(Some).ok_or_else(|| IngestError::Malformed {
                campaign: id.to_string(),
                reason: format!("{} is not an integer", path.join(".")),
            }),
        }
    };

    let linkedin_sent = match count(&["channel", "linkedin", "contactRequest", "sent"])? {
        Some(sent) => sent,
        None => count(&["relations", "requestSent"])?.unwrap_or(0),
    };
    let linkedin_accepted = count(&["relations", "newRelations"])?.unwrap_or(0)
        + count(&["relations", "alreadyConnected"])?.unwrap_or(0);
    let linkedin_replied = match count(&["replies", "linkedinReplied"])? {
        Some(replied) => replied,
        None => count(&["channel", "linkedin", "message", "replied"])?.unwrap_or(0),
    };

    let linkedin = (linkedin_sent != 0 || linkedin_accepted != 0 || linkedin_replied != 0)
        .then_some(RawLinkedInCounters {
            sent: linkedin_sent,
            accepted: linkedin_accepted,
            replied: linkedin_replied,
        });

    Ok(RawCampaignRecord {
        id: id.to_string(),
        name: name.map(str::to_string),
        channel: None,
        sent: count(&["channel", "email", "sent"])?.unwrap_or(0),
        opened: count(&["channel", "email", "opened"])?.unwrap_or(0),
        clicked: count(&["channel", "email", "clicked"])?.unwrap_or(0),
        replied: count(&["channel", "email", "replied"])?.unwrap_or(0),
        accepted: 0,
        converted: count(&["converted"])?.unwrap_or(0),
        linkedin,
    })
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(key))
}

fn as_count(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}

/// Index validated campaigns by id, rejecting duplicates.
pub fn catalog(
    campaigns: impl IntoIterator<Item = CampaignStats>,
) -> Result<BTreeMap<String, CampaignStats>, IngestError> {
    let mut by_id = BTreeMap::new();
    for stats in campaigns {
        if by_id.contains_key(&stats.id) {
            return Err(IngestError::DuplicateId(stats.id));
        }
        by_id.insert(stats.id.clone(), stats);
    }
    Ok(by_id)
}

/// Read a JSON array of raw records and validate each of them.
pub fn read_records(path: &Path) -> CampaignResult<Vec<CampaignStats>> {
    let text = std::fs::read_to_string(path)?;
    let raw: Vec<RawCampaignRecord> = serde_json::from_str(&text)?;
    let stats = raw
        .into_iter()
        .map(CampaignStats::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    info!(path = %path.display(), campaigns = stats.len(), "Campaign records loaded");
    Ok(stats)
}

/// Read a JSON object mapping campaign ids to their content.
pub fn read_content(path: &Path) -> CampaignResult<BTreeMap<String, CampaignContent>> {
    let text = std::fs::read_to_string(path)?;
    let content: BTreeMap<String, CampaignContent> = serde_json::from_str(&text)?;
    debug!(path = %path.display(), entries = content.len(), "Campaign content loaded");
    Ok(content)
}
