use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IngestError;
use crate::ingest::RawCampaignRecord;

/// Outreach medium of a campaign. Decides which metrics apply to it.
///
/// Serializes lowercase; deserializes through [`FromStr`], so provider
/// spellings such as `LinkedIn` or `multichannel` are accepted.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Linkedin,
    Mixed,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Linkedin => "linkedin",
            Channel::Mixed => "mixed",
        }
    }

    /// Whether the email-side metrics (open, click, email reply) apply.
    pub fn has_email(self) -> bool {
        matches!(self, Channel::Email | Channel::Mixed)
    }

    /// Whether the LinkedIn-side metrics (acceptance, LinkedIn reply) apply.
    pub fn has_linkedin(self) -> bool {
        matches!(self, Channel::Linkedin | Channel::Mixed)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" | "e-mail" => Ok(Channel::Email),
            "linkedin" => Ok(Channel::Linkedin),
            "mixed" | "multichannel" => Ok(Channel::Mixed),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Rate metrics derived from campaign counters.
///
/// The declaration order is the canonical order used wherever metrics are
/// iterated (scoring, prompt rendering), so results never depend on the
/// order of a configuration table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    OpenRate,
    ClickRate,
    ReplyRateEmail,
    AcceptanceRate,
    ReplyRateLinkedin,
    ConversionRate,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::OpenRate,
        Metric::ClickRate,
        Metric::ReplyRateEmail,
        Metric::AcceptanceRate,
        Metric::ReplyRateLinkedin,
        Metric::ConversionRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::OpenRate => "open_rate",
            Metric::ClickRate => "click_rate",
            Metric::ReplyRateEmail => "reply_rate_email",
            Metric::AcceptanceRate => "acceptance_rate",
            Metric::ReplyRateLinkedin => "reply_rate_linkedin",
            Metric::ConversionRate => "conversion_rate",
        }
    }

    /// Human-readable label used in prompts and demo phrasing.
    pub fn label(self) -> &'static str {
        match self {
            Metric::OpenRate => "open rate",
            Metric::ClickRate => "click rate",
            Metric::ReplyRateEmail => "email reply rate",
            Metric::AcceptanceRate => "acceptance rate",
            Metric::ReplyRateLinkedin => "LinkedIn reply rate",
            Metric::ConversionRate => "conversion rate",
        }
    }

    pub fn applies_to(self, channel: Channel) -> bool {
        match self {
            Metric::OpenRate | Metric::ClickRate | Metric::ReplyRateEmail => channel.has_email(),
            Metric::AcceptanceRate | Metric::ReplyRateLinkedin => channel.has_linkedin(),
            Metric::ConversionRate => true,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw counters reported by the campaign-data provider.
///
/// For `linkedin` campaigns `sent` counts connection requests; for `mixed`
/// campaigns carrying a [`LinkedInCounters`] breakdown these counters
/// describe the email side only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub opened: u64,
    #[serde(default)]
    pub clicked: u64,
    #[serde(default)]
    pub replied: u64,
    #[serde(default)]
    pub accepted: u64,
    #[serde(default)]
    pub converted: u64,
}

/// LinkedIn side of a multichannel campaign.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedInCounters {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub accepted: u64,
    #[serde(default)]
    pub replied: u64,
}

/// Validated performance snapshot of one campaign.
///
/// Deserialization goes through [`RawCampaignRecord`] so that every
/// `CampaignStats` in the system has passed ingestion checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawCampaignRecord")]
pub struct CampaignStats {
    pub id: String,
    pub name: String,
    pub channel: Channel,
    #[serde(flatten)]
    pub counters: Counters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<LinkedInCounters>,
}

impl CampaignStats {
    /// Build and validate a single-breakdown campaign.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        channel: Channel,
        counters: Counters,
    ) -> Result<Self, IngestError> {
        let stats = Self {
            id: id.into(),
            name: name.into(),
            channel,
            counters,
            linkedin: None,
        };
        crate::ingest::validate(&stats)?;
        Ok(stats)
    }

    /// Build and validate a multichannel campaign with a LinkedIn breakdown.
    pub fn mixed(
        id: impl Into<String>,
        name: impl Into<String>,
        email: Counters,
        linkedin: LinkedInCounters,
    ) -> Result<Self, IngestError> {
        let stats = Self {
            id: id.into(),
            name: name.into(),
            channel: Channel::Mixed,
            counters: email,
            linkedin: Some(linkedin),
        };
        crate::ingest::validate(&stats)?;
        Ok(stats)
    }

    /// Counters feeding the LinkedIn metrics: the explicit breakdown when one
    /// exists, the top-level counters otherwise.
    pub fn linkedin_counters(&self) -> LinkedInCounters {
        self.linkedin.unwrap_or(LinkedInCounters {
            sent: self.counters.sent,
            accepted: self.counters.accepted,
            replied: self.counters.replied,
        })
    }
}

/// Copy used by a campaign, when the caller has it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignContent {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub linkedin_message: Option<String>,
}

impl CampaignContent {
    pub fn is_empty(&self) -> bool {
        [&self.subject, &self.body, &self.linkedin_message]
            .iter()
            .all(|field| field.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}
