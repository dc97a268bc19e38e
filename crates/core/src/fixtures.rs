//! Built-in demo dataset: four outreach campaigns with their copy, used when
//! no provider export is at hand.

use std::collections::BTreeMap;

use crate::types::{CampaignContent, CampaignStats, Channel, Counters, LinkedInCounters};

struct DemoCampaign {
    id: &'static str,
    name: &'static str,
    email: Counters,
    linkedin: Option<LinkedInCounters>,
}

fn demo_rows() -> [DemoCampaign; 4] {
    [
        DemoCampaign {
            id: "demo_1",
            name: "Email > LinkedIn - CEO #1",
            email: Counters {
                sent: 145,
                opened: 87,
                clicked: 23,
                replied: 12,
                accepted: 0,
                converted: 5,
            },
            linkedin: Some(LinkedInCounters {
                sent: 120,
                accepted: 45,
                replied: 18,
            }),
        },
        DemoCampaign {
            id: "demo_2",
            name: "LinkedIn > Email - CMO #1",
            email: Counters {
                sent: 95,
                opened: 62,
                clicked: 15,
                replied: 8,
                accepted: 0,
                converted: 7,
            },
            linkedin: Some(LinkedInCounters {
                sent: 120,
                accepted: 52,
                replied: 22,
            }),
        },
        DemoCampaign {
            id: "demo_3",
            name: "Email Only - COO #1",
            email: Counters {
                sent: 195,
                opened: 98,
                clicked: 28,
                replied: 15,
                accepted: 0,
                converted: 3,
            },
            linkedin: None,
        },
        DemoCampaign {
            id: "demo_4",
            name: "Multichannel - Voice Note",
            email: Counters {
                sent: 75,
                opened: 52,
                clicked: 18,
                replied: 10,
                accepted: 0,
                converted: 9,
            },
            linkedin: Some(LinkedInCounters {
                sent: 80,
                accepted: 48,
                replied: 28,
            }),
        },
    ]
}

/// The demo campaigns. Every row satisfies ingestion checks.
pub fn demo_campaigns() -> Vec<CampaignStats> {
    demo_rows()
        .into_iter()
        .map(|row| CampaignStats {
            id: row.id.to_string(),
            name: row.name.to_string(),
            channel: if row.linkedin.is_some() {
                Channel::Mixed
            } else {
                Channel::Email
            },
            counters: row.email,
            linkedin: row.linkedin,
        })
        .collect()
}

/// Copy of the demo campaigns keyed by campaign id.
pub fn demo_content() -> BTreeMap<String, CampaignContent> {
    let entry = |subject: &str, body: &str, linkedin: Option<&str>| CampaignContent {
        subject: Some(subject.to_string()),
        body: Some(body.to_string()),
        linkedin_message: linkedin.map(str::to_string),
    };

    BTreeMap::from([
        (
            "demo_1".to_string(),
            entry(
                "2 AM checkout breaks",
                "Hi {{firstName}},\n\nIt's 2:30 AM. Your checkout breaks on mobile.\n\nWhen do you find out?",
                Some("Thanks for connecting {{firstName}}. Your checkout can break at 2 AM..."),
            ),
        ),
        (
            "demo_2".to_string(),
            entry(
                "{{firstName}} - 2 hours of lost revenue",
                "Hey {{firstName}},\n\nQuick question: when was the last time you checked your store analytics at 3 AM?",
                Some("Hey {{firstName}}, thanks for connecting. Just curious - when does your team stop checking..."),
            ),
        ),
        (
            "demo_3".to_string(),
            entry(
                "Your ops team wastes time daily",
                "Hi {{firstName}},\n\nI noticed {{companyName}} is scaling fast. Quick question...",
                None,
            ),
        ),
        (
            "demo_4".to_string(),
            entry(
                "Quick voice note for {{firstName}}",
                "Hi {{firstName}},\n\nI just sent you a voice note on LinkedIn...",
                Some("[Voice Note] Hey {{firstName}}, quick 30 second message for you..."),
            ),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest;

    #[test]
    fn test_demo_campaigns_pass_validation() {
        let campaigns = demo_campaigns();
        assert_eq!(campaigns.len(), 4);
        for stats in &campaigns {
            ingest::validate(stats).unwrap();
        }
        let by_id = ingest::catalog(campaigns).unwrap();
        assert_eq!(by_id["demo_3"].channel, Channel::Email);
        assert_eq!(by_id["demo_4"].channel, Channel::Mixed);
    }

    #[test]
    fn test_demo_content_covers_every_campaign() {
        let content = demo_content();
        for stats in demo_campaigns() {
            assert!(content.contains_key(&stats.id), "missing content for {}", stats.id);
        }
        assert!(content["demo_3"].linkedin_message.is_none());
    }
}
