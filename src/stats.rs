//! Global outreach statistics

use crate::models::{CampaignStatus, ContactStatus, OutreachData, OutreachStats};

/// Rounded percentage, 0 when the denominator is 0
fn rate(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Aggregate counts and rates across every campaign.
///
/// Status counts are exact matches. Rates are funnel-shaped: anything past
/// `pending` counts as contacted, and a submitted form also counts as a reply
/// and an open.
pub fn compute_outreach_stats(data: &OutreachData) -> OutreachStats {
    let mut stats = OutreachStats {
        total_campaigns: data.campaigns.len() as u64,
        active_campaigns: data
            .campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Active)
            .count() as u64,
        total_contacts: data.contacts.len() as u64,
        ..Default::default()
    };

    for contact in &data.contacts {
        match contact.status {
            ContactStatus::Pending => stats.pending += 1,
            ContactStatus::Sent => stats.sent += 1,
            ContactStatus::Opened => stats.opened += 1,
            ContactStatus::Replied => stats.replied += 1,
            ContactStatus::Bounced => stats.bounced += 1,
            ContactStatus::FormSubmitted => stats.form_submitted += 1,
        }
    }

    let contacted = stats.total_contacts - stats.pending;
    stats.send_rate = rate(contacted, stats.total_contacts);
    stats.open_rate = rate(stats.opened + stats.replied + stats.form_submitted, contacted);
    stats.reply_rate = rate(stats.replied + stats.form_submitted, contacted);
    stats.form_rate = rate(stats.form_submitted, contacted);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Campaign, CampaignStats, OutreachContact, TargetFilter};
    use chrono::Utc;

    fn contact(i: usize, status: ContactStatus) -> OutreachContact {
        OutreachContact {
            venue_id: format!("v{i}"),
            venue_name: format!("Lieu {i}"),
            email: format!("v{i}@example.org"),
            status,
            campaign_id: "c1".into(),
            sent_at: None,
            opened_at: None,
            replied_at: None,
            form_token: format!("tok{i}"),
            follow_up_count: 0,
            next_follow_up_at: None,
            notes: String::new(),
        }
    }

    fn campaign(id: &str, status: CampaignStatus) -> Campaign {
        Campaign {
            id: id.into(),
            name: id.into(),
            created_at: Utc::now(),
            status,
            target_filter: TargetFilter::default(),
            email_template_id: String::new(),
            stats: CampaignStats::default(),
        }
    }

    #[test]
    fn test_empty_store() {
        let stats = compute_outreach_stats(&OutreachData::default());
        assert_eq!(stats, OutreachStats::default());
    }

    #[test]
    fn test_only_pending_has_zero_rates() {
        let data = OutreachData {
            campaigns: vec![campaign("c1", CampaignStatus::Draft)],
            contacts: (0..4).map(|i| contact(i, ContactStatus::Pending)).collect(),
        };
        let stats = compute_outreach_stats(&data);
        assert_eq!(stats.pending, 4);
        assert_eq!(stats.active_campaigns, 0);
        assert_eq!(
            (stats.send_rate, stats.open_rate, stats.reply_rate, stats.form_rate),
            (0, 0, 0, 0)
        );
    }

    #[test]
    fn test_funnel_rates() {
        use ContactStatus::*;
        let statuses = [Pending, Sent, Sent, Opened, Replied, FormSubmitted, Bounced];
        let data = OutreachData {
            campaigns: vec![
                campaign("c1", CampaignStatus::Active),
                campaign("c2", CampaignStatus::Paused),
            ],
            contacts: statuses.iter().enumerate().map(|(i, s)| contact(i, *s)).collect(),
        };

        let stats = compute_outreach_stats(&data);
        assert_eq!(stats.total_campaigns, 2);
        assert_eq!(stats.active_campaigns, 1);
        assert_eq!(stats.total_contacts, 7);
        assert_eq!(stats.sent, 2);
        // 6 of 7 contacted
        assert_eq!(stats.send_rate, 86);
        // 3 of 6 opened or further
        assert_eq!(stats.open_rate, 50);
        // 2 of 6
        assert_eq!(stats.reply_rate, 33);
        // 1 of 6
        assert_eq!(stats.form_rate, 17);
    }

    #[test]
    fn test_half_rounds_up() {
        assert_eq!(rate(1, 8), 13);
        assert_eq!(rate(0, 0), 0);
    }
}
