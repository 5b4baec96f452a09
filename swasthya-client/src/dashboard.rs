use chrono::{DateTime, Local, NaiveDate};
use swasthya_shared::api::RecordDto;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub screened_today: usize,
    pub referred: usize,
}

/// Local calendar date of a record's creation timestamp, if it parses.
fn local_date(created_at: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(created_at)
        .ok()
        .map(|dt| dt.with_timezone(&Local).date_naive())
}

pub fn compute_stats(records: &[RecordDto], today: NaiveDate) -> DashboardStats {
    DashboardStats {
        total: records.len(),
        screened_today: records
            .iter()
            .filter(|r| local_date(&r.created_at) == Some(today))
            .count(),
        referred: records
            .iter()
            .filter(|r| r.health_status == "Referred")
            .count(),
    }
}

/// Newest first; records with unparsable timestamps sink to the end.
/// Ties break on id so freshly inserted rows come first.
pub fn sort_newest_first(records: &mut [RecordDto]) {
    records.sort_by(|a, b| {
        let ka = DateTime::parse_from_rfc3339(&a.created_at).ok();
        let kb = DateTime::parse_from_rfc3339(&b.created_at).ok();
        kb.cmp(&ka).then(b.id.cmp(&a.id))
    });
}

pub fn matches_filter(record: &RecordDto, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    [
        &record.child_name,
        &record.school_name,
        &record.anganwadi_kendra,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

pub fn render(records: &[RecordDto], stats: &DashboardStats) {
    println!(
        "Total: {}   Screened today: {}   Referred: {}",
        stats.total, stats.screened_today, stats.referred
    );
    println!();
    println!(
        "{:>5}  {:<20} {:>3}  {:<6} {:>6}  {:<20} {:<20} {:<20} {}",
        "ID", "Child", "Age", "Sex", "Wt", "Status", "Kendra", "School", "Created"
    );
    for r in records {
        println!(
            "{:>5}  {:<20} {:>3}  {:<6} {:>6.1}  {:<20} {:<20} {:<20} {}",
            r.id,
            truncate(&r.child_name, 20),
            r.age,
            r.gender,
            r.weight,
            r.health_status,
            truncate(&r.anganwadi_kendra, 20),
            truncate(&r.school_name, 20),
            local_timestamp(&r.created_at),
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn local_timestamp(created_at: &str) -> String {
    DateTime::parse_from_rfc3339(created_at)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i32, name: &str, status: &str, created_at: &str) -> RecordDto {
        RecordDto {
            id,
            child_name: name.to_string(),
            age: 4,
            gender: "Female".to_string(),
            weight: 14.5,
            health_status: status.to_string(),
            anganwadi_kendra: "Kendra-7".to_string(),
            school_name: "Sunrise".to_string(),
            symptoms: String::new(),
            submitted_by_user_id: "asha".to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn stats_count_today_and_referred() {
        let now = Local::now();
        let today = now.date_naive();
        let records = vec![
            record(1, "Asha", "Pending", &now.to_rfc3339()),
            record(2, "Ravi", "Referred", &now.to_rfc3339()),
            record(3, "Meena", "Referred", "2020-01-15T08:00:00+00:00"),
            record(4, "Kiran", "Checked", "not-a-timestamp"),
        ];
        let stats = compute_stats(&records, today);
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                screened_today: 2,
                referred: 2,
            }
        );
    }

    #[test]
    fn sort_puts_newest_first_and_unparsable_last() {
        let mut records = vec![
            record(1, "a", "Pending", "2026-08-01T10:00:00+00:00"),
            record(2, "b", "Pending", "garbage"),
            record(3, "c", "Pending", "2026-08-02T10:00:00+00:00"),
            record(4, "d", "Pending", "2026-08-02T10:00:00+00:00"),
        ];
        sort_newest_first(&mut records);
        let ids: Vec<i32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 3, 1, 2]);
    }

    #[test]
    fn filter_is_case_insensitive_across_fields() {
        let mut r = record(1, "Asha Kumari", "Pending", "2026-08-01T10:00:00+00:00");
        r.school_name = "Sunrise Primary".to_string();
        r.anganwadi_kendra = "Kendra-7".to_string();
        assert!(matches_filter(&r, "asha"));
        assert!(matches_filter(&r, "SUNRISE"));
        assert!(matches_filter(&r, "kendra-7"));
        assert!(!matches_filter(&r, "riverdale"));
        // symptoms and status are not part of the filter surface
        r.health_status = "Referred".to_string();
        assert!(!matches_filter(&r, "referred"));
    }
}
