// src/sources/filters.rs
use chrono::{Duration, NaiveDate};
use serde_json::Value;

/// Keep items whose `posted_date` falls on `today` or the day before.
///
/// Only the date portion is compared. Missing or unparseable dates exclude
/// the item.
pub fn posted_today_or_yesterday(items: Vec<Value>, today: NaiveDate) -> Vec<Value> {
    let yesterday = today - Duration::days(1);
    items
        .into_iter()
        .filter(|it| {
            matches!(
                it.get("posted_date").and_then(Value::as_str).and_then(date_portion),
                Some(d) if d == today || d == yesterday
            )
        })
        .collect()
}

/// `2024-01-02T10:00:00Z` → `2024-01-02`. Also accepts a space separator
/// and unpadded month or day (`2024-1-2`).
pub fn date_portion(s: &str) -> Option<NaiveDate> {
    let head = s.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn keeps_today_and_yesterday_only() {
        let items = vec![json!({ "posted_date": "2024-01-02T10:00:00Z" })];
        assert_eq!(posted_today_or_yesterday(items.clone(), day(2024, 1, 2)).len(), 1);
        assert_eq!(posted_today_or_yesterday(items.clone(), day(2024, 1, 3)).len(), 1);
        assert!(posted_today_or_yesterday(items, day(2024, 1, 10)).is_empty());
    }

    #[test]
    fn missing_or_malformed_dates_are_excluded() {
        let items = vec![
            json!({}),
            json!({ "posted_date": null }),
            json!({ "posted_date": 20240102 }),
            json!({ "posted_date": "yesterday" }),
            json!({ "posted_date": "02/01/2024" }),
        ];
        assert!(posted_today_or_yesterday(items, day(2024, 1, 2)).is_empty());
    }

    #[test]
    fn unpadded_dates_are_accepted() {
        assert_eq!(date_portion("2024-1-2"), Some(day(2024, 1, 2)));
        assert_eq!(date_portion("2024-1-2T09:00:00Z"), Some(day(2024, 1, 2)));
        let items = vec![json!({ "posted_date": "2024-1-1" })];
        assert_eq!(posted_today_or_yesterday(items, day(2024, 1, 2)).len(), 1);
    }

    #[test]
    fn preserves_input_order() {
        let items = vec![
            json!({ "id": "a", "posted_date": "2024-01-01" }),
            json!({ "id": "b", "posted_date": "2023-12-01" }),
            json!({ "id": "c", "posted_date": "2024-01-02 08:00:00" }),
        ];
        let kept = posted_today_or_yesterday(items, day(2024, 1, 2));
        let ids: Vec<_> = kept.iter().map(|v| v["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["a", "c"]);
    }
}
