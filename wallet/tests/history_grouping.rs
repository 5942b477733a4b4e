//! Grouping of transaction and payout history into day buckets

use chrono::{DateTime, Duration, Utc};
use wallet::{
    group_by_date, InvalidTimestampPolicy, PaymentMethod, PayoutRecord, PayoutStatus,
    TransactionRecord, TransactionStatus,
};

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid test timestamp")
        .with_timezone(&Utc)
}

fn now() -> DateTime<Utc> {
    at("2024-01-12T12:00:00Z")
}

fn tx(id: &str, created_at: &str) -> TransactionRecord {
    TransactionRecord {
        id: id.to_string(),
        created_at: created_at.to_string(),
        amount: 1000,
        currency: "usd".to_string(),
        status: TransactionStatus::Completed,
        description: None,
        payment_method: PaymentMethod::Qr,
    }
}

fn ids(items: &[TransactionRecord]) -> Vec<&str> {
    items.iter().map(|t| t.id.as_str()).collect()
}

#[test]
fn test_grouping_is_deterministic() {
    let records = vec![
        tx("a", "2024-01-12T08:00:00Z"),
        tx("b", "2024-01-05T09:00:00Z"),
        tx("c", "2024-01-11T10:00:00Z"),
        tx("d", "2024-01-12T23:59:00Z"),
    ];

    let first = group_by_date(records.clone(), &now(), InvalidTimestampPolicy::Reject).unwrap();
    let second = group_by_date(records, &now(), InvalidTimestampPolicy::Reject).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_same_day_records_share_today_bucket() {
    let records = vec![
        tx("morning", "2024-01-12T08:00:00Z"),
        tx("midnight", "2024-01-12T23:59:00Z"),
    ];

    let grouped = group_by_date(records, &now(), InvalidTimestampPolicy::Reject).unwrap();

    assert_eq!(grouped.buckets.len(), 1);
    assert_eq!(grouped.buckets[0].label, "TODAY");
    assert_eq!(ids(&grouped.buckets[0].items), vec!["midnight", "morning"]);
}

#[test]
fn test_yesterday_label() {
    let grouped = group_by_date(
        vec![tx("y", "2024-01-11T10:00:00Z")],
        &now(),
        InvalidTimestampPolicy::Reject,
    )
    .unwrap();

    assert_eq!(grouped.labels(), vec!["YESTERDAY, JAN 11, 2024"]);
}

#[test]
fn test_older_date_label() {
    let grouped = group_by_date(
        vec![tx("old", "2024-01-01T10:00:00Z")],
        &now(),
        InvalidTimestampPolicy::Reject,
    )
    .unwrap();

    // 2024-01-01 was a Monday
    assert_eq!(grouped.labels(), vec!["Monday, Jan 1, 2024"]);
}

#[test]
fn test_buckets_newest_first() {
    let week_ago = (now() - Duration::days(7)).to_rfc3339();
    let records = vec![
        tx("week", &week_ago),
        tx("today", "2024-01-12T09:00:00Z"),
        tx("yesterday", "2024-01-11T09:00:00Z"),
    ];

    let grouped = group_by_date(records, &now(), InvalidTimestampPolicy::Reject).unwrap();

    assert_eq!(
        grouped.labels(),
        vec!["TODAY", "YESTERDAY, JAN 11, 2024", "Friday, Jan 5, 2024"]
    );
    assert_eq!(ids(&grouped.buckets[2].items), vec!["week"]);
}

#[test]
fn test_empty_input() {
    let grouped = group_by_date(
        Vec::<TransactionRecord>::new(),
        &now(),
        InvalidTimestampPolicy::Reject,
    )
    .unwrap();

    assert!(grouped.is_empty());
    assert!(grouped.skipped.is_empty());
}

#[test]
fn test_invalid_timestamp_is_never_treated_as_now() {
    let records = vec![tx("ok", "2024-01-12T09:00:00Z"), tx("broken", "2024-13-45")];

    assert!(group_by_date(records.clone(), &now(), InvalidTimestampPolicy::Reject).is_err());

    let grouped = group_by_date(records, &now(), InvalidTimestampPolicy::Skip).unwrap();
    assert_eq!(ids(&grouped.buckets[0].items), vec!["ok"]);
    assert_eq!(grouped.skipped[0].record.id, "broken");
}

#[test]
fn test_payouts_group_by_arrival_date() {
    let payout = |id: &str, arrival: &str| PayoutRecord {
        id: id.to_string(),
        arrival_date: at(arrival).timestamp(),
        amount: 5000,
        currency: "usd".to_string(),
        status: PayoutStatus::Paid,
    };
    let payouts = vec![
        payout("po_old", "2024-01-08T00:00:00Z"),
        payout("po_today", "2024-01-12T00:00:00Z"),
    ];

    let grouped = group_by_date(payouts, &now(), InvalidTimestampPolicy::Reject).unwrap();
    assert_eq!(grouped.labels(), vec!["TODAY", "Monday, Jan 8, 2024"]);
}
