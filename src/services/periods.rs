//! Date bucketing shared by the planning, sales and stock reports.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Reporting period kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeriodKind {
    Weekly,
    Monthly,
    Quarterly,
    BiAnnual,
    Annual,
}

/// Grouping key used by the planning overview.
///
/// Weekly keys are the Monday of the ISO week.
pub fn period_key(kind: PeriodKind, date: NaiveDate) -> String {
    match kind {
        PeriodKind::Weekly => {
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            monday.format("%Y-%m-%d").to_string()
        }
        PeriodKind::Monthly => date.format("%Y-%m").to_string(),
        PeriodKind::Quarterly => format!("{}-Q{}", date.year(), (date.month() - 1) / 3 + 1),
        PeriodKind::BiAnnual => {
            let half = if date.month() <= 6 { 1 } else { 2 };
            format!("{}-H{}", date.year(), half)
        }
        PeriodKind::Annual => date.year().to_string(),
    }
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The month before `(year, month)`, wrapping January to December of the previous year
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Unclamped end of a sales-report bucket starting at `start`
fn report_bucket_end(kind: PeriodKind, start: NaiveDate) -> NaiveDate {
    match kind {
        PeriodKind::Weekly => start + Duration::days(6),
        PeriodKind::Monthly => month_end(start),
        PeriodKind::Quarterly => start + Duration::days(90),
        PeriodKind::BiAnnual => start + Duration::days(181),
        PeriodKind::Annual => NaiveDate::from_ymd_opt(start.year(), 12, 31).unwrap_or(start),
    }
}

/// Consecutive buckets covering `[start, end]`; each bucket end is clamped to `end`.
pub fn report_buckets(kind: PeriodKind, start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut buckets = Vec::new();
    let mut current = start;
    while current <= end {
        let bucket_end = report_bucket_end(kind, current).min(end);
        buckets.push((current, bucket_end));
        match bucket_end.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    buckets
}

/// Key under which sales-report totals are published
pub fn report_bucket_key(kind: PeriodKind, start: NaiveDate) -> String {
    match kind {
        PeriodKind::Monthly => start.format("%Y-%m").to_string(),
        PeriodKind::Annual => start.year().to_string(),
        _ => start.format("%Y-%m-%d").to_string(),
    }
}

/// `actual / planned × 100`, or 0 when nothing was planned
pub fn percentage(actual: f64, planned: f64) -> f64 {
    if planned > 0.0 {
        actual / planned * 100.0
    } else {
        0.0
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Months of a `YYYY-Qn` quarter as `YYYY-MM` period strings
pub fn quarter_months(quarter: &str) -> Option<[String; 3]> {
    let (year, q) = quarter.split_once("-Q")?;
    let year: i32 = year.parse().ok()?;
    let q: u32 = q.parse().ok()?;
    if !(1..=4).contains(&q) {
        return None;
    }
    let first = (q - 1) * 3 + 1;
    Some([
        format!("{:04}-{:02}", year, first),
        format!("{:04}-{:02}", year, first + 1),
        format!("{:04}-{:02}", year, first + 2),
    ])
}

/// `YYYY-MM` period of a date
pub fn month_period(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(PeriodKind::Weekly, d(2024, 5, 16), "2024-05-13")]
    #[case(PeriodKind::Weekly, d(2024, 5, 13), "2024-05-13")]
    #[case(PeriodKind::Monthly, d(2024, 5, 16), "2024-05")]
    #[case(PeriodKind::Quarterly, d(2024, 5, 16), "2024-Q2")]
    #[case(PeriodKind::Quarterly, d(2024, 12, 31), "2024-Q4")]
    #[case(PeriodKind::BiAnnual, d(2024, 6, 30), "2024-H1")]
    #[case(PeriodKind::BiAnnual, d(2024, 7, 1), "2024-H2")]
    #[case(PeriodKind::Annual, d(2024, 7, 1), "2024")]
    fn period_keys(#[case] kind: PeriodKind, #[case] date: NaiveDate, #[case] expected: &str) {
        assert_eq!(period_key(kind, date), expected);
    }

    #[test]
    fn period_kind_parses_snake_case() {
        assert_eq!(PeriodKind::from_str("bi_annual").unwrap(), PeriodKind::BiAnnual);
        assert_eq!(PeriodKind::BiAnnual.to_string(), "bi_annual");
        assert!(PeriodKind::from_str("fortnightly").is_err());
    }

    #[test]
    fn month_end_handles_leap_years_and_december() {
        assert_eq!(month_end(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_end(d(2023, 2, 10)), d(2023, 2, 28));
        assert_eq!(month_end(d(2024, 12, 5)), d(2024, 12, 31));
    }

    #[test]
    fn monthly_buckets_follow_calendar_months() {
        let buckets = report_buckets(PeriodKind::Monthly, d(2024, 1, 15), d(2024, 3, 10));
        assert_eq!(
            buckets,
            vec![
                (d(2024, 1, 15), d(2024, 1, 31)),
                (d(2024, 2, 1), d(2024, 2, 29)),
                (d(2024, 3, 1), d(2024, 3, 10)),
            ]
        );
    }

    #[test]
    fn quarterly_buckets_span_ninety_one_days() {
        let buckets = report_buckets(PeriodKind::Quarterly, d(2024, 1, 1), d(2024, 12, 31));
        assert_eq!(buckets[0], (d(2024, 1, 1), d(2024, 3, 31)));
        assert_eq!(buckets[1].0, d(2024, 4, 1));
    }

    #[test]
    fn bucket_keys() {
        assert_eq!(report_bucket_key(PeriodKind::Monthly, d(2024, 3, 4)), "2024-03");
        assert_eq!(report_bucket_key(PeriodKind::Annual, d(2024, 3, 4)), "2024");
        assert_eq!(report_bucket_key(PeriodKind::Weekly, d(2024, 3, 4)), "2024-03-04");
    }

    #[test]
    fn percentages_and_rounding() {
        assert_eq!(percentage(50.0, 200.0), 25.0);
        assert_eq!(percentage(50.0, 0.0), 0.0);
        assert_eq!(percentage(50.0, -1.0), 0.0);
        assert_eq!(round2(1.005_1), 1.01);
    }

    #[test]
    fn quarters_and_previous_months() {
        assert_eq!(
            quarter_months("2024-Q3").unwrap(),
            ["2024-07".to_string(), "2024-08".to_string(), "2024-09".to_string()]
        );
        assert!(quarter_months("2024-Q5").is_none());
        assert!(quarter_months("garbage").is_none());
        assert_eq!(previous_month(2024, 3), (2024, 2));
    }

    proptest! {
        #[test]
        fn buckets_are_contiguous_and_cover_the_range(
            offset in 0i64..3000,
            len in 0i64..800,
            kind_idx in 0usize..5,
        ) {
            let kinds = [
                PeriodKind::Weekly,
                PeriodKind::Monthly,
                PeriodKind::Quarterly,
                PeriodKind::BiAnnual,
                PeriodKind::Annual,
            ];
            let start = d(2020, 1, 1) + Duration::days(offset);
            let end = start + Duration::days(len);
            let buckets = report_buckets(kinds[kind_idx], start, end);

            prop_assert_eq!(buckets.first().map(|b| b.0), Some(start));
            prop_assert_eq!(buckets.last().map(|b| b.1), Some(end));
            for pair in buckets.windows(2) {
                prop_assert_eq!(pair[0].1.succ_opt(), Some(pair[1].0));
            }
            for (s, e) in &buckets {
                prop_assert!(s <= e);
            }
        }
    }
}
