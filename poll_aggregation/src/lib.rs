mod config;
pub mod builder;
pub mod manual;
pub mod pollster;

use chrono::{Duration, NaiveDate};
use log::{debug, info};

use std::collections::HashSet;

pub use crate::config::*;

// **** Private structures ****

// A poll prepared for aggregation: the age-independent part of its weight is
// computed once, and its values are projected onto the requested keys.
// Polls with a zero sample size are dropped during preparation; they carry no
// weight on any day.
#[derive(PartialEq, Debug, Clone)]
struct PollInternal {
    end_date: NaiveDate,
    // sqrt(sample_size) * sample-type weight
    static_weight: f64,
    // Aligned with the requested candidate keys.
    values: Vec<Option<f64>>,
}

// Weighted accumulator for one candidate key on one day.
#[derive(PartialEq, Debug, Clone, Copy)]
struct WeightedSum {
    num: f64,
    den: f64,
}

impl WeightedSum {
    const EMPTY: WeightedSum = WeightedSum { num: 0.0, den: 0.0 };

    fn add(&mut self, value: f64, weight: f64) {
        self.num += value * weight;
        self.den += weight;
    }

    // None when nothing contributed: "no data" is not 0.
    fn mean(&self) -> Option<f64> {
        if self.den > 0.0 {
            Some(round1(self.num / self.den))
        } else {
            None
        }
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// The recency decay applied to a poll of the given age in days.
///
/// `decay_weight(0) == 1` and the weight halves roughly every
/// `recency_scale_days * ln(2)` days.
pub fn decay_weight(age_days: i64, policy: &WeightingPolicy) -> f64 {
    (-(age_days as f64) / policy.recency_scale_days).exp()
}

/// The composite weight of one poll as of one day.
///
/// Zero when the poll is excluded from weighting (`sample_size == 0`) or when
/// its field-end date is after `as_of` (a trendline for a day must not use
/// information from a poll fielded after it).
pub fn poll_weight(poll: &Poll, as_of: NaiveDate, policy: &WeightingPolicy) -> f64 {
    if poll.sample_size == 0 || poll.end_date > as_of {
        return 0.0;
    }
    let age = (as_of - poll.end_date)
        .num_days()
        .clamp(0, policy.max_age_days);
    (poll.sample_size as f64).sqrt()
        * decay_weight(age, policy)
        * policy.sample_type_weight(poll.sample_type)
}

/// Builds the daily weighted series for the given candidate keys over the
/// inclusive date range.
///
/// Arguments:
/// * `polls` the poll set, already pollster-adjusted by the caller. This
///   function never performs pollster classification itself.
/// * `candidate_keys` the ordered result labels to project.
/// * `start`/`end` the inclusive calendar range, one output row per day.
/// * `policy` the weighting constants.
///
/// Every row is present even when no poll contributes: an empty or fully
/// excluded poll set yields a full-range series of "no data" values, since
/// chart rendering downstream expects one row per day.
pub fn run_daily_series(
    polls: &[Poll],
    candidate_keys: &[String],
    start: NaiveDate,
    end: NaiveDate,
    policy: &WeightingPolicy,
) -> Result<Vec<DailyRow>, PollError> {
    if start > end {
        return Err(PollError::InvertedRange { start, end });
    }
    info!(
        "run_daily_series: {} polls, {} keys, {} -> {}",
        polls.len(),
        candidate_keys.len(),
        start,
        end
    );

    let prepared = prepare_polls(polls, candidate_keys, policy);
    debug!(
        "run_daily_series: {} polls carry weight after exclusion",
        prepared.len()
    );

    let num_days = (end - start).num_days() + 1;
    let mut out: Vec<DailyRow> = Vec::with_capacity(num_days as usize);
    let mut day = start;
    while day <= end {
        out.push(aggregate_day(&prepared, candidate_keys.len(), day, policy));
        day += Duration::days(1);
    }
    Ok(out)
}

fn prepare_polls(
    polls: &[Poll],
    candidate_keys: &[String],
    policy: &WeightingPolicy,
) -> Vec<PollInternal> {
    polls
        .iter()
        .filter(|p| p.sample_size > 0)
        .map(|p| PollInternal {
            end_date: p.end_date,
            static_weight: (p.sample_size as f64).sqrt()
                * policy.sample_type_weight(p.sample_type),
            values: candidate_keys.iter().map(|k| p.result(k)).collect(),
        })
        .collect()
}

fn aggregate_day(
    prepared: &[PollInternal],
    num_keys: usize,
    day: NaiveDate,
    policy: &WeightingPolicy,
) -> DailyRow {
    let mut sums: Vec<WeightedSum> = vec![WeightedSum::EMPTY; num_keys];
    for p in prepared.iter() {
        // Causality: only polls whose fieldwork ended by this day contribute.
        if p.end_date > day {
            continue;
        }
        let age = (day - p.end_date).num_days().clamp(0, policy.max_age_days);
        let weight = p.static_weight * decay_weight(age, policy);
        if weight <= 0.0 {
            continue;
        }
        for (sum, value) in sums.iter_mut().zip(p.values.iter()) {
            if let Some(v) = value {
                sum.add(*v, weight);
            }
        }
    }
    DailyRow {
        date: day,
        values: sums.iter().map(|s| s.mean()).collect(),
    }
}

/// The observed date range of a poll set: earliest to latest field-end date.
pub fn date_range(polls: &[Poll]) -> Result<(NaiveDate, NaiveDate), PollError> {
    let start = polls
        .iter()
        .map(|p| p.end_date)
        .min()
        .ok_or(PollError::EmptyPollSet)?;
    let end = polls
        .iter()
        .map(|p| p.end_date)
        .max()
        .ok_or(PollError::EmptyPollSet)?;
    Ok((start, end))
}

/// The date range with an explicit end policy.
///
/// `RangeEnd::Through` extends the end past the last poll so the trendline
/// visibly continues to a caller-chosen date (typically "today", which the
/// caller reads from its own clock). An extension date before the last poll
/// has no effect.
pub fn date_range_with(
    polls: &[Poll],
    range_end: RangeEnd,
) -> Result<(NaiveDate, NaiveDate), PollError> {
    let (start, end) = date_range(polls)?;
    match range_end {
        RangeEnd::LastPollDate => Ok((start, end)),
        RangeEnd::Through(date) => Ok((start, end.max(date))),
    }
}

/// The union of all result labels across the poll set, in first-seen order.
///
/// Callers are responsible for filtering out non-candidate labels such as
/// "Undecided" or "Other" and for choosing the final display order.
pub fn candidate_keys(polls: &[Poll]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for p in polls.iter() {
        for (label, _) in p.results.iter() {
            if seen.insert(label.clone()) {
                out.push(label.clone());
            }
        }
    }
    out
}

/// A stable fingerprint of a poll set, for memoizing computed series keyed by
/// `(fingerprint, candidate_keys, start, end)`.
///
/// Insensitive to poll order: two poll sets with the same polls in different
/// order produce the same digest.
pub fn pollset_fingerprint(polls: &[Poll]) -> String {
    let mut lines: Vec<String> = polls
        .iter()
        .map(|p| {
            let mut parts: Vec<String> = vec![format!(
                "{}|{}|{}|{}",
                p.pollster,
                p.end_date,
                p.sample_size,
                p.sample_type.code()
            )];
            for (label, value) in p.results.iter() {
                parts.push(format!("{}={}", label, value));
            }
            parts.join(";")
        })
        .collect();
    lines.sort();
    sha256::digest(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pollster::GoldStandardRegistry;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn poll(
        pollster: &str,
        end_date: &str,
        sample_size: u64,
        sample_type: &str,
        results: &[(&str, f64)],
    ) -> Poll {
        let results: Vec<(String, f64)> = results
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        Poll::new(pollster, end_date, sample_size, sample_type, &results).unwrap()
    }

    fn keys(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    const POLICY: WeightingPolicy = WeightingPolicy::DEFAULT_POLICY;

    #[test]
    fn series_is_deterministic() {
        let polls = vec![
            poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0), ("Y", 42.0)]),
            poll("Morning Consult", "2026-01-25", 2201, "RV", &[("X", 45.0), ("Y", 43.0)]),
        ];
        let ks = keys(&["X", "Y"]);
        let a = run_daily_series(&polls, &ks, date("2026-01-19"), date("2026-02-01"), &POLICY);
        let b = run_daily_series(&polls, &ks, date("2026-01-19"), date("2026-02-01"), &POLICY);
        assert_eq!(a, b);
    }

    #[test]
    fn series_is_contiguous_and_ascending() {
        let polls = vec![poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)])];
        let rows =
            run_daily_series(&polls, &keys(&["X"]), date("2026-01-10"), date("2026-02-10"), &POLICY)
                .unwrap();
        assert_eq!(rows.len(), 32);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
        assert_eq!(rows.first().unwrap().date, date("2026-01-10"));
        assert_eq!(rows.last().unwrap().date, date("2026-02-10"));
    }

    #[test]
    fn days_before_the_earliest_poll_have_no_data() {
        let polls = vec![
            poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)]),
            poll("Cygnal", "2026-01-28", 1004, "LV", &[("X", 48.0)]),
        ];
        let rows =
            run_daily_series(&polls, &keys(&["X"]), date("2026-01-10"), date("2026-01-31"), &POLICY)
                .unwrap();
        for row in rows.iter() {
            if row.date < date("2026-01-19") {
                assert_eq!(row.values, vec![None], "day {}", row.date);
            } else {
                assert!(row.values[0].is_some(), "day {}", row.date);
            }
        }
    }

    #[test]
    fn zero_sample_polls_are_inert() {
        let base = vec![
            poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0), ("Y", 42.0)]),
            poll("Morning Consult", "2026-01-25", 2201, "RV", &[("X", 45.0), ("Y", 43.0)]),
        ];
        let mut with_excluded = base.clone();
        with_excluded.push(poll("Marquette", "2026-01-28", 0, "LV", &[("X", 52.0), ("Y", 45.0)]));

        let ks = keys(&["X", "Y"]);
        let a = run_daily_series(&base, &ks, date("2026-01-19"), date("2026-02-05"), &POLICY);
        let b = run_daily_series(&with_excluded, &ks, date("2026-01-19"), date("2026-02-05"), &POLICY);
        assert_eq!(a, b);
    }

    #[test]
    fn a_single_excluded_poll_yields_no_data_not_zero() {
        let polls = vec![poll("Marquette", "2026-01-19", 0, "LV", &[("X", 52.0), ("Y", 45.0)])];
        let rows = run_daily_series(
            &polls,
            &keys(&["X", "Y"]),
            date("2026-01-19"),
            date("2026-01-24"),
            &POLICY,
        )
        .unwrap();
        assert_eq!(rows.len(), 6);
        for row in rows.iter() {
            assert_eq!(row.values, vec![None, None]);
        }
    }

    #[test]
    fn a_single_poll_pins_the_series_to_its_value() {
        // With one contributing poll the weighted mean is the poll value on
        // every day, whatever the decay.
        let polls = vec![poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 55.0)])];
        let rows =
            run_daily_series(&polls, &keys(&["X"]), date("2026-01-19"), date("2026-01-24"), &POLICY)
                .unwrap();
        for row in rows.iter() {
            assert_eq!(row.values[0], Some(55.0));
        }
    }

    #[test]
    fn fresh_gold_standard_polls_dominate() {
        // Poll A: gold standard, larger, fresher, LV. Poll B: none of those.
        // With m=2 the adjusted weight of A dominates and the aggregate lands
        // strictly between the two values, closer to A.
        let registry = GoldStandardRegistry::curated();
        let day = date("2026-02-01");
        let raw = vec![
            poll("Emerson", "2026-01-31", 1000, "LV", &[("X", 50.0), ("Y", 45.0)]),
            poll("Morning Consult", "2026-01-22", 500, "RV", &[("X", 40.0), ("Y", 55.0)]),
        ];
        let adjusted: Vec<Poll> = raw
            .iter()
            .map(|p| registry.adjust_poll(p, POLICY.gold_multiplier))
            .collect();
        assert_eq!(adjusted[0].sample_size, 4000);
        assert_eq!(adjusted[1].sample_size, 500);

        let rows = run_daily_series(&adjusted, &keys(&["X"]), day, day, &POLICY).unwrap();
        let x = rows[0].values[0].unwrap();
        assert!(x > 40.0 && x < 50.0, "x = {}", x);
        assert!((50.0 - x) < (x - 40.0), "x = {} is not closer to 50", x);
    }

    #[test]
    fn day_values_stay_inside_the_convex_hull() {
        let polls = vec![
            poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)]),
            poll("Morning Consult", "2026-01-25", 2201, "RV", &[("X", 45.0)]),
            poll("Cygnal", "2026-01-28", 1004, "LV", &[("X", 44.0)]),
        ];
        let rows =
            run_daily_series(&polls, &keys(&["X"]), date("2026-01-19"), date("2026-02-20"), &POLICY)
                .unwrap();
        for row in rows.iter() {
            let x = row.values[0].unwrap();
            assert!((44.0..=48.0).contains(&x), "day {}: {}", row.date, x);
        }
    }

    #[test]
    fn an_empty_poll_set_yields_a_full_range_of_no_data() {
        let rows = run_daily_series(
            &[],
            &keys(&["X", "Y"]),
            date("2026-01-01"),
            date("2026-01-10"),
            &POLICY,
        )
        .unwrap();
        assert_eq!(rows.len(), 10);
        for row in rows.iter() {
            assert_eq!(row.values, vec![None, None]);
        }
    }

    #[test]
    fn an_inverted_range_is_rejected() {
        let polls = vec![poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)])];
        let err = run_daily_series(&polls, &keys(&["X"]), date("2026-02-01"), date("2026-01-01"), &POLICY)
            .unwrap_err();
        assert!(matches!(err, PollError::InvertedRange { .. }));
    }

    #[test]
    fn a_key_carried_by_no_poll_is_no_data_everywhere() {
        let polls = vec![poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)])];
        let rows = run_daily_series(
            &polls,
            &keys(&["X", "Z"]),
            date("2026-01-19"),
            date("2026-01-21"),
            &POLICY,
        )
        .unwrap();
        for row in rows.iter() {
            assert!(row.values[0].is_some());
            assert_eq!(row.values[1], None);
        }
    }

    #[test]
    fn decay_starts_at_one_and_decreases() {
        assert!((decay_weight(0, &POLICY) - 1.0).abs() < 1e-12);
        assert!(decay_weight(1, &POLICY) < 1.0);
        assert!(decay_weight(100, &POLICY) < decay_weight(10, &POLICY));
        assert!(decay_weight(3650, &POLICY) > 0.0);
    }

    #[test]
    fn poll_weight_is_zero_for_future_and_excluded_polls() {
        let p = poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)]);
        assert_eq!(poll_weight(&p, date("2026-01-18"), &POLICY), 0.0);
        assert!(poll_weight(&p, date("2026-01-19"), &POLICY) > 0.0);
        let excluded = poll("Marquette", "2026-01-19", 0, "LV", &[("X", 52.0)]);
        assert_eq!(poll_weight(&excluded, date("2026-02-01"), &POLICY), 0.0);
    }

    #[test]
    fn observed_range_spans_first_to_last_field_end() {
        let polls = vec![
            poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)]),
            poll("Cygnal", "2026-01-08", 1500, "LV", &[("X", 48.0)]),
            poll("Morning Consult", "2026-02-09", 2200, "RV", &[("X", 41.0)]),
        ];
        assert_eq!(
            date_range(&polls).unwrap(),
            (date("2026-01-08"), date("2026-02-09"))
        );
        assert!(matches!(date_range(&[]), Err(PollError::EmptyPollSet)));
    }

    #[test]
    fn range_end_extension_is_explicit() {
        let polls = vec![poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)])];
        let (_, end) = date_range_with(&polls, RangeEnd::Through(date("2026-02-01"))).unwrap();
        assert_eq!(end, date("2026-02-01"));
        // An extension date before the last poll has no effect.
        let (_, end) = date_range_with(&polls, RangeEnd::Through(date("2026-01-01"))).unwrap();
        assert_eq!(end, date("2026-01-19"));
        let (_, end) = date_range_with(&polls, RangeEnd::LastPollDate).unwrap();
        assert_eq!(end, date("2026-01-19"));
    }

    #[test]
    fn discovered_keys_are_first_seen_ordered() {
        let polls = vec![
            poll("Emerson", "2026-01-19", 1000, "LV", &[("Y", 42.0), ("X", 48.0)]),
            poll("Cygnal", "2026-01-08", 1500, "LV", &[("X", 48.0), ("Undecided", 8.0)]),
        ];
        assert_eq!(candidate_keys(&polls), keys(&["Y", "X", "Undecided"]));
    }

    #[test]
    fn fingerprint_ignores_poll_order() {
        let a = poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)]);
        let b = poll("Cygnal", "2026-01-08", 1500, "LV", &[("X", 44.0)]);
        assert_eq!(
            pollset_fingerprint(&[a.clone(), b.clone()]),
            pollset_fingerprint(&[b.clone(), a.clone()])
        );
        assert_ne!(pollset_fingerprint(&[a.clone()]), pollset_fingerprint(&[b]));
        let mut a2 = a.clone();
        a2.sample_size = 4000;
        assert_ne!(pollset_fingerprint(&[a]), pollset_fingerprint(&[a2]));
    }
}
