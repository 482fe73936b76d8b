// ********* Input data structures ***********

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::Display;

/// The surveyed population of a poll, used as a reliability signal.
///
/// The conventional ordering of presumed reliability is
/// likely voters > registered voters > all adults.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SampleType {
    LikelyVoters,
    RegisteredVoters,
    Adults,
}

impl SampleType {
    /// Parses the conventional two-letter code (`LV`, `RV`, `A`).
    ///
    /// This is a closed enumeration. Any other code is rejected rather than
    /// being given a middle-of-the-road weight, so that data-entry mistakes
    /// upstream surface immediately.
    pub fn parse(code: &str) -> Result<SampleType, PollError> {
        match code {
            "LV" => Ok(SampleType::LikelyVoters),
            "RV" => Ok(SampleType::RegisteredVoters),
            "A" => Ok(SampleType::Adults),
            _ => Err(PollError::UnknownSampleType {
                pollster: String::new(),
                code: code.to_string(),
            }),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SampleType::LikelyVoters => "LV",
            SampleType::RegisteredVoters => "RV",
            SampleType::Adults => "A",
        }
    }
}

/// One published survey release.
///
/// A poll is immutable once constructed. The effective-sample adjustment
/// produces a new `Poll` value so the unadjusted figure stays available for
/// audit display.
#[derive(PartialEq, Debug, Clone)]
pub struct Poll {
    pub pollster: String,
    /// Last day of fieldwork. No time-of-day component.
    pub end_date: NaiveDate,
    /// Reported sample size. Zero means "exclude from weighting but keep
    /// for display".
    pub sample_size: u64,
    pub sample_type: SampleType,
    /// Option label -> percentage, in release order. The values of one poll
    /// need not sum to 100.
    pub results: Vec<(String, f64)>,
}

impl Poll {
    /// Builds a poll from raw textual parts, validating the date and the
    /// sample-type code.
    ///
    /// The `end_date` must be an ISO calendar date (`YYYY-MM-DD`). A date
    /// that does not parse rejects this poll only, with a message naming the
    /// pollster and the offending text.
    pub fn new(
        pollster: &str,
        end_date: &str,
        sample_size: u64,
        sample_type: &str,
        results: &[(String, f64)],
    ) -> Result<Poll, PollError> {
        let date = NaiveDate::parse_from_str(end_date, "%Y-%m-%d").map_err(|_| {
            PollError::MalformedDate {
                pollster: pollster.to_string(),
                text: end_date.to_string(),
            }
        })?;
        let sample_type =
            SampleType::parse(sample_type).map_err(|e| e.with_pollster(pollster))?;
        for (label, value) in results {
            if !value.is_finite() || *value < 0.0 || *value > 100.0 {
                return Err(PollError::InvalidValue {
                    pollster: pollster.to_string(),
                    label: label.clone(),
                    value: *value,
                });
            }
        }
        Ok(Poll {
            pollster: pollster.to_string(),
            end_date: date,
            sample_size,
            sample_type,
            results: results.to_vec(),
        })
    }

    /// The reported percentage for one option label, if this poll carries it.
    pub fn result(&self, key: &str) -> Option<f64> {
        self.results
            .iter()
            .find(|(label, _)| label == key)
            .map(|(_, value)| *value)
    }
}

// ******** Output data structures *********

/// One day of the aggregated series.
///
/// `values` is aligned with the candidate-key list handed to the series
/// builder. `None` means "no data": no poll contributed to that key on that
/// day. It is distinct from `Some(0.0)`, which is a valid day value.
#[derive(PartialEq, Debug, Clone)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// Errors raised while validating polls or assembling a series.
#[derive(PartialEq, Debug, Clone)]
pub enum PollError {
    /// Range discovery requires at least one poll.
    EmptyPollSet,
    MalformedDate {
        pollster: String,
        text: String,
    },
    UnknownSampleType {
        pollster: String,
        code: String,
    },
    InvalidValue {
        pollster: String,
        label: String,
        value: f64,
    },
    InvertedRange {
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl PollError {
    pub(crate) fn with_pollster(self, name: &str) -> PollError {
        match self {
            PollError::UnknownSampleType { code, .. } => PollError::UnknownSampleType {
                pollster: name.to_string(),
                code,
            },
            other => other,
        }
    }
}

impl Error for PollError {}

impl Display for PollError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollError::EmptyPollSet => {
                write!(f, "the poll set is empty: no date range can be derived")
            }
            PollError::MalformedDate { pollster, text } => write!(
                f,
                "poll from {}: end date {:?} is not a calendar date (expected YYYY-MM-DD)",
                pollster, text
            ),
            PollError::UnknownSampleType { pollster, code } if pollster.is_empty() => write!(
                f,
                "unknown sample type {:?} (expected one of LV, RV, A)",
                code
            ),
            PollError::UnknownSampleType { pollster, code } => write!(
                f,
                "poll from {}: unknown sample type {:?} (expected one of LV, RV, A)",
                pollster, code
            ),
            PollError::InvalidValue {
                pollster,
                label,
                value,
            } => write!(
                f,
                "poll from {}: value {} for {:?} is not a percentage in [0, 100]",
                pollster, value, label
            ),
            PollError::InvertedRange { start, end } => {
                write!(f, "range start {} is after range end {}", start, end)
            }
        }
    }
}

// ********* Configuration **********

// The tunable constants of the pipeline. Dashboards supply their own values;
// the defaults mirror the constants documented on the methodology pages.

/// Where the daily series should stop.
///
/// The observed range of a poll set ends at the latest field-end date. Some
/// dashboards want the trendline to visibly continue to the present; that is
/// an explicit policy choice, so the extension date is supplied by the
/// caller. The library never reads a clock.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RangeEnd {
    LastPollDate,
    Through(NaiveDate),
}

/// The weighting constants, passed explicitly into every entry point that
/// weights polls.
#[derive(PartialEq, Debug, Clone)]
pub struct WeightingPolicy {
    /// Trust multiplier for gold-standard pollsters. Applied as `m^2` on the
    /// sample size so the sqrt-derived weight scales by exactly `m`.
    pub gold_multiplier: f64,
    /// Denominator of the exponential recency decay, in days. 45.0 gives a
    /// half-life of roughly 31 days.
    pub recency_scale_days: f64,
    /// Ages beyond this many days are clamped before the decay is applied.
    pub max_age_days: i64,
    // Per-sample-type reliability weights. Invariant: LV >= RV >= A.
    pub likely_voter_weight: f64,
    pub registered_voter_weight: f64,
    pub adult_weight: f64,
}

impl WeightingPolicy {
    pub const DEFAULT_POLICY: WeightingPolicy = WeightingPolicy {
        gold_multiplier: 2.0,
        recency_scale_days: 45.0,
        max_age_days: 3650,
        likely_voter_weight: 1.15,
        registered_voter_weight: 1.0,
        adult_weight: 0.85,
    };

    pub fn sample_type_weight(&self, sample_type: SampleType) -> f64 {
        match sample_type {
            SampleType::LikelyVoters => self.likely_voter_weight,
            SampleType::RegisteredVoters => self.registered_voter_weight,
            SampleType::Adults => self.adult_weight,
        }
    }
}
