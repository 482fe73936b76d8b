/*!

This is the long-form manual for `poll_aggregation` and `polltrends`.

## The model

Every dashboard series is built the same way: a heterogeneous list of poll
releases goes in, one weighted snapshot per calendar day comes out, per
candidate. On a given day `D`, every poll whose fieldwork ended on or before
`D` contributes with the composite weight

```text
weight = exp(-age / recency_scale_days) * sqrt(sample_size) * type_weight
```

where `age` is the number of days between the poll's field-end date and `D`
(clamped to `max_age_days`), and `type_weight` reflects the surveyed
population: likely voters are weighted above registered voters, registered
voters above all adults. The day's value for a candidate is the
weight-normalized average of the contributing polls, rounded to one decimal
place. Days on which no poll carries a value for a candidate are reported as
"no data", never as zero.

With the default policy (`recency_scale_days = 45`) a poll loses half of its
influence roughly every 31 days.

## Gold-standard upweighting

A curated registry of high-trust pollsters receives an upweighted
contribution. The adjustment is applied to the input data, not to the
aggregator: the reported sample size is inflated to `n * m^2`, so the
sqrt-derived sample weight scales by exactly `m`. The adjusted figure is an
"effective sample size" used only for weighting; audit tables display it next
to the raw `n`.

Registry matching is forgiving about formatting: names are lowercased,
parenthetical partisan tags such as `(R)` are removed, punctuation is
collapsed, and membership is a substring test. "Emerson College Polling (R)"
matches a registry entry of "Emerson".

The multiplier is part of the weighting policy, not a constant: the observed
dashboards disagree on its value (2 on horse-race pages, 3 on approval
pages), so every call site must say which one it means.

## Input formats

The `polltrends` command accepts poll releases in the following formats:

* `json` A JSON list of poll objects:

```json
[
  {
    "pollster": "Emerson",
    "endDate": "2026-01-19",
    "sampleSize": 1000,
    "sampleType": "LV",
    "results": { "Democrats": 48, "Republicans": 42 }
  }
]
```

* `csv` A header row naming the fixed columns `pollster`, `endDate`,
  `sampleSize`, `sampleType`; every other header cell is an option label.
  An empty cell means the poll did not report that option.

```text
pollster,endDate,sampleSize,sampleType,Democrats,Republicans
Emerson,2026-01-19,1000,LV,48,42
Quantus Insights,2026-01-22,1000,RV,47,41
```

* `xlsx` The same column convention in an Excel workbook (first worksheet,
  or the one named with `--excel-worksheet-name`).

`sampleType` is one of `LV` (likely voters), `RV` (registered voters) or `A`
(all adults). Any other code rejects the poll: a silent default would mask
data-entry mistakes upstream.

A poll with `sampleSize` 0 is kept for the audit table but carries no weight.

## Configuration

A dashboard is described by a JSON configuration file:

```json
{
  "displaySettings": { "dashboardName": "Generic ballot" },
  "pollFileSources": [
    { "provider": "csv", "filePath": "polls.csv" }
  ],
  "candidates": {
    "exclude": ["Undecided", "Other"],
    "sortAlphabetically": true
  },
  "weighting": {
    "goldMultiplier": 2,
    "recencyScaleDays": 45,
    "likelyVoterWeight": 1.15,
    "registeredVoterWeight": 1.0,
    "adultWeight": 0.85,
    "goldStandardPollsters": ["Emerson", "Trafalgar"],
    "extendRangeTo": "2026-03-01"
  }
}
```

All weighting fields are optional and default to the documented constants.
`candidates.keys` pins the projected labels explicitly; without it the labels
are discovered from the polls, the `exclude` list (default `Undecided` and
`Other`) is dropped, and the remainder is sorted alphabetically for display.
`extendRangeTo` stretches the series end past the last poll so the trendline
continues to a chosen date.

## Output

The summary is a JSON document with three parts: the `config` echo, the
gap-free daily `series` (days without data carry the literal string
`"no data"`), and the per-poll `polls` audit list with the raw and effective
sample sizes, the gold-standard flag, the weight multiplier, and the margin
between the first two displayed candidates.

A reference summary can be supplied with `--reference`; `polltrends` then
diffs the computed summary against it and fails on any difference.

*/
