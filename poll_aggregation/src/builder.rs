pub use crate::config::*;
use crate::pollster::GoldStandardRegistry;

/// A builder for assembling a validated poll set.
///
/// Individual malformed polls are rejected by `add_poll` without poisoning
/// the polls already accepted.
///
/// ```
/// use poll_aggregation::builder::Builder;
/// use poll_aggregation::WeightingPolicy;
/// # use poll_aggregation::PollError;
///
/// let mut builder = Builder::new(&WeightingPolicy::DEFAULT_POLICY)?.curated_registry()?;
///
/// builder.add_poll("Emerson", "2026-01-19", 1000, "LV", &[("Democrats", 48.0), ("Republicans", 42.0)])?;
///
/// let polls = builder.adjusted_polls();
/// assert_eq!(polls[0].sample_size, 4000);
///
/// # Ok::<(), PollError>(())
/// ```
pub struct Builder {
    pub(crate) _policy: WeightingPolicy,
    pub(crate) _registry: Option<GoldStandardRegistry>,
    pub(crate) _polls: Vec<Poll>,
}

impl Builder {
    pub fn new(policy: &WeightingPolicy) -> Result<Builder, PollError> {
        Ok(Builder {
            _policy: policy.clone(),
            _registry: None,
            _polls: Vec::new(),
        })
    }

    /// Attaches the default curated gold-standard registry.
    pub fn curated_registry(self) -> Result<Builder, PollError> {
        self.registry(GoldStandardRegistry::curated())
    }

    /// Attaches a caller-supplied gold-standard registry.
    pub fn registry(self, registry: GoldStandardRegistry) -> Result<Builder, PollError> {
        Ok(Builder {
            _policy: self._policy,
            _registry: Some(registry),
            _polls: self._polls,
        })
    }

    /// Adds one poll from raw textual parts.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_poll(
        &mut self,
        pollster: &str,
        end_date: &str,
        sample_size: u64,
        sample_type: &str,
        results: &[(&str, f64)],
    ) -> Result<(), PollError> {
        let results: Vec<(String, f64)> = results
            .iter()
            .map(|(label, value)| (label.to_string(), *value))
            .collect();
        let poll = Poll::new(pollster, end_date, sample_size, sample_type, &results)?;
        self.add_poll_2(&poll)
    }

    pub fn add_poll_2(&mut self, poll: &Poll) -> Result<(), PollError> {
        self._polls.push(poll.clone());
        Ok(())
    }

    /// The accepted polls, unadjusted.
    pub fn raw_polls(&self) -> Vec<Poll> {
        self._polls.clone()
    }

    /// The accepted polls with the gold-standard effective-sample adjustment
    /// applied, ready for the series builder. Without a registry this is the
    /// raw poll set.
    pub fn adjusted_polls(&self) -> Vec<Poll> {
        match &self._registry {
            Some(registry) => self
                ._polls
                .iter()
                .map(|p| registry.adjust_poll(p, self._policy.gold_multiplier))
                .collect(),
            None => self.raw_polls(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_bad_poll_does_not_poison_the_builder() {
        let mut builder = Builder::new(&WeightingPolicy::DEFAULT_POLICY).unwrap();
        builder
            .add_poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)])
            .unwrap();
        let err = builder
            .add_poll("Cygnal", "January 8", 1500, "LV", &[("X", 44.0)])
            .unwrap_err();
        assert!(matches!(err, PollError::MalformedDate { .. }));
        builder
            .add_poll("Morning Consult", "2026-01-25", 2201, "RV", &[("X", 45.0)])
            .unwrap();
        assert_eq!(builder.raw_polls().len(), 2);
    }

    #[test]
    fn adjustment_requires_a_registry() {
        let mut builder = Builder::new(&WeightingPolicy::DEFAULT_POLICY).unwrap();
        builder
            .add_poll("Emerson", "2026-01-19", 1000, "LV", &[("X", 48.0)])
            .unwrap();
        assert_eq!(builder.adjusted_polls()[0].sample_size, 1000);

        let mut builder = builder.curated_registry().unwrap();
        builder
            .add_poll("Morning Consult", "2026-01-25", 2201, "RV", &[("X", 45.0)])
            .unwrap();
        let adjusted = builder.adjusted_polls();
        assert_eq!(adjusted[0].sample_size, 4000);
        assert_eq!(adjusted[1].sample_size, 2201);
        // raw polls stay unadjusted for audit display
        assert_eq!(builder.raw_polls()[0].sample_size, 1000);
    }
}
