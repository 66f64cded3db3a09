use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{Result, RouteError};
use crate::pipe::{BoxedPipe, Pipe, Traverser};

/// Sampling stage specification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Sample {
    /// Exactly this many elements, without replacement, in upstream order.
    Count(usize),
    /// Keep each element independently with this probability.
    Probability(f64),
}

impl Sample {
    pub(crate) fn probability(p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(RouteError::InvalidSample(format!(
                "probability {} outside [0, 1]",
                p
            )));
        }
        Ok(Sample::Probability(p))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Sample::Count(n) => format!("Sample(count={})", n),
            Sample::Probability(p) => format!("Sample(p={})", p),
        }
    }

    pub(crate) fn pipe<'g>(&self, upstream: BoxedPipe<'g>, rng: StdRng) -> BoxedPipe<'g> {
        match *self {
            Sample::Count(count) => Box::new(CountSamplePipe {
                upstream,
                rng,
                count,
                seen: 0,
                reservoir: Vec::with_capacity(count.min(1024)),
                output: None,
            }),
            Sample::Probability(probability) => Box::new(ProbabilitySamplePipe {
                upstream,
                rng,
                probability,
            }),
        }
    }
}

/// Reservoir sampling over the whole upstream, then replay in upstream order.
///
/// Buffers `count` traversers; nothing is emitted until the upstream is drained.
struct CountSamplePipe<'g> {
    upstream: BoxedPipe<'g>,
    rng: StdRng,
    count: usize,
    seen: usize,
    reservoir: Vec<(usize, Traverser)>,
    output: Option<std::vec::IntoIter<(usize, Traverser)>>,
}

impl CountSamplePipe<'_> {
    fn fill(&mut self) -> Result<()> {
        while let Some(t) = self.upstream.pull()? {
            let index = self.seen;
            self.seen += 1;
            if self.reservoir.len() < self.count {
                self.reservoir.push((index, t));
            } else {
                let slot = self.rng.gen_range(0..=index);
                if slot < self.count {
                    self.reservoir[slot] = (index, t);
                }
            }
        }
        Ok(())
    }
}

impl Pipe for CountSamplePipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        if self.output.is_none() {
            self.fill()?;
            let mut chosen = std::mem::take(&mut self.reservoir);
            self.output = Some(Vec::new().into_iter());
            if self.seen < self.count {
                return Err(RouteError::InvalidSample(format!(
                    "requested {} elements but upstream produced {}",
                    self.count, self.seen
                )));
            }
            chosen.sort_by_key(|(index, _)| *index);
            self.output = Some(chosen.into_iter());
        }
        Ok(self
            .output
            .as_mut()
            .and_then(|it| it.next())
            .map(|(_, t)| t))
    }
}

struct ProbabilitySamplePipe<'g> {
    upstream: BoxedPipe<'g>,
    rng: StdRng,
    probability: f64,
}

impl Pipe for ProbabilitySamplePipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        while let Some(t) = self.upstream.pull()? {
            let keep = if self.probability >= 1.0 {
                true
            } else if self.probability <= 0.0 {
                false
            } else {
                self.rng.gen_bool(self.probability)
            };
            if keep {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_bounds() {
        assert!(Sample::probability(0.0).is_ok());
        assert!(Sample::probability(1.0).is_ok());
        assert!(matches!(
            Sample::probability(1.5),
            Err(RouteError::InvalidSample(_))
        ));
        assert!(matches!(
            Sample::probability(-0.1),
            Err(RouteError::InvalidSample(_))
        ));
        assert!(matches!(
            Sample::probability(f64::NAN),
            Err(RouteError::InvalidSample(_))
        ));
    }

    #[test]
    fn test_describe() {
        assert_eq!(Sample::Count(3).describe(), "Sample(count=3)");
        assert_eq!(Sample::Probability(0.5).describe(), "Sample(p=0.5)");
    }
}
