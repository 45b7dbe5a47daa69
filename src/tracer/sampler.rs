//! Per-trace sampling decisions.

use uuid::Uuid;

pub trait Sampler: Send + Sync {
    fn should_sample(&self, trace_id: &str) -> bool;
}

/// Keeps roughly `rate` of all traces.
///
/// The decision is derived from the trace id alone, so every process that sees
/// the same trace id makes the same choice.
#[derive(Clone, Debug)]
pub struct RatioSampler {
    pub rate: f64,
}

impl RatioSampler {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
        }
    }
}

impl Sampler for RatioSampler {
    fn should_sample(&self, trace_id: &str) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        if self.rate <= 0.0 {
            return false;
        }
        let bucket = trace_bucket(trace_id) as f64 / u64::MAX as f64;
        bucket < self.rate
    }
}

fn trace_bucket(trace_id: &str) -> u64 {
    match Uuid::parse_str(trace_id) {
        Ok(uuid) => {
            // leading bytes are random; the variant bits would skew the low half
            let (high, _) = uuid.as_u64_pair();
            high
        }
        // FNV-1a over the raw id
        Err(_) => trace_id.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_rate_samples_everything() {
        let sampler = RatioSampler::new(1.0);
        assert!(sampler.should_sample(&Uuid::new_v4().to_string()));
        assert!(sampler.should_sample("not-a-uuid"));
    }

    #[test]
    fn test_zero_rate_samples_nothing() {
        let sampler = RatioSampler::new(0.0);
        assert!(!sampler.should_sample(&Uuid::new_v4().to_string()));
    }

    #[test]
    fn test_decision_is_stable_per_trace() {
        let sampler = RatioSampler::new(0.5);
        let trace_id = Uuid::new_v4().to_string();
        let first = sampler.should_sample(&trace_id);
        for _ in 0..10 {
            assert_eq!(sampler.should_sample(&trace_id), first);
        }
    }

    #[test]
    fn test_half_rate_is_roughly_half() {
        let sampler = RatioSampler::new(0.5);
        let sampled = (0..2_000)
            .filter(|_| sampler.should_sample(&Uuid::new_v4().to_string()))
            .count();
        assert!(sampled > 800 && sampled < 1_200, "sampled {}", sampled);
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(RatioSampler::new(3.0).rate, 1.0);
        assert_eq!(RatioSampler::new(-1.0).rate, 0.0);
    }
}
