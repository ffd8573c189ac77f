//! Weighted categorical samplers for op kinds and result types.
use hlsfuzz_ir::{NumericKind, OpKind, OverflowMode, ResultType, RoundingMode};
use hlsfuzz_utils::{Error, FuzzResult};
use rand::{
    Rng,
    distributions::{Distribution, WeightedIndex},
};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Draws items with probability proportional to their weights.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    items: Vec<T>,
    /// Normalized to sum to 1.
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl<T: Clone> WeightedSampler<T> {
    /// Build a sampler. Weights must be finite and non-negative with a
    /// positive sum, and there must be exactly one weight per item.
    pub fn new(items: Vec<T>, weights: Vec<f64>) -> FuzzResult<Self> {
        if items.is_empty() || items.len() != weights.len() {
            return Err(Error::invalid_argument(format!(
                "expected one weight for each of {} items, found {}",
                items.len(),
                weights.len()
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0)
        {
            return Err(Error::invalid_argument(format!(
                "weight {w} is not a finite non-negative number"
            )));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(Error::invalid_argument("all weights are zero"));
        }
        let weights: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let index = WeightedIndex::new(&weights)
            .map_err(|err| Error::invalid_argument(err.to_string()))?;
        Ok(Self {
            items,
            weights,
            index,
        })
    }

    /// Every item equally likely.
    pub fn uniform(items: Vec<T>) -> FuzzResult<Self> {
        let weights = vec![1.0; items.len()];
        Self::new(items, weights)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.items[self.index.sample(rng)].clone()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Pick an element of `items`, favoring the middle of the list.
///
/// Position `i` of an `n` element list has weight
/// `exp(-0.5 * ((i - (n - 1) / 2) / (n / 6))^2)`.
pub fn pick_centered<T: Copy, R: Rng + ?Sized>(
    items: &[T],
    rng: &mut R,
) -> FuzzResult<T> {
    match items {
        [] => Err(Error::invalid_argument("cannot pick from an empty list")),
        [only] => Ok(*only),
        _ => {
            let n = items.len() as f64;
            let center = (n - 1.0) / 2.0;
            let std_dev = n / 6.0;
            let weights = (0..items.len())
                .map(|i| (-0.5 * ((i as f64 - center) / std_dev).powi(2)).exp())
                .collect();
            WeightedSampler::new(items.to_vec(), weights)
                .map(|sampler| sampler.sample(rng))
        }
    }
}

/// Preset distributions over [`OpKind::SAMPLED`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum OpDistribution {
    /// Mostly arithmetic, then bitwise, then relational.
    #[default]
    Default,
    Arithmetic,
    Logical,
    Comparison,
    Uniform,
}

impl OpDistribution {
    /// Weights in the order of [`OpKind::SAMPLED`].
    pub fn weights(&self) -> [f64; 15] {
        match self {
            OpDistribution::Default => [
                0.15, 0.15, 0.12, // add sub mul
                0.08, 0.08, 0.06, 0.04, 0.04, 0.04, // and or xor not shl shr
                0.06, 0.06, 0.04, 0.04, 0.02, 0.02, // eq neq lt gt le ge
            ],
            OpDistribution::Arithmetic => [
                0.35, 0.35, 0.20, //
                0.02, 0.02, 0.02, 0.01, 0.01, 0.01, //
                0.003, 0.003, 0.002, 0.002, 0.001, 0.001,
            ],
            OpDistribution::Logical => [
                0.10, 0.10, 0.05, //
                0.25, 0.25, 0.15, 0.05, 0.02, 0.02, //
                0.003, 0.003, 0.002, 0.002, 0.001, 0.001,
            ],
            OpDistribution::Comparison => [
                0.15, 0.15, 0.05, //
                0.05, 0.05, 0.03, 0.02, 0.02, 0.02, //
                0.16, 0.16, 0.06, 0.06, 0.02, 0.02,
            ],
            OpDistribution::Uniform => [1.0; 15],
        }
    }
}

/// Samples op kinds for new ops and inputs.
#[derive(Debug, Clone)]
pub struct OpKindSampler {
    sampler: WeightedSampler<OpKind>,
}

impl OpKindSampler {
    pub fn new(dist: OpDistribution) -> FuzzResult<Self> {
        Self::from_weights(dist.weights().to_vec())
    }

    /// Custom weights, one per kind of [`OpKind::SAMPLED`].
    pub fn from_weights(weights: Vec<f64>) -> FuzzResult<Self> {
        Ok(Self {
            sampler: WeightedSampler::new(OpKind::SAMPLED.to_vec(), weights)?,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> OpKind {
        self.sampler.sample(rng)
    }

    pub fn sampler(&self) -> &WeightedSampler<OpKind> {
        &self.sampler
    }
}

/// Weights used to draw result types.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConfig {
    pub kinds: Vec<(NumericKind, f64)>,
    pub widths: Vec<(u32, f64)>,
    /// One weight per [`RoundingMode`], in declaration order.
    pub rounding: Vec<f64>,
    /// One weight per [`OverflowMode`], in declaration order.
    pub overflow: Vec<f64>,
}

impl Default for TypeConfig {
    fn default() -> Self {
        Self {
            kinds: vec![
                (NumericKind::Int, 0.4),
                (NumericKind::Fixed, 0.4),
                (NumericKind::UInt, 0.2),
            ],
            widths: vec![
                (1, 0.1),
                (2, 0.2),
                (4, 0.3),
                (8, 0.2),
                (16, 0.1),
                (32, 0.1),
            ],
            rounding: vec![1.0; RoundingMode::iter().count()],
            overflow: vec![1.0; OverflowMode::iter().count()],
        }
    }
}

/// Samples [`ResultType`]s.
#[derive(Debug, Clone)]
pub struct TypeSampler {
    kinds: WeightedSampler<NumericKind>,
    widths: WeightedSampler<u32>,
    rounding: WeightedSampler<RoundingMode>,
    overflow: WeightedSampler<OverflowMode>,
}

impl TypeSampler {
    pub fn new(config: &TypeConfig) -> FuzzResult<Self> {
        if let Some((w, _)) = config.widths.iter().find(|(w, _)| *w == 0) {
            return Err(Error::invalid_argument(format!(
                "bit width {w} is not positive"
            )));
        }
        let (kinds, kind_weights): (Vec<_>, Vec<_>) =
            config.kinds.iter().copied().unzip();
        let (widths, width_weights): (Vec<_>, Vec<_>) =
            config.widths.iter().copied().unzip();
        Ok(Self {
            kinds: WeightedSampler::new(kinds, kind_weights)?,
            widths: WeightedSampler::new(widths, width_weights)?,
            rounding: WeightedSampler::new(
                RoundingMode::iter().collect(),
                config.rounding.clone(),
            )?,
            overflow: WeightedSampler::new(
                OverflowMode::iter().collect(),
                config.overflow.clone(),
            )?,
        })
    }

    /// Draw a type. The integer part of a fixed-point type is uniform in
    /// `[1, width]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ResultType {
        let width = self.widths.sample(rng);
        match self.kinds.sample(rng) {
            NumericKind::Int => ResultType::int(width),
            NumericKind::UInt => ResultType::uint(width),
            NumericKind::Fixed => {
                let int_width = rng.gen_range(1..=width);
                ResultType::fixed(
                    width,
                    int_width,
                    self.rounding.sample(rng),
                    self.overflow.sample(rng),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeded_rng;
    use hlsfuzz_utils::ErrorKind;
    use std::str::FromStr;

    #[test]
    fn weights_are_normalized() {
        let sampler =
            WeightedSampler::new(vec!['a', 'b', 'c'], vec![1.0, 1.0, 2.0])
                .unwrap();
        assert_eq!(sampler.weights(), &[0.25, 0.25, 0.5]);
        let total: f64 = OpKindSampler::new(OpDistribution::Arithmetic)
            .unwrap()
            .sampler()
            .weights()
            .iter()
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bad_weights_are_rejected() {
        for weights in [vec![0.0, 0.0], vec![1.0], vec![-1.0, 2.0]] {
            let err = WeightedSampler::new(vec![1, 2], weights).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));
        }
        assert!(WeightedSampler::new(vec![1], vec![f64::NAN]).is_err());
        assert!(OpKindSampler::from_weights(vec![1.0; 14]).is_err());
        assert!(WeightedSampler::<u8>::uniform(vec![]).is_err());
    }

    #[test]
    fn zero_weight_is_never_drawn() {
        let sampler =
            WeightedSampler::new(vec![1, 2, 3], vec![1.0, 0.0, 1.0]).unwrap();
        let mut rng = seeded_rng(3);
        assert!((0..500).all(|_| sampler.sample(&mut rng) != 2));
    }

    #[test]
    fn sampled_kinds_exclude_memory_and_division() {
        let sampler = OpKindSampler::new(OpDistribution::Uniform).unwrap();
        let mut rng = seeded_rng(11);
        for _ in 0..1000 {
            let kind = sampler.sample(&mut rng);
            assert!(OpKind::SAMPLED.contains(&kind));
        }
    }

    #[test]
    fn sampled_types_are_valid() {
        let sampler = TypeSampler::new(&TypeConfig::default()).unwrap();
        let mut rng = seeded_rng(0);
        let mut saw_fixed = false;
        for _ in 0..1000 {
            let ty = sampler.sample(&mut rng);
            ty.validate().unwrap();
            assert!([1, 2, 4, 8, 16, 32].contains(&ty.width));
            saw_fixed |= ty.is_fixed();
        }
        assert!(saw_fixed);
    }

    #[test]
    fn zero_width_is_rejected() {
        let config = TypeConfig {
            widths: vec![(0, 1.0)],
            ..TypeConfig::default()
        };
        assert!(TypeSampler::new(&config).is_err());
    }

    #[test]
    fn centered_pick_prefers_the_middle() {
        let items: Vec<usize> = (0..9).collect();
        let mut rng = seeded_rng(5);
        let mut counts = [0usize; 9];
        for _ in 0..5000 {
            counts[pick_centered(&items, &mut rng).unwrap()] += 1;
        }
        assert!(counts[4] > counts[0] * 4);
        assert!(counts[4] > counts[8] * 4);
        assert_eq!(pick_centered(&[7], &mut rng).unwrap(), 7);
        assert!(pick_centered::<u8, _>(&[], &mut rng).is_err());
    }

    #[test]
    fn presets_parse() {
        assert_eq!(
            OpDistribution::from_str("comparison").unwrap(),
            OpDistribution::Comparison
        );
        assert_eq!(OpDistribution::default().to_string(), "default");
        for dist in OpDistribution::iter() {
            assert!(OpKindSampler::new(dist).is_ok());
        }
    }
}
