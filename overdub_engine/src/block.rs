//! Block arithmetic: silence, saturating mix and peak level.

use std::fmt;
use std::sync::Arc;

/// Full-scale magnitude of a 16-bit sample (|i16::MIN|).
const FULL_SCALE: f32 = 32768.0;

/// Fixed-length interleaved 16-bit block.
///
/// Blocks are immutable once built; mixing produces a new block. Cloning is
/// a reference-count bump, so whole-buffer copies share sample storage safely.
#[derive(Clone, PartialEq, Eq)]
pub struct SampleBlock {
    samples: Arc<[i16]>,
}

impl SampleBlock {
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![0; len].into(),
        }
    }

    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Writable samples. Storage shared with another clone is copied first,
    /// so other holders never observe the change.
    pub fn samples_mut(&mut self) -> &mut [i16] {
        if Arc::get_mut(&mut self.samples).is_none() {
            self.samples = self.samples.to_vec().into();
        }
        match Arc::get_mut(&mut self.samples) {
            Some(samples) => samples,
            None => &mut [],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }
}

impl From<Vec<i16>> for SampleBlock {
    fn from(samples: Vec<i16>) -> Self {
        Self::from_samples(samples)
    }
}

impl fmt::Debug for SampleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBlock")
            .field("len", &self.len())
            .field("peak", &peak_level(self))
            .finish()
    }
}

/// Sample-wise sum of `blocks`, clipped to the 16-bit range.
///
/// `None` entries count as silence. Every present block must be exactly
/// `len` samples long; anything else is a caller bug and panics.
pub fn sum<'a, I>(len: usize, blocks: I) -> SampleBlock
where
    I: IntoIterator<Item = Option<&'a SampleBlock>>,
{
    let blocks: Vec<Option<&SampleBlock>> = blocks.into_iter().collect();
    let mut mixed = vec![0; len];
    sum_into(&mut mixed, &blocks);
    SampleBlock::from_samples(mixed)
}

/// [`sum`] into an existing buffer, for the callback path.
pub fn sum_into(out: &mut [i16], blocks: &[Option<&SampleBlock>]) {
    for block in blocks.iter().flatten() {
        assert_eq!(
            block.len(),
            out.len(),
            "malformed block: expected {} samples, got {}",
            out.len(),
            block.len()
        );
    }

    for (i, o) in out.iter_mut().enumerate() {
        let acc: i32 = blocks.iter().flatten().map(|b| b.samples()[i] as i32).sum();
        *o = clip(acc);
    }
}

/// Two-input shorthand for [`sum`].
pub fn mix(a: &SampleBlock, b: &SampleBlock) -> SampleBlock {
    sum(a.len(), [Some(a), Some(b)])
}

/// Overdubs `block` onto `target` in place.
pub fn mix_into(target: &mut SampleBlock, block: &SampleBlock) {
    let len = target.len();
    assert_eq!(block.len(), len, "malformed block: expected {} samples, got {}", len, block.len());
    for (t, &s) in target.samples_mut().iter_mut().zip(block.samples()) {
        *t = clip(*t as i32 + s as i32);
    }
}

fn clip(s: i32) -> i16 {
    s.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Largest absolute sample, normalized to 0.0..=1.0.
pub fn peak_level(block: &SampleBlock) -> f32 {
    let peak = block
        .samples()
        .iter()
        .map(|&s| (s as i32).abs())
        .max()
        .unwrap_or(0);
    peak as f32 / FULL_SCALE
}

/// Peak level of `mix(a, b)` without building the mixed block.
pub fn mixed_peak(a: &SampleBlock, b: &SampleBlock) -> f32 {
    let peak = a
        .samples()
        .iter()
        .zip(b.samples())
        .map(|(&x, &y)| (clip(x as i32 + y as i32) as i32).abs())
        .max()
        .unwrap_or(0);
    peak as f32 / FULL_SCALE
}
