//! Seed plans, case seed sequences and per-member stream sets.
//!
//! Seeding is layered:
//!
//! 1. A [`SeedPlan`] maps the run's starting seed and a member index to
//!    that member's first case seed and its two multipliers.
//! 2. A [`CaseSeedSequence`] yields successive case seeds for the member.
//! 3. [`RandomStreams`] derives every stream seed from one root (a case
//!    seed, or the run seed of a time-based member) and draws uniforms.
//!
//! Nothing here is shared between members; each member owns its plan,
//! its sequence and its stream set.

use microsim_types::StreamState;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RandomError;
use crate::generators::{
    CASE_SEED_GENERATORS, GENERATOR_COUNT, MODULUS, STREAM_GENERATORS, STREAM_SEED_GENERATOR,
    is_valid_seed, step,
};

// ---------------------------------------------------------------------------
// Seed plan
// ---------------------------------------------------------------------------

/// Seeding parameters of one member, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPlan {
    member: u32,
    first_case_seed: u32,
    case_multiplier: u32,
    stream_multiplier: u32,
}

impl SeedPlan {
    /// Build the plan for `member` from the run's starting seed.
    ///
    /// Members `0..41` share the starting seed as their first case seed and
    /// differ by multiplier; every further block of 41 members reuses the
    /// multipliers with the starting seed advanced by one.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::SeedOutOfRange`] if the resulting first case
    /// seed is not in `1..2^31-1`.
    pub fn new(starting_seed: u32, member: u32) -> Result<Self, RandomError> {
        let member_index = usize::try_from(member).unwrap_or(usize::MAX);
        let block = member_index.checked_div(GENERATOR_COUNT).unwrap_or(0);
        let slot = member_index.checked_rem(GENERATOR_COUNT).unwrap_or(0);

        let first_case_seed = u64::from(starting_seed)
            .checked_add(u64::try_from(block).unwrap_or(u64::MAX))
            .unwrap_or(u64::MAX);
        let out_of_range = || RandomError::SeedOutOfRange {
            seed: first_case_seed,
            modulus: MODULUS,
        };
        let first_case_seed = u32::try_from(first_case_seed)
            .ok()
            .filter(|seed| is_valid_seed(*seed))
            .ok_or_else(out_of_range)?;

        let case_multiplier = CASE_SEED_GENERATORS
            .get(slot)
            .copied()
            .unwrap_or(CASE_SEED_GENERATORS[0]);
        let stream_multiplier = STREAM_GENERATORS
            .get(slot)
            .copied()
            .unwrap_or(STREAM_GENERATORS[0]);

        Ok(Self {
            member,
            first_case_seed,
            case_multiplier,
            stream_multiplier,
        })
    }

    /// Member index this plan belongs to.
    pub const fn member(&self) -> u32 {
        self.member
    }

    /// Seed of the member's first case.
    pub const fn first_case_seed(&self) -> u32 {
        self.first_case_seed
    }

    /// Multiplier advancing the case seed sequence.
    pub const fn case_multiplier(&self) -> u32 {
        self.case_multiplier
    }

    /// Multiplier of every draw on the member's streams.
    pub const fn stream_multiplier(&self) -> u32 {
        self.stream_multiplier
    }

    /// Root seed for a time-based member: the first advance of its case
    /// seed sequence, so members sharing a first case seed still diverge.
    pub const fn run_seed(&self) -> u32 {
        step(self.first_case_seed, self.case_multiplier)
    }

    /// Case seed sequence starting at the member's first case.
    pub const fn case_seeds(&self) -> CaseSeedSequence {
        CaseSeedSequence {
            next_seed: self.first_case_seed,
            multiplier: self.case_multiplier,
            cases_started: 0,
        }
    }

    /// Stream set rooted at `root` with this member's draw multiplier.
    ///
    /// # Errors
    ///
    /// See [`RandomStreams::seeded`].
    pub fn streams(&self, root: u32, count: usize) -> Result<RandomStreams, RandomError> {
        RandomStreams::seeded(root, self.stream_multiplier, count)
    }
}

// ---------------------------------------------------------------------------
// Case seed sequence
// ---------------------------------------------------------------------------

/// Successive case seeds of one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSeedSequence {
    next_seed: u32,
    multiplier: u32,
    cases_started: u64,
}

impl CaseSeedSequence {
    /// Return the seed of the next case and advance the sequence.
    pub fn next_case(&mut self) -> u32 {
        let seed = self.next_seed;
        self.next_seed = step(seed, self.multiplier);
        self.cases_started = self.cases_started.saturating_add(1);
        seed
    }

    /// Seed the next call to [`Self::next_case`] will return.
    pub const fn peek(&self) -> u32 {
        self.next_seed
    }

    /// Number of cases started so far.
    pub const fn cases_started(&self) -> u64 {
        self.cases_started
    }
}

// ---------------------------------------------------------------------------
// Stream set
// ---------------------------------------------------------------------------

/// A fixed number of independent uniform streams sharing one multiplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomStreams {
    multiplier: u32,
    seeds: Vec<u32>,
}

impl RandomStreams {
    /// Derive `count` stream seeds from `root`.
    ///
    /// Stream 0 starts at `root`; every further stream starts at the
    /// previous stream's seed advanced by the stream seed generator.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::SeedOutOfRange`] if `root` or `multiplier`
    /// is not a valid generator state, or [`RandomError::NoStreams`] if
    /// `count` is zero.
    pub fn seeded(root: u32, multiplier: u32, count: usize) -> Result<Self, RandomError> {
        if count == 0 {
            return Err(RandomError::NoStreams);
        }
        for value in [root, multiplier] {
            if !is_valid_seed(value) {
                return Err(RandomError::SeedOutOfRange {
                    seed: u64::from(value),
                    modulus: MODULUS,
                });
            }
        }
        let mut streams = Self {
            multiplier,
            seeds: vec![0; count],
        };
        streams.fill_from(root);
        Ok(streams)
    }

    /// Re-derive every stream seed from a new root, keeping the stream count.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::SeedOutOfRange`] if `root` is invalid.
    pub fn reseed(&mut self, root: u32) -> Result<(), RandomError> {
        if !is_valid_seed(root) {
            return Err(RandomError::SeedOutOfRange {
                seed: u64::from(root),
                modulus: MODULUS,
            });
        }
        self.fill_from(root);
        debug!(root, streams = self.seeds.len(), "Streams reseeded");
        Ok(())
    }

    fn fill_from(&mut self, root: u32) {
        let mut seed = root;
        for slot in &mut self.seeds {
            *slot = seed;
            seed = step(seed, STREAM_SEED_GENERATOR);
        }
    }

    /// Draw a uniform in `(0, 1)` from `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::UnknownStream`] if `stream` is out of range.
    pub fn uniform(&mut self, stream: usize) -> Result<f64, RandomError> {
        let count = self.seeds.len();
        let multiplier = self.multiplier;
        let seed = self
            .seeds
            .get_mut(stream)
            .ok_or(RandomError::UnknownStream { stream, count })?;
        *seed = step(*seed, multiplier);
        Ok(f64::from(*seed) / f64::from(MODULUS))
    }

    /// Borrow one stream as a [`RngCore`] for use with `rand` distributions.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::UnknownStream`] if `stream` is out of range.
    pub fn stream(&mut self, stream: usize) -> Result<StreamRng<'_>, RandomError> {
        let count = self.seeds.len();
        let multiplier = self.multiplier;
        let seed = self
            .seeds
            .get_mut(stream)
            .ok_or(RandomError::UnknownStream { stream, count })?;
        Ok(StreamRng { seed, multiplier })
    }

    /// Number of streams in the set.
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Always `false`: a set is never built without streams.
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// Capture the full state for checkpointing.
    pub fn state(&self) -> StreamState {
        StreamState {
            multiplier: self.multiplier,
            seeds: self.seeds.clone(),
        }
    }

    /// Rebuild a set from a captured state.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::MalformedState`] if the state is empty or
    /// contains an invalid seed or multiplier.
    pub fn restore(state: &StreamState) -> Result<Self, RandomError> {
        if state.seeds.is_empty() {
            return Err(RandomError::MalformedState {
                reason: "no stream seeds".to_owned(),
            });
        }
        if !is_valid_seed(state.multiplier) {
            return Err(RandomError::MalformedState {
                reason: format!("invalid multiplier {}", state.multiplier),
            });
        }
        if let Some(bad) = state.seeds.iter().find(|s| !is_valid_seed(**s)) {
            return Err(RandomError::MalformedState {
                reason: format!("invalid seed {bad}"),
            });
        }
        Ok(Self {
            multiplier: state.multiplier,
            seeds: state.seeds.clone(),
        })
    }

    /// Render the state as whitespace-separated integers:
    /// the multiplier followed by every stream seed.
    pub fn to_text(&self) -> String {
        let mut parts = Vec::with_capacity(self.seeds.len().saturating_add(1));
        parts.push(self.multiplier.to_string());
        parts.extend(self.seeds.iter().map(u32::to_string));
        parts.join(" ")
    }

    /// Parse the text form produced by [`Self::to_text`].
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::MalformedState`] if a token is not an integer
    /// or the resulting state fails [`Self::restore`].
    pub fn from_text(text: &str) -> Result<Self, RandomError> {
        let mut numbers = text.split_whitespace().map(|token| {
            token.parse::<u32>().map_err(|err| RandomError::MalformedState {
                reason: format!("token {token:?}: {err}"),
            })
        });
        let multiplier = numbers.next().ok_or_else(|| RandomError::MalformedState {
            reason: "empty state text".to_owned(),
        })??;
        let seeds = numbers.collect::<Result<Vec<_>, _>>()?;
        Self::restore(&StreamState { multiplier, seeds })
    }
}

/// One stream viewed as a [`RngCore`].
///
/// Each 32-bit output combines the top 16 bits of two consecutive draws.
#[derive(Debug)]
pub struct StreamRng<'a> {
    seed: &'a mut u32,
    multiplier: u32,
}

impl StreamRng<'_> {
    fn next_half(&mut self) -> u32 {
        *self.seed = step(*self.seed, self.multiplier);
        self.seed.wrapping_shr(15)
    }
}

impl RngCore for StreamRng<'_> {
    fn next_u32(&mut self) -> u32 {
        let high = self.next_half();
        let low = self.next_half();
        high.wrapping_shl(16) | low
    }

    fn next_u64(&mut self) -> u64 {
        rand::rand_core::impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        rand::rand_core::impls::fill_bytes_via_next(self, dst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::Rng;

    use super::*;

    fn plan(member: u32) -> SeedPlan {
        SeedPlan::new(1, member).unwrap()
    }

    #[test]
    fn first_draw_of_default_member_is_minimal_standard() {
        let mut streams = plan(0).streams(1, 1).unwrap();
        let u = streams.uniform(0).unwrap();
        assert!((u - 16_807.0 / f64::from(MODULUS)).abs() < 1e-15);
    }

    #[test]
    fn stream_seeds_chain_through_seed_generator() {
        let state = RandomStreams::seeded(7, 16_807, 3).unwrap().state();
        let second = step(7, STREAM_SEED_GENERATOR);
        assert_eq!(state.seeds, vec![7, second, step(second, STREAM_SEED_GENERATOR)]);
        assert_eq!(state.multiplier, 16_807);
    }

    #[test]
    fn member_blocks_cycle_multipliers_and_advance_seed() {
        let first = plan(3);
        let wrapped = plan(44);
        assert_eq!(first.case_multiplier(), wrapped.case_multiplier());
        assert_eq!(first.stream_multiplier(), wrapped.stream_multiplier());
        assert_eq!(first.first_case_seed(), 1);
        assert_eq!(wrapped.first_case_seed(), 2);
        assert_eq!(wrapped.member(), 44);
    }

    #[test]
    fn invalid_seeds_are_rejected() {
        assert!(SeedPlan::new(0, 0).is_err());
        assert!(SeedPlan::new(MODULUS, 0).is_err());
        assert!(RandomStreams::seeded(0, 16_807, 2).is_err());
        assert_eq!(RandomStreams::seeded(5, 16_807, 0), Err(RandomError::NoStreams));
    }

    #[test]
    fn unknown_stream_is_an_error() {
        let mut streams = RandomStreams::seeded(5, 16_807, 2).unwrap();
        assert_eq!(
            streams.uniform(2),
            Err(RandomError::UnknownStream { stream: 2, count: 2 })
        );
        assert!(streams.stream(9).is_err());
    }

    #[test]
    fn case_sequence_advances_by_case_multiplier() {
        let plan = plan(2);
        let mut cases = plan.case_seeds();
        let first = cases.next_case();
        let second = cases.next_case();
        assert_eq!(first, 1);
        assert_eq!(second, step(1, plan.case_multiplier()));
        assert_eq!(cases.cases_started(), 2);
        assert_eq!(cases.peek(), step(second, plan.case_multiplier()));
    }

    #[test]
    fn time_based_roots_differ_across_members() {
        assert_ne!(plan(0).run_seed(), plan(1).run_seed());
        assert_ne!(plan(0).run_seed(), plan(41).run_seed());
    }

    #[test]
    fn reseed_restarts_every_stream() {
        let mut streams = RandomStreams::seeded(11, 16_807, 3).unwrap();
        let fresh = streams.clone();
        for stream in 0..3 {
            let _ = streams.uniform(stream).unwrap();
        }
        assert_ne!(streams, fresh);
        streams.reseed(11).unwrap();
        assert_eq!(streams, fresh);
        assert!(streams.reseed(MODULUS).is_err());
    }

    #[test]
    fn text_state_roundtrip_continues_sequence() {
        let mut original = RandomStreams::seeded(12_345, 1_826_645_050, 4).unwrap();
        for stream in 0..4 {
            let _ = original.uniform(stream).unwrap();
        }
        let mut restored = RandomStreams::from_text(&original.to_text()).unwrap();
        for stream in [3, 1, 0, 2, 2] {
            assert_eq!(original.uniform(stream), restored.uniform(stream));
        }
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(RandomStreams::from_text("").is_err());
        assert!(RandomStreams::from_text("16807").is_err());
        assert!(RandomStreams::from_text("16807 abc").is_err());
        assert!(RandomStreams::from_text("16807 0").is_err());
    }

    #[test]
    fn stream_rng_advances_only_its_stream() {
        let mut a = RandomStreams::seeded(99, 16_807, 2).unwrap();
        let mut b = a.clone();
        let value: f64 = a.stream(1).unwrap().random();
        assert!((0.0..1.0).contains(&value));
        assert_ne!(a.state(), b.state());
        assert_eq!(a.uniform(0), b.uniform(0));
    }
}
