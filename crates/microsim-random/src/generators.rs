//! Fixed generator constants for the multiplicative congruential streams.
//!
//! All generators share the prime modulus `2^31 - 1`. Case seeds advance
//! with a per-member multiplier chosen from [`CASE_SEED_GENERATORS`];
//! draws advance with the matching entry of [`STREAM_GENERATORS`]; stream
//! seeds are derived from the root with [`STREAM_SEED_GENERATOR`], which
//! appears in neither table.

/// Prime modulus shared by every generator.
pub const MODULUS: u32 = 2_147_483_647;

/// Number of known-good generator constants. Member indices beyond the
/// table reuse constants cyclically while advancing the root seed.
pub const GENERATOR_COUNT: usize = 41;

/// Multiplier deriving each stream seed from the previous one.
pub const STREAM_SEED_GENERATOR: u32 = 376_740_290;

/// Default number of streams per member.
pub const DEFAULT_STREAM_COUNT: usize = 10;

/// Case seed advance multipliers, indexed by member modulo [`GENERATOR_COUNT`].
pub const CASE_SEED_GENERATORS: [u32; GENERATOR_COUNT] = [
    470_583_131,
    1_278_375_574,
    1_182_424_016,
    465_267_208,
    236_156_608,
    507_096_703,
    1_030_737_213,
    1_192_442_634,
    286_354_484,
    1_963_413_634,
    929_285_805,
    1_074_439_303,
    1_866_718_706,
    1_746_251_423,
    444_178_200,
    1_076_542_630,
    289_753_891,
    490_363_125,
    803_959_450,
    37_939_113,
    1_153_920_361,
    1_010_788_020,
    1_148_043_095,
    1_422_167_303,
    1_596_996_927,
    396_692_538,
    2_125_924_067,
    290_525_234,
    1_412_033_687,
    70_608_958,
    366_654_164,
    29_727_326,
    40_186_327,
    1_271_122_795,
    940_165_244,
    735_279_377,
    1_988_769_561,
    988_683_283,
    1_943_943_356,
    1_294_875_557,
    914_624_015,
];

/// Draw multipliers, indexed by member modulo [`GENERATOR_COUNT`].
pub const STREAM_GENERATORS: [u32; GENERATOR_COUNT] = [
    16_807,
    1_826_645_050,
    519_701_294,
    1_912_518_406,
    87_921_397,
    755_482_893,
    673_205_363,
    727_452_832,
    630_360_016,
    1_142_281_875,
    219_667_202,
    200_558_872,
    1_185_331_463,
    573_186_566,
    396_907_481,
    1_106_264_918,
    1_605_529_283,
    1_902_548_864,
    1_444_095_898,
    1_600_915_560,
    1_987_505_485,
    1_323_051_066,
    1_715_488_211,
    1_289_290_241,
    967_740_346,
    1_644_645_313,
    2_142_074_246,
    1_397_488_348,
    97_473_033,
    1_210_640_156,
    990_191_797,
    640_039_787,
    1_141_672_104,
    2_081_478_048,
    1_236_995_837,
    1_985_494_258,
    84_845_685,
    184_528_125,
    1_303_680_654,
    61_496_220,
    1_096_609_123,
];

/// One step of the recurrence: `seed * multiplier mod (2^31 - 1)`.
///
/// Both operands stay below `2^31`, so the product fits in 62 bits and
/// the residue in 31.
#[allow(clippy::cast_possible_truncation)]
pub const fn step(seed: u32, multiplier: u32) -> u32 {
    let product = (seed as u64).wrapping_mul(multiplier as u64);
    product.wrapping_rem(MODULUS as u64) as u32
}

/// Whether `seed` is a valid generator state (`1..MODULUS`).
pub const fn is_valid_seed(seed: u32) -> bool {
    seed >= 1 && seed < MODULUS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_stream_generator_is_minimal_standard() {
        assert_eq!(STREAM_GENERATORS.first().copied(), Some(16_807));
        // Park and Miller: 10000 steps from seed 1 land on 1043618065.
        let mut seed = 1;
        for _ in 0..10_000 {
            seed = step(seed, 16_807);
        }
        assert_eq!(seed, 1_043_618_065);
    }

    #[test]
    fn every_constant_is_a_valid_multiplier() {
        for m in CASE_SEED_GENERATORS.iter().chain(STREAM_GENERATORS.iter()) {
            assert!(is_valid_seed(*m));
        }
        assert!(is_valid_seed(STREAM_SEED_GENERATOR));
        assert!(!STREAM_GENERATORS.contains(&STREAM_SEED_GENERATOR));
    }

    #[test]
    fn step_never_leaves_valid_range() {
        let mut seed = MODULUS - 1;
        for m in STREAM_GENERATORS {
            seed = step(seed, m);
            assert!(is_valid_seed(seed));
        }
    }
}
