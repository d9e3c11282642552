use std::time::{SystemTime, UNIX_EPOCH};

use rand_core::{Error, RngCore, SeedableRng};
use wrapping_arithmetic::wrappit;

use crate::error::VariateError;

// dSFMT-19937 characteristics
// -scalar port of Saito & Matsumoto's double precision SIMD oriented
//  Fast Mersenne Twister, 2^19937-1 period variant
// -generates IEEE754 doubles in [1,2) directly, other ranges are derived
//  from that canonical encoding
// -draws are buffered: one batch regeneration advances every state word
//  once and refills 382 doubles read out through a cursor
// -seeding ends with a period certification step, so all seeds reach the
//  full advertised period

/// Mersenne exponent: the period is a multiple of 2^19937 - 1.
pub const DSFMT_MEXP: usize = 19937;
/// Number of 128-bit output words in the state array.
pub const DSFMT_N: usize = (DSFMT_MEXP - 128) / 104 + 1;
/// Number of doubles buffered by one batch regeneration.
pub const DSFMT_N64: usize = DSFMT_N * 2;
/// Smallest buffer length accepted by the bulk fill operations.
pub const MIN_FILL_LEN: usize = DSFMT_N64;

// Parameter set for the 19937 variant, from the published dSFMT2
// reference tables (Saito & Matsumoto).
const POS1: usize = 117;
const SL1: u32 = 19;
const SR: u32 = 12;
const MSK1: u64 = 0x000ffafffffffb3f;
const MSK2: u64 = 0x000ffdfffc90fffd;
const FIX1: u64 = 0x90014964b32f4329;
const FIX2: u64 = 0x3b8d12ac548a7c7a;
const PCV1: u64 = 0x3d84e1ac0dc82880;
const PCV2: u64 = 0x0000000000000001;

// The [1,2) encoding: 52 mantissa bits below a fixed exponent.
const LOW_MASK: u64 = 0x000fffffffffffff;
const HIGH_CONST: u64 = 0x3ff0000000000000;

// Size of the state in 32-bit words, the granularity of the seeding
// algorithms, with the init-by-array lag and mid points the reference
// lag table assigns to a 768-word pool.
const N32: usize = (DSFMT_N + 1) * 4;
const KEY_LAG: usize = 11;
const KEY_MID: usize = (N32 - KEY_LAG) / 2;

/// dSFMT-19937 non-cryptographic RNG. 52-bit double output, buffered in
/// batches of 382, with one extra 128-bit lung word mixed through every
/// recurrence step.
#[derive(Clone, Eq, PartialEq)]
pub struct Dsfmt19937 {
    /// The 128-bit state words; the last one is the lung.
    status: [[u64; 2]; DSFMT_N + 1],
    /// Read cursor over the buffered doubles; `DSFMT_N64` means exhausted.
    idx: usize,
}

// As recommended, this Debug implementation does not expose internal state.
impl core::fmt::Debug for Dsfmt19937 {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "Dsfmt19937 {{ .. }}")
    }
}

/// One step of the 128-bit lane-mixing recurrence. The output keeps the
/// [1,2) exponent in its high 12 bits because both masks and the shifted
/// lung clear them, while `a` contributes the fixed 0x3ff.
#[inline]
fn recurse(a: [u64; 2], b: [u64; 2], lung: &mut [u64; 2]) -> [u64; 2] {
    let l0 = (a[0] << SL1) ^ lung[1].rotate_left(32) ^ b[0];
    let l1 = (a[1] << SL1) ^ lung[0].rotate_left(32) ^ b[1];
    *lung = [l0, l1];
    [
        (l0 >> SR) ^ (l0 & MSK1) ^ a[0],
        (l1 >> SR) ^ (l1 & MSK2) ^ a[1],
    ]
}

/// First scramble of the key schedule, a Knuth-multiplier hash.
#[wrappit]
#[inline]
fn scramble_a(x: u32) -> u32 {
    (x ^ (x >> 27)) * 1664525
}

/// Second scramble of the key schedule.
#[wrappit]
#[inline]
fn scramble_b(x: u32) -> u32 {
    (x ^ (x >> 27)) * 1566083941
}

#[inline]
fn word(dest: &[f64], i: usize) -> [u64; 2] {
    [dest[2 * i].to_bits(), dest[2 * i + 1].to_bits()]
}

#[inline]
fn put_word(dest: &mut [f64], i: usize, w: [u64; 2]) {
    dest[2 * i] = f64::from_bits(w[0]);
    dest[2 * i + 1] = f64::from_bits(w[1]);
}

impl Dsfmt19937 {
    fn zeroed() -> Self {
        Dsfmt19937 {
            status: [[0; 2]; DSFMT_N + 1],
            idx: DSFMT_N64,
        }
    }

    /// Creates a new engine from a 32-bit seed.
    /// Certification makes all seeds work equally well.
    pub fn from_seed32(seed: u32) -> Self {
        let mut engine = Self::zeroed();
        engine.reseed(seed);
        engine
    }

    /// Creates a new engine from a key of arbitrary length, for a larger
    /// effective seed space than a single 32-bit value.
    /// Certification makes all keys work equally well.
    pub fn from_key(key: &[u32]) -> Self {
        let mut engine = Self::zeroed();
        engine.reseed_from_key(key);
        engine
    }

    /// Creates a new engine seeded from the wall clock, truncated to 32
    /// bits. Not reproducible; tests and experiments should seed
    /// explicitly instead.
    pub fn from_time() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_seed32(now.as_secs() as u32 ^ now.subsec_nanos())
    }

    /// Re-initializes every state word from a single 32-bit seed via the
    /// reference expansion, then certifies the period. The next draw
    /// regenerates the whole buffer.
    #[wrappit]
    pub fn reseed(&mut self, seed: u32) {
        let mut v = [0u32; N32];
        v[0] = seed;
        for i in 1..N32 {
            let x = v[i - 1];
            v[i] = 1812433253u32 * (x ^ (x >> 30)) + i as u32;
        }
        self.load_words(&v);
        self.finish_seed();
    }

    /// Re-initializes the state from a key of arbitrary length (the empty
    /// key is allowed) via the reference init-by-array schedule, then
    /// certifies the period.
    #[wrappit]
    pub fn reseed_from_key(&mut self, key: &[u32]) {
        let mut v = [0x8b8b8b8bu32; N32];
        let count = (key.len() + 1).max(N32);

        let mut r = scramble_a(v[0] ^ v[KEY_MID] ^ v[N32 - 1]);
        v[KEY_MID] = v[KEY_MID] + r;
        r = r + key.len() as u32;
        v[(KEY_MID + KEY_LAG) % N32] = v[(KEY_MID + KEY_LAG) % N32] + r;
        v[0] = r;

        let mut i = 1;
        for j in 0..count - 1 {
            r = scramble_a(v[i] ^ v[(i + KEY_MID) % N32] ^ v[(i + N32 - 1) % N32]);
            v[(i + KEY_MID) % N32] = v[(i + KEY_MID) % N32] + r;
            r = r + i as u32;
            if j < key.len() {
                r = r + key[j];
            }
            v[(i + KEY_MID + KEY_LAG) % N32] = v[(i + KEY_MID + KEY_LAG) % N32] + r;
            v[i] = r;
            i = (i + 1) % N32;
        }
        for _ in 0..N32 {
            r = scramble_b(v[i] + v[(i + KEY_MID) % N32] + v[(i + N32 - 1) % N32]);
            v[(i + KEY_MID) % N32] ^= r;
            r = r - i as u32;
            v[(i + KEY_MID + KEY_LAG) % N32] ^= r;
            v[i] = r;
            i = (i + 1) % N32;
        }

        self.load_words(&v);
        self.finish_seed();
    }

    /// Packs the 32-bit seeding view into the 128-bit state words,
    /// little-endian within each 64-bit lane.
    fn load_words(&mut self, v: &[u32; N32]) {
        for (w, q) in self.status.iter_mut().zip(v.chunks_exact(4)) {
            w[0] = q[0] as u64 | ((q[1] as u64) << 32);
            w[1] = q[2] as u64 | ((q[3] as u64) << 32);
        }
    }

    /// Forces the [1,2) encoding onto the output words, certifies the
    /// period and marks the buffer exhausted.
    fn finish_seed(&mut self) {
        for w in self.status[..DSFMT_N].iter_mut() {
            w[0] = (w[0] & LOW_MASK) | HIGH_CONST;
            w[1] = (w[1] & LOW_MASK) | HIGH_CONST;
        }
        self.certify_period();
        self.idx = DSFMT_N64;
    }

    /// The parity of `(lung ^ FIX) & PCV` must be odd for the state to sit
    /// on the full-period cycle. PCV2 reserves the lung's lowest bit, so
    /// flipping it repairs a short-cycle state without touching the
    /// output words.
    fn certify_period(&mut self) {
        let lung = self.status[DSFMT_N];
        let inner = ((lung[0] ^ FIX1) & PCV1) ^ ((lung[1] ^ FIX2) & PCV2);
        if inner.count_ones() & 1 == 0 {
            self.status[DSFMT_N][1] ^= 1;
        }
    }

    /// Advances every state word exactly once and resets the cursor,
    /// making a fresh batch of 382 doubles readable.
    fn regenerate(&mut self) {
        let mut lung = self.status[DSFMT_N];
        for i in 0..DSFMT_N {
            let a = self.status[i];
            let b = self.status[(i + POS1) % DSFMT_N];
            self.status[i] = recurse(a, b, &mut lung);
        }
        self.status[DSFMT_N] = lung;
        self.idx = 0;
    }

    /// Returns the next buffered 64-bit pattern, regenerating first if the
    /// cursor is exhausted.
    #[inline]
    fn next_bits(&mut self) -> u64 {
        if self.idx >= DSFMT_N64 {
            self.regenerate();
        }
        let bits = self.status[self.idx >> 1][self.idx & 1];
        self.idx += 1;
        bits
    }

    /// Generates the next double in the canonical range `[1, 2)`. This is
    /// the primitive draw; the other ranges derive from it.
    #[inline]
    pub fn next_close1_open2(&mut self) -> f64 {
        f64::from_bits(self.next_bits())
    }

    /// Generates the next double in `[0, 1)`.
    #[inline]
    pub fn next_close_open(&mut self) -> f64 {
        self.next_close1_open2() - 1.0
    }

    /// Generates the next double in `(0, 1]`.
    #[inline]
    pub fn next_open_close(&mut self) -> f64 {
        2.0 - self.next_close1_open2()
    }

    /// Generates the next double in the fully open range `(0, 1)`. The
    /// mantissa's lowest bit is forced to 1 before the shift to 0, so the
    /// result can never be exactly 0 or 1.
    #[inline]
    pub fn next_open_open(&mut self) -> f64 {
        f64::from_bits(self.next_bits() | 1) - 1.0
    }

    /// Generates `dest.len()` doubles in `[1, 2)` straight into the
    /// caller's buffer, bypassing the single-value cursor. Values still
    /// buffered when the fill starts are discarded.
    ///
    /// The length must be even and at least [`MIN_FILL_LEN`]; anything
    /// else signals [`VariateError::InvalidFillLength`].
    pub fn fill_close1_open2(&mut self, dest: &mut [f64]) -> Result<(), VariateError> {
        self.fill_raw(dest)
    }

    /// Bulk variant of [`next_close_open`](Self::next_close_open); same
    /// length contract as [`fill_close1_open2`](Self::fill_close1_open2).
    pub fn fill_close_open(&mut self, dest: &mut [f64]) -> Result<(), VariateError> {
        self.fill_raw(dest)?;
        for x in dest.iter_mut() {
            *x -= 1.0;
        }
        Ok(())
    }

    /// Bulk variant of [`next_open_close`](Self::next_open_close); same
    /// length contract as [`fill_close1_open2`](Self::fill_close1_open2).
    pub fn fill_open_close(&mut self, dest: &mut [f64]) -> Result<(), VariateError> {
        self.fill_raw(dest)?;
        for x in dest.iter_mut() {
            *x = 2.0 - *x;
        }
        Ok(())
    }

    /// Bulk variant of [`next_open_open`](Self::next_open_open); same
    /// length contract as [`fill_close1_open2`](Self::fill_close1_open2).
    pub fn fill_open_open(&mut self, dest: &mut [f64]) -> Result<(), VariateError> {
        self.fill_raw(dest)?;
        for x in dest.iter_mut() {
            *x = f64::from_bits(x.to_bits() | 1) - 1.0;
        }
        Ok(())
    }

    /// The array form of the recurrence: the state seeds the first 191
    /// output words, the buffer then feeds itself, and the trailing 191
    /// words slide back in as the new state. A fill therefore continues
    /// the exact stream the single-value draws would have produced.
    fn fill_raw(&mut self, dest: &mut [f64]) -> Result<(), VariateError> {
        if dest.len() % 2 != 0 || dest.len() < MIN_FILL_LEN {
            return Err(VariateError::InvalidFillLength {
                len: dest.len(),
                min: MIN_FILL_LEN,
            });
        }
        let words = dest.len() / 2;
        let mut lung = self.status[DSFMT_N];
        for i in 0..DSFMT_N {
            let a = self.status[i];
            let b = if i + POS1 < DSFMT_N {
                self.status[i + POS1]
            } else {
                word(dest, i + POS1 - DSFMT_N)
            };
            put_word(dest, i, recurse(a, b, &mut lung));
        }
        for i in DSFMT_N..words {
            let a = word(dest, i - DSFMT_N);
            let b = word(dest, i + POS1 - DSFMT_N);
            put_word(dest, i, recurse(a, b, &mut lung));
        }
        for j in 0..DSFMT_N {
            self.status[j] = word(dest, words - DSFMT_N + j);
        }
        self.status[DSFMT_N] = lung;
        self.idx = DSFMT_N64;
        Ok(())
    }
}

impl RngCore for Dsfmt19937 {
    fn next_u32(&mut self) -> u32 {
        // The low half of a buffered pattern is 32 fully random mantissa
        // bits; this consumes one buffered double, like the float draws.
        self.next_bits() as u32
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_u32() as u64;
        let hi = self.next_u32() as u64;
        lo | (hi << 32)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        // Always use Little-Endian.
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        Ok(self.fill_bytes(dest))
    }
}

impl SeedableRng for Dsfmt19937 {
    type Seed = [u8; 4];

    /// Creates a new engine from a 4-byte seed, read as a little-endian
    /// 32-bit integer.
    fn from_seed(seed: Self::Seed) -> Self {
        Dsfmt19937::from_seed32(u32::from_le_bytes(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn same_seed_same_stream() {
        for seed in [0u32, 1, 2, 7, 42, 12345, 0xffffffff] {
            let mut a = Dsfmt19937::from_seed32(seed);
            let mut b = Dsfmt19937::from_seed32(seed);
            for i in 0..1000 {
                assert_eq!(
                    a.next_close1_open2().to_bits(),
                    b.next_close1_open2().to_bits(),
                    "seed {} diverged at draw {}",
                    seed,
                    i
                );
            }
        }
    }

    #[test]
    fn nearby_seeds_diverge() {
        let mut a = Dsfmt19937::from_seed32(1);
        let mut b = Dsfmt19937::from_seed32(2);
        let same = (0..16).filter(|_| a.next_close_open() == b.next_close_open()).count();
        assert!(same < 16, "seeds 1 and 2 produced identical prefixes");
    }

    #[test]
    fn close_open_stays_in_range() {
        let mut engine = Dsfmt19937::from_seed32(4357);
        for _ in 0..1_000_000 {
            let x = engine.next_close_open();
            assert!(x >= 0.0 && x < 1.0, "close_open produced {}", x);
        }
    }

    #[test]
    fn open_open_excludes_endpoints() {
        let mut engine = Dsfmt19937::from_seed32(4357);
        for _ in 0..1_000_000 {
            let x = engine.next_open_open();
            assert!(x > 0.0 && x < 1.0, "open_open produced {}", x);
        }
    }

    #[test]
    fn close1_open2_is_canonical() {
        let mut engine = Dsfmt19937::from_seed32(8);
        for _ in 0..100_000 {
            let x = engine.next_close1_open2();
            assert!(x >= 1.0 && x < 2.0, "canonical draw produced {}", x);
        }
    }

    #[test]
    fn open_close_includes_one_only() {
        let mut engine = Dsfmt19937::from_seed32(8);
        for _ in 0..100_000 {
            let x = engine.next_open_close();
            assert!(x > 0.0 && x <= 1.0, "open_close produced {}", x);
        }
    }

    #[test]
    fn reseed_matches_fresh_engine() {
        let mut fresh = Dsfmt19937::from_seed32(31337);
        let mut reused = Dsfmt19937::from_seed32(999);
        for _ in 0..100 {
            reused.next_close_open();
        }
        reused.reseed(31337);
        assert!(fresh == reused);
        for _ in 0..500 {
            assert_eq!(fresh.next_close_open(), reused.next_close_open());
        }
    }

    #[test]
    fn key_seeding_is_deterministic() {
        let key = [0x12345u32, 0x23456, 0x34567, 0x45678];
        let mut a = Dsfmt19937::from_key(&key);
        let mut b = Dsfmt19937::from_key(&key);
        for _ in 0..500 {
            assert_eq!(a.next_close_open(), b.next_close_open());
        }

        let mut c = Dsfmt19937::from_key(&[0x12345u32, 0x23456, 0x34567, 0x45679]);
        let same = (0..16).filter(|_| b.next_close_open() == c.next_close_open()).count();
        assert!(same < 16, "nearby keys produced identical prefixes");
    }

    #[test]
    fn extreme_key_lengths_work() {
        // Empty keys and keys longer than the state pool are both legal.
        let mut short = Dsfmt19937::from_key(&[]);
        let long_key: Vec<u32> = (0..1000u32).collect();
        let mut long = Dsfmt19937::from_key(&long_key);
        for _ in 0..500 {
            let x = short.next_close_open();
            let y = long.next_close_open();
            assert!(x >= 0.0 && x < 1.0);
            assert!(y >= 0.0 && y < 1.0);
        }
        assert!(Dsfmt19937::from_key(&long_key) == Dsfmt19937::from_key(&long_key));
    }

    #[test]
    fn seeded_state_is_certified() {
        // After seeding, the certification parity must be odd for every
        // seed and every key, or the state would sit on a short cycle.
        for seed in 0..256u32 {
            let engine = Dsfmt19937::from_seed32(seed);
            let lung = engine.status[DSFMT_N];
            let inner = ((lung[0] ^ FIX1) & PCV1) ^ ((lung[1] ^ FIX2) & PCV2);
            assert_eq!(inner.count_ones() & 1, 1, "seed {} not certified", seed);
        }
        for len in 0..16u32 {
            let key: Vec<u32> = (0..len).map(|i| i.wrapping_mul(0x9e3779b9)).collect();
            let engine = Dsfmt19937::from_key(&key);
            let lung = engine.status[DSFMT_N];
            let inner = ((lung[0] ^ FIX1) & PCV1) ^ ((lung[1] ^ FIX2) & PCV2);
            assert_eq!(inner.count_ones() & 1, 1, "key len {} not certified", len);
        }
    }

    #[test]
    fn first_draw_regenerates() {
        let mut engine = Dsfmt19937::from_seed32(1);
        assert_eq!(engine.idx, DSFMT_N64);
        engine.next_close_open();
        assert_eq!(engine.idx, 1);
        for _ in 1..DSFMT_N64 {
            engine.next_close_open();
        }
        assert_eq!(engine.idx, DSFMT_N64);
        engine.next_close_open();
        assert_eq!(engine.idx, 1);
    }

    #[test]
    fn fill_matches_single_draws() {
        let mut bulk = Dsfmt19937::from_seed32(2020);
        let mut single = Dsfmt19937::from_seed32(2020);
        let mut buffer = vec![0.0; 1000];
        bulk.fill_close1_open2(&mut buffer).unwrap();
        for (i, &x) in buffer.iter().enumerate() {
            assert_eq!(
                x.to_bits(),
                single.next_close1_open2().to_bits(),
                "fill diverged from the single-draw stream at {}",
                i
            );
        }
    }

    #[test]
    fn fill_then_draws_continue_stream() {
        // 1000 doubles is not a multiple of the batch size, so this also
        // exercises the batch window slide in the copy-back.
        let mut bulk = Dsfmt19937::from_seed32(7);
        let mut single = Dsfmt19937::from_seed32(7);
        let mut buffer = vec![0.0; 1000];
        bulk.fill_close_open(&mut buffer).unwrap();
        for _ in 0..1000 {
            single.next_close_open();
        }
        for i in 0..500 {
            assert_eq!(
                bulk.next_close_open(),
                single.next_close_open(),
                "streams diverged {} draws after the fill",
                i
            );
        }
    }

    #[test]
    fn fill_rejects_bad_lengths() {
        let mut engine = Dsfmt19937::from_seed32(5);
        for len in [0usize, 2, 380, 383] {
            let mut buffer = vec![0.0; len];
            assert_eq!(
                engine.fill_close_open(&mut buffer),
                Err(VariateError::InvalidFillLength {
                    len,
                    min: MIN_FILL_LEN
                })
            );
        }
        let mut buffer = vec![0.0; MIN_FILL_LEN];
        assert!(engine.fill_close_open(&mut buffer).is_ok());
    }

    #[test]
    fn fill_encodings_stay_in_range() {
        let mut engine = Dsfmt19937::from_seed32(77);
        let mut buffer = vec![0.0; 2000];

        engine.fill_close1_open2(&mut buffer).unwrap();
        assert!(buffer.iter().all(|&x| x >= 1.0 && x < 2.0));

        engine.fill_close_open(&mut buffer).unwrap();
        assert!(buffer.iter().all(|&x| x >= 0.0 && x < 1.0));

        engine.fill_open_close(&mut buffer).unwrap();
        assert!(buffer.iter().all(|&x| x > 0.0 && x <= 1.0));

        engine.fill_open_open(&mut buffer).unwrap();
        assert!(buffer.iter().all(|&x| x > 0.0 && x < 1.0));
    }

    #[test]
    fn u32_output_is_low_mantissa_bits() {
        let mut ints = Dsfmt19937::from_seed32(99);
        let mut floats = Dsfmt19937::from_seed32(99);
        for _ in 0..1000 {
            let bits = floats.next_close1_open2().to_bits();
            assert_eq!(ints.next_u32(), bits as u32);
        }
    }

    #[test]
    fn fill_bytes_is_deterministic() {
        let mut a = Dsfmt19937::from_seed32(123);
        let mut b = Dsfmt19937::from_seed32(123);
        let mut buf_a = [0u8; 133];
        let mut buf_b = [0u8; 133];
        a.fill_bytes(&mut buf_a);
        b.try_fill_bytes(&mut buf_b).unwrap();
        assert_eq!(buf_a[..], buf_b[..]);
    }

    #[test]
    fn seedable_rng_matches_explicit_seeding() {
        let a = Dsfmt19937::from_seed32(0xdeadbeef);
        let b = Dsfmt19937::from_seed(0xdeadbeefu32.to_le_bytes());
        assert!(a == b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_seed_draws_in_range(seed in any::<u32>()) {
            let mut engine = Dsfmt19937::from_seed32(seed);
            for _ in 0..4096 {
                let x = engine.next_close_open();
                prop_assert!(x >= 0.0 && x < 1.0, "seed {} produced {}", seed, x);
            }
        }

        #[test]
        fn any_seed_open_open_excludes_endpoints(seed in any::<u32>()) {
            let mut engine = Dsfmt19937::from_seed32(seed);
            for _ in 0..4096 {
                let x = engine.next_open_open();
                prop_assert!(x > 0.0 && x < 1.0, "seed {} produced {}", seed, x);
            }
        }

        #[test]
        fn any_seed_is_reproducible(seed in any::<u32>()) {
            let mut a = Dsfmt19937::from_seed32(seed);
            let mut b = Dsfmt19937::from_seed32(seed);
            for _ in 0..512 {
                prop_assert_eq!(a.next_close1_open2().to_bits(), b.next_close1_open2().to_bits());
            }
        }
    }
}
