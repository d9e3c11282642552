//! Prints the empirical density of `normal(0, 1)` draws, one `x density`
//! pair per line, for a quick plot against the analytic bell curve.

use rand_dsfmt::*;

const DRAWS: usize = 10_000_000;
const BINS: usize = 1000;
const LO: f64 = -5.0;
const HI: f64 = 5.0;

fn main() -> Result<(), VariateError> {
    let mut engine = Dsfmt19937::from_time();
    let mut histogram = vec![0u64; BINS + 1];

    for _ in 0..DRAWS {
        let x = normal(&mut engine, 0.0, 1.0)?.clamp(LO, HI);
        histogram[(BINS as f64 * (x - LO) / (HI - LO)) as usize] += 1;
    }

    for (i, &count) in histogram.iter().enumerate() {
        if count > 0 {
            println!(
                "{:.3} {:.3}",
                LO + i as f64 * (HI - LO) / BINS as f64,
                count as f64 * BINS as f64 / (DRAWS as f64 * (HI - LO))
            );
        }
    }

    Ok(())
}
