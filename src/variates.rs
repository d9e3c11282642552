//! Classic random variate samplers over a uniform source.
//!
//! Every function is stateless: the result is a pure function of its
//! parameters and the draws it consumes, so a fixed seed reproduces the
//! same variates everywhere. The number of draws per call is part of each
//! function's contract and never depends on the values drawn, except for
//! [`poisson`], which consumes one draw per increment.
//!
//! Parameters are validated before the first draw; a rejected call
//! consumes nothing. Float parameters must be finite, counts must be
//! positive, probabilities must lie strictly between 0 and 1.

use crate::error::VariateError;
use crate::source::UniformSource;

// Integer-valued distributions.

/// Bernoulli trial: `true` with probability `p`.
///
/// Domain `0 < p < 1`. Mean `p`, variance `p * (1 - p)`. One draw.
pub fn bernoulli<S: UniformSource + ?Sized>(source: &mut S, p: f64) -> Result<bool, VariateError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(VariateError::InvalidParameter("bernoulli requires 0 < p < 1"));
    }
    Ok(source.next() >= 1.0 - p)
}

/// Binomial count of successes in `n` Bernoulli trials.
///
/// Domain `n > 0`, `0 < p < 1`. Range `0 ..= n`, mean `n * p`, variance
/// `n * p * (1 - p)`. Exactly `n` draws.
pub fn binomial<S: UniformSource + ?Sized>(
    source: &mut S,
    n: u32,
    p: f64,
) -> Result<u32, VariateError> {
    if n == 0 {
        return Err(VariateError::InvalidParameter("binomial requires n > 0"));
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(VariateError::InvalidParameter("binomial requires 0 < p < 1"));
    }
    let mut x = 0;
    for _ in 0..n {
        // Inlined bernoulli(p).
        x += (source.next() >= 1.0 - p) as u32;
    }
    Ok(x)
}

/// Discrete uniform integer between `a` and `b` inclusive.
///
/// Domain `a < b`. Mean `(a + b) / 2`, variance `((b - a + 1)^2 - 1) / 12`.
/// One draw.
pub fn equilikely<S: UniformSource + ?Sized>(
    source: &mut S,
    a: i64,
    b: i64,
) -> Result<i64, VariateError> {
    if a >= b {
        return Err(VariateError::InvalidParameter("equilikely requires a < b"));
    }
    // Wrapping keeps the whole i64 range usable; the span always fits in
    // u64, and the offset is capped so rounding can never escape `b`.
    let span = b.wrapping_sub(a) as u64;
    let offset = (((span as f64 + 1.0) * source.next()) as u64).min(span);
    Ok(a.wrapping_add(offset as i64))
}

/// Geometric count of failures before the first success.
///
/// Domain `0 < p < 1`. Range `0, 1, ...`, mean `p / (1 - p)`, variance
/// `p / (1 - p)^2`. One draw.
pub fn geometric<S: UniformSource + ?Sized>(source: &mut S, p: f64) -> Result<i64, VariateError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(VariateError::InvalidParameter("geometric requires 0 < p < 1"));
    }
    Ok(((1.0 - source.next()).ln() / p.ln()) as i64)
}

/// Pascal (negative binomial) sum of `n` geometric counts.
///
/// Domain `n > 0`, `0 < p < 1`. Mean `n * p / (1 - p)`, variance
/// `n * p / (1 - p)^2`. Exactly `n` draws.
pub fn pascal<S: UniformSource + ?Sized>(
    source: &mut S,
    n: u32,
    p: f64,
) -> Result<i64, VariateError> {
    if n == 0 {
        return Err(VariateError::InvalidParameter("pascal requires n > 0"));
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(VariateError::InvalidParameter("pascal requires 0 < p < 1"));
    }
    let log_p = p.ln();
    let mut x = 0;
    for _ in 0..n {
        // Inlined geometric(p), with the divisor hoisted.
        x += ((1.0 - source.next()).ln() / log_p) as i64;
    }
    Ok(x)
}

/// Poisson count with mean `m`: unit exponentials are accumulated until
/// their sum reaches `m`, and the result is the increment count minus one.
///
/// Domain: finite `m > 0`. Mean `m`, variance `m`. Consumes `result + 1`
/// draws, `m + 1` in expectation.
pub fn poisson<S: UniformSource + ?Sized>(source: &mut S, m: f64) -> Result<i64, VariateError> {
    if !(m > 0.0 && m.is_finite()) {
        return Err(VariateError::InvalidParameter("poisson requires finite m > 0"));
    }
    let mut t = 0.0;
    let mut x: i64 = -1;
    while t < m {
        t -= (1.0 - source.next()).ln();
        x += 1;
    }
    Ok(x)
}

// Real-valued distributions.

/// Uniform real on `[a, b)`.
///
/// Domain: finite `a < b`. Mean `(a + b) / 2`, variance `(b - a)^2 / 12`.
/// One draw.
pub fn uniform<S: UniformSource + ?Sized>(
    source: &mut S,
    a: f64,
    b: f64,
) -> Result<f64, VariateError> {
    if !(a < b && a.is_finite() && b.is_finite()) {
        return Err(VariateError::InvalidParameter("uniform requires finite a < b"));
    }
    Ok(a + (b - a) * source.next())
}

/// Exponential with mean `m`.
///
/// Domain: finite `m > 0`. Mean `m`, variance `m^2`. One draw.
pub fn exponential<S: UniformSource + ?Sized>(source: &mut S, m: f64) -> Result<f64, VariateError> {
    if !(m > 0.0 && m.is_finite()) {
        return Err(VariateError::InvalidParameter("exponential requires finite m > 0"));
    }
    Ok(-m * (1.0 - source.next()).ln())
}

/// Erlang sum of `n` exponentials with mean `b` each.
///
/// Domain `n > 0`, finite `b > 0`. Mean `n * b`, variance `n * b^2`.
/// Exactly `n` draws.
pub fn erlang<S: UniformSource + ?Sized>(
    source: &mut S,
    n: u32,
    b: f64,
) -> Result<f64, VariateError> {
    if n == 0 {
        return Err(VariateError::InvalidParameter("erlang requires n > 0"));
    }
    if !(b > 0.0 && b.is_finite()) {
        return Err(VariateError::InvalidParameter("erlang requires finite b > 0"));
    }
    let mut x = 0.0;
    for _ in 0..n {
        x -= b * (1.0 - source.next()).ln();
    }
    Ok(x)
}

// Odeh & Evans rational approximation of the normal inverse cdf,
// J. Applied Statistics 23 (1974), pp. 96-97.
const P0: f64 = 0.322232431088;
const P1: f64 = 1.0;
const P2: f64 = 0.342242088547;
const P3: f64 = 0.204231210245e-1;
const P4: f64 = 0.453642210148e-4;
const Q0: f64 = 0.099348462606;
const Q1: f64 = 0.588581570495;
const Q2: f64 = 0.531103462366;
const Q3: f64 = 0.103537752850;
const Q4: f64 = 0.385607006340e-2;

/// Normal (Gaussian) with mean `m` and standard deviation `s`: one draw
/// is mapped through the Odeh & Evans inverse-cdf approximation,
/// reflected about the median for draws at or above 0.5.
///
/// Domain: finite `m`, finite `s > 0`. Mean `m`, variance `s^2`. One draw.
pub fn normal<S: UniformSource + ?Sized>(
    source: &mut S,
    m: f64,
    s: f64,
) -> Result<f64, VariateError> {
    if !(s > 0.0 && s.is_finite() && m.is_finite()) {
        return Err(VariateError::InvalidParameter("normal requires finite m and finite s > 0"));
    }
    let u = source.next();
    let t = if u < 0.5 {
        (-2.0 * u.ln()).sqrt()
    } else {
        (-2.0 * (1.0 - u).ln()).sqrt()
    };
    let p = P0 + t * (P1 + t * (P2 + t * (P3 + t * P4)));
    let q = Q0 + t * (Q1 + t * (Q2 + t * (Q3 + t * Q4)));
    let z = if u < 0.5 { p / q - t } else { t - p / q };
    Ok(m + s * z)
}

/// Lognormal: `exp(a + b * z)` for a standard normal `z`.
///
/// Domain: finite `a`, finite `b > 0`. Mean `exp(a + b^2 / 2)`, variance
/// `(exp(b^2) - 1) * exp(2a + b^2)`. One draw.
pub fn lognormal<S: UniformSource + ?Sized>(
    source: &mut S,
    a: f64,
    b: f64,
) -> Result<f64, VariateError> {
    if !(b > 0.0 && b.is_finite() && a.is_finite()) {
        return Err(VariateError::InvalidParameter("lognormal requires finite a and finite b > 0"));
    }
    Ok((a + b * normal(source, 0.0, 1.0)?).exp())
}

/// Chi-square with `n` degrees of freedom: the sum of `n` squared
/// standard normals.
///
/// Domain `n > 0`. Mean `n`, variance `2n`. Exactly `n` draws.
pub fn chisquare<S: UniformSource + ?Sized>(source: &mut S, n: u32) -> Result<f64, VariateError> {
    if n == 0 {
        return Err(VariateError::InvalidParameter("chisquare requires n > 0"));
    }
    let mut x = 0.0;
    for _ in 0..n {
        let z = normal(source, 0.0, 1.0)?;
        x += z * z;
    }
    Ok(x)
}

/// Student-t with `n` degrees of freedom. The numerator normal is drawn
/// first, then the `n` chi-square normals; that order is part of the
/// reproducibility contract.
///
/// Domain `n > 0`. Mean 0 for `n > 1`, variance `n / (n - 2)` for `n > 2`.
/// Exactly `n + 1` draws.
pub fn student<S: UniformSource + ?Sized>(source: &mut S, n: u32) -> Result<f64, VariateError> {
    if n == 0 {
        return Err(VariateError::InvalidParameter("student requires n > 0"));
    }
    let z = normal(source, 0.0, 1.0)?;
    let x = chisquare(source, n)?;
    Ok(z / (x / n as f64).sqrt())
}
