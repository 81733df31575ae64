//! Bounded 1D refinements used by the expansion searches.
//!
//! - `bisect_increasing`: find `x ≥ 0` with `f(x) ≈ target` for increasing `f`.
//! - `secant`: find a root of a residual `g(x) = f(x) − target`.
//!
//! Both are pure: they evaluate the closure, never log, and report
//! `(value, converged, iterations)` so callers decide whether to warn.

/// Stopping rule: relative error against the target, plus an iteration cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stop {
    pub rel_tol: f64,
    pub max_iter: usize,
}

/// Outcome of a refinement: best estimate and how it was reached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Refinement {
    pub value: f64,
    pub converged: bool,
    pub iterations: usize,
    pub rel_error: f64,
}

#[inline]
fn rel_error(value: f64, target: f64) -> f64 {
    let e = (value - target).abs() / target.abs().max(f64::MIN_POSITIVE);
    if e.is_nan() {
        f64::INFINITY
    } else {
        e
    }
}

struct Best {
    x: f64,
    err: f64,
}

impl Best {
    fn offer(&mut self, x: f64, err: f64) {
        if err < self.err {
            self.x = x;
            self.err = err;
        }
    }
}

/// Bisection on `[0, ∞)` for an increasing `f`, seeded with `guess`.
///
/// Assumes `f(0) ≤ target`. The guess is tried first; if it undershoots the
/// bracket is grown by doubling (at most `max_doublings` times). Only
/// bisection halvings count towards `stop.max_iter`.
pub fn bisect_increasing<F>(
    mut f: F,
    guess: f64,
    target: f64,
    stop: Stop,
    max_doublings: usize,
) -> Refinement
where
    F: FnMut(f64) -> f64,
{
    let x0 = if guess.is_finite() && guess > 0.0 { guess } else { 0.0 };
    let f0 = f(x0);
    let mut best = Best {
        x: x0,
        err: rel_error(f0, target),
    };
    if best.err <= stop.rel_tol {
        return Refinement {
            value: x0,
            converged: true,
            iterations: 0,
            rel_error: best.err,
        };
    }

    let (mut lo, mut hi) = if f0 < target {
        let mut lo = x0;
        let mut hi = if x0 > 0.0 { 2.0 * x0 } else { 1.0 };
        let mut doublings = 0;
        loop {
            let fh = f(hi);
            let err = rel_error(fh, target);
            best.offer(hi, err);
            if err <= stop.rel_tol {
                return Refinement {
                    value: hi,
                    converged: true,
                    iterations: 0,
                    rel_error: err,
                };
            }
            if fh >= target {
                break;
            }
            doublings += 1;
            if doublings >= max_doublings {
                return Refinement {
                    value: best.x,
                    converged: false,
                    iterations: 0,
                    rel_error: best.err,
                };
            }
            lo = hi;
            hi *= 2.0;
        }
        (lo, hi)
    } else {
        (0.0, x0)
    };

    let mut iterations = 0;
    while iterations < stop.max_iter {
        iterations += 1;
        let mid = 0.5 * (lo + hi);
        let fm = f(mid);
        let err = rel_error(fm, target);
        best.offer(mid, err);
        if err <= stop.rel_tol {
            return Refinement {
                value: mid,
                converged: true,
                iterations,
                rel_error: err,
            };
        }
        if fm < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Refinement {
        value: best.x,
        converged: false,
        iterations,
        rel_error: best.err,
    }
}

/// Secant iteration on a residual `g`, started from a known `(x0, g(x0))`
/// and a second abscissa `x1`.
///
/// Errors are relative to `target` (the quantity the residual is measured
/// against). Iterates are kept above `floor`: an update at or below it is
/// replaced by the midpoint between the current iterate and `floor`.
pub fn secant<G>(mut g: G, start: (f64, f64), x1: f64, target: f64, floor: f64, stop: Stop) -> Refinement
where
    G: FnMut(f64) -> f64,
{
    let (mut x_prev, mut g_prev) = start;
    let mut best = Best {
        x: x_prev,
        err: rel_error(g_prev + target, target),
    };
    if best.err <= stop.rel_tol {
        return Refinement {
            value: x_prev,
            converged: true,
            iterations: 0,
            rel_error: best.err,
        };
    }

    let mut x = x1;
    let mut gx = g(x);
    let mut iterations = 1;
    loop {
        let err = rel_error(gx + target, target);
        best.offer(x, err);
        if err <= stop.rel_tol {
            return Refinement {
                value: x,
                converged: true,
                iterations,
                rel_error: err,
            };
        }
        if iterations >= stop.max_iter {
            break;
        }
        let denom = gx - g_prev;
        if denom == 0.0 || !denom.is_finite() {
            break;
        }
        let mut next = x - gx * (x - x_prev) / denom;
        if !next.is_finite() || next <= floor {
            next = 0.5 * (x + floor);
        }
        x_prev = x;
        g_prev = gx;
        x = next;
        gx = g(x);
        iterations += 1;
    }
    Refinement {
        value: best.x,
        converged: false,
        iterations,
        rel_error: best.err,
    }
}
