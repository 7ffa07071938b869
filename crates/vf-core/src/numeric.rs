use crate::VfError;

/// Floating point type used for every vector component and scalar signal.
pub type Real = f64;

/// Absolute + relative comparison tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerances {
    pub const fn new(abs: Real, rel: Real) -> Self {
        Self { abs, rel }
    }

    /// Tolerance suited to comparing results of fixed-step integration
    /// against closed-form answers.
    pub const fn integration() -> Self {
        Self::new(1e-9, 1e-6)
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::new(1e-12, 1e-9)
    }
}

pub fn approx_eq(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, VfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(VfError::NonFinite { what, value: v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_eq_basic() {
        let tol = Tolerances::default();
        assert!(approx_eq(1.0, 1.0 + 1e-12, tol));
        assert!(approx_eq(0.0, 1e-13, tol));
        assert!(!approx_eq(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn integration_tolerance_is_looser() {
        assert!(approx_eq(100.0, 100.0 + 1e-5, Tolerances::integration()));
        assert!(!approx_eq(100.0, 100.0 + 1e-5, Tolerances::default()));
    }

    #[test]
    fn nan_is_never_equal() {
        assert!(!approx_eq(Real::NAN, Real::NAN, Tolerances::default()));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }
}
