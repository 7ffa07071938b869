//! Immutable 3-component vector value.
//!
//! `Vector3` is what every vector block produces. It is copied by value and
//! has no identity beyond its components. All operators are pure; division
//! by zero follows IEEE-754 (inf/NaN components) and is not guarded.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};
use std::io::{self, Write};

use crate::numeric::{Real, Tolerances, approx_eq};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "[f64; 3]", into = "[f64; 3]")
)]
pub struct Vector3 {
    x: Real,
    y: Real,
    z: Real,
}

impl Vector3 {
    pub const fn new(x: Real, y: Real, z: Real) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn x(&self) -> Real {
        self.x
    }

    pub fn y(&self) -> Real {
        self.y
    }

    pub fn z(&self) -> Real {
        self.z
    }

    pub fn component(&self, axis: Axis) -> Real {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Scalar (dot) product.
    pub fn dot(self, other: Self) -> Real {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean norm.
    pub fn abs(self) -> Real {
        self.dot(self).sqrt()
    }

    /// `self / |self|`. A zero vector yields NaN components.
    pub fn unit(self) -> Self {
        self / self.abs()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Componentwise comparison with the shared tolerance rule.
    pub fn approx_eq(self, other: Self, tol: Tolerances) -> bool {
        approx_eq(self.x, other.x, tol)
            && approx_eq(self.y, other.y, tol)
            && approx_eq(self.z, other.z, tol)
    }

    /// Write the trace line ` x y z ` (C `%g` style) to `sink`.
    pub fn print_to<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        write!(sink, "{self}")
    }

    /// Write the trace line to stdout.
    pub fn print(&self) -> io::Result<()> {
        self.print_to(&mut io::stdout().lock())
    }
}

/// One of the three vector components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in evaluation order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Axis served at phase `phase` of an x, y, z cycle.
    pub fn from_phase(phase: u8) -> Self {
        match phase % 3 {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl From<[Real; 3]> for Vector3 {
    fn from([x, y, z]: [Real; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Vector3> for [Real; 3] {
    fn from(v: Vector3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, b: Vector3) -> Vector3 {
        Vector3::new(self.x + b.x, self.y + b.y, self.z + b.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, b: Vector3) -> Vector3 {
        Vector3::new(self.x - b.x, self.y - b.y, self.z - b.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

/// Componentwise product.
impl Mul for Vector3 {
    type Output = Vector3;

    fn mul(self, b: Vector3) -> Vector3 {
        Vector3::new(self.x * b.x, self.y * b.y, self.z * b.z)
    }
}

impl Mul<Real> for Vector3 {
    type Output = Vector3;

    fn mul(self, k: Real) -> Vector3 {
        Vector3::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Mul<Vector3> for Real {
    type Output = Vector3;

    fn mul(self, v: Vector3) -> Vector3 {
        v * self
    }
}

impl Div<Real> for Vector3 {
    type Output = Vector3;

    fn div(self, k: Real) -> Vector3 {
        Vector3::new(self.x / k, self.y / k, self.z / k)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " {} {} {} ",
            format_g(self.x),
            format_g(self.y),
            format_g(self.z)
        )
    }
}

/// Format a real the way C's `%g` does: 6 significant digits, trailing
/// zeros removed, exponent form outside `1e-4 <= |v| < 1e6`.
pub fn format_g(value: Real) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounding to the target precision can bump the exponent (9.999995 -> 1e1),
    // so the exponent is read back from the rounded scientific form.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if (-4..PRECISION).contains(&exp) {
        let decimals = (PRECISION - 1 - exp) as usize;
        trim_fraction(format!("{:.*}", decimals, value))
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa.to_string()), sign, exp.abs())
    }
}

fn trim_fraction(s: String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn component() -> impl Strategy<Value = f64> {
        -1.0e3_f64..1.0e3_f64
    }

    fn vector() -> impl Strategy<Value = Vector3> {
        (component(), component(), component()).prop_map(|(x, y, z)| Vector3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn add_then_sub_is_identity(a in vector(), b in vector()) {
            let tol = Tolerances::new(1e-9, 1e-12);
            prop_assert!((a + b - b).approx_eq(a, tol));
        }

        #[test]
        fn componentwise_product_commutes(a in vector(), b in vector()) {
            prop_assert_eq!(a * b, b * a);
        }

        #[test]
        fn scaling_commutes(a in vector(), k in component()) {
            prop_assert_eq!(a * k, k * a);
        }

        #[test]
        fn dot_is_symmetric(a in vector(), b in vector()) {
            prop_assert_eq!(a.dot(b), b.dot(a));
        }

        #[test]
        fn norm_is_non_negative(a in vector()) {
            prop_assert!(a.abs() >= 0.0);
        }

        #[test]
        fn unit_vector_has_unit_norm(a in vector()) {
            prop_assume!(a.abs() > 1e-6);
            prop_assert!(approx_eq(a.unit().abs(), 1.0, Tolerances::new(1e-12, 1e-9)));
        }
    }
}
