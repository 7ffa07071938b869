//! Composition operators.
//!
//! Each operator allocates exactly one anonymous block wired to its operands
//! and returns a reference to it. The block recomputes from its inputs on
//! every pull. Anonymous blocks are owned by the model and live as long as it
//! does; nothing needs to hold them by name.

use vf_core::{Axis, Vector3};

use crate::block::{ScalarKind, ScalarOp, ScaleOp, VectorKind, VectorOp};
use crate::model::Model;
use crate::reference::{ScalarRef, VectorRef};

impl Model {
    fn vector_expr(&mut self, op: VectorOp, inputs: Vec<VectorRef>) -> VectorRef {
        self.push_vector(VectorKind::Expression { op, inputs })
    }

    fn scalar_expr(&mut self, op: ScalarOp, inputs: Vec<ScalarRef>) -> ScalarRef {
        self.push_scalar(ScalarKind::Expression { op, inputs })
    }

    /// Pass-through expression; useful as a rewirable junction.
    pub fn expression(&mut self, input: impl Into<VectorRef>) -> VectorRef {
        self.vector_expr(VectorOp::Identity, vec![input.into()])
    }

    /// `a + b`
    pub fn add(&mut self, a: impl Into<VectorRef>, b: impl Into<VectorRef>) -> VectorRef {
        self.vector_expr(VectorOp::Sum, vec![a.into(), b.into()])
    }

    /// `a - b`
    pub fn sub(&mut self, a: impl Into<VectorRef>, b: impl Into<VectorRef>) -> VectorRef {
        self.vector_expr(VectorOp::Difference, vec![a.into(), b.into()])
    }

    /// `-a`
    pub fn neg(&mut self, a: impl Into<VectorRef>) -> VectorRef {
        self.vector_expr(VectorOp::Negate, vec![a.into()])
    }

    /// Componentwise `a * b`.
    pub fn mul(&mut self, a: impl Into<VectorRef>, b: impl Into<VectorRef>) -> VectorRef {
        self.vector_expr(VectorOp::Product, vec![a.into(), b.into()])
    }

    /// `v * s`
    pub fn scale(&mut self, v: impl Into<VectorRef>, s: impl Into<ScalarRef>) -> VectorRef {
        self.push_vector(VectorKind::Scaled {
            op: ScaleOp::Multiply,
            vector: v.into(),
            scalar: s.into(),
        })
    }

    /// `s * v`
    pub fn scale_left(&mut self, s: impl Into<ScalarRef>, v: impl Into<VectorRef>) -> VectorRef {
        self.scale(v, s)
    }

    /// `v / s`. Division by zero propagates inf/NaN.
    pub fn div(&mut self, v: impl Into<VectorRef>, s: impl Into<ScalarRef>) -> VectorRef {
        self.push_vector(VectorKind::Scaled {
            op: ScaleOp::Divide,
            vector: v.into(),
            scalar: s.into(),
        })
    }

    /// `v / |v|`. A zero vector yields NaN components.
    pub fn unit_vector(&mut self, v: impl Into<VectorRef>) -> VectorRef {
        self.vector_expr(VectorOp::Unit, vec![v.into()])
    }

    /// Three scalars assembled into one vector.
    pub fn adaptor(
        &mut self,
        x: impl Into<ScalarRef>,
        y: impl Into<ScalarRef>,
        z: impl Into<ScalarRef>,
    ) -> VectorRef {
        self.push_vector(VectorKind::Adaptor([x.into(), y.into(), z.into()]))
    }

    /// User-defined block over one vector input.
    pub fn custom1(
        &mut self,
        a: impl Into<VectorRef>,
        f: impl Fn(Vector3) -> Vector3 + 'static,
    ) -> VectorRef {
        let op = VectorOp::Custom(Box::new(move |v: &[Vector3]| f(v[0])));
        self.vector_expr(op, vec![a.into()])
    }

    /// User-defined block over two vector inputs.
    pub fn custom2(
        &mut self,
        a: impl Into<VectorRef>,
        b: impl Into<VectorRef>,
        f: impl Fn(Vector3, Vector3) -> Vector3 + 'static,
    ) -> VectorRef {
        let op = VectorOp::Custom(Box::new(move |v: &[Vector3]| f(v[0], v[1])));
        self.vector_expr(op, vec![a.into(), b.into()])
    }

    /// User-defined block over three vector inputs.
    pub fn custom3(
        &mut self,
        a: impl Into<VectorRef>,
        b: impl Into<VectorRef>,
        c: impl Into<VectorRef>,
        f: impl Fn(Vector3, Vector3, Vector3) -> Vector3 + 'static,
    ) -> VectorRef {
        let op = VectorOp::Custom(Box::new(move |v: &[Vector3]| f(v[0], v[1], v[2])));
        self.vector_expr(op, vec![a.into(), b.into(), c.into()])
    }

    // ---------------------------------------------------------------------
    // Vector -> scalar
    // ---------------------------------------------------------------------

    /// Euclidean norm `|v|`.
    pub fn abs(&mut self, v: impl Into<VectorRef>) -> ScalarRef {
        self.push_scalar(ScalarKind::Norm(v.into()))
    }

    /// Dot product `a . b`.
    pub fn scalar_product(
        &mut self,
        a: impl Into<VectorRef>,
        b: impl Into<VectorRef>,
    ) -> ScalarRef {
        self.push_scalar(ScalarKind::Dot([a.into(), b.into()]))
    }

    pub fn part(&mut self, v: impl Into<VectorRef>, axis: Axis) -> ScalarRef {
        self.push_scalar(ScalarKind::Component {
            vector: v.into(),
            axis,
        })
    }

    pub fn x_part(&mut self, v: impl Into<VectorRef>) -> ScalarRef {
        self.part(v, Axis::X)
    }

    pub fn y_part(&mut self, v: impl Into<VectorRef>) -> ScalarRef {
        self.part(v, Axis::Y)
    }

    pub fn z_part(&mut self, v: impl Into<VectorRef>) -> ScalarRef {
        self.part(v, Axis::Z)
    }

    // ---------------------------------------------------------------------
    // Scalar arithmetic
    // ---------------------------------------------------------------------

    pub fn scalar_add(&mut self, a: impl Into<ScalarRef>, b: impl Into<ScalarRef>) -> ScalarRef {
        self.scalar_expr(ScalarOp::Sum, vec![a.into(), b.into()])
    }

    pub fn scalar_sub(&mut self, a: impl Into<ScalarRef>, b: impl Into<ScalarRef>) -> ScalarRef {
        self.scalar_expr(ScalarOp::Difference, vec![a.into(), b.into()])
    }

    pub fn scalar_mul(&mut self, a: impl Into<ScalarRef>, b: impl Into<ScalarRef>) -> ScalarRef {
        self.scalar_expr(ScalarOp::Product, vec![a.into(), b.into()])
    }

    pub fn scalar_div(&mut self, a: impl Into<ScalarRef>, b: impl Into<ScalarRef>) -> ScalarRef {
        self.scalar_expr(ScalarOp::Quotient, vec![a.into(), b.into()])
    }

    pub fn scalar_neg(&mut self, a: impl Into<ScalarRef>) -> ScalarRef {
        self.scalar_expr(ScalarOp::Negate, vec![a.into()])
    }

    pub fn scalar_custom1(
        &mut self,
        a: impl Into<ScalarRef>,
        f: impl Fn(f64) -> f64 + 'static,
    ) -> ScalarRef {
        let op = ScalarOp::Custom(Box::new(move |v: &[f64]| f(v[0])));
        self.scalar_expr(op, vec![a.into()])
    }

    pub fn scalar_custom2(
        &mut self,
        a: impl Into<ScalarRef>,
        b: impl Into<ScalarRef>,
        f: impl Fn(f64, f64) -> f64 + 'static,
    ) -> ScalarRef {
        let op = ScalarOp::Custom(Box::new(move |v: &[f64]| f(v[0], v[1])));
        self.scalar_expr(op, vec![a.into(), b.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    #[test]
    fn arithmetic_operators() {
        let mut m = Model::new();
        let a = m.constant3(vec3(1.0, 2.0, 3.0));
        let b = m.constant3(vec3(4.0, 5.0, 6.0));
        let two = m.constant(2.0);

        let sum = m.add(a, b);
        let diff = m.sub(b, a);
        let neg = m.neg(a);
        let prod = m.mul(a, b);
        let scaled = m.scale(a, two);
        let scaled_left = m.scale_left(two, a);
        let halved = m.div(b, two);

        assert_eq!(m.value(sum).unwrap(), vec3(5.0, 7.0, 9.0));
        assert_eq!(m.value(diff).unwrap(), vec3(3.0, 3.0, 3.0));
        assert_eq!(m.value(neg).unwrap(), vec3(-1.0, -2.0, -3.0));
        assert_eq!(m.value(prod).unwrap(), vec3(4.0, 10.0, 18.0));
        assert_eq!(m.value(scaled).unwrap(), vec3(2.0, 4.0, 6.0));
        assert_eq!(m.value(scaled_left).unwrap(), m.value(scaled).unwrap());
        assert_eq!(m.value(halved).unwrap(), vec3(2.0, 2.5, 3.0));
    }

    #[test]
    fn every_operator_allocates_one_block() {
        let mut m = Model::new();
        let a = m.constant3(vec3(1.0, 0.0, 0.0));
        let before = m.vector_count();
        let _ = m.add(a, a);
        let _ = m.unit_vector(a);
        assert_eq!(m.vector_count(), before + 2);

        let scalars = m.scalar_count();
        let _ = m.abs(a);
        assert_eq!(m.scalar_count(), scalars + 1);
    }

    #[test]
    fn vector_to_scalar_functions() {
        let mut m = Model::new();
        let a = m.constant3(vec3(3.0, 0.0, 4.0));
        let b = m.constant3(vec3(1.0, 1.0, 1.0));

        let norm = m.abs(a);
        let dot = m.scalar_product(a, b);
        let unit = m.unit_vector(a);

        assert_eq!(m.scalar_value(norm).unwrap(), 5.0);
        assert_eq!(m.scalar_value(dot).unwrap(), 7.0);
        assert_eq!(m.value(unit).unwrap(), vec3(0.6, 0.0, 0.8));
    }

    #[test]
    fn unit_vector_of_zero_is_nan() {
        let mut m = Model::new();
        let zero = m.constant3(Vector3::zero());
        let unit = m.unit_vector(zero);
        assert!(m.value(unit).unwrap().x().is_nan());
    }

    #[test]
    fn divide_by_zero_scalar_is_not_an_error() {
        let mut m = Model::new();
        let a = m.constant3(vec3(1.0, 0.0, -1.0));
        let zero = m.constant(0.0);
        let q = m.div(a, zero);
        let v = m.value(q).unwrap();
        assert_eq!(v.x(), f64::INFINITY);
        assert!(v.y().is_nan());
        assert_eq!(v.z(), f64::NEG_INFINITY);
    }

    #[test]
    fn scalar_arithmetic() {
        let mut m = Model::new();
        let a = m.constant(6.0);
        let b = m.constant(3.0);
        let ops = [
            (m.scalar_add(a, b), 9.0),
            (m.scalar_sub(a, b), 3.0),
            (m.scalar_mul(a, b), 18.0),
            (m.scalar_div(a, b), 2.0),
            (m.scalar_neg(a), -6.0),
            (m.scalar_custom2(a, b, f64::max), 6.0),
            (m.scalar_custom1(b, |x| x * x), 9.0),
        ];
        for (r, expected) in ops {
            assert_eq!(m.scalar_value(r).unwrap(), expected);
        }
    }

    #[test]
    fn custom_blocks_see_input_values() {
        let mut m = Model::new();
        let a = m.constant3(vec3(1.0, 2.0, 3.0));
        let b = m.constant3(vec3(0.0, 1.0, 0.0));
        let c = m.constant3(vec3(0.0, 0.0, 1.0));

        let cross = m.custom2(a, b, |u, v| {
            Vector3::new(
                u.y() * v.z() - u.z() * v.y(),
                u.z() * v.x() - u.x() * v.z(),
                u.x() * v.y() - u.y() * v.x(),
            )
        });
        let doubled = m.custom1(a, |u| u * 2.0);
        let summed = m.custom3(a, b, c, |u, v, w| u + v + w);

        assert_eq!(m.value(cross).unwrap(), vec3(-3.0, 0.0, 1.0));
        assert_eq!(m.value(doubled).unwrap(), vec3(2.0, 4.0, 6.0));
        assert_eq!(m.value(summed).unwrap(), vec3(1.0, 3.0, 4.0));
    }
}
