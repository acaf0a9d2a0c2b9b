use crate::orientation::Orientation;
use ::proptest::prelude::*;
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

pub fn point3() -> impl Strategy<Value = Point3<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range.clone(), range.clone()].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// A general 3x3 matrix with moderately sized entries.
pub fn matrix3() -> impl Strategy<Value = Matrix3<f64>> {
    prop::array::uniform9(-10.0..10.0).prop_map(|entries: [f64; 9]| Matrix3::from_row_slice(&entries))
}

pub fn symmetric_matrix3() -> impl Strategy<Value = Matrix3<f64>> {
    matrix3().prop_map(|m| 0.5 * (m + m.transpose()))
}

/// A proper rotation, drawn as a scaled axis with angle in `[0, π)`.
pub fn orientation() -> impl Strategy<Value = Orientation> {
    let angle = 0.0..std::f64::consts::PI;
    let component = -1.0..1.0;
    (
        [component.clone(), component.clone(), component],
        angle,
    )
        .prop_filter_map("axis must not be zero", |([x, y, z], angle)| {
            let axis = Vector3::new(x, y, z);
            let norm = axis.norm();
            (norm > 1e-3).then(|| Orientation::from_rotation(&Rotation3::new(axis * (angle / norm))))
        })
}

impl Arbitrary for Orientation {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        orientation().boxed()
    }
}
