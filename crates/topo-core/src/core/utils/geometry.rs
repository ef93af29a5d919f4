use crate::core::models::case::{PlacedSse, Tilt};
use nalgebra::{Point3, Rotation3, Vector3};

/// Rotation described by a tilt, applied as XYZ Euler angles in degrees.
pub fn rotation_from_tilt(tilt: &Tilt) -> Rotation3<f64> {
    Rotation3::from_euler_angles(
        tilt.x.to_radians(),
        tilt.y.to_radians(),
        tilt.z.to_radians(),
    )
}

/// Unit vector running from the N- to the C-terminal end of an SSE.
///
/// Untilted elements run along +Y.
pub fn sse_axis(tilt: &Tilt) -> Vector3<f64> {
    rotation_from_tilt(tilt) * Vector3::y()
}

/// Half the axial extent of an SSE of `length` residues with the given rise per residue.
pub fn half_extent(length: u32, rise: f64) -> f64 {
    rise * f64::from(length.saturating_sub(1)) / 2.0
}

/// N- and C-terminal end points of an idealized SSE.
pub fn sse_termini(sse: &PlacedSse) -> (Point3<f64>, Point3<f64>) {
    let center = sse.center_point();
    let offset = sse_axis(&sse.tilt) * half_extent(sse.length, sse.id.sse_type.rise());
    (center - offset, center + offset)
}

/// Distance from the C-terminal end of `from` to the N-terminal end of `to`.
pub fn loop_span(from: &PlacedSse, to: &PlacedSse) -> f64 {
    let (_, c_term) = sse_termini(from);
    let (n_term, _) = sse_termini(to);
    nalgebra::distance(&c_term, &n_term)
}

pub fn center_distance(a: &PlacedSse, b: &PlacedSse) -> f64 {
    nalgebra::distance(&a.center_point(), &b.center_point())
}

/// Adds `delta` to every component of a tilt.
pub fn compose_tilt(base: &Tilt, delta: &Tilt) -> Tilt {
    Tilt {
        x: base.x + delta.x,
        y: base.y + delta.y,
        z: base.z + delta.z,
    }
}
