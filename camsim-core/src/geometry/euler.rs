use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use log::warn;
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::Transform;
use crate::error::CameraError;

// Middle angle within this distance of 0 or pi is treated as gimbal lock
const GIMBAL_LOCK_EPS: f64 = 1e-7;

/// Axis sequence for Euler angles.
///
/// Upper-case sequences rotate about the moving (intrinsic) axes,
/// lower-case sequences about the fixed (extrinsic) axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EulerOrder {
    #[serde(rename = "XYZ")]
    IntrinsicXyz,
    #[serde(rename = "XZY")]
    IntrinsicXzy,
    #[serde(rename = "YXZ")]
    IntrinsicYxz,
    #[serde(rename = "YZX")]
    IntrinsicYzx,
    #[serde(rename = "ZXY")]
    IntrinsicZxy,
    #[serde(rename = "ZYX")]
    IntrinsicZyx,
    #[serde(rename = "xyz")]
    ExtrinsicXyz,
    #[serde(rename = "xzy")]
    ExtrinsicXzy,
    #[serde(rename = "yxz")]
    ExtrinsicYxz,
    #[serde(rename = "yzx")]
    ExtrinsicYzx,
    #[serde(rename = "zxy")]
    ExtrinsicZxy,
    #[serde(rename = "zyx")]
    ExtrinsicZyx,
}

impl EulerOrder {
    pub const ALL: [EulerOrder; 12] = [
        EulerOrder::IntrinsicXyz,
        EulerOrder::IntrinsicXzy,
        EulerOrder::IntrinsicYxz,
        EulerOrder::IntrinsicYzx,
        EulerOrder::IntrinsicZxy,
        EulerOrder::IntrinsicZyx,
        EulerOrder::ExtrinsicXyz,
        EulerOrder::ExtrinsicXzy,
        EulerOrder::ExtrinsicYxz,
        EulerOrder::ExtrinsicYzx,
        EulerOrder::ExtrinsicZxy,
        EulerOrder::ExtrinsicZyx,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EulerOrder::IntrinsicXyz => "XYZ",
            EulerOrder::IntrinsicXzy => "XZY",
            EulerOrder::IntrinsicYxz => "YXZ",
            EulerOrder::IntrinsicYzx => "YZX",
            EulerOrder::IntrinsicZxy => "ZXY",
            EulerOrder::IntrinsicZyx => "ZYX",
            EulerOrder::ExtrinsicXyz => "xyz",
            EulerOrder::ExtrinsicXzy => "xzy",
            EulerOrder::ExtrinsicYxz => "yxz",
            EulerOrder::ExtrinsicYzx => "yzx",
            EulerOrder::ExtrinsicZxy => "zxy",
            EulerOrder::ExtrinsicZyx => "zyx",
        }
    }

    pub fn is_extrinsic(self) -> bool {
        self.as_str().starts_with(|c: char| c.is_ascii_lowercase())
    }

    /// Axis indices (0 = x, 1 = y, 2 = z) in the order the angles are given
    fn axes(self) -> [usize; 3] {
        let mut axes = [0; 3];
        for (slot, c) in axes.iter_mut().zip(self.as_str().chars()) {
            *slot = match c.to_ascii_lowercase() {
                'x' => 0,
                'y' => 1,
                _ => 2,
            };
        }
        axes
    }
}

impl fmt::Display for EulerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EulerOrder {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EulerOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| CameraError::InvalidInput(format!("unknown Euler order '{s}'")))
    }
}

fn elementary(axis: usize, angle: f64) -> Rotation3<f64> {
    let unit = match axis {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        _ => Vector3::z_axis(),
    };
    Rotation3::from_axis_angle(&unit, angle)
}

/// Rotation from three angles in radians.
///
/// Intrinsic `XYZ` yields `Rx * Ry * Rz`; extrinsic `xyz` yields `Rz * Ry * Rx`.
pub fn rotation_from_euler(order: EulerOrder, angles: [f64; 3]) -> Rotation3<f64> {
    order
        .axes()
        .into_iter()
        .zip(angles)
        .fold(Rotation3::identity(), |acc, (axis, angle)| {
            if order.is_extrinsic() {
                elementary(axis, angle) * acc
            } else {
                acc * elementary(axis, angle)
            }
        })
}

/// Decompose a rotation matrix into angles (radians) for the given order.
///
/// First and third angles lie in `[-pi, pi]`, the middle one in
/// `[-pi/2, pi/2]`. At gimbal lock the third angle is fixed to zero.
pub fn euler_from_rotation(rotation: &Matrix3<f64>, order: EulerOrder) -> [f64; 3] {
    let extrinsic = order.is_extrinsic();
    let mut axes = order.axes();
    let (first, third) = if extrinsic {
        (0, 2)
    } else {
        axes.reverse();
        (2, 0)
    };
    let [i, j, k] = axes;

    // +1 for an even permutation of (x, y, z), -1 for odd
    let (si, sj, sk) = (i as i64, j as i64, k as i64);
    let sign = ((si - sj) * (sj - sk) * (sk - si) / 2) as f64;

    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation))
        .quaternion()
        .coords;
    let a = q[3] - q[j];
    let b = q[i] + q[k] * sign;
    let c = q[j] + q[3];
    let d = q[k] * sign - q[i];

    let mut angles = [0.0; 3];
    angles[1] = 2.0 * c.hypot(d).atan2(a.hypot(b));

    let half_sum = b.atan2(a);
    let half_diff = d.atan2(c);

    if angles[1].abs() <= GIMBAL_LOCK_EPS {
        warn!("gimbal lock for order {order}, third angle set to zero");
        angles[2] = 0.0;
        angles[0] = 2.0 * half_sum;
    } else if (angles[1] - PI).abs() <= GIMBAL_LOCK_EPS {
        warn!("gimbal lock for order {order}, third angle set to zero");
        angles[2] = 0.0;
        angles[0] = if extrinsic {
            -2.0 * half_diff
        } else {
            2.0 * half_diff
        };
    } else {
        angles[first] = half_sum - half_diff;
        angles[third] = half_sum + half_diff;
    }

    angles[third] *= sign;
    angles[1] -= FRAC_PI_2;

    angles.map(|angle| {
        if angle < -PI {
            angle + 2.0 * PI
        } else if angle > PI {
            angle - 2.0 * PI
        } else {
            angle
        }
    })
}

impl Transform {
    /// Pure rotation from Euler angles, in degrees or radians
    pub fn from_euler(order: EulerOrder, angles: [f64; 3], degrees: bool) -> Transform {
        let angles = if degrees {
            angles.map(f64::to_radians)
        } else {
            angles
        };
        let rotation = rotation_from_euler(order, angles);
        Transform::from_parts(rotation.matrix(), &Vector3::zeros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_orders() {
        assert_eq!(
            "XYZ".parse::<EulerOrder>().unwrap(),
            EulerOrder::IntrinsicXyz
        );
        assert_eq!(
            "zyx".parse::<EulerOrder>().unwrap(),
            EulerOrder::ExtrinsicZyx
        );
        assert!("xyx".parse::<EulerOrder>().is_err());
        assert!("XyZ".parse::<EulerOrder>().is_err());

        for order in EulerOrder::ALL {
            assert_eq!(order.to_string().parse::<EulerOrder>().unwrap(), order);
        }
    }

    #[test]
    fn test_extrinsic_flag() {
        assert!(!EulerOrder::IntrinsicYzx.is_extrinsic());
        assert!(EulerOrder::ExtrinsicYzx.is_extrinsic());
    }

    #[test]
    fn test_composition_convention() {
        let (a, b, c) = (0.3, -0.4, 0.9);
        let rx = elementary(0, a);
        let ry = elementary(1, b);
        let rz = elementary(2, c);

        let intrinsic = rotation_from_euler(EulerOrder::IntrinsicXyz, [a, b, c]);
        assert_relative_eq!(
            intrinsic.matrix(),
            (rx * ry * rz).matrix(),
            epsilon = 1e-12
        );

        let extrinsic = rotation_from_euler(EulerOrder::ExtrinsicXyz, [a, b, c]);
        assert_relative_eq!(
            extrinsic.matrix(),
            (rz * ry * rx).matrix(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_matches_nalgebra_roll_pitch_yaw() {
        let (roll, pitch, yaw) = (0.1, 0.2, 0.3);
        let rotation = Rotation3::from_euler_angles(roll, pitch, yaw);

        let extrinsic = euler_from_rotation(rotation.matrix(), EulerOrder::ExtrinsicXyz);
        assert_relative_eq!(extrinsic[0], roll, epsilon = 1e-12);
        assert_relative_eq!(extrinsic[1], pitch, epsilon = 1e-12);
        assert_relative_eq!(extrinsic[2], yaw, epsilon = 1e-12);

        let intrinsic = euler_from_rotation(rotation.matrix(), EulerOrder::IntrinsicZyx);
        assert_relative_eq!(intrinsic[0], yaw, epsilon = 1e-12);
        assert_relative_eq!(intrinsic[1], pitch, epsilon = 1e-12);
        assert_relative_eq!(intrinsic[2], roll, epsilon = 1e-12);
    }

    #[test]
    fn test_round_trip_all_orders() {
        let angles = [0.7, -0.45, -2.1];
        for order in EulerOrder::ALL {
            let rotation = rotation_from_euler(order, angles);
            let recovered = euler_from_rotation(rotation.matrix(), order);
            for (expected, actual) in angles.iter().zip(recovered) {
                assert_relative_eq!(*expected, actual, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_gimbal_lock_reconstructs_rotation() {
        for order in EulerOrder::ALL {
            for middle in [FRAC_PI_2, -FRAC_PI_2] {
                let rotation = rotation_from_euler(order, [0.4, middle, -0.7]);
                let recovered = euler_from_rotation(rotation.matrix(), order);
                let rebuilt = rotation_from_euler(order, recovered);
                assert_relative_eq!(rebuilt.matrix(), rotation.matrix(), epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_transform_from_euler_degrees() {
        let t = Transform::from_euler(EulerOrder::IntrinsicXyz, [0.0, 0.0, 90.0], true);
        let expected = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(t.rotation(), expected, epsilon = 1e-12);
        assert_eq!(t.translation(), Vector3::zeros());
    }
}
