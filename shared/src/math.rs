use serde::{Deserialize, Serialize};

///Represents a vector in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is up.
    pub y: f32,
    ///Value along the z-axis.
    /// Positive direction is forward.
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const UNIT_Y: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vec3 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec3::ZERO
        } else {
            Vec3 {
                x: self.x / mag,
                y: self.y / mag,
                z: self.z / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    ///Returns the dot product of two vectors.
    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    ///Returns the distance between two points.
    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

///Represents a rotation as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    ///Builds a rotation of `angle` radians around `axis`.
    /// The axis must be normalized.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Quat {
        let half = angle * 0.5;
        let s = half.sin();
        Quat {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        }
    }

    ///Builds the yaw rotation that faces a direction in the ground plane.
    /// The vertical component of `dir` is ignored; a zero direction yields
    /// the identity rotation.
    pub fn look_rotation(dir: Vec3) -> Quat {
        if dir.x == 0.0 && dir.z == 0.0 {
            return Quat::IDENTITY;
        }
        let yaw = dir.x.atan2(dir.z);
        Quat::from_axis_angle(Vec3::UNIT_Y, yaw)
    }

    ///Returns the dot product of two quaternions.
    pub fn dot(&self, other: &Quat) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    ///Returns the normalized quaternion.
    pub fn normalize(&self) -> Quat {
        let mag = self.dot(self).sqrt();
        if mag == 0.0 {
            Quat::IDENTITY
        } else {
            Quat {
                x: self.x / mag,
                y: self.y / mag,
                z: self.z / mag,
                w: self.w / mag,
            }
        }
    }

    ///Spherically interpolates from `self` toward `other` by `t` in [0, 1].
    /// Falls back to normalized linear interpolation when the rotations are
    /// nearly aligned.
    pub fn slerp(&self, other: &Quat, t: f32) -> Quat {
        let t = t.clamp(0.0, 1.0);
        let mut cos_theta = self.dot(other);
        let mut end = *other;

        // Take the shorter arc.
        if cos_theta < 0.0 {
            cos_theta = -cos_theta;
            end = Quat {
                x: -end.x,
                y: -end.y,
                z: -end.z,
                w: -end.w,
            };
        }

        if cos_theta > 0.9995 {
            return Quat {
                x: self.x + (end.x - self.x) * t,
                y: self.y + (end.y - self.y) * t,
                z: self.z + (end.z - self.z) * t,
                w: self.w + (end.w - self.w) * t,
            }
            .normalize();
        }

        let theta = cos_theta.clamp(-1.0, 1.0).acos();
        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;

        Quat {
            x: self.x * a + end.x * b,
            y: self.y * a + end.y * b,
            z: self.z * a + end.z * b,
            w: self.w * a + end.w * b,
        }
    }

    ///Rotates a vector by this quaternion.
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        // v' = v + 2w(q x v) + 2(q x (q x v))
        let qv = Vec3::new(self.x, self.y, self.z);
        let uv = cross(&qv, &v);
        let uuv = cross(&qv, &uv);
        Vec3 {
            x: v.x + 2.0 * (self.w * uv.x + uuv.x),
            y: v.y + 2.0 * (self.w * uv.y + uuv.y),
            z: v.z + 2.0 * (self.w * uv.z + uuv.z),
        }
    }

    ///Returns the local forward axis (+Z rotated by this quaternion).
    pub fn forward(&self) -> Vec3 {
        self.rotate(Vec3::new(0.0, 0.0, 1.0))
    }

    ///Returns the local right axis (+X rotated by this quaternion).
    pub fn right(&self) -> Vec3 {
        self.rotate(Vec3::new(1.0, 0.0, 0.0))
    }
}

fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    Vec3 {
        x: a.y * b.z - a.z * b.y,
        y: a.z * b.x - a.x * b.z,
        z: a.x * b.y - a.y * b.x,
    }
}

///Exponentially damps `current` toward `target`.
/// `smoothing` is the time constant in seconds; larger values react slower.
pub fn damp(current: f32, target: f32, smoothing: f32, dt: f32) -> f32 {
    if smoothing <= 0.0 {
        return target;
    }
    current + (target - current) * (1.0 - (-dt / smoothing).exp())
}
