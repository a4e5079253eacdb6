//! Frame geometry: texture transform matrices and reported rotation.

use std::ops::Mul;

/// 3x3 affine transform in row-major order, operating on texture
/// coordinates in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 9]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    pub fn translate(dx: f32, dy: f32) -> Self {
        Matrix([1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0])
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Matrix([sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Matrix([cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0])
    }

    /// `self * other`: `other` is applied to a point first.
    pub fn pre_concat(self, other: Matrix) -> Self {
        self * other
    }

    pub fn pre_translate(self, dx: f32, dy: f32) -> Self {
        self * Matrix::translate(dx, dy)
    }

    pub fn pre_scale(self, sx: f32, sy: f32) -> Self {
        self * Matrix::scale(sx, sy)
    }

    pub fn pre_rotate(self, degrees: f32) -> Self {
        self * Matrix::rotate(degrees)
    }

    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        let m = &self.0;
        (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 3 + col] = (0..3).map(|k| a[row * 3 + k] * b[k * 3 + col]).sum();
            }
        }
        Matrix(out)
    }
}

/// GPU texture holding one captured frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBuffer {
    pub texture_id: u32,
    pub width: u32,
    pub height: u32,
    pub transform: Matrix,
}

impl TextureBuffer {
    pub fn new(texture_id: u32, width: u32, height: u32) -> Self {
        Self {
            texture_id,
            width,
            height,
            transform: Matrix::IDENTITY,
        }
    }

    /// Same texture with `transform` applied before the current one.
    pub fn apply_transform_matrix(&self, transform: Matrix) -> TextureBuffer {
        TextureBuffer {
            texture_id: self.texture_id,
            width: self.width,
            height: self.height,
            transform: self.transform.pre_concat(transform),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub buffer: TextureBuffer,
    /// Clockwise rotation in degrees a consumer applies for display.
    pub rotation: u32,
    pub timestamp_ns: i64,
}

/// Mirror and rotate around the texture center `(0.5, 0.5)`.
///
/// Width and height are left alone: the capture format already carries the
/// post-rotation dimensions.
pub fn create_texture_buffer_with_modified_transform_matrix(
    buffer: &TextureBuffer,
    mirror: bool,
    rotation: i32,
) -> TextureBuffer {
    let mut transform = Matrix::IDENTITY.pre_translate(0.5, 0.5);
    if mirror {
        transform = transform.pre_scale(-1.0, 1.0);
    }
    transform = transform.pre_rotate(rotation as f32);
    transform = transform.pre_translate(-0.5, -0.5);
    buffer.apply_transform_matrix(transform)
}

/// `(sensor_orientation + device_rotation) % 360`, where the device
/// rotation is mirrored for front-facing lenses.
pub fn frame_orientation(
    sensor_orientation: u32,
    front_facing: bool,
    display_rotation: u32,
) -> u32 {
    let sensor_orientation = sensor_orientation % 360;
    let display_rotation = display_rotation % 360;
    let device_rotation = if front_facing {
        360 - display_rotation
    } else {
        display_rotation
    };
    (sensor_orientation + device_rotation) % 360
}
