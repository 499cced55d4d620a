//! Rotation matrices for the XYZ (Cardan) joint parameterization
//!
//! An element's local rotation is composed as
//! ```text
//! R(α, β, γ) = Rx(α) · Ry(β) · Rz(γ)
//! ```
//! Every partial derivative below is a partial of that product; the
//! composition order is fixed.

use nalgebra::{Matrix3, Vector3};

/// Skew-symmetric matrix from vector (Rössel / hat operator)
///
/// For v = [x, y, z]^T:
/// ```text
/// [v]× = [ 0  -z   y]
///        [ z   0  -x]
///        [-y   x   0]
/// ```
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Cross product using skew-symmetric matrix
///
/// a × b = [a]× * b
pub fn cross_matrix(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    skew(a) * b
}

/// Inverse of [`skew`]: extracts v from a skew-symmetric [v]×
///
/// Only the skew-symmetric part of `m` contributes.
pub fn vee(m: &Matrix3<f64>) -> Vector3<f64> {
    Vector3::new(
        0.5 * (m[(2, 1)] - m[(1, 2)]),
        0.5 * (m[(0, 2)] - m[(2, 0)]),
        0.5 * (m[(1, 0)] - m[(0, 1)]),
    )
}

/// Rotation about the x axis
///
/// ```text
/// Rx = [1  0  0]
///      [0  c -s]
///      [0  s  c]
/// ```
pub fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, c, -s,
        0.0, s, c,
    )
}

/// Rotation about the y axis
pub fn rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, s,
        0.0, 1.0, 0.0,
        -s, 0.0, c,
    )
}

/// Rotation about the z axis
pub fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, -s, 0.0,
        s, c, 0.0,
        0.0, 0.0, 1.0,
    )
}

/// dRx/dα
pub fn rot_x_partial(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        0.0, 0.0, 0.0,
        0.0, -s, -c,
        0.0, c, -s,
    )
}

/// dRy/dβ
pub fn rot_y_partial(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        -s, 0.0, c,
        0.0, 0.0, 0.0,
        -c, 0.0, -s,
    )
}

/// dRz/dγ
pub fn rot_z_partial(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        -s, -c, 0.0,
        c, -s, 0.0,
        0.0, 0.0, 0.0,
    )
}

/// d²Rx/dα²
pub fn rot_x_second_partial(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        0.0, 0.0, 0.0,
        0.0, -c, s,
        0.0, -s, -c,
    )
}

/// d²Ry/dβ²
pub fn rot_y_second_partial(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        -c, 0.0, -s,
        0.0, 0.0, 0.0,
        s, 0.0, -c,
    )
}

/// d²Rz/dγ²
pub fn rot_z_second_partial(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        -c, s, 0.0,
        -s, -c, 0.0,
        0.0, 0.0, 0.0,
    )
}

/// d/dt (dRx/dα) = d²Rx/dα² · α̇
pub fn rot_x_partial_time_derivative(angle: f64, rate: f64) -> Matrix3<f64> {
    rot_x_second_partial(angle) * rate
}

/// d/dt (dRy/dβ) = d²Ry/dβ² · β̇
pub fn rot_y_partial_time_derivative(angle: f64, rate: f64) -> Matrix3<f64> {
    rot_y_second_partial(angle) * rate
}

/// d/dt (dRz/dγ) = d²Rz/dγ² · γ̇
pub fn rot_z_partial_time_derivative(angle: f64, rate: f64) -> Matrix3<f64> {
    rot_z_second_partial(angle) * rate
}

/// Composed local rotation R = Rx(α) · Ry(β) · Rz(γ)
pub fn rot_xyz(alpha: f64, beta: f64, gamma: f64) -> Matrix3<f64> {
    rot_x(alpha) * rot_y(beta) * rot_z(gamma)
}

/// ∂R/∂α = Rx' · Ry · Rz
///
/// `angles` holds (α, β, γ).
pub fn partial_alpha(angles: &Vector3<f64>) -> Matrix3<f64> {
    rot_x_partial(angles.x) * rot_y(angles.y) * rot_z(angles.z)
}

/// ∂R/∂β = Rx · Ry' · Rz
pub fn partial_beta(angles: &Vector3<f64>) -> Matrix3<f64> {
    rot_x(angles.x) * rot_y_partial(angles.y) * rot_z(angles.z)
}

/// ∂R/∂γ = Rx · Ry · Rz'
pub fn partial_gamma(angles: &Vector3<f64>) -> Matrix3<f64> {
    rot_x(angles.x) * rot_y(angles.y) * rot_z_partial(angles.z)
}

/// d/dt (∂R/∂α)
///
/// ```text
/// Rx''·α̇·Ry·Rz + Rx'·Ry'·β̇·Rz + Rx'·Ry·Rz'·γ̇
/// ```
pub fn partial_alpha_time_derivative(angles: &Vector3<f64>, rates: &Vector3<f64>) -> Matrix3<f64> {
    let (a, b, g) = (angles.x, angles.y, angles.z);
    rot_x_partial_time_derivative(a, rates.x) * rot_y(b) * rot_z(g)
        + rot_x_partial(a) * rot_y_partial(b) * rot_z(g) * rates.y
        + rot_x_partial(a) * rot_y(b) * rot_z_partial(g) * rates.z
}

/// d/dt (∂R/∂β)
///
/// ```text
/// Rx'·α̇·Ry'·Rz + Rx·Ry''·β̇·Rz + Rx·Ry'·Rz'·γ̇
/// ```
pub fn partial_beta_time_derivative(angles: &Vector3<f64>, rates: &Vector3<f64>) -> Matrix3<f64> {
    let (a, b, g) = (angles.x, angles.y, angles.z);
    rot_x_partial(a) * rot_y_partial(b) * rot_z(g) * rates.x
        + rot_x(a) * rot_y_partial_time_derivative(b, rates.y) * rot_z(g)
        + rot_x(a) * rot_y_partial(b) * rot_z_partial(g) * rates.z
}

/// d/dt (∂R/∂γ)
///
/// ```text
/// Rx'·α̇·Ry·Rz' + Rx·Ry'·β̇·Rz' + Rx·Ry·Rz''·γ̇
/// ```
pub fn partial_gamma_time_derivative(angles: &Vector3<f64>, rates: &Vector3<f64>) -> Matrix3<f64> {
    let (a, b, g) = (angles.x, angles.y, angles.z);
    rot_x_partial(a) * rot_y(b) * rot_z_partial(g) * rates.x
        + rot_x(a) * rot_y_partial(b) * rot_z_partial(g) * rates.y
        + rot_x(a) * rot_y(b) * rot_z_partial_time_derivative(g, rates.z)
}

/// dR/dt = ∂R/∂α·α̇ + ∂R/∂β·β̇ + ∂R/∂γ·γ̇
pub fn total_time_derivative(angles: &Vector3<f64>, rates: &Vector3<f64>) -> Matrix3<f64> {
    partial_alpha(angles) * rates.x
        + partial_beta(angles) * rates.y
        + partial_gamma(angles) * rates.z
}
