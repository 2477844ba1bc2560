use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltwh};
use crate::error::Error;

type Matrix8 = na::SMatrix<f32, 8, 8>;
type Vector8 = na::SVector<f32, 8>;
type Matrix4x8 = na::SMatrix<f32, 4, 8>;

/// Per-track recursive estimator. Owned exclusively by its track.
///
/// Filters are cloned at the start of every frame so a failed frame can be
/// thrown away without touching the committed state.
pub trait MotionFilter: Clone {
    /// Advances the state one frame and returns the predicted box.
    fn predict(&mut self) -> Result<BBox<Ltwh>, Error>;

    /// Fuses an observed box into the state.
    fn correct(&mut self, observed: &BBox<Ltwh>) -> Result<(), Error>;
}

/// Creates a fresh filter seeded from the detection that spawns a track.
pub trait MotionModel {
    type Filter: MotionFilter;

    fn create(&self, initial: &BBox<Ltwh>) -> Result<Self::Filter, Error>;
}

/// Noise parameters of the constant-velocity model. Each pair is
/// `[position, velocity]` variance and applies to all four box coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct KalmanConfig {
    pub initial_estimate_error: [f32; 2],
    pub motion_noise: [f32; 2],
    pub measurement_noise: f32,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            initial_estimate_error: [200.0, 50.0],
            motion_noise: [100.0, 25.0],
            measurement_noise: 100.0,
        }
    }
}

impl KalmanConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let positive = |v: f32| v.is_finite() && v > 0.0;

        if !self.initial_estimate_error.iter().copied().all(positive)
            || !self.motion_noise.iter().copied().all(positive)
            || !positive(self.measurement_noise)
        {
            return Err(Error::ConfigError(format!(
                "kalman noise terms must be finite and positive: {:?}",
                self
            )));
        }

        Ok(())
    }

    fn diagonal(pair: [f32; 2]) -> Matrix8 {
        Matrix8::from_diagonal(&Vector8::from_column_slice(&[
            pair[0], pair[0], pair[0], pair[0], pair[1], pair[1], pair[1], pair[1],
        ]))
    }
}

impl MotionModel for KalmanConfig {
    type Filter = ConstantVelocity;

    fn create(&self, initial: &BBox<Ltwh>) -> Result<ConstantVelocity, Error> {
        if !initial.is_finite() {
            return Err(Error::MotionFilterError(format!(
                "cannot seed filter from non-finite box {:?}",
                initial.as_slice()
            )));
        }

        Ok(ConstantVelocity::new(initial, self))
    }
}

/// Kalman filter over `[x, y, w, h, vx, vy, vw, vh]` with a unit time step.
#[derive(Debug, Clone)]
pub struct ConstantVelocity {
    x: Vector8,
    p: Matrix8,
    f: Matrix8,
    h: Matrix4x8,
    q: Matrix8,
    r: na::Matrix4<f32>,
}

impl ConstantVelocity {
    pub fn new(initial: &BBox<Ltwh>, config: &KalmanConfig) -> Self {
        let mut x = Vector8::zeros();
        for (i, v) in initial.as_slice().iter().enumerate() {
            x[i] = *v;
        }

        let mut f = Matrix8::identity();
        let mut h = Matrix4x8::zeros();
        for i in 0..4 {
            f[(i, i + 4)] = 1.0;
            h[(i, i)] = 1.0;
        }

        Self {
            x,
            p: KalmanConfig::diagonal(config.initial_estimate_error),
            f,
            h,
            q: KalmanConfig::diagonal(config.motion_noise),
            r: na::Matrix4::identity() * config.measurement_noise,
        }
    }

    /// Current box estimate.
    #[inline]
    pub fn bbox(&self) -> BBox<Ltwh> {
        BBox::ltwh(self.x[0], self.x[1], self.x[2], self.x[3])
    }

    /// Estimated per-frame displacement of the box.
    #[inline]
    pub fn velocity(&self) -> [f32; 4] {
        [self.x[4], self.x[5], self.x[6], self.x[7]]
    }

    fn ensure_finite(&self) -> Result<(), Error> {
        if self.x.iter().chain(self.p.iter()).all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(Error::MotionFilterError("filter state is not finite".into()))
        }
    }
}

impl MotionFilter for ConstantVelocity {
    fn predict(&mut self) -> Result<BBox<Ltwh>, Error> {
        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose() + self.q;
        self.ensure_finite()?;

        Ok(self.bbox())
    }

    fn correct(&mut self, observed: &BBox<Ltwh>) -> Result<(), Error> {
        let z = na::Vector4::from_column_slice(observed.as_slice());

        let y = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let s_inv = s.try_inverse().ok_or_else(|| {
            Error::MotionFilterError("innovation covariance is singular".into())
        })?;
        let k = self.p * self.h.transpose() * s_inv;

        self.x += k * y;
        self.p = (Matrix8::identity() - k * self.h) * self.p;

        self.ensure_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn filter(bbox: BBox<Ltwh>) -> ConstantVelocity {
        KalmanConfig::default().create(&bbox).unwrap()
    }

    #[test]
    fn stationary_box_stays_put() {
        let bbox = BBox::ltwh(100.0, 50.0, 40.0, 30.0);
        let mut kf = filter(bbox);

        for _ in 0..5 {
            let predicted = kf.predict().unwrap();
            for (a, b) in predicted.as_slice().iter().zip(bbox.as_slice()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
            }
            kf.correct(&bbox).unwrap();
        }
    }

    #[test]
    fn learns_constant_velocity() {
        let mut kf = filter(BBox::ltwh(0.0, 0.0, 20.0, 20.0));

        for step in 1..=30 {
            kf.predict().unwrap();
            kf.correct(&BBox::ltwh(step as f32 * 5.0, 0.0, 20.0, 20.0))
                .unwrap();
        }

        assert_abs_diff_eq!(kf.velocity()[0], 5.0, epsilon = 0.5);

        let predicted = kf.predict().unwrap();
        assert_abs_diff_eq!(predicted.left(), 155.0, epsilon = 3.0);
        assert_abs_diff_eq!(predicted.width(), 20.0, epsilon = 1.0);
    }

    #[test]
    fn correction_moves_towards_observation() {
        let mut kf = filter(BBox::ltwh(0.0, 0.0, 20.0, 20.0));
        kf.predict().unwrap();
        kf.correct(&BBox::ltwh(10.0, 0.0, 20.0, 20.0)).unwrap();

        let left = kf.bbox().left();
        assert!(left > 0.0 && left <= 10.0);
    }

    #[test]
    fn rejects_non_finite_seed() {
        let res = KalmanConfig::default().create(&BBox::ltwh(f32::NAN, 0.0, 1.0, 1.0));

        assert!(matches!(res, Err(Error::MotionFilterError(_))));
    }

    #[test]
    fn non_finite_observation_is_an_error() {
        let mut kf = filter(BBox::ltwh(0.0, 0.0, 20.0, 20.0));
        kf.predict().unwrap();

        let res = kf.correct(&BBox::ltwh(f32::INFINITY, 0.0, 20.0, 20.0));
        assert!(matches!(res, Err(Error::MotionFilterError(_))));
    }

    #[test]
    fn validate_rejects_bad_noise() {
        let mut config = KalmanConfig::default();
        assert!(config.validate().is_ok());

        config.measurement_noise = 0.0;
        assert!(config.validate().is_err());
    }
}
