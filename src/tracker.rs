use crate::config::TrackerConfig;
use crate::detector::{ClassFilter, Detector};
use crate::error::Error;
use crate::predictor::MotionModel;
use crate::scene::Scene;
use crate::{Frame, Track};

/// Per-frame driver: detect, keep trackable classes, hand over to the scene.
///
/// Frames are taken by `&mut self`, so a frame can only start once the
/// previous one has fully committed.
pub struct Tracker<D: Detector, M: MotionModel> {
    detector: D,
    scene: Scene<M>,
    classes: ClassFilter,
    detection_threshold: f32,
    last_frame: Option<u64>,
}

impl<D: Detector, M: MotionModel> Tracker<D, M> {
    pub fn new(detector: D, model: M, config: &TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            detector,
            scene: Scene::new(model, config),
            classes: ClassFilter::new(config.classes.iter().cloned()),
            detection_threshold: config.detection_threshold,
            last_frame: None,
        })
    }

    #[inline]
    pub fn scene(&self) -> &Scene<M> {
        &self.scene
    }

    #[inline]
    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn reset(&mut self) {
        self.scene.reset();
        self.last_frame = None;
    }
}

impl<D: Detector> Tracker<D, crate::predictor::KalmanConfig> {
    /// Tracker using the constant-velocity Kalman filter from `config.motion`.
    pub fn with_kalman(detector: D, config: &TrackerConfig) -> Result<Self, Error> {
        Self::new(detector, config.motion, config)
    }
}

impl<D: Detector, M: MotionModel> crate::Tracking for Tracker<D, M> {
    type Input = D::Input;

    fn process_frame(&mut self, frame: &Frame<D::Input>) -> Result<Vec<Track>, Error> {
        if let Some(last) = self.last_frame {
            if frame.index <= last {
                return Err(Error::OutOfOrderFrameError {
                    last,
                    got: frame.index,
                });
            }
        }

        let detections = self
            .detector
            .detect(&frame.input, self.detection_threshold)?;
        let total = detections.len();
        let detections = self.classes.apply(detections);

        log::debug!(
            "frame {}: {} of {} detections are trackable",
            frame.index,
            detections.len(),
            total
        );

        let visible = self.scene.update(&detections)?;
        self.last_frame = Some(frame.index);

        Ok(visible)
    }

    #[inline]
    fn tracks(&self) -> Vec<Track> {
        self.scene.tracks()
    }
}
