pub mod association;
pub mod bbox;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod predictor;
pub mod scene;
pub mod tracker;

mod track;

pub use config::TrackerConfig;
pub use detection::Detection;
pub use frame::Frame;
pub use track::Track;
pub use tracker::Tracker;

use error::Error;

pub trait Tracking {
    type Input;

    /// Processes exactly one frame, in frame order, and returns the tracks
    /// matched in it. On error nothing has changed.
    fn process_frame(&mut self, frame: &Frame<Self::Input>) -> Result<Vec<Track>, Error>;

    /// All tracks currently held, including ones coasting on prediction.
    fn tracks(&self) -> Vec<Track>;
}
