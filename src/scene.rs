use crate::association::{associate, Association};
use crate::bbox::{BBox, Ltwh};
use crate::config::{TrackerConfig, YoungTrackPolicy};
use crate::detection::Detection;
use crate::error::Error;
use crate::predictor::{MotionFilter, MotionModel};
use crate::Track;

/// Persistent track record together with the motion filter it owns.
#[derive(Debug, Clone)]
pub struct Participant<M> {
    pub id: u64,
    pub class: String,
    pub confidence: f32,
    pub bbox: BBox<Ltwh>,
    pub age: u32,
    pub total_visible_count: u32,
    pub consecutive_invisible_count: u32,
    filter: M,
}

impl<M: MotionFilter> Participant<M> {
    pub fn new(id: u64, det: &Detection, filter: M) -> Self {
        Self {
            id,
            class: det.class.clone(),
            confidence: det.confidence,
            bbox: det.bbox,
            age: 1,
            total_visible_count: 1,
            consecutive_invisible_count: 0,
            filter,
        }
    }

    pub fn predict(&mut self) -> Result<BBox<Ltwh>, Error> {
        self.bbox = self.filter.predict()?;

        Ok(self.bbox)
    }

    pub fn update(&mut self, det: &Detection) -> Result<(), Error> {
        self.filter.correct(&det.bbox)?;

        self.bbox = det.bbox;
        self.class.clone_from(&det.class);
        self.confidence = det.confidence;
        self.age += 1;
        self.total_visible_count += 1;
        self.consecutive_invisible_count = 0;

        Ok(())
    }

    pub fn mark_missed(&mut self) {
        self.age += 1;
        self.consecutive_invisible_count += 1;
    }

    fn is_lost(&self, invisibility_threshold: u32, young: Option<&YoungTrackPolicy>) -> bool {
        if self.consecutive_invisible_count >= invisibility_threshold {
            return true;
        }

        match young {
            Some(policy) if self.age < policy.age_threshold => {
                (self.total_visible_count as f32 / self.age as f32) < policy.min_visibility
            }
            _ => false,
        }
    }

    #[inline]
    pub fn filter(&self) -> &M {
        &self.filter
    }
}

impl<M> From<&Participant<M>> for Track {
    fn from(p: &Participant<M>) -> Track {
        Track {
            track_id: p.id,
            class: p.class.clone(),
            confidence: p.confidence,
            bbox: p.bbox,
            age: p.age,
            total_visible_count: p.total_visible_count,
            consecutive_invisible_count: p.consecutive_invisible_count,
        }
    }
}

/// Owns the track set and runs the per-frame lifecycle:
/// predict, associate, correct, age, spawn, prune, emit.
pub struct Scene<M: MotionModel> {
    model: M,
    tracks: Vec<Participant<M::Filter>>,
    next_id: u64,
    max_cost: f32,
    invisibility_threshold: u32,
    min_visible_count: u32,
    young_track: Option<YoungTrackPolicy>,
}

impl<M: MotionModel> Scene<M> {
    pub fn new(model: M, config: &TrackerConfig) -> Self {
        Self {
            model,
            tracks: Vec::with_capacity(64),
            next_id: 1,
            max_cost: config.max_cost,
            invisibility_threshold: config.invisibility_threshold,
            min_visible_count: config.min_visible_count,
            young_track: config.young_track,
        }
    }

    /// Runs one frame and returns the visible tracks.
    ///
    /// All work happens on a copy of the track set which replaces the
    /// committed one only when every step succeeded, so on error the scene
    /// is left exactly as it was.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<Track>, Error> {
        let mut tracks = self.tracks.clone();
        let mut next_id = self.next_id;

        let predicted = tracks
            .iter_mut()
            .map(Participant::predict)
            .collect::<Result<Vec<_>, _>>()?;

        let detections: Vec<&Detection> = detections
            .iter()
            .filter(|d| {
                let finite = d.bbox.is_finite();
                if !finite {
                    log::warn!(
                        "skipping {} detection with non-finite box {:?}",
                        d.class,
                        d.bbox.as_slice()
                    );
                }
                finite
            })
            .collect();

        let boxes: Vec<_> = detections.iter().map(|d| d.bbox).collect();
        let Association {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = associate(&predicted, &boxes, self.max_cost);

        for &(i, j, _) in &matches {
            tracks[i].update(detections[j])?;
        }

        for &i in &unmatched_tracks {
            tracks[i].mark_missed();
        }

        for &j in &unmatched_detections {
            let det = detections[j];
            let filter = self.model.create(&det.bbox)?;

            log::trace!("new track {} ({}) at {:?}", next_id, det.class, det.bbox.as_slice());

            tracks.push(Participant::new(next_id, det, filter));
            next_id += 1;
        }

        let before = tracks.len();
        let threshold = self.invisibility_threshold;
        let young = self.young_track.as_ref();
        tracks.retain(|t| {
            let lost = t.is_lost(threshold, young);
            if lost {
                log::trace!(
                    "track {} pruned after {} invisible frames",
                    t.id,
                    t.consecutive_invisible_count
                );
            }
            !lost
        });

        log::debug!(
            "frame: {} tracks, {} detections, {} matched, {} spawned, {} pruned",
            predicted.len(),
            detections.len(),
            matches.len(),
            unmatched_detections.len(),
            before - tracks.len()
        );

        self.tracks = tracks;
        self.next_id = next_id;

        Ok(self.visible())
    }

    /// Tracks matched in the latest frame that have been seen often enough.
    pub fn visible(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|t| {
                t.consecutive_invisible_count == 0
                    && t.total_visible_count >= self.min_visible_count
            })
            .map(Into::into)
            .collect()
    }

    /// Every track currently held, coasting ones included.
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(Into::into).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }
}
