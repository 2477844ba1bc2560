use crate::detection::Detection;
use crate::error::Error;

/// Object detector consumed by the tracker. Implementations are free to
/// return any labels; the tracker keeps only the configured classes.
pub trait Detector {
    type Input;

    fn detect(&mut self, input: &Self::Input, threshold: f32) -> Result<Vec<Detection>, Error>;
}

/// Passes through detections computed upstream, dropping the ones scored
/// below the threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrecomputedDetector;

impl Detector for PrecomputedDetector {
    type Input = Vec<Detection>;

    fn detect(&mut self, input: &Self::Input, threshold: f32) -> Result<Vec<Detection>, Error> {
        Ok(input
            .iter()
            .filter(|d| d.confidence >= threshold)
            .cloned()
            .collect())
    }
}

/// Keeps only detections whose label is in the trackable set.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFilter {
    classes: Vec<String>,
}

impl ClassFilter {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty class list accepts everything.
    #[inline]
    pub fn accepts(&self, det: &Detection) -> bool {
        self.classes.is_empty() || self.classes.iter().any(|c| *c == det.class)
    }

    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections.into_iter().filter(|d| self.accepts(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    fn det(class: &str, p: f32) -> Detection {
        Detection::new(BBox::ltwh(0.0, 0.0, 10.0, 10.0), class, p)
    }

    #[test]
    fn precomputed_applies_threshold() {
        let input = vec![det("car", 0.9), det("car", 0.2), det("bus", 0.5)];
        let out = PrecomputedDetector.detect(&input, 0.5).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].confidence, 0.9);
        assert_eq!(out[1].class, "bus");
    }

    #[test]
    fn class_filter_drops_untracked_labels() {
        let filter = ClassFilter::new(["car", "truck", "bus"]);
        let out = filter.apply(vec![det("car", 0.9), det("person", 0.9), det("truck", 0.8)]);

        let labels: Vec<_> = out.iter().map(|d| d.class.as_str()).collect();
        assert_eq!(labels, ["car", "truck"]);
    }

    #[test]
    fn empty_class_filter_accepts_all() {
        let filter = ClassFilter::new(Vec::<String>::new());

        assert!(filter.accepts(&det("person", 0.1)));
    }
}
