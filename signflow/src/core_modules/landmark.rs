// THEORY:
// The `landmark` module holds the most fundamental data of the engine: a single hand
// skeleton as produced by the external landmark detector, and its fixed-order
// numeric serialization.
//
// Key architectural principles:
// 1.  **Dumb Data Containers**: `Landmark` and `LandmarkFrame` know nothing about
//     time or about other frames. Anything comparative (motion, stillness) lives in
//     higher modules.
// 2.  **Deterministic Flattening**: `flatten` is a pure function. It walks the 21
//     points in landmark-index order and writes `[x0, y0, z0, ..., x20, y20, z20]`.
//     Two frames with identical points always flatten identically.
// 3.  **First Hand Only**: A `Detection` may carry several hands, but only the first
//     one ever reaches the segmentation layer.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of points in one hand skeleton.
pub const LANDMARK_COUNT: usize = 21;
/// Coordinates per point (x, y, z).
pub const COORDS_PER_LANDMARK: usize = 3;
/// Length of a flattened hand skeleton.
pub const FLATTENED_LEN: usize = LANDMARK_COUNT * COORDS_PER_LANDMARK;

/// Fixed-order serialization of one `LandmarkFrame`.
pub type FlattenedVector = [f32; FLATTENED_LEN];

/// A single 3D point in detector-native units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; COORDS_PER_LANDMARK]> for Landmark {
    fn from([x, y, z]: [f32; COORDS_PER_LANDMARK]) -> Self {
        Self { x, y, z }
    }
}

/// One detector sample: exactly 21 points for a tracked hand.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkFrame {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Builds a frame from a detector slice, rejecting anything that is not 21 points.
    pub fn from_slice(points: &[Landmark]) -> Result<Self> {
        let points: [Landmark; LANDMARK_COUNT] =
            points.try_into().map_err(|_| Error::InvalidFrame {
                expected: LANDMARK_COUNT,
                found: points.len(),
            })?;
        Ok(Self { points })
    }

    /// Builds a frame from raw `[x, y, z]` triples, the layout used by recordings.
    pub fn from_coords(coords: &[[f32; COORDS_PER_LANDMARK]]) -> Result<Self> {
        let points: Vec<Landmark> = coords.iter().copied().map(Landmark::from).collect();
        Self::from_slice(&points)
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }
}

/// Serializes a frame into `[x0, y0, z0, ..., x20, y20, z20]`.
pub fn flatten(frame: &LandmarkFrame) -> FlattenedVector {
    let mut vector = [0.0; FLATTENED_LEN];
    for (slot, point) in vector.chunks_exact_mut(COORDS_PER_LANDMARK).zip(frame.points.iter()) {
        slot[0] = point.x;
        slot[1] = point.y;
        slot[2] = point.z;
    }
    vector
}

/// What the landmark detector reported for one video frame: zero or more hands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    hands: Vec<LandmarkFrame>,
}

impl Detection {
    /// No hand in this frame.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(hand: LandmarkFrame) -> Self {
        Self { hands: vec![hand] }
    }

    pub fn from_hands(hands: Vec<LandmarkFrame>) -> Self {
        Self { hands }
    }

    /// The hand the pipeline tracks. Additional hands are ignored.
    pub fn primary(&self) -> Option<&LandmarkFrame> {
        self.hands.first()
    }

    pub fn hand_count(&self) -> usize {
        self.hands.len()
    }
}

impl From<Option<LandmarkFrame>> for Detection {
    fn from(hand: Option<LandmarkFrame>) -> Self {
        Self { hands: hand.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed_frame() -> LandmarkFrame {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (i, point) in points.iter_mut().enumerate() {
            let base = i as f32;
            *point = Landmark::new(base, base + 0.25, base + 0.5);
        }
        LandmarkFrame::new(points)
    }

    #[test]
    fn flatten_walks_points_in_index_order() {
        let vector = flatten(&indexed_frame());

        assert_eq!(vector.len(), 63);
        assert_eq!(&vector[..3], &[0.0, 0.25, 0.5]);
        assert_eq!(&vector[3..6], &[1.0, 1.25, 1.5]);
        assert_eq!(&vector[60..], &[20.0, 20.25, 20.5]);
    }

    #[test]
    fn flatten_is_deterministic() {
        let frame = indexed_frame();
        let copy = frame.clone();

        assert_eq!(flatten(&frame), flatten(&frame));
        assert_eq!(flatten(&frame), flatten(&copy));
    }

    #[test]
    fn from_slice_rejects_wrong_point_count() {
        let short = vec![Landmark::default(); 20];
        match LandmarkFrame::from_slice(&short) {
            Err(Error::InvalidFrame { expected, found }) => {
                assert_eq!(expected, 21);
                assert_eq!(found, 20);
            }
            other => panic!("expected InvalidFrame, got {:?}", other),
        }
    }

    #[test]
    fn from_coords_matches_manual_construction() {
        let coords: Vec<[f32; 3]> = (0..21)
            .map(|i| [i as f32, i as f32 + 0.25, i as f32 + 0.5])
            .collect();
        let frame = LandmarkFrame::from_coords(&coords).expect("21 points");
        assert_eq!(frame, indexed_frame());
    }

    #[test]
    fn detection_keeps_only_first_hand() {
        let first = indexed_frame();
        let second = LandmarkFrame::new([Landmark::new(9.0, 9.0, 9.0); LANDMARK_COUNT]);
        let detection = Detection::from_hands(vec![first.clone(), second]);

        assert_eq!(detection.hand_count(), 2);
        assert_eq!(detection.primary(), Some(&first));
        assert!(Detection::none().primary().is_none());
    }
}
