//! Collapse overlapping detections of the same physical face.
//!
//! Detectors routinely emit several near-identical boxes for one face.
//! The collapse is order-dependent and first-seen-wins: the earliest
//! detection of a face is the canonical one, later near-duplicates are
//! dropped. Re-running the collapse on its own output changes nothing.

use serde::{Deserialize, Serialize};

use super::geometry::{corners_within, overlap_area};
use super::Detection;

/// How two detections are judged to be the same face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Duplicate when `overlap_area / candidate_area` exceeds `min_ratio`
    /// against any already-kept box. The richer test; default.
    AreaOverlap { min_ratio: f32 },
    /// Duplicate when the x1, y1 and x2 corners all sit within
    /// `max_shift` pixels of an already-kept box. Coarse alternative for
    /// detectors with stable corner placement.
    CornerDistance { max_shift: f32 },
}

pub const DEFAULT_OVERLAP_RATIO: f32 = 0.5;

impl Default for DedupPolicy {
    fn default() -> Self {
        DedupPolicy::AreaOverlap {
            min_ratio: DEFAULT_OVERLAP_RATIO,
        }
    }
}

/// Reduce a detection list to the indices of its canonical faces.
///
/// Indices are returned in input order. Zero-area candidates are always
/// dropped: the detector is not re-validated upstream, so a degenerate
/// box is treated as noise rather than risking a division by zero in
/// the ratio test.
pub fn dedup(detections: &[Detection], policy: DedupPolicy) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::with_capacity(detections.len());

    // O(n^2) over single-digit face counts per frame.
    for (i, candidate) in detections.iter().enumerate() {
        let duplicate = match policy {
            DedupPolicy::AreaOverlap { min_ratio } => {
                let candidate_area = candidate.bbox.area();
                if candidate_area == 0.0 {
                    true
                } else {
                    kept.iter().any(|&k| {
                        overlap_area(&candidate.bbox, &detections[k].bbox) / candidate_area
                            > min_ratio
                    })
                }
            }
            DedupPolicy::CornerDistance { max_shift } => kept
                .iter()
                .any(|&k| corners_within(&candidate.bbox, &detections[k].bbox, max_shift)),
        };

        if !duplicate {
            kept.push(i);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{geometry::BoundingBox, Landmarks};

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            landmarks: Landmarks::default(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_contained_duplicate_dropped() {
        // Second box fully inside the first: overlap ratio 1.0 relative
        // to the second, so only the first survives.
        let faces = vec![det(0.0, 0.0, 100.0, 100.0), det(10.0, 10.0, 90.0, 90.0)];
        assert_eq!(dedup(&faces, DedupPolicy::default()), vec![0]);
    }

    #[test]
    fn test_disjoint_both_kept() {
        let faces = vec![det(0.0, 0.0, 100.0, 100.0), det(200.0, 200.0, 300.0, 300.0)];
        assert_eq!(dedup(&faces, DedupPolicy::default()), vec![0, 1]);
    }

    #[test]
    fn test_first_seen_wins_ordering() {
        // Face 2 duplicates face 1, face 3 is independent.
        let faces = vec![
            det(0.0, 0.0, 100.0, 100.0),
            det(5.0, 5.0, 95.0, 95.0),
            det(200.0, 0.0, 300.0, 100.0),
        ];
        assert_eq!(dedup(&faces, DedupPolicy::default()), vec![0, 2]);
    }

    #[test]
    fn test_idempotent() {
        let faces = vec![
            det(0.0, 0.0, 100.0, 100.0),
            det(10.0, 10.0, 90.0, 90.0),
            det(200.0, 200.0, 300.0, 300.0),
            det(205.0, 205.0, 295.0, 295.0),
        ];
        let kept = dedup(&faces, DedupPolicy::default());
        let survivors: Vec<Detection> = kept.iter().map(|&i| faces[i].clone()).collect();
        let again = dedup(&survivors, DedupPolicy::default());
        assert_eq!(again, (0..survivors.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_never_increases_count() {
        let faces = vec![
            det(0.0, 0.0, 50.0, 50.0),
            det(10.0, 0.0, 60.0, 50.0),
            det(20.0, 0.0, 70.0, 50.0),
        ];
        assert!(dedup(&faces, DedupPolicy::default()).len() <= faces.len());
    }

    #[test]
    fn test_zero_area_dropped() {
        let faces = vec![det(50.0, 50.0, 50.0, 50.0), det(0.0, 0.0, 100.0, 100.0)];
        assert_eq!(dedup(&faces, DedupPolicy::default()), vec![1]);
    }

    #[test]
    fn test_corner_distance_policy() {
        let faces = vec![
            det(0.0, 0.0, 100.0, 100.0),
            det(4.0, 3.0, 102.0, 104.0),
            det(200.0, 0.0, 300.0, 100.0),
        ];
        let policy = DedupPolicy::CornerDistance { max_shift: 10.0 };
        assert_eq!(dedup(&faces, policy), vec![0, 2]);
    }

    #[test]
    fn test_partial_overlap_below_ratio_kept() {
        // ~25% of the candidate's area overlaps; below the 0.5 default.
        let faces = vec![det(0.0, 0.0, 100.0, 100.0), det(50.0, 50.0, 150.0, 150.0)];
        assert_eq!(dedup(&faces, DedupPolicy::default()), vec![0, 1]);
    }
}
