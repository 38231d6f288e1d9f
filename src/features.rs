// src/features.rs - fixed-size feature vector from smoothed landmarks
//
// Layout is frozen by the trained model: left hand (63) ++ right hand (63) ++ pose (33).
// Changing the order or the pose subset requires retraining.
use crate::landmarks::{
    Landmark, HAND_LANDMARKS, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, NOSE,
    RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};
use crate::landmarks::FrameLandmarks;

pub const HAND_FEATURES: usize = HAND_LANDMARKS * 3;
pub const POSE_FEATURES: usize = POSE_INDICES.len() * 3;
pub const FEATURE_COUNT: usize = HAND_FEATURES * 2 + POSE_FEATURES;

/// Below this the hand is treated as a single point and left unscaled.
pub const SCALE_EPSILON: f32 = 1e-6;

/// Body joints fed to the model, in feature order.
pub const POSE_INDICES: [usize; 11] = [
    NOSE,
    LEFT_SHOULDER,
    RIGHT_SHOULDER,
    LEFT_ELBOW,
    RIGHT_ELBOW,
    LEFT_WRIST,
    RIGHT_WRIST,
    LEFT_HIP,
    RIGHT_HIP,
    LEFT_KNEE,
    RIGHT_KNEE,
];

pub type FeatureVector = [f32; FEATURE_COUNT];

/// Wrist-centred, scale-normalized hand features.
///
/// Invariant to translation and to uniform scaling about the wrist. Rotation is
/// left alone, so signs that differ only by wrist rotation stay distinguishable
/// only through the pose features.
pub fn normalize_hand(hand: Option<&[Landmark]>) -> [f32; HAND_FEATURES] {
    let mut out = [0.0; HAND_FEATURES];

    let hand = match hand {
        Some(h) if h.len() >= HAND_LANDMARKS => &h[..HAND_LANDMARKS],
        _ => return out,
    };

    let wrist = hand[0];
    let translated: Vec<Landmark> = hand.iter().map(|lm| lm - wrist).collect();

    let mut scale = translated.iter().map(|lm| lm.amax()).fold(0.0_f32, f32::max);
    if scale <= SCALE_EPSILON {
        scale = 1.0;
    }

    for (i, lm) in translated.iter().enumerate() {
        out[i * 3] = lm.x / scale;
        out[i * 3 + 1] = lm.y / scale;
        out[i * 3 + 2] = lm.z / scale;
    }
    out
}

/// Raw coordinates of the selected body joints. Missing joints are zero.
pub fn extract_pose(pose: Option<&[Landmark]>) -> [f32; POSE_FEATURES] {
    let mut out = [0.0; POSE_FEATURES];
    let Some(pose) = pose else {
        return out;
    };

    for (slot, &idx) in POSE_INDICES.iter().enumerate() {
        if let Some(lm) = pose.get(idx) {
            out[slot * 3] = lm.x;
            out[slot * 3 + 1] = lm.y;
            out[slot * 3 + 2] = lm.z;
        }
    }
    out
}

/// Concatenate both hands and the pose subset into one model input row.
pub fn extract_features(frame: &FrameLandmarks) -> FeatureVector {
    let mut features = [0.0; FEATURE_COUNT];

    let left = normalize_hand(frame.left_hand.as_deref());
    let right = normalize_hand(frame.right_hand.as_deref());
    let pose = extract_pose(frame.pose.as_deref());

    features[..HAND_FEATURES].copy_from_slice(&left);
    features[HAND_FEATURES..HAND_FEATURES * 2].copy_from_slice(&right);
    features[HAND_FEATURES * 2..].copy_from_slice(&pose);
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn sample_hand() -> Vec<Landmark> {
        (0..21)
            .map(|i| {
                let t = i as f32;
                Vector3::new(0.42 + 0.011 * t, 0.61 - 0.017 * (t * 0.7).sin(), -0.03 + 0.002 * t)
            })
            .collect()
    }

    #[test]
    fn test_feature_layout_sizes() {
        assert_eq!(HAND_FEATURES, 63);
        assert_eq!(POSE_FEATURES, 33);
        assert_eq!(FEATURE_COUNT, 159);
    }

    #[test]
    fn test_missing_hand_is_all_zero() {
        assert!(normalize_hand(None).iter().all(|&v| v == 0.0));
        let partial: Vec<Landmark> = sample_hand().into_iter().take(20).collect();
        assert!(normalize_hand(Some(&partial)).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_wrist_is_origin_and_max_is_one() {
        let features = normalize_hand(Some(&sample_hand()));
        assert_eq!(&features[..3], &[0.0_f32; 3]);

        let max = features.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
        assert_relative_eq!(max, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_translation_invariance() {
        let hand = sample_hand();
        let shift = Vector3::new(0.25, -0.13, 0.07);
        let shifted: Vec<Landmark> = hand.iter().map(|lm| lm + shift).collect();

        let a = normalize_hand(Some(&hand));
        let b = normalize_hand(Some(&shifted));
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_scale_invariance_about_wrist() {
        let hand = sample_hand();
        let wrist = hand[0];
        let scaled: Vec<Landmark> = hand.iter().map(|lm| wrist + (lm - wrist) * 2.5).collect();

        let a = normalize_hand(Some(&hand));
        let b = normalize_hand(Some(&scaled));
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_degenerate_hand_is_not_scaled() {
        // Every landmark within epsilon of the wrist: divide by 1, not by ~0
        let hand: Vec<Landmark> = (0..21)
            .map(|i| Vector3::new(0.5 + if i == 1 { 5e-7 } else { 0.0 }, 0.5, 0.0))
            .collect();
        let features = normalize_hand(Some(&hand));

        assert!(features.iter().all(|v| v.is_finite()));
        assert!(features[3].abs() < 1e-5);
    }

    #[test]
    fn test_pose_subset_order_and_padding() {
        let pose: Vec<Landmark> = (0..17).map(|i| Vector3::new(i as f32, 0.5, 0.1)).collect();
        let features = extract_pose(Some(&pose));

        assert_eq!(&features[..3], &[0.0_f32, 0.5, 0.1]); // nose
        assert_eq!(features[3], 11.0); // left shoulder
        assert_eq!(features[18], 16.0); // right wrist
        // hips and knees are past the end of a 17-point pose
        assert!(features[21..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_concatenation_order() {
        let hand = sample_hand();
        let frame = FrameLandmarks::new(None, Some(hand.clone()), None);
        let features = extract_features(&frame);

        assert!(features[..HAND_FEATURES].iter().all(|&v| v == 0.0));
        assert_eq!(&features[HAND_FEATURES..HAND_FEATURES * 2], &normalize_hand(Some(&hand))[..]);
        assert!(features[HAND_FEATURES * 2..].iter().all(|&v| v == 0.0));
    }
}
