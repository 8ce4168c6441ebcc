// Helmet IMU - On-device Motion Classifier
//
// Turns one drained batch into a riding-state label:
//   1. `extract_features` - per-axis mean / variance / peak for accel (g)
//      and gyro (dps), plus mean accel magnitude.
//   2. `classify` - three fixed decision trees, majority vote.
//
// Axis convention on the helmet: +X forward, +Y left, +Z up.

use crate::config::{SensorConfig, CLASSIFIER_CONFIDENCE_THRESHOLD, MIN_SAMPLES_PER_SENSOR};
use crate::error::FeatureExtractionError;
use crate::events::{Batch, SampleTag};

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Stationary,
    Riding,
    Braking,
    Turning,
}

impl Motion {
    pub const ALL: [Motion; 4] = [Self::Stationary, Self::Riding, Self::Braking, Self::Turning];

    /// Label sent to the host.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stationary => "Stationary",
            Self::Riding => "Riding",
            Self::Braking => "Braking",
            Self::Turning => "Turning",
        }
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisStats {
    pub mean: f32,
    pub variance: f32,
    pub peak: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    pub accel: [AxisStats; 3],
    pub gyro: [AxisStats; 3],
    pub accel_magnitude: f32,
}

/// Index into a [`FeatureVector`] used by tree split nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    AccelMean(usize),
    AccelVariance(usize),
    AccelPeak(usize),
    GyroMean(usize),
    GyroVariance(usize),
    GyroPeak(usize),
    AccelMagnitude,
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f32 {
        match feature {
            Feature::AccelMean(a) => self.accel[a].mean,
            Feature::AccelVariance(a) => self.accel[a].variance,
            Feature::AccelPeak(a) => self.accel[a].peak,
            Feature::GyroMean(a) => self.gyro[a].mean,
            Feature::GyroVariance(a) => self.gyro[a].variance,
            Feature::GyroPeak(a) => self.gyro[a].peak,
            Feature::AccelMagnitude => self.accel_magnitude,
        }
    }
}

fn axis_stats(values: &[f32]) -> AxisStats {
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let peak = values.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    AxisStats { mean, variance, peak }
}

/// Compute features in physical units using the configured sensitivities.
pub fn extract_features(
    batch: &Batch,
    sensor: &SensorConfig,
) -> Result<FeatureVector, FeatureExtractionError> {
    let g = sensor.accel_scale.g_per_lsb();
    let dps = sensor.gyro_scale.dps_per_lsb();

    let mut accel: [Vec<f32>; 3] = Default::default();
    let mut gyro: [Vec<f32>; 3] = Default::default();
    for s in batch.iter_tagged(SampleTag::Accel) {
        accel[0].push(s.x as f32 * g);
        accel[1].push(s.y as f32 * g);
        accel[2].push(s.z as f32 * g);
    }
    for s in batch.iter_tagged(SampleTag::Gyro) {
        gyro[0].push(s.x as f32 * dps);
        gyro[1].push(s.y as f32 * dps);
        gyro[2].push(s.z as f32 * dps);
    }

    let (na, ng) = (accel[0].len(), gyro[0].len());
    if na < MIN_SAMPLES_PER_SENSOR || ng < MIN_SAMPLES_PER_SENSOR {
        return Err(FeatureExtractionError::TooFewSamples {
            accel: na,
            gyro: ng,
            required: MIN_SAMPLES_PER_SENSOR,
        });
    }

    let accel_magnitude = (0..na)
        .map(|i| (accel[0][i].powi(2) + accel[1][i].powi(2) + accel[2][i].powi(2)).sqrt())
        .sum::<f32>()
        / na as f32;

    Ok(FeatureVector {
        accel: [axis_stats(&accel[0]), axis_stats(&accel[1]), axis_stats(&accel[2])],
        gyro: [axis_stats(&gyro[0]), axis_stats(&gyro[1]), axis_stats(&gyro[2])],
        accel_magnitude,
    })
}

// ---------------------------------------------------------------------------
// Decision-tree ensemble
// ---------------------------------------------------------------------------

/// Flat tree node; `below` / `above` index into the same tree.
#[derive(Debug, Clone, Copy)]
enum Node {
    Split {
        feature: Feature,
        threshold: f32,
        below: usize,
        above: usize,
    },
    Leaf(Motion),
}

use Feature::*;
use Node::{Leaf, Split};

const X: usize = 0;
const Z: usize = 2;

/// Longitudinal deceleration first, then yaw activity.
const TREE_BRAKE_FIRST: &[Node] = &[
    Split { feature: AccelMean(X), threshold: -0.25, below: 1, above: 2 },
    Leaf(Motion::Braking),
    Split { feature: GyroVariance(Z), threshold: 150.0, below: 3, above: 6 },
    Split { feature: AccelVariance(Z), threshold: 0.002, below: 4, above: 5 },
    Leaf(Motion::Stationary),
    Leaf(Motion::Riding),
    Leaf(Motion::Turning),
];

/// Yaw rate first, then vibration level.
const TREE_TURN_FIRST: &[Node] = &[
    Split { feature: GyroPeak(Z), threshold: 45.0, below: 1, above: 6 },
    Split { feature: AccelPeak(X), threshold: 0.35, below: 2, above: 5 },
    Split { feature: GyroPeak(X), threshold: 8.0, below: 3, above: 4 },
    Leaf(Motion::Stationary),
    Leaf(Motion::Riding),
    Leaf(Motion::Braking),
    Leaf(Motion::Turning),
];

/// Overall energy first.
const TREE_ENERGY_FIRST: &[Node] = &[
    Split { feature: AccelVariance(Z), threshold: 0.002, below: 1, above: 4 },
    Split { feature: AccelMean(X), threshold: -0.25, below: 2, above: 3 },
    Leaf(Motion::Braking),
    Leaf(Motion::Stationary),
    Split { feature: GyroMean(Z), threshold: -20.0, below: 5, above: 6 },
    Leaf(Motion::Turning),
    Split { feature: GyroMean(Z), threshold: 20.0, below: 7, above: 5 },
    Split { feature: AccelMean(X), threshold: -0.25, below: 8, above: 9 },
    Leaf(Motion::Braking),
    Leaf(Motion::Riding),
];

const FOREST: [&[Node]; 3] = [TREE_BRAKE_FIRST, TREE_TURN_FIRST, TREE_ENERGY_FIRST];

fn evaluate(tree: &[Node], features: &FeatureVector) -> Motion {
    let mut ix = 0;
    loop {
        match tree[ix] {
            Leaf(label) => return label,
            Split { feature, threshold, below, above } => {
                ix = if features.get(feature) < threshold { below } else { above };
            }
        }
    }
}

/// Winning label and its vote share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierResult {
    pub motion: Motion,
    pub confidence: f32,
}

/// Majority vote over the forest. Returns `None` below the confidence threshold.
pub fn classify(features: &FeatureVector) -> Option<ClassifierResult> {
    let mut votes = [0u32; Motion::ALL.len()];
    for tree in FOREST {
        let label = evaluate(tree, features);
        votes[Motion::ALL.iter().position(|m| *m == label)?] += 1;
    }

    // Ties go to the earlier label in `Motion::ALL`.
    let (best, &count) = votes
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &u32)>, (i, c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((i, c)),
        })?;
    let confidence = count as f32 / FOREST.len() as f32;

    log::debug!("Forest votes {:?} -> {:?} ({:.2})", votes, Motion::ALL[best], confidence);

    if confidence >= CLASSIFIER_CONFIDENCE_THRESHOLD {
        Some(ClassifierResult {
            motion: Motion::ALL[best],
            confidence,
        })
    } else {
        None
    }
}
