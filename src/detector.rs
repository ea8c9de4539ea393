// src/detector.rs - Hand detection boundary: native bridge or synthetic poses
use image::DynamicImage;
use nalgebra::Point2;
use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::gesture::GestureClass;
use crate::landmark_bridge::{BridgeConfig, LandmarkBridge};
use crate::landmarks::*;

#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub max_hands: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_hands: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.7,
        }
    }
}

/// One detected hand, confidence-filtered and capped by `max_hands`.
#[derive(Debug, Clone)]
pub struct Detection {
    pub points: Vec<Point2<f32>>,
}

enum Backend {
    Bridge(LandmarkBridge),
    Simulation,
}

/// Front-end over the external landmark model. Falls back to a
/// deterministic simulation source when the native runtime is unavailable
/// or when simulation is requested, so the whole pipeline can be exercised
/// without a camera-facing hand.
pub struct HandDetector {
    config: DetectorConfig,
    backend: Backend,
    sim_time: f64,
}

impl HandDetector {
    pub fn new(config: DetectorConfig, force_simulation: bool) -> Self {
        let backend = if force_simulation {
            info!("hand detector running in simulation mode");
            Backend::Simulation
        } else {
            match LandmarkBridge::new(BridgeConfig {
                max_hands: config.max_hands,
                min_detection_confidence: config.min_detection_confidence,
                min_tracking_confidence: config.min_tracking_confidence,
            }) {
                Ok(bridge) => {
                    info!("hand-landmark bridge initialized");
                    Backend::Bridge(bridge)
                }
                Err(e) => {
                    warn!("hand-landmark bridge unavailable ({e}), using simulation mode");
                    Backend::Simulation
                }
            }
        };
        Self {
            config,
            backend,
            sim_time: 0.0,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.backend, Backend::Simulation)
    }

    /// Detect hands in one frame. Returns at most `max_hands` detections,
    /// dropping any below the detection-confidence threshold.
    pub fn detect(&mut self, frame: &DynamicImage) -> Vec<Detection> {
        self.sim_time += 1.0 / 30.0;
        match &mut self.backend {
            Backend::Bridge(bridge) => match bridge.process_image(frame) {
                Ok(detections) => detections
                    .into_iter()
                    .filter(|d| d.confidence >= self.config.min_detection_confidence)
                    .take(self.config.max_hands)
                    .map(|d| Detection { points: d.points })
                    .collect(),
                Err(e) => {
                    warn!("landmark bridge error: {e}");
                    Vec::new()
                }
            },
            Backend::Simulation => simulated_hand(self.sim_time)
                .into_iter()
                .take(self.config.max_hands)
                .collect(),
        }
    }
}

// ─── Synthetic poses ────────────────────────────────────────────────────────

/// Canonical 21-point pose for a gesture. Right chirality (index MCP left
/// of pinky MCP); fingers point up, extended tips sit above their PIPs.
pub fn synthetic_pose(gesture: GestureClass) -> Vec<Point2<f32>> {
    let (fingers, thumb) = match gesture {
        GestureClass::VolumeUp => ([false; 4], true),
        GestureClass::VolumeDown => ([false; 4], false),
        GestureClass::PlayPause => ([true; 4], true),
        GestureClass::Next => ([true, false, false, false], false),
        GestureClass::Previous => ([true, true, false, false], false),
        GestureClass::None => ([false, false, true, true], false),
    };
    build_pose(fingers, thumb)
}

fn build_pose(fingers: [bool; 4], thumb_extended: bool) -> Vec<Point2<f32>> {
    let mut lm = vec![Point2::new(0.5, 0.6); LANDMARK_COUNT];
    lm[WRIST] = Point2::new(0.5, 0.85);

    let columns = [
        (INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP),
        (MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP),
        (RING_MCP, RING_PIP, RING_DIP, RING_TIP),
        (PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP),
    ];
    for (col, (mcp, pip, dip, tip)) in columns.into_iter().enumerate() {
        let x = 0.40 + col as f32 * 0.07;
        lm[mcp] = Point2::new(x, 0.55);
        lm[pip] = Point2::new(x, 0.45);
        if fingers[col] {
            lm[dip] = Point2::new(x, 0.38);
            lm[tip] = Point2::new(x, 0.30);
        } else {
            lm[dip] = Point2::new(x, 0.48);
            lm[tip] = Point2::new(x, 0.52);
        }
    }

    lm[THUMB_CMC] = Point2::new(0.44, 0.72);
    lm[THUMB_MCP] = Point2::new(0.40, 0.66);
    lm[THUMB_IP] = Point2::new(0.36, 0.60);
    lm[THUMB_TIP] = if thumb_extended {
        Point2::new(0.28, 0.58)
    } else {
        Point2::new(0.44, 0.62)
    };
    lm
}

/// Looping demo script: each entry is (gesture, seconds on screen). `None`
/// entries model the hand leaving the frame entirely.
static SIM_SCRIPT: Lazy<Vec<(Option<GestureClass>, f64)>> = Lazy::new(|| {
    vec![
        (None, 1.0),
        (Some(GestureClass::VolumeUp), 1.5),
        (None, 0.5),
        (Some(GestureClass::PlayPause), 1.0),
        (None, 0.5),
        (Some(GestureClass::Next), 1.0),
        (None, 0.5),
        (Some(GestureClass::VolumeDown), 1.5),
        (None, 0.5),
        (Some(GestureClass::Previous), 1.0),
        (None, 1.0),
    ]
});

fn simulated_hand(sim_time: f64) -> Vec<Detection> {
    let cycle: f64 = SIM_SCRIPT.iter().map(|(_, d)| d).sum();
    let mut t = sim_time % cycle;
    for (gesture, duration) in SIM_SCRIPT.iter() {
        if t < *duration {
            return match gesture {
                Some(g) => vec![Detection {
                    points: synthetic_pose(*g),
                }],
                None => Vec::new(),
            };
        }
        t -= duration;
    }
    Vec::new()
}
