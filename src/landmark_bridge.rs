// src/landmark_bridge.rs - Wrapper around the native hand-landmark runtime
use anyhow::Result;
use image::DynamicImage;
use nalgebra::Point2;

/// One detected hand: 21 normalized landmark points plus the runtime's
/// detection confidence.
#[derive(Debug, Clone)]
pub struct BridgeDetection {
    pub points: Vec<Point2<f32>>,
    pub confidence: f32,
}

/// Configuration handed to the runtime once at startup.
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    pub max_hands: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

/// Integration point for the native hand-landmark model.
///
/// The runtime ships as a platform-specific library outside this crate;
/// this wrapper is the only place that talks to it. Until the runtime is
/// linked in, `process_image` reports no detections and the detector runs
/// in simulation mode instead.
pub struct LandmarkBridge {
    #[allow(dead_code)]
    config: BridgeConfig,
}

impl LandmarkBridge {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn process_image(&mut self, _frame: &DynamicImage) -> Result<Vec<BridgeDetection>> {
        Ok(Vec::new())
    }
}
