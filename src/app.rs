// src/app.rs
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::SessionLog;
use crate::detector::{DetectorConfig, HandDetector};
use crate::dispatch::{AlsaVolume, Dispatcher, MediaKeys};
use crate::engine::{EngineConfig, GestureEngine, Status};
use crate::gesture::{self, GestureClass};
use crate::landmarks::{self, HandShape};
use crate::ui::{Theme, VideoWidget};
use crate::video::VideoSource;

/// Command-line choices resolved in `main`.
pub struct LaunchOptions {
    pub camera_index: Option<u32>,
    pub clip: Option<PathBuf>,
    pub simulate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub camera_index: u32,
    pub hold_time_ms: u64,
    pub volume_delay_ms: u64,
    pub detection_confidence: f32,
    pub tracking_confidence: f32,
    pub auto_save: bool,
    pub output_directory: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            hold_time_ms: 400,
            volume_delay_ms: 300,
            detection_confidence: 0.7,
            tracking_confidence: 0.7,
            auto_save: true,
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("GestureController")))
                .unwrap_or_else(|| PathBuf::from("./output")),
        }
    }
}

impl AppSettings {
    fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "gesture_controller")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("ignoring unreadable settings file {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!("failed to save settings: {e}");
                }
            }
            Err(e) => warn!("failed to serialize settings: {e}"),
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            vol_delay: Duration::from_millis(self.volume_delay_ms),
            hold_time: Duration::from_millis(self.hold_time_ms),
        }
    }
}

pub struct GestureControllerApp {
    video_source: VideoSource,
    detector: HandDetector,
    engine: GestureEngine,
    dispatcher: Option<Dispatcher<AlsaVolume, MediaKeys>>,
    session: SessionLog,
    settings: AppSettings,

    theme: Theme,
    video: VideoWidget,
    status: Status,
    last_hand: Option<Vec<Point2<f32>>>,

    started: Instant,
    frame_counter: u64,
    stream_ended: bool,
    show_settings: bool,
    log_exported: bool,
}

impl GestureControllerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, opts: LaunchOptions) -> Self {
        let settings = AppSettings::load();

        let video_source = match &opts.clip {
            Some(path) => VideoSource::new_file(path).expect("Failed to open video clip"),
            None => {
                let index = opts.camera_index.unwrap_or(settings.camera_index);
                VideoSource::new_camera(index).expect("Failed to open camera")
            }
        };
        if let Some(info) = video_source.info() {
            info!(
                "video source: {}x{} @ {:.1} fps",
                info.width, info.height, info.fps
            );
        }

        let detector = HandDetector::new(
            DetectorConfig {
                max_hands: 1,
                min_detection_confidence: settings.detection_confidence,
                min_tracking_confidence: settings.tracking_confidence,
            },
            opts.simulate,
        );

        let dispatcher = match Self::build_dispatcher() {
            Ok(d) => {
                let (min, max) = d.volume_range();
                info!("audio endpoint ready, volume range {min}..{max}");
                Some(d)
            }
            Err(e) => {
                warn!("system control unavailable, running overlay-only: {e}");
                None
            }
        };

        let session = SessionLog::new(&settings.output_directory);
        let engine = GestureEngine::new(settings.engine_config());

        Self {
            video_source,
            detector,
            engine,
            dispatcher,
            session,
            settings,
            theme: Theme::default(),
            video: VideoWidget::new(),
            status: Status::NoHand,
            last_hand: None,
            started: Instant::now(),
            frame_counter: 0,
            stream_ended: false,
            show_settings: false,
            log_exported: false,
        }
    }

    fn build_dispatcher() -> anyhow::Result<Dispatcher<AlsaVolume, MediaKeys>> {
        let audio = AlsaVolume::new()?;
        let keys = MediaKeys::new()?;
        Dispatcher::new(audio, keys)
    }

    /// One pipeline pass: frame, detection, classification, resolution,
    /// debouncing, dispatch, log.
    fn step(&mut self, ctx: &egui::Context) {
        if self.stream_ended {
            return;
        }

        let frame = match self.video_source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("end of stream");
                self.finish_session();
                self.stream_ended = true;
                return;
            }
            Err(e) => {
                warn!("frame acquisition failed, stopping: {e}");
                self.finish_session();
                self.stream_ended = true;
                return;
            }
        };

        self.frame_counter += 1;
        let now = self.started.elapsed();

        // Detector is configured for a single tracked hand; process at
        // most the first detection.
        let mut shape: Option<HandShape> = None;
        let mut hand_points = None;
        if let Some(detection) = self.detector.detect(&frame).into_iter().next() {
            match landmarks::classify(&detection.points) {
                Ok(s) => {
                    shape = Some(s);
                    hand_points = Some(detection.points);
                }
                Err(e) => warn!("skipping malformed detection: {e}"),
            }
        }

        let gesture = shape
            .as_ref()
            .map(gesture::resolve)
            .unwrap_or(GestureClass::None);
        let decision = self.engine.process(gesture, now);

        if let Some(action) = decision.action {
            info!(?action, "dispatching");
            if let Some(dispatcher) = self.dispatcher.as_mut() {
                if let Err(e) = dispatcher.dispatch(action) {
                    warn!("action dispatch failed: {e}");
                }
            }
        }

        self.status = if shape.is_some() {
            decision.status
        } else {
            Status::NoHand
        };
        self.session.add_frame(
            self.frame_counter,
            now.as_secs_f64(),
            shape.as_ref(),
            gesture,
            self.status,
            decision.action,
        );

        self.video.update_frame(ctx, &frame);
        self.last_hand = hand_points;
    }

    fn finish_session(&mut self) {
        if self.settings.auto_save && !self.log_exported && !self.session.is_empty() {
            self.export_log();
        }
        self.settings.save();
    }

    fn export_log(&mut self) {
        match self.session.export_csv() {
            Ok(path) => {
                info!("session log written to {}", path.display());
                self.log_exported = true;
            }
            Err(e) => warn!("failed to export session log: {e}"),
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            egui::menu::bar(ui, |ui| {
                ui.heading("Gesture Media Controller");

                ui.separator();
                if self.detector.is_simulated() {
                    ui.colored_label(self.theme.warning, "SIMULATION");
                }
                if self.dispatcher.is_none() {
                    ui.colored_label(self.theme.error, "overlay only");
                }
                if self.stream_ended {
                    ui.colored_label(self.theme.text_secondary, "stream ended");
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙ Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    if ui.button("Export Log").clicked() {
                        self.export_log();
                    }
                });
            });
            ui.add_space(6.0);
        });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        let mut timing_changed = false;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .default_size([380.0, 320.0])
            .show(ctx, |ui| {
                ui.heading("Gesture Timing");
                ui.add_space(6.0);

                ui.label("Hold time before a discrete gesture fires (ms):");
                timing_changed |= ui
                    .add(egui::Slider::new(&mut self.settings.hold_time_ms, 100..=1500))
                    .changed();

                ui.label("Delay between volume steps (ms):");
                timing_changed |= ui
                    .add(egui::Slider::new(&mut self.settings.volume_delay_ms, 100..=1000))
                    .changed();

                ui.separator();
                ui.heading("Detection");
                ui.label("Confidence thresholds apply on next launch.");
                ui.add(
                    egui::Slider::new(&mut self.settings.detection_confidence, 0.0..=1.0)
                        .step_by(0.05)
                        .text("detection"),
                );
                ui.add(
                    egui::Slider::new(&mut self.settings.tracking_confidence, 0.0..=1.0)
                        .step_by(0.05)
                        .text("tracking"),
                );

                ui.separator();
                ui.heading("Output");
                ui.checkbox(&mut self.settings.auto_save, "Save session log on exit");
                ui.label("Output directory:");
                ui.label(self.settings.output_directory.display().to_string());
            });
        self.show_settings = open;

        if timing_changed {
            // Rebuilding the engine drops any in-flight hold, which is the
            // safe reading while timings are being edited.
            self.engine = GestureEngine::new(self.settings.engine_config());
        }
    }
}

impl eframe::App for GestureControllerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.finish_session();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.step(ctx);

        self.render_header(ctx);
        if self.show_settings {
            self.render_settings_window(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let status_line = self.status.to_string();
            self.video
                .show(ui, &self.theme, &status_line, self.last_hand.as_deref());
        });

        // Keep pulling frames even when no UI interaction happens.
        ctx.request_repaint();
    }
}
