// src/main.rs
mod app;
mod data;
mod detector;
mod dispatch;
mod engine;
mod gesture;
mod landmark_bridge;
mod landmarks;
mod ui;
mod video;

use std::path::PathBuf;

use eframe::egui;

use crate::app::{GestureControllerApp, LaunchOptions};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let opts = parse_args();

    if opts.clip.is_none() {
        // List available cameras before opening one; camera problems are
        // the most common support question.
        println!("=== Camera Detection ===");
        match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
            Ok(cameras) => {
                println!("Found {} camera(s):", cameras.len());
                for (i, camera) in cameras.iter().enumerate() {
                    println!("  [{}] {}", i, camera.human_name());
                }
            }
            Err(e) => {
                println!("Failed to query cameras: {}", e);
            }
        }
        println!("========================\n");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 760.0])
            .with_min_inner_size([640.0, 560.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Gesture Media Controller",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(GestureControllerApp::new(cc, opts))
        }),
    );

    if let Err(e) = result {
        eprintln!("Error running application: {:?}", e);
    }
}

/// `gesture_controller [--simulate] [CAMERA_INDEX | CLIP_PATH]`
fn parse_args() -> LaunchOptions {
    let mut opts = LaunchOptions {
        camera_index: None,
        clip: None,
        simulate: false,
    };

    for arg in std::env::args().skip(1) {
        if arg == "--simulate" {
            opts.simulate = true;
        } else if let Ok(index) = arg.parse::<u32>() {
            opts.camera_index = Some(index);
        } else {
            opts.clip = Some(PathBuf::from(arg));
        }
    }
    opts
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);
    visuals.menu_rounding = egui::Rounding::same(8.0);

    visuals
}
