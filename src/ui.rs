// src/ui.rs - Video panel with status banner and hand-skeleton overlay
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use image::DynamicImage;
use nalgebra::Point2;

use crate::landmarks::HAND_SKELETON;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub background: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(70, 130, 240),
            background: Color32::from_rgb(20, 20, 25),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

/// Video display: the latest frame as a texture, a one-line status banner
/// across the top, and the detected hand's skeleton drawn over the frame.
pub struct VideoWidget {
    texture: Option<egui::TextureHandle>,
    aspect_ratio: f32,
}

impl VideoWidget {
    pub fn new() -> Self {
        Self {
            texture: None,
            aspect_ratio: 4.0 / 3.0,
        }
    }

    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &DynamicImage) {
        let size = [frame.width() as _, frame.height() as _];
        self.aspect_ratio = frame.width() as f32 / frame.height() as f32;
        let rgba = frame.to_rgba8();
        let pixels = rgba.as_flat_samples();

        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());

        self.texture = Some(ctx.load_texture("video_frame", color_image, Default::default()));
    }

    pub fn show(
        &self,
        ui: &mut egui::Ui,
        theme: &Theme,
        status_line: &str,
        hand: Option<&[Point2<f32>]>,
    ) {
        let available_size = ui.available_size();
        let widget_width = available_size.x;
        let widget_height = (widget_width / self.aspect_ratio).min(available_size.y);

        let size = Vec2::new(widget_width, widget_height);
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter();

        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        } else {
            painter.rect_filled(rect, egui::Rounding::same(4.0), theme.surface);
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No Video Signal",
                egui::FontId::proportional(16.0),
                theme.text_secondary,
            );
        }

        if let Some(points) = hand {
            draw_hand_skeleton(painter, rect, points, theme);
        }

        // Status banner: black strip, green text, like the source overlay.
        let banner = Rect::from_min_size(rect.min, Vec2::new(rect.width(), 36.0));
        painter.rect_filled(banner, egui::Rounding::same(0.0), Color32::from_black_alpha(200));
        painter.text(
            Pos2::new(banner.left() + 12.0, banner.center().y),
            egui::Align2::LEFT_CENTER,
            status_line,
            egui::FontId::proportional(20.0),
            theme.success,
        );
    }
}

fn draw_hand_skeleton(
    painter: &egui::Painter,
    rect: Rect,
    points: &[Point2<f32>],
    theme: &Theme,
) {
    let to_screen = |p: &Point2<f32>| {
        Pos2::new(
            rect.left() + p.x * rect.width(),
            rect.top() + p.y * rect.height(),
        )
    };

    for (from, to) in HAND_SKELETON {
        if from < points.len() && to < points.len() {
            painter.line_segment(
                [to_screen(&points[from]), to_screen(&points[to])],
                Stroke::new(2.0, theme.primary),
            );
        }
    }

    for p in points {
        painter.circle_filled(to_screen(p), 3.0, theme.warning);
    }
}
