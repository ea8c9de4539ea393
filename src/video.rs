// src/video.rs - Frame acquisition: live camera or pre-recorded clip
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageBuffer};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

pub enum VideoSource {
    Camera(Arc<Mutex<Camera>>),
    File(VideoFileReader),
}

pub struct VideoFileReader {
    path: PathBuf,
    current_frame: usize,
    total_frames: usize,
    width: u32,
    height: u32,
    fps: f32,
    frames_cache: Vec<DynamicImage>,
    is_loaded: bool,
}

impl VideoFileReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow::anyhow!(
                "video file does not exist: {}",
                path.display()
            ));
        }

        if Command::new("ffprobe").arg("-version").output().is_err() {
            return Err(anyhow::anyhow!(
                "FFmpeg is not installed or not in PATH; it is required for clip playback"
            ));
        }

        // Probe stream geometry and frame count.
        let output = Command::new("ffprobe")
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-count_frames",
                "-show_entries", "stream=width,height,r_frame_rate,nb_read_frames",
                "-of", "csv=p=0",
                path.to_str().unwrap(),
            ])
            .output()
            .context("failed to run ffprobe")?;

        let info = String::from_utf8_lossy(&output.stdout);
        let parts: Vec<&str> = info.trim().split(',').collect();
        if parts.len() < 4 {
            return Err(anyhow::anyhow!("invalid video format or corrupted file"));
        }

        let width = parts[0].parse().context("invalid video width")?;
        let height = parts[1].parse().context("invalid video height")?;
        let fps_str = parts[2];
        let fps = if let Some((num, den)) = fps_str.split_once('/') {
            num.parse::<f32>().unwrap_or(30.0) / den.parse::<f32>().unwrap_or(1.0)
        } else {
            fps_str.parse().unwrap_or(30.0)
        };
        let total_frames: usize = parts[3].parse().context("invalid frame count")?;
        if total_frames == 0 {
            return Err(anyhow::anyhow!("video has no frames"));
        }

        Ok(Self {
            path,
            current_frame: 0,
            total_frames,
            width,
            height,
            fps,
            frames_cache: Vec::new(),
            is_loaded: false,
        })
    }

    fn load_all_frames(&mut self) -> Result<()> {
        if self.is_loaded {
            return Ok(());
        }

        tracing::info!("loading clip frames from {}", self.path.display());

        let temp_dir = std::env::temp_dir().join(format!("gesturectl_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).context("cannot create temporary directory")?;

        let status = Command::new("ffmpeg")
            .args([
                "-i", self.path.to_str().unwrap(),
                "-vf", "scale=640:480",
                &format!("{}/frame_%04d.png", temp_dir.display()),
            ])
            .status()
            .context("failed to extract frames with ffmpeg")?;

        if !status.success() {
            let _ = fs::remove_dir_all(&temp_dir);
            return Err(anyhow::anyhow!("ffmpeg frame extraction failed"));
        }

        self.frames_cache.clear();
        for i in 1..=self.total_frames {
            let frame_path = temp_dir.join(format!("frame_{:04}.png", i));
            if frame_path.exists() {
                match image::open(&frame_path) {
                    Ok(img) => self.frames_cache.push(img),
                    Err(e) => tracing::warn!("failed to load frame {i}: {e}"),
                }
            }
        }

        let _ = fs::remove_dir_all(&temp_dir);

        if self.frames_cache.is_empty() {
            return Err(anyhow::anyhow!("no frames could be loaded from the video"));
        }

        self.is_loaded = true;
        tracing::info!("loaded {} frames", self.frames_cache.len());
        Ok(())
    }

    /// Next frame, or `None` at end of stream. Clips do not wrap around.
    pub fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        self.load_all_frames()?;
        let frame = self.frames_cache.get(self.current_frame).cloned();
        if frame.is_some() {
            self.current_frame += 1;
        }
        Ok(frame)
    }
}

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub fps: f64,
    pub width: i32,
    pub height: i32,
}

impl VideoSource {
    pub fn new_camera(index: u32) -> Result<Self> {
        let camera_index = CameraIndex::Index(index);
        let format = CameraFormat::new(Resolution::new(640, 480), FrameFormat::MJPEG, 30);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Exact(format));

        let camera = Camera::new(camera_index, requested)
            .map_err(|e| anyhow::anyhow!("failed to open camera: {e}"))?;

        Ok(VideoSource::Camera(Arc::new(Mutex::new(camera))))
    }

    pub fn new_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(VideoSource::File(VideoFileReader::new(path)?))
    }

    /// One frame. Camera frames are mirrored horizontally so visual
    /// left/right matches the user's perspective; clip frames are replayed
    /// as-is. `Ok(None)` signals end of stream (clips only).
    pub fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        match self {
            VideoSource::Camera(camera) => {
                let mut cam = camera.lock().unwrap();

                if !cam.is_stream_open() {
                    cam.open_stream()
                        .map_err(|e| anyhow::anyhow!("failed to open camera stream: {e}"))?;
                }

                let frame = cam
                    .frame()
                    .map_err(|e| anyhow::anyhow!("failed to capture frame: {e}"))?;

                let decoded = frame
                    .decode_image::<RgbFormat>()
                    .map_err(|e| anyhow::anyhow!("failed to decode frame: {e}"))?;

                let width = decoded.width();
                let height = decoded.height();
                let rgb_data = decoded.into_vec();

                let mut rgba_data = Vec::with_capacity((width * height * 4) as usize);
                for chunk in rgb_data.chunks(3) {
                    rgba_data.push(chunk[0]);
                    rgba_data.push(chunk[1]);
                    rgba_data.push(chunk[2]);
                    rgba_data.push(255);
                }

                let img = ImageBuffer::from_raw(width, height, rgba_data)
                    .ok_or_else(|| anyhow::anyhow!("failed to create image buffer"))?;

                let flipped = image::imageops::flip_horizontal(&img);
                Ok(Some(DynamicImage::ImageRgba8(flipped)))
            }
            VideoSource::File(reader) => reader.next_frame(),
        }
    }

    pub fn info(&self) -> Option<VideoInfo> {
        match self {
            VideoSource::Camera(camera) => {
                let cam = camera.lock().unwrap();
                let resolution = cam.resolution();
                Some(VideoInfo {
                    fps: cam.frame_rate() as f64,
                    width: resolution.width() as i32,
                    height: resolution.height() as i32,
                })
            }
            VideoSource::File(reader) => Some(VideoInfo {
                fps: reader.fps as f64,
                width: reader.width as i32,
                height: reader.height as i32,
            }),
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        if let VideoSource::Camera(camera) = self {
            if let Ok(mut cam) = camera.lock() {
                let _ = cam.stop_stream();
            }
        }
    }
}
