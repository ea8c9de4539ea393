// src/data.rs - Per-frame session log with CSV export
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use csv::Writer;
use serde::Serialize;

use crate::engine::{Action, Status, VolumeDirection};
use crate::gesture::GestureClass;
use crate::landmarks::HandShape;

#[derive(Debug, Serialize)]
struct FrameRecord {
    frame: u64,
    timestamp_secs: f64,
    hand_detected: bool,
    index_extended: Option<bool>,
    middle_extended: Option<bool>,
    ring_extended: Option<bool>,
    pinky_extended: Option<bool>,
    thumb_extended: Option<bool>,
    gesture: String,
    status: String,
    action: Option<String>,
}

pub struct SessionLog {
    output_dir: PathBuf,
    session_name: String,
    records: Vec<FrameRecord>,
}

impl SessionLog {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        let session_name = format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"));
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            records: Vec::new(),
        }
    }

    pub fn add_frame(
        &mut self,
        frame: u64,
        timestamp_secs: f64,
        shape: Option<&HandShape>,
        gesture: GestureClass,
        status: Status,
        action: Option<Action>,
    ) {
        self.records.push(FrameRecord {
            frame,
            timestamp_secs,
            hand_detected: shape.is_some(),
            index_extended: shape.map(|s| s.fingers.index),
            middle_extended: shape.map(|s| s.fingers.middle),
            ring_extended: shape.map(|s| s.fingers.ring),
            pinky_extended: shape.map(|s| s.fingers.pinky),
            thumb_extended: shape.map(|s| s.thumb_extended),
            gesture: format!("{gesture:?}"),
            status: status.to_string(),
            action: action.map(|a| match a {
                Action::VolumeStep(VolumeDirection::Up) => "volume_up".to_string(),
                Action::VolumeStep(VolumeDirection::Down) => "volume_down".to_string(),
                Action::MediaTrigger(g) => format!("press_{g:?}").to_lowercase(),
            }),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self
            .output_dir
            .join(&self.session_name)
            .join("gesture_log.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(csv_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::FingerExtension;

    #[test]
    fn test_export_writes_one_row_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::new(dir.path());

        let shape = HandShape {
            fingers: FingerExtension {
                index: true,
                middle: true,
                ring: false,
                pinky: false,
            },
            thumb_extended: false,
        };
        log.add_frame(0, 0.0, None, GestureClass::None, Status::NoHand, None);
        log.add_frame(
            1,
            0.033,
            Some(&shape),
            GestureClass::Previous,
            Status::Hold(GestureClass::Previous),
            None,
        );
        log.add_frame(
            2,
            0.466,
            Some(&shape),
            GestureClass::Previous,
            Status::Action(GestureClass::Previous),
            Some(Action::MediaTrigger(GestureClass::Previous)),
        );
        assert_eq!(log.len(), 3);

        let path = log.export_csv().unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 rows
        assert!(lines[3].contains("press_previous"));
        assert!(lines[3].contains("Action: PREVIOUS"));
    }
}
