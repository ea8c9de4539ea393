// src/dispatch.rs - Forwarding emitted actions to the audio endpoint and media keys
use std::thread;
use std::time::Duration;

use alsa::mixer::{Mixer, SelemChannelId, SelemId};
use anyhow::{anyhow, Context, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};

use crate::engine::{Action, VolumeDirection};
use crate::gesture::GestureClass;

/// Volume step as a fraction of the device range.
pub const VOL_STEP_FRACTION: f64 = 0.02;

/// The three logical media keys this system can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    NextTrack,
    PreviousTrack,
}

impl MediaKey {
    pub fn for_gesture(gesture: GestureClass) -> Option<MediaKey> {
        match gesture {
            GestureClass::PlayPause => Some(MediaKey::PlayPause),
            GestureClass::Next => Some(MediaKey::NextTrack),
            GestureClass::Previous => Some(MediaKey::PreviousTrack),
            _ => None,
        }
    }

    fn key_code(&self) -> Key {
        match self {
            MediaKey::PlayPause => Key::KEY_PLAYPAUSE,
            MediaKey::NextTrack => Key::KEY_NEXTSONG,
            MediaKey::PreviousTrack => Key::KEY_PREVIOUSSONG,
        }
    }
}

/// System audio endpoint. Levels are in whatever units the platform mixer
/// exposes; the range is queried once and cached by the dispatcher.
pub trait AudioEndpoint {
    fn volume_range(&self) -> Result<(i64, i64)>;
    fn current_level(&self) -> Result<i64>;
    fn set_level(&mut self, level: i64) -> Result<()>;
}

/// Key-event injection for the logical media keys.
pub trait KeyInjector {
    fn press(&mut self, key: MediaKey) -> Result<()>;
}

/// ALSA "Master" mixer element. Raw playback volume units, not percent.
pub struct AlsaVolume {
    mixer: Mixer,
    selem_id: SelemId,
}

impl AlsaVolume {
    pub fn new() -> Result<Self> {
        let mixer = Mixer::new("default", false).context("failed to open ALSA mixer")?;
        let selem_id = SelemId::new("Master", 0);
        if mixer.find_selem(&selem_id).is_none() {
            return Err(anyhow!("no Master element on the default ALSA mixer"));
        }
        Ok(Self { mixer, selem_id })
    }
}

impl AudioEndpoint for AlsaVolume {
    fn volume_range(&self) -> Result<(i64, i64)> {
        let selem = self
            .mixer
            .find_selem(&self.selem_id)
            .ok_or_else(|| anyhow!("Master element disappeared"))?;
        Ok(selem.get_playback_volume_range())
    }

    fn current_level(&self) -> Result<i64> {
        let selem = self
            .mixer
            .find_selem(&self.selem_id)
            .ok_or_else(|| anyhow!("Master element disappeared"))?;
        Ok(selem.get_playback_volume(SelemChannelId::FrontLeft)?)
    }

    fn set_level(&mut self, level: i64) -> Result<()> {
        let selem = self
            .mixer
            .find_selem(&self.selem_id)
            .ok_or_else(|| anyhow!("Master element disappeared"))?;
        selem.set_playback_volume_all(level)?;
        Ok(())
    }
}

/// uinput virtual keyboard carrying only the media keys.
pub struct MediaKeys {
    device: VirtualDevice,
}

impl MediaKeys {
    pub fn new() -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::KEY_PLAYPAUSE);
        keys.insert(Key::KEY_NEXTSONG);
        keys.insert(Key::KEY_PREVIOUSSONG);

        let device = VirtualDeviceBuilder::new()
            .context("failed to open /dev/uinput")?
            .name("gesture-media-keys")
            .with_keys(&keys)
            .context("failed to register media keys")?
            .build()
            .context("failed to create uinput device")?;

        Ok(Self { device })
    }
}

impl KeyInjector for MediaKeys {
    fn press(&mut self, key: MediaKey) -> Result<()> {
        let code = key.key_code().code();
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, 1)])?;
        thread::sleep(Duration::from_millis(10));
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, 0)])?;
        Ok(())
    }
}

/// Thin forwarding layer: volume steps go to the audio endpoint (clamped to
/// the device range), discrete triggers go to the key injector. No retry,
/// no buffering.
pub struct Dispatcher<A: AudioEndpoint, K: KeyInjector> {
    audio: A,
    keys: K,
    range: (i64, i64),
    step: i64,
}

impl<A: AudioEndpoint, K: KeyInjector> Dispatcher<A, K> {
    pub fn new(audio: A, keys: K) -> Result<Self> {
        let range = audio.volume_range()?;
        let (min, max) = range;
        if max <= min {
            return Err(anyhow!("degenerate volume range {min}..{max}"));
        }
        // 2% of the device range, but never a zero step.
        let step = (((max - min) as f64) * VOL_STEP_FRACTION).round() as i64;
        let step = step.max(1);
        Ok(Self {
            audio,
            keys,
            range,
            step,
        })
    }

    pub fn volume_range(&self) -> (i64, i64) {
        self.range
    }

    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::VolumeStep(direction) => {
                let (min, max) = self.range;
                let current = self.audio.current_level()?;
                let target = match direction {
                    VolumeDirection::Up => (current + self.step).min(max),
                    VolumeDirection::Down => (current - self.step).max(min),
                };
                self.audio.set_level(target)
            }
            Action::MediaTrigger(gesture) => {
                let key = MediaKey::for_gesture(gesture)
                    .ok_or_else(|| anyhow!("non-discrete gesture {gesture:?} dispatched"))?;
                self.keys.press(key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeAudio {
        range: (i64, i64),
        level: Rc<RefCell<i64>>,
    }

    impl AudioEndpoint for FakeAudio {
        fn volume_range(&self) -> Result<(i64, i64)> {
            Ok(self.range)
        }
        fn current_level(&self) -> Result<i64> {
            Ok(*self.level.borrow())
        }
        fn set_level(&mut self, level: i64) -> Result<()> {
            *self.level.borrow_mut() = level;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeKeys {
        pressed: Vec<MediaKey>,
    }

    impl KeyInjector for FakeKeys {
        fn press(&mut self, key: MediaKey) -> Result<()> {
            self.pressed.push(key);
            Ok(())
        }
    }

    fn dispatcher(
        range: (i64, i64),
        start: i64,
    ) -> (Dispatcher<FakeAudio, FakeKeys>, Rc<RefCell<i64>>) {
        let level = Rc::new(RefCell::new(start));
        let audio = FakeAudio {
            range,
            level: Rc::clone(&level),
        };
        let d = Dispatcher::new(audio, FakeKeys::default()).unwrap();
        (d, level)
    }

    #[test]
    fn test_step_is_two_percent_of_range() {
        let (d, _) = dispatcher((-6000, 0), -3000);
        assert_eq!(d.step, 120);
    }

    #[test]
    fn test_narrow_range_still_steps() {
        let (d, _) = dispatcher((0, 10), 5);
        assert_eq!(d.step, 1);
    }

    #[test]
    fn test_volume_up_clamps_at_max() {
        let (mut d, level) = dispatcher((-6000, 0), -100);
        for _ in 0..5 {
            d.dispatch(Action::VolumeStep(VolumeDirection::Up)).unwrap();
        }
        assert_eq!(*level.borrow(), 0);
    }

    #[test]
    fn test_volume_down_clamps_at_min() {
        let (mut d, level) = dispatcher((-6000, 0), -5900);
        for _ in 0..5 {
            d.dispatch(Action::VolumeStep(VolumeDirection::Down)).unwrap();
        }
        assert_eq!(*level.borrow(), -6000);
    }

    #[test]
    fn test_media_triggers_press_the_mapped_key() {
        let (mut d, _) = dispatcher((0, 100), 50);
        d.dispatch(Action::MediaTrigger(GestureClass::PlayPause)).unwrap();
        d.dispatch(Action::MediaTrigger(GestureClass::Next)).unwrap();
        d.dispatch(Action::MediaTrigger(GestureClass::Previous)).unwrap();
        assert_eq!(
            d.keys.pressed,
            vec![
                MediaKey::PlayPause,
                MediaKey::NextTrack,
                MediaKey::PreviousTrack
            ]
        );
    }

    #[test]
    fn test_non_discrete_trigger_is_an_error() {
        let (mut d, _) = dispatcher((0, 100), 50);
        assert!(d.dispatch(Action::MediaTrigger(GestureClass::VolumeUp)).is_err());
    }

    #[test]
    fn test_degenerate_range_is_rejected() {
        let level = Rc::new(RefCell::new(0));
        let audio = FakeAudio {
            range: (0, 0),
            level,
        };
        assert!(Dispatcher::new(audio, FakeKeys::default()).is_err());
    }
}
