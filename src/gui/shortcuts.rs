use eframe::egui;

use crate::playback::Intent;

/// Step sizes for the keys that adjust rather than toggle
#[derive(Debug, Clone, Copy)]
pub struct ShortcutSteps {
    pub volume: u8,
    pub seek_secs: f64,
}

/// Space play/pause, N next, S stop, F fullscreen, M mute, Up/Down volume,
/// Left/Right seek every slot, Esc leaves fullscreen. Only the step keys
/// act on auto-repeat.
pub fn intent_for_key(key: egui::Key, repeat: bool, steps: ShortcutSteps) -> Option<Intent> {
    let volume = steps.volume as i32;
    let intent = match key {
        egui::Key::ArrowUp => return Some(Intent::AdjustVolume(volume)),
        egui::Key::ArrowDown => return Some(Intent::AdjustVolume(-volume)),
        egui::Key::ArrowLeft => return Some(Intent::SeekAllRelative(-steps.seek_secs)),
        egui::Key::ArrowRight => return Some(Intent::SeekAllRelative(steps.seek_secs)),
        egui::Key::Space => Intent::PlayPause,
        egui::Key::N => Intent::Next,
        egui::Key::S => Intent::Stop,
        egui::Key::F => Intent::ToggleFullscreen,
        egui::Key::M => Intent::ToggleGlobalMute,
        egui::Key::Escape => Intent::ExitFullscreen,
        _ => return None,
    };
    (!repeat).then_some(intent)
}

/// Intents for this frame's key presses, in the order they happened
pub fn collect_intents(ctx: &egui::Context, steps: ShortcutSteps) -> Vec<Intent> {
    if ctx.wants_keyboard_input() {
        return Vec::new();
    }

    ctx.input(|input| {
        input
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    repeat,
                    modifiers,
                    ..
                } if modifiers.is_none() => intent_for_key(*key, *repeat, steps),
                _ => None,
            })
            .collect()
    })
}
