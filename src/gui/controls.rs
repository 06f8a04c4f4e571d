use eframe::egui;
use std::time::Duration;

use crate::playback::{AggregateState, Intent, TimelineSummary, MAX_SLOTS};

/// Snapshot of everything the transport bar displays
#[derive(Debug, Clone, Copy)]
pub struct TransportView {
    pub state: AggregateState,
    pub timeline: TimelineSummary,
    pub volume: u8,
    pub muted: bool,
    pub video_count: usize,
    pub fullscreen: bool,
}

/// `MM:SS`, or `HH:MM:SS` from one hour on
pub fn format_time(time: Duration) -> String {
    let total = time.as_secs();
    let (hours, mins, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

pub fn transport_bar(ui: &mut egui::Ui, view: &TransportView, intents: &mut Vec<Intent>) {
    let loaded = view.state != AggregateState::Idle;

    ui.horizontal(|ui| {
        let play_label = if view.state == AggregateState::Playing {
            "⏸ Pause"
        } else {
            "▶ Play"
        };
        if ui.add_enabled(loaded, egui::Button::new(play_label)).clicked() {
            intents.push(Intent::PlayPause);
        }
        if ui.add_enabled(loaded, egui::Button::new("⏭ Next")).clicked() {
            intents.push(Intent::Next);
        }
        if ui.add_enabled(loaded, egui::Button::new("⏹ Stop")).clicked() {
            intents.push(Intent::Stop);
        }

        ui.separator();
        timeline(ui, &view.timeline, intents);
        ui.separator();

        let mute_label = if view.muted { "🔇" } else { "🔊" };
        if ui.button(mute_label).on_hover_text("Mute all (M)").clicked() {
            intents.push(Intent::ToggleGlobalMute);
        }
        let mut volume = view.volume;
        if ui
            .add(egui::Slider::new(&mut volume, 0..=100).suffix("%"))
            .changed()
        {
            intents.push(Intent::SetVolume(volume as i32));
        }

        ui.separator();
        ui.label("Videos:");
        let mut count = view.video_count;
        if ui
            .add(egui::DragValue::new(&mut count).clamp_range(1..=MAX_SLOTS))
            .changed()
        {
            intents.push(Intent::SetVideoCount(count));
        }

        let fullscreen_label = if view.fullscreen { "🗗 Window" } else { "⛶ Fullscreen" };
        if ui.button(fullscreen_label).on_hover_text("F / double-click").clicked() {
            intents.push(Intent::ToggleFullscreen);
        }
    });
}

/// Shared slider over every bound session plus the time readout
fn timeline(ui: &mut egui::Ui, timeline: &TimelineSummary, intents: &mut Vec<Intent>) {
    let mut fraction = timeline.progress.unwrap_or(0.0);
    let seekable = timeline.duration.is_some();

    ui.spacing_mut().slider_width = 240.0;
    let response = ui.add_enabled(seekable, egui::Slider::new(&mut fraction, 0.0..=1.0).show_value(false));
    if response.drag_stopped() || (response.changed() && !response.dragged()) {
        intents.push(Intent::SeekAll(fraction));
    }

    let duration = timeline.duration.map(format_time).unwrap_or_else(|| "--:--".to_string());
    ui.monospace(format!("{} / {}", format_time(timeline.position), duration));
}
