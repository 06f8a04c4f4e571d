use eframe::egui;

use crate::playback::{GridLayout, Intent, PlaybackSession, SessionPool, TransportState, VideoFrame};

const CELL_GAP: f32 = 2.0;

/// Textures for the video cells, one per slot, reused frame to frame
#[derive(Default)]
pub struct VideoGrid {
    textures: Vec<Option<egui::TextureHandle>>,
}

impl VideoGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload the newest decoded frames. Textures of removed slots are freed.
    pub fn update_textures(&mut self, ctx: &egui::Context, frames: Vec<(usize, VideoFrame)>, slot_count: usize) {
        self.textures.resize_with(slot_count, || None);

        for (slot, frame) in frames {
            let expected = frame.width as usize * frame.height as usize * 4;
            if slot >= slot_count || frame.image_data.len() != expected {
                continue;
            }
            let image =
                egui::ColorImage::from_rgba_unmultiplied([frame.width as usize, frame.height as usize], &frame.image_data);

            match &mut self.textures[slot] {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                entry => *entry = Some(ctx.load_texture(format!("slot_{}", slot), image, egui::TextureOptions::LINEAR)),
            }
        }
    }

    pub fn show(
        &self,
        ui: &mut egui::Ui,
        pool: &SessionPool,
        show_controls: bool,
        seek_step: f64,
        intents: &mut Vec<Intent>,
    ) {
        let layout = GridLayout::for_count(pool.len());
        let area = ui.available_rect_before_wrap();
        ui.allocate_rect(area, egui::Sense::hover());

        let cell_size = egui::vec2(
            (area.width() - CELL_GAP * (layout.cols - 1) as f32) / layout.cols as f32,
            (area.height() - CELL_GAP * (layout.rows - 1) as f32) / layout.rows as f32,
        );

        for session in pool.iter() {
            let Some((row, col)) = layout.cell(session.slot()) else {
                continue;
            };
            let min = area.min + egui::vec2(col as f32 * (cell_size.x + CELL_GAP), row as f32 * (cell_size.y + CELL_GAP));
            let rect = egui::Rect::from_min_size(min, cell_size);
            self.show_cell(ui, rect, session, show_controls, seek_step, intents);
        }
    }

    fn show_cell(
        &self,
        ui: &mut egui::Ui,
        rect: egui::Rect,
        session: &PlaybackSession,
        show_controls: bool,
        seek_step: f64,
        intents: &mut Vec<Intent>,
    ) {
        let slot = session.slot();
        let response = ui.interact(rect, ui.id().with(("video_cell", slot)), egui::Sense::click());
        if response.double_clicked() {
            intents.push(Intent::ToggleFullscreen);
        } else if response.clicked() {
            intents.push(Intent::OverlayInteraction);
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, egui::Color32::BLACK);

        match self.textures.get(slot).and_then(Option::as_ref) {
            Some(texture) if session.media().is_some() => {
                let fitted = fit_rect(texture.size_vec2(), rect);
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(texture.id(), fitted, uv, egui::Color32::WHITE);
            }
            _ => {
                let text = if session.media().is_some() { "Loading…" } else { "No video" };
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    text,
                    egui::FontId::proportional(14.0),
                    egui::Color32::GRAY,
                );
            }
        }

        if let Some(error) = session.error() {
            painter.text(
                rect.center_top() + egui::vec2(0.0, 8.0),
                egui::Align2::CENTER_TOP,
                error,
                egui::FontId::proportional(12.0),
                egui::Color32::LIGHT_RED,
            );
        }

        if show_controls && session.media().is_some() {
            let bar = egui::Rect::from_min_max(egui::pos2(rect.min.x, rect.max.y - 52.0), rect.max);
            painter.rect_filled(bar, 0.0, egui::Color32::from_black_alpha(160));
            ui.allocate_ui_at_rect(bar.shrink(4.0), |ui| slot_controls(ui, session, seek_step, intents));
        }
    }
}

fn slot_controls(ui: &mut egui::Ui, session: &PlaybackSession, seek_step: f64, intents: &mut Vec<Intent>) {
    let slot = session.slot();

    ui.horizontal(|ui| {
        let muted = session.is_muted();
        if ui
            .selectable_label(muted, if muted { "🔇" } else { "🔊" })
            .on_hover_text("Mute this video")
            .clicked()
        {
            intents.push(Intent::SetSessionMute { slot, muted: !muted });
        }
        if ui.small_button("⏹").on_hover_text("Stop this video").clicked() {
            intents.push(Intent::StopSlot(slot));
        }
        if ui.small_button(format!("-{:.0}s", seek_step)).clicked() {
            intents.push(Intent::SeekRelative {
                slot,
                delta_secs: -seek_step,
            });
        }
        if ui.small_button(format!("+{:.0}s", seek_step)).clicked() {
            intents.push(Intent::SeekRelative {
                slot,
                delta_secs: seek_step,
            });
        }
        if session.state() == TransportState::Stopped {
            ui.weak(session.state().display_text());
        }
        if let Some(media) = session.media() {
            ui.label(egui::RichText::new(media.file_name()).small().color(egui::Color32::WHITE));
        }
    });

    let mut fraction = session.progress().unwrap_or(0.0);
    ui.spacing_mut().slider_width = ui.available_width();
    let response = ui.add_enabled(
        session.duration().is_some(),
        egui::Slider::new(&mut fraction, 0.0..=1.0).show_value(false),
    );
    if response.drag_stopped() || (response.changed() && !response.dragged()) {
        intents.push(Intent::SeekSlot { slot, fraction });
    }
}

/// Largest rect with the texture's aspect ratio centred inside `cell`
pub fn fit_rect(texture: egui::Vec2, cell: egui::Rect) -> egui::Rect {
    if texture.x <= 0.0 || texture.y <= 0.0 {
        return cell;
    }
    let scale = (cell.width() / texture.x).min(cell.height() / texture.y);
    egui::Rect::from_center_size(cell.center(), texture * scale)
}
