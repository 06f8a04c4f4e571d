use eframe::egui;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::{AppConfig, FsWalker, Sampler};
use crate::gui::controls::{self, TransportView};
use crate::gui::grid::VideoGrid;
use crate::gui::shortcuts::{self, ShortcutSteps};
use crate::playback::{AggregateState, CoordinatorSettings, Intent, Notice, TransportCoordinator};
use crate::video::{FfmpegBackendFactory, FrameSize, MediaRuntime};

/// What applying a batch of intents changed outside the coordinator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AppliedIntents {
    pub fullscreen_changed: bool,
    pub config_dirty: bool,
}

pub struct ShuffleScreenApp {
    pub config: AppConfig,
    pub coordinator: TransportCoordinator,
    pub pending_intents: Vec<Intent>,
    pub status_message: String,
    pub show_playlist: bool,
    pub selected_entry: Option<usize>,
    grid: VideoGrid,
    runtime: Option<MediaRuntime>,
}

impl ShuffleScreenApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, runtime: MediaRuntime) -> anyhow::Result<Self> {
        let mut visuals = egui::Visuals::dark();
        visuals.override_text_color = Some(egui::Color32::WHITE);
        cc.egui_ctx.set_visuals(visuals);

        let factory = FfmpegBackendFactory::new(
            runtime.clone(),
            FrameSize {
                width: config.preview_width,
                height: config.preview_height,
            },
        );
        let coordinator = TransportCoordinator::new(
            Box::new(factory),
            Arc::new(FsWalker),
            Sampler::new(),
            CoordinatorSettings::from(&config),
        )?;

        let mut app = Self::with_coordinator(config, coordinator);
        app.runtime = Some(runtime);

        if let Some(last) = app.config.last_folder.clone() {
            if last.is_dir() {
                log::info!("Restoring last folder: {}", last.display());
                app.pending_intents.push(Intent::SelectFolder(last));
            } else {
                log::warn!("Last folder no longer exists: {}", last.display());
            }
        }

        Ok(app)
    }

    /// App around an already built coordinator, without touching egui
    pub fn with_coordinator(config: AppConfig, coordinator: TransportCoordinator) -> Self {
        Self {
            config,
            coordinator,
            pending_intents: Vec::new(),
            status_message: String::new(),
            show_playlist: true,
            selected_entry: None,
            grid: VideoGrid::new(),
            runtime: None,
        }
    }

    fn steps(&self) -> ShortcutSteps {
        ShortcutSteps {
            volume: self.config.volume_step,
            seek_secs: self.config.seek_step_secs,
        }
    }

    /// Dispatch every queued intent in arrival order
    pub fn apply_pending(&mut self, now: Instant) -> AppliedIntents {
        let mut applied = AppliedIntents::default();

        for intent in std::mem::take(&mut self.pending_intents) {
            if matches!(
                intent,
                Intent::SetVideoCount(_) | Intent::SetVolume(_) | Intent::AdjustVolume(_)
            ) {
                applied.config_dirty = true;
            }

            let was_fullscreen = self.coordinator.is_fullscreen();
            if let Err(e) = self.coordinator.dispatch(intent, now) {
                log::warn!("{}", e);
                self.status_message = e.to_string();
            }
            applied.fullscreen_changed |= was_fullscreen != self.coordinator.is_fullscreen();
        }

        if applied.config_dirty {
            self.config.volume = self.coordinator.mix().volume;
            self.config.video_count = self.coordinator.pool().len();
        }
        applied
    }

    /// Returns true when a notice changed the config
    fn handle_notices(&mut self) -> bool {
        let mut config_dirty = false;
        for notice in self.coordinator.take_notices() {
            config_dirty |= self.apply_notice(notice);
        }
        config_dirty
    }

    /// Show `notice` in the status bar. A folder is remembered only once
    /// its scan has loaded media.
    pub fn apply_notice(&mut self, notice: Notice) -> bool {
        self.status_message = notice_message(&notice);
        match notice {
            Notice::CatalogLoaded { root, .. } if self.config.last_folder.as_ref() != Some(&root) => {
                self.config.last_folder = Some(root);
                true
            }
            _ => false,
        }
    }

    fn pick_folder(&mut self) {
        let mut dialog = rfd::FileDialog::new().set_title("Select a folder of videos");
        if let Some(last) = &self.config.last_folder {
            dialog = dialog.set_directory(last);
        }
        if let Some(folder) = dialog.pick_folder() {
            self.pending_intents.push(Intent::SelectFolder(folder));
        }
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            log::error!("Failed to save config: {}", e);
        }
    }

    fn transport_view(&self) -> TransportView {
        let mix = self.coordinator.mix();
        TransportView {
            state: self.coordinator.aggregate_state(),
            timeline: self.coordinator.timeline(),
            volume: mix.volume,
            muted: mix.muted,
            video_count: self.coordinator.pool().len(),
            fullscreen: self.coordinator.is_fullscreen(),
        }
    }
}

impl eframe::App for ShuffleScreenApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.pending_intents.extend(shortcuts::collect_intents(ctx, self.steps()));
        self.coordinator.update(now);
        let folder_changed = self.handle_notices();

        let frames = self.coordinator.take_frames();
        self.grid.update_textures(ctx, frames, self.coordinator.pool().len());

        let fullscreen = self.coordinator.is_fullscreen();
        let controls_shown = self.coordinator.overlay().controls_shown();
        let mut intents = Vec::new();

        if !fullscreen {
            egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
                egui::menu::bar(ui, |ui| {
                    if ui.button("📁 Open Folder…").clicked() {
                        self.pick_folder();
                    }
                    if ui.selectable_label(self.show_playlist, "☰ Playlist").clicked() {
                        self.show_playlist = !self.show_playlist;
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.coordinator.is_scanning() {
                            ui.spinner();
                        }
                        match self.coordinator.catalog().root() {
                            Some(root) => ui.label(format!("📁 {} ({} videos)", root.display(), self.coordinator.catalog().len())),
                            None => ui.label("No folder selected"),
                        };
                    });
                });
            });

            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(if self.status_message.is_empty() { "Ready" } else { self.status_message.as_str() });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if let Some(runtime) = &self.runtime {
                            ui.weak(format!("{} decoder(s)", runtime.active_decoders()));
                        }
                        let now_playing = self.coordinator.now_playing();
                        if !now_playing.is_empty() {
                            ui.label(format!("Now playing: {}", now_playing));
                        }
                    });
                });
            });
        }

        if controls_shown {
            let view = self.transport_view();
            egui::TopBottomPanel::bottom("transport").show(ctx, |ui| {
                controls::transport_bar(ui, &view, &mut intents);
            });
        }

        if self.show_playlist && !fullscreen {
            egui::SidePanel::right("playlist")
                .default_width(260.0)
                .min_width(180.0)
                .show(ctx, |ui| self.show_playlist_panel(ui, &mut intents));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                if self.coordinator.aggregate_state() == AggregateState::Idle && !fullscreen {
                    self.show_welcome(ui);
                } else {
                    self.grid.show(
                        ui,
                        self.coordinator.pool(),
                        controls_shown,
                        self.config.seek_step_secs,
                        &mut intents,
                    );
                }
            });

        self.pending_intents.extend(intents);
        let applied = self.apply_pending(now);
        if applied.fullscreen_changed {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.coordinator.is_fullscreen()));
        }
        if applied.config_dirty || folder_changed {
            self.save_config();
        }

        if self.coordinator.aggregate_state() == AggregateState::Playing {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            let wait = self
                .coordinator
                .overlay()
                .remaining(now)
                .unwrap_or(Duration::from_millis(250))
                .min(Duration::from_millis(250));
            ctx.request_repaint_after(wait);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("Shutting down");
        self.config.volume = self.coordinator.mix().volume;
        self.config.video_count = self.coordinator.pool().len();
        self.coordinator.shutdown();
        if let Some(runtime) = &self.runtime {
            if !runtime.wait_for_decoders(Duration::from_secs(2)) {
                log::warn!("{} decoder(s) still running at exit", runtime.active_decoders());
            }
        }
        self.save_config();
    }
}

impl ShuffleScreenApp {
    fn show_playlist_panel(&mut self, ui: &mut egui::Ui, intents: &mut Vec<Intent>) {
        ui.heading("Playlist");
        ui.weak("Double-click to play everywhere");
        ui.separator();

        let files = self.coordinator.catalog().files();
        if files.is_empty() {
            ui.label("No videos");
            return;
        }

        let row_height = ui.text_style_height(&egui::TextStyle::Body) + 4.0;
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show_rows(ui, row_height, files.len(), |ui, range| {
                for index in range {
                    let selected = self.selected_entry == Some(index);
                    let response = ui.selectable_label(selected, files[index].file_name());
                    if response.clicked() {
                        self.selected_entry = Some(index);
                    }
                    if response.double_clicked() {
                        intents.push(Intent::PlayEverywhere(index));
                    }
                }
            });
    }

    fn show_welcome(&mut self, ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() / 3.0);
                ui.heading("Shuffle Screen");
                ui.label("Pick a folder and a random set of its videos plays side by side.");
                ui.add_space(20.0);
                if ui.button("📁 Open Folder…").clicked() {
                    self.pick_folder();
                }
            });
        });
    }
}

/// Status-bar text for a coordinator notice
pub fn notice_message(notice: &Notice) -> String {
    match notice {
        Notice::ScanStarted(root) => format!("Scanning {}…", root.display()),
        Notice::CatalogLoaded { root, count } => format!("Found {} video(s) in {}", count, root.display()),
        Notice::NoMedia => "No playable videos found".to_string(),
        Notice::FolderNotFound(path) => format!("Folder not found: {}", path.display()),
        Notice::ScanFailed(reason) => format!("Scan failed: {}", reason),
        Notice::InsufficientMedia(warning) => format!("Warning: {}", warning),
        Notice::SlotError { slot, message } => format!("Video {}: {}", slot + 1, message),
    }
}
