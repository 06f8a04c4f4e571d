#[cfg(test)]
mod tests {
    use eframe::egui;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::core::{AppConfig, FsWalker, InsufficientMedia, Sampler};
    use crate::gui::app::{notice_message, AppliedIntents, ShuffleScreenApp};
    use crate::gui::controls::format_time;
    use crate::gui::grid::fit_rect;
    use crate::gui::shortcuts::{intent_for_key, ShortcutSteps};
    use crate::playback::testing::FakeFactory;
    use crate::playback::{CoordinatorSettings, Intent, Notice, TransportCoordinator};

    // Test helper to create an app backed by scripted players
    fn create_test_app() -> ShuffleScreenApp {
        let config = AppConfig::default();
        let coordinator = TransportCoordinator::new(
            Box::new(FakeFactory::with_duration(Duration::from_secs(60))),
            Arc::new(FsWalker),
            Sampler::with_seed(1),
            CoordinatorSettings::from(&config),
        )
        .unwrap();
        ShuffleScreenApp::with_coordinator(config, coordinator)
    }

    const STEPS: ShortcutSteps = ShortcutSteps {
        volume: 5,
        seek_secs: 10.0,
    };

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Duration::ZERO), "00:00");
        assert_eq!(format_time(Duration::from_secs(75)), "01:15");
        assert_eq!(format_time(Duration::from_secs_f64(59.9)), "00:59");
        assert_eq!(format_time(Duration::from_secs(3661)), "01:01:01");
    }

    #[test]
    fn test_shortcut_keys() {
        assert_eq!(intent_for_key(egui::Key::Space, false, STEPS), Some(Intent::PlayPause));
        assert_eq!(intent_for_key(egui::Key::N, false, STEPS), Some(Intent::Next));
        assert_eq!(intent_for_key(egui::Key::S, false, STEPS), Some(Intent::Stop));
        assert_eq!(intent_for_key(egui::Key::F, false, STEPS), Some(Intent::ToggleFullscreen));
        assert_eq!(intent_for_key(egui::Key::M, false, STEPS), Some(Intent::ToggleGlobalMute));
        assert_eq!(intent_for_key(egui::Key::Escape, false, STEPS), Some(Intent::ExitFullscreen));
        assert_eq!(intent_for_key(egui::Key::ArrowUp, false, STEPS), Some(Intent::AdjustVolume(5)));
        assert_eq!(intent_for_key(egui::Key::ArrowDown, false, STEPS), Some(Intent::AdjustVolume(-5)));
        assert_eq!(
            intent_for_key(egui::Key::ArrowLeft, false, STEPS),
            Some(Intent::SeekAllRelative(-10.0))
        );
        assert_eq!(intent_for_key(egui::Key::Q, false, STEPS), None);
    }

    #[test]
    fn test_auto_repeat_only_steps() {
        assert_eq!(intent_for_key(egui::Key::Space, true, STEPS), None);
        assert_eq!(intent_for_key(egui::Key::F, true, STEPS), None);
        assert_eq!(intent_for_key(egui::Key::ArrowUp, true, STEPS), Some(Intent::AdjustVolume(5)));
        assert_eq!(
            intent_for_key(egui::Key::ArrowRight, true, STEPS),
            Some(Intent::SeekAllRelative(10.0))
        );
    }

    #[test]
    fn test_notice_messages() {
        let warning = Notice::InsufficientMedia(InsufficientMedia {
            requested: 4,
            available: 2,
        });
        assert_eq!(notice_message(&warning), "Warning: only 2 playable file(s) for 4 slot(s)");

        let error = Notice::SlotError {
            slot: 0,
            message: "decode failed".to_string(),
        };
        assert_eq!(notice_message(&error), "Video 1: decode failed");
        assert_eq!(notice_message(&Notice::NoMedia), "No playable videos found");
    }

    #[test]
    fn test_pending_intents_update_config() {
        let mut app = create_test_app();
        let folder = PathBuf::from("/nonexistent/videos");
        app.pending_intents = vec![
            Intent::SetVolume(30),
            Intent::SetVideoCount(3),
            Intent::SelectFolder(folder.clone()),
        ];

        let applied = app.apply_pending(Instant::now());

        assert_eq!(
            applied,
            AppliedIntents {
                fullscreen_changed: false,
                config_dirty: true,
            }
        );
        assert!(app.pending_intents.is_empty());
        assert_eq!(app.config.volume, 30);
        assert_eq!(app.config.video_count, 3);
        // Not remembered until the scan has found something
        assert_eq!(app.config.last_folder, None);
    }

    #[test]
    fn test_loaded_folder_is_remembered() {
        let mut app = create_test_app();
        let folder = PathBuf::from("/videos/holiday");

        let dirty = app.apply_notice(Notice::CatalogLoaded {
            root: folder.clone(),
            count: 4,
        });
        assert!(dirty);
        assert_eq!(app.config.last_folder, Some(folder.clone()));
        assert_eq!(app.status_message, "Found 4 video(s) in /videos/holiday");

        // Reloading the same folder is not a config change
        assert!(!app.apply_notice(Notice::CatalogLoaded { root: folder, count: 5 }));
    }

    #[test]
    fn test_missing_folder_is_not_remembered() {
        let mut app = create_test_app();
        app.config.last_folder = Some(PathBuf::from("/videos/old"));

        let missing = PathBuf::from("/nonexistent/videos");
        app.pending_intents.push(Intent::SelectFolder(missing.clone()));
        app.apply_pending(Instant::now());
        assert!(!app.apply_notice(Notice::FolderNotFound(missing)));

        assert_eq!(app.config.last_folder, Some(PathBuf::from("/videos/old")));
        assert!(app.status_message.starts_with("Folder not found"));
    }

    #[test]
    fn test_rejected_intent_reports_status() {
        let mut app = create_test_app();
        app.pending_intents.push(Intent::SetVideoCount(12));

        app.apply_pending(Instant::now());

        assert!(app.status_message.contains("12"));
        assert_eq!(app.coordinator.pool().len(), 1);
    }

    #[test]
    fn test_fullscreen_toggle_is_reported() {
        let mut app = create_test_app();
        app.pending_intents.push(Intent::ToggleFullscreen);

        let applied = app.apply_pending(Instant::now());
        assert!(applied.fullscreen_changed);
        assert!(!applied.config_dirty);
        assert!(app.coordinator.is_fullscreen());

        // Toggling twice in one batch ends where it started
        app.pending_intents = vec![Intent::ToggleFullscreen, Intent::ToggleFullscreen];
        app.apply_pending(Instant::now());
        assert!(app.coordinator.is_fullscreen());
    }

    #[test]
    fn test_fit_rect_letterboxes() {
        let cell = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(400.0, 400.0));
        let fitted = fit_rect(egui::vec2(800.0, 450.0), cell);

        assert_eq!(fitted.width(), 400.0);
        assert_eq!(fitted.height(), 225.0);
        assert_eq!(fitted.center(), cell.center());
    }
}
