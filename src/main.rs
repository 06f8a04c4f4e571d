mod core;
mod gui;
mod playback;
mod video;

use eframe::egui;
use gui::ShuffleScreenApp;

use crate::core::AppConfig;
use crate::video::MediaRuntime;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::load_or_default();

    // Nothing can play without ffmpeg
    let runtime = match MediaRuntime::detect(&config) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Install ffmpeg or set ffmpeg_path/ffprobe_path in the config file.");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 400.0])
            .with_title("Shuffle Screen"),
        ..Default::default()
    };

    eframe::run_native(
        "Shuffle Screen",
        options,
        Box::new(|cc| {
            match ShuffleScreenApp::new(cc, config, runtime) {
                Ok(app) => Ok(Box::new(app)),
                Err(e) => {
                    eprintln!("Failed to initialize app: {}", e);
                    std::process::exit(1);
                }
            }
        }),
    ).map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))?;

    Ok(())
}
