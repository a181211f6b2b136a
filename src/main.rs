mod app;
mod audio;
mod config;
mod logger;
mod story;
mod types;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use crossbeam_channel::bounded;
use eframe::egui;
use log::{error, info, warn};

use app::DreamweaverApp;
use config::ConfigManager;
use story::{run_story_worker, GeminiClient, OfflineService, StoryService};
use types::StoryTask;

const CONFIG_FILE: &str = "dreamweaver.toml";

fn main() {
    logger::init_logger();
    info!("Dreamweaver starting");

    let config = ConfigManager::load_or_create(CONFIG_FILE);
    let app_config = config.get_config().clone();

    let (task_sender, task_receiver) = bounded(app_config.channels.task_channel_capacity);
    let (result_sender, result_receiver) = bounded(app_config.channels.result_channel_capacity);
    let shutdown_signal = Arc::new(AtomicBool::new(false));

    // 没有 API key 时仍可启动，生成请求会以友好提示失败
    let service: Box<dyn StoryService + Send> = match GeminiClient::from_env(&app_config.service) {
        Ok(client) => Box::new(client),
        Err(e) => {
            error!("Story service unavailable: {}", e);
            Box::new(OfflineService::new(&app_config.service.api_key_env))
        }
    };

    let worker_shutdown = Arc::clone(&shutdown_signal);
    let worker_audio = app_config.audio.clone();
    let worker_handle = thread::Builder::new()
        .name("story-worker".to_string())
        .spawn(move || run_story_worker(task_receiver, result_sender, service, worker_audio, worker_shutdown));

    let window = &app_config.window;
    let options = eframe::NativeOptions {
        vsync: window.vsync,
        viewport: egui::ViewportBuilder::default()
            .with_title(window.title.clone())
            .with_inner_size([window.width, window.height])
            .with_resizable(window.resizable),
        ..Default::default()
    };

    let shutdown_sender = task_sender.clone();
    if let Err(e) = eframe::run_native(
        &window.title,
        options,
        Box::new(|cc| Ok(Box::new(DreamweaverApp::new(&cc.egui_ctx, config, task_sender, result_receiver)))),
    ) {
        error!("GUI failed: {}", e);
    }

    // GUI 关闭后通知故事线程退出
    info!("GUI closed, signaling story worker to shutdown");
    let _ = shutdown_sender.try_send(StoryTask::Shutdown);
    shutdown_signal.store(true, Ordering::Relaxed);

    match worker_handle {
        Ok(handle) => match handle.join() {
            Ok(()) => info!("Story worker shut down gracefully"),
            Err(e) => error!("Story worker panicked: {:?}", e),
        },
        Err(e) => warn!("Story worker was never started: {}", e),
    }
}
