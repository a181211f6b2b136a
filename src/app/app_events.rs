use std::time::Instant;
use eframe::egui;
use log::{error, info, warn};

use crate::audio::PlaybackError;
use crate::types::StoryTask;
use super::app_core::DreamweaverApp;

impl DreamweaverApp {
    /// 发出生成请求
    pub fn start_generation(&mut self) {
        // 旧旁白立即停止
        self.narrator.clear();

        let generation = self.state.begin_generation(Instant::now());
        let task = StoryTask::Generate {
            generation,
            request: self.state.request.clone(),
        };

        match self.state.channels.task_sender.try_send(task) {
            Ok(()) => info!("Story task #{} sent to worker", generation),
            Err(e) => {
                error!("Failed to send story task: {}", e);
                self.state.fail_generation(crate::story::worker::RETRY_MESSAGE.to_string());
            }
        }
    }

    pub fn handle_story_results(&mut self) {
        while let Ok(result) = self.state.channels.result_receiver.try_recv() {
            let generation = result.generation;
            match self.state.accept_result(result) {
                None => info!("Ignoring stale story result #{}", generation),
                Some(Some(buffer)) => self.start_narration(buffer),
                Some(None) => {}
            }
        }
    }

    /// 回到选择界面，释放旁白
    pub fn reset(&mut self) {
        self.narrator.clear();
        self.state.reset();
        info!("Reset to story selection");
    }

    /// 输出设备失败后由用户手动重试
    pub fn retry_narration(&mut self) {
        if let Some(buffer) = self.state.playback.last_narration.clone() {
            self.state.playback.device_error = None;
            self.start_narration(buffer);
        }
    }

    pub fn toggle_playback(&mut self) {
        if self.narrator.is_playing() {
            self.narrator.pause();
        } else {
            self.state.playback.finished.set(false);
            let result = self.narrator.play();
            self.record_playback_result(result);
        }
    }

    pub fn restart_playback(&mut self) {
        self.state.playback.finished.set(false);
        let result = self.narrator.restart();
        self.record_playback_result(result);
    }

    pub fn handle_keyboard_input(&mut self, ctx: &egui::Context) {
        let space_pressed = ctx.input(|i| i.key_pressed(egui::Key::Space));
        if space_pressed && self.narrator.has_narration() && self.state.playback.device_error.is_none() {
            self.toggle_playback();
        }
    }

    fn start_narration(&mut self, buffer: crate::audio::SampleBuffer) {
        let result = self.narrator.load(buffer);
        self.record_playback_result(result);
    }

    fn record_playback_result(&mut self, result: Result<(), PlaybackError>) {
        match result {
            Ok(()) => {}
            Err(PlaybackError::Device(e)) => {
                warn!("Audio device unavailable: {}", e);
                self.narrator.clear();
                self.state.playback.device_error = Some(e.to_string());
            }
            Err(e) => {
                warn!("Narration cannot be played: {}", e);
                if let Some(story) = self.state.story.as_mut() {
                    story.narration_note = Some(crate::story::NARRATION_UNAVAILABLE.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use crossbeam_channel::bounded;
    use crate::audio::SampleBuffer;
    use crate::audio::output::testing::MockBackend;
    use crate::audio::ticker::Waker;
    use crate::config::ConfigManager;
    use crate::types::{NarrationOutcome, Story, StoryResult};
    use super::*;

    fn app_with(backend: &MockBackend) -> (DreamweaverApp, crossbeam_channel::Sender<StoryResult>) {
        let ctx = egui::Context::default();
        let waker: Waker = Arc::new(move || ctx.request_repaint());
        let (task_sender, _task_receiver) = bounded(1);
        let (result_sender, result_receiver) = bounded(1);
        let app = DreamweaverApp::with_backend(
            Box::new(backend.clone()),
            Some(waker),
            ConfigManager::new(),
            task_sender,
            result_receiver,
        );
        (app, result_sender)
    }

    fn deliver_story(app: &mut DreamweaverApp, result_sender: &crossbeam_channel::Sender<StoryResult>) {
        let generation = app.state.begin_generation(Instant::now());
        let story = Story {
            title: "Moon Boat".to_string(),
            content: "The boat sailed on.".to_string(),
        };
        let narration = NarrationOutcome::Ready(SampleBuffer::silence(2.0, 100));
        result_sender.send(StoryResult::success(generation, story, narration)).unwrap();
        app.handle_story_results();
    }

    #[test]
    fn device_failure_disables_controls_until_retry() {
        let backend = MockBackend {
            start_suspended: true,
            ..MockBackend::new()
        };
        backend.fail_resume.set(true);
        let (mut app, result_sender) = app_with(&backend);

        deliver_story(&mut app, &result_sender);

        assert!(app.state.playback.device_error.is_some());
        assert!(!app.narrator.has_narration());
        assert_eq!(backend.log.borrow().closed, 1);

        // 没有控制器时播放控制不做任何事
        app.toggle_playback();
        app.restart_playback();
        assert!(!app.narrator.has_narration());
        assert_eq!(backend.log.borrow().opened, 1);

        backend.fail_resume.set(false);
        app.retry_narration();

        assert!(app.state.playback.device_error.is_none());
        assert!(app.narrator.is_playing());
        assert_eq!(backend.log.borrow().resumed, 1);
        assert_eq!(app.narrator.status().map(|s| s.duration_secs), Some(2.0));
    }

    #[test]
    fn unplayable_narration_is_reported_on_the_story() {
        let backend = MockBackend::new();
        let (mut app, result_sender) = app_with(&backend);
        let generation = app.state.begin_generation(Instant::now());
        let story = Story {
            title: "Quiet".to_string(),
            content: "Hush.".to_string(),
        };
        let narration = NarrationOutcome::Ready(SampleBuffer::silence(0.0, 100));
        result_sender.send(StoryResult::success(generation, story, narration)).unwrap();
        app.handle_story_results();

        assert!(app.state.playback.device_error.is_none());
        assert_eq!(
            app.state.story.as_ref().and_then(|s| s.narration_note.as_deref()),
            Some(crate::story::NARRATION_UNAVAILABLE)
        );
        assert_eq!(backend.log.borrow().opened, 0);
    }
}
