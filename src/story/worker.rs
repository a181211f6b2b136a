use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{error, info, warn};

use crate::audio::decode_narration;
use crate::config::AudioConfig;
use crate::types::{NarrationOutcome, StoryRequest, StoryResult, StoryTask};
use super::client::StoryService;

/// 故事生成失败时展示给用户的提示
pub const RETRY_MESSAGE: &str = "The dream characters were a bit shy. Let's try again!";
/// 旁白不可用时的提示
pub const NARRATION_UNAVAILABLE: &str = "Narration unavailable";

/// 故事线程：依次生成故事文本、语音并解码，结果发回界面线程
pub fn run_story_worker(
    task_receiver: Receiver<StoryTask>,
    result_sender: Sender<StoryResult>,
    service: Box<dyn StoryService + Send>,
    audio: AudioConfig,
    shutdown_signal: Arc<AtomicBool>,
) {
    info!("Story worker thread started");

    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(StoryTask::Generate { generation, request }) => {
                let result = generate(service.as_ref(), &request, &audio, generation);
                if result_sender.send(result).is_err() {
                    // 界面已关闭
                    info!("Story worker: result channel disconnected, exiting");
                    break;
                }
            }
            Ok(StoryTask::Shutdown) => {
                info!("Story worker received shutdown task");
                break;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Story worker: task channel disconnected, exiting");
                break;
            }
        }
    }

    info!("Story worker thread exiting gracefully");
}

/// 生成一则故事及其旁白
///
/// 故事文本失败时整个请求失败；语音失败或解码失败只会让旁白不可用。
pub fn generate(
    service: &dyn StoryService,
    request: &StoryRequest,
    audio: &AudioConfig,
    generation: u64,
) -> StoryResult {
    info!("Generating story #{}: {} / {}", generation, request.theme, request.mood);

    let story = match service.generate_story(request) {
        Ok(story) => story,
        Err(e) => {
            error!("Story generation failed: {}", e);
            return StoryResult::error(generation, RETRY_MESSAGE.to_string());
        }
    };

    let narration = match service.generate_speech(&story.content) {
        Ok(Some(encoded)) => match decode_narration(&encoded, audio.sample_rate, audio.channels) {
            Ok(buffer) if !buffer.is_empty() => {
                info!("Narration decoded: {:.1}s", buffer.duration_secs());
                NarrationOutcome::Ready(buffer)
            }
            Ok(_) => {
                warn!("Narration audio is empty");
                NarrationOutcome::Unavailable(NARRATION_UNAVAILABLE.to_string())
            }
            Err(e) => {
                warn!("Failed to decode narration: {}", e);
                NarrationOutcome::Unavailable(NARRATION_UNAVAILABLE.to_string())
            }
        },
        Ok(None) => NarrationOutcome::Unavailable(NARRATION_UNAVAILABLE.to_string()),
        Err(e) => {
            warn!("Speech generation failed: {}", e);
            NarrationOutcome::Unavailable(NARRATION_UNAVAILABLE.to_string())
        }
    };

    StoryResult::success(generation, story, narration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use base64::{Engine as _, engine::general_purpose};
    use crossbeam_channel::bounded;
    use crate::story::client::UpstreamError;
    use crate::types::Story;

    struct FakeService {
        story: Option<Story>,
        speech: Result<Option<String>, u16>,
    }

    impl FakeService {
        fn with_speech(speech: Option<String>) -> Self {
            Self {
                story: Some(Story {
                    title: "The Sleepy Comet".to_string(),
                    content: "A comet yawned.".to_string(),
                }),
                speech: Ok(speech),
            }
        }
    }

    impl StoryService for FakeService {
        fn generate_story(&self, _request: &StoryRequest) -> Result<Story, UpstreamError> {
            self.story.clone().ok_or(UpstreamError::Api {
                status: 500,
                message: "boom".to_string(),
            })
        }

        fn generate_speech(&self, _text: &str) -> Result<Option<String>, UpstreamError> {
            match &self.speech {
                Ok(audio) => Ok(audio.clone()),
                Err(status) => Err(UpstreamError::Api {
                    status: *status,
                    message: "tts failed".to_string(),
                }),
            }
        }
    }

    fn half_second_audio() -> String {
        general_purpose::STANDARD.encode(vec![0u8; 24_000])
    }

    #[test]
    fn story_and_narration_are_returned_together() {
        let service = FakeService::with_speech(Some(half_second_audio()));
        let result = generate(&service, &StoryRequest::default(), &AudioConfig::default(), 3);

        assert_eq!(result.generation, 3);
        let generated = result.outcome.unwrap();
        assert_eq!(generated.story.title, "The Sleepy Comet");
        match generated.narration {
            NarrationOutcome::Ready(buffer) => assert_eq!(buffer.duration_secs(), 0.5),
            NarrationOutcome::Unavailable(reason) => panic!("unexpected: {}", reason),
        }
    }

    #[test]
    fn missing_speech_keeps_the_story() {
        let service = FakeService::with_speech(None);
        let generated = generate(&service, &StoryRequest::default(), &AudioConfig::default(), 1)
            .outcome
            .unwrap();
        assert!(matches!(generated.narration, NarrationOutcome::Unavailable(_)));
    }

    #[test]
    fn speech_failure_keeps_the_story() {
        let service = FakeService {
            speech: Err(503),
            ..FakeService::with_speech(None)
        };
        let generated = generate(&service, &StoryRequest::default(), &AudioConfig::default(), 1)
            .outcome
            .unwrap();
        assert!(matches!(generated.narration, NarrationOutcome::Unavailable(_)));
    }

    #[test]
    fn undecodable_speech_is_unavailable() {
        let service = FakeService::with_speech(Some("%%%not audio%%%".to_string()));
        let generated = generate(&service, &StoryRequest::default(), &AudioConfig::default(), 1)
            .outcome
            .unwrap();
        match generated.narration {
            NarrationOutcome::Unavailable(reason) => assert_eq!(reason, NARRATION_UNAVAILABLE),
            NarrationOutcome::Ready(_) => panic!("garbage audio must not decode"),
        }
    }

    #[test]
    fn story_failure_reports_retry_message() {
        let service = FakeService {
            story: None,
            ..FakeService::with_speech(None)
        };
        let result = generate(&service, &StoryRequest::default(), &AudioConfig::default(), 9);
        assert_eq!(result.outcome.unwrap_err(), RETRY_MESSAGE);
    }

    #[test]
    fn worker_processes_tasks_until_shutdown() {
        let (task_sender, task_receiver) = bounded(4);
        let (result_sender, result_receiver) = bounded(4);
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shutdown = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            run_story_worker(
                task_receiver,
                result_sender,
                Box::new(FakeService::with_speech(Some(half_second_audio()))),
                AudioConfig::default(),
                worker_shutdown,
            )
        });

        task_sender
            .send(StoryTask::Generate { generation: 7, request: StoryRequest::default() })
            .unwrap();
        let result = result_receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.generation, 7);

        task_sender.send(StoryTask::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
