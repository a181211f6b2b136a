use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use eframe::{egui, Frame};
use log::info;

use crate::audio::{Narrator, RodioBackend};
use crate::audio::output::OutputBackend;
use crate::audio::ticker::Waker;
use crate::config::ConfigManager;
use crate::types::{StoryResult, StoryTask};
use super::state::AppState;

pub struct DreamweaverApp {
    // 统一的状态管理
    pub state: AppState,

    // 配置管理
    pub config: ConfigManager,

    // 旁白播放
    pub narrator: Narrator,
}

impl DreamweaverApp {
    pub fn new(
        egui_ctx: &egui::Context,
        config: ConfigManager,
        task_sender: crossbeam_channel::Sender<StoryTask>,
        result_receiver: crossbeam_channel::Receiver<StoryResult>,
    ) -> Self {
        // 播放期间由刷新任务唤醒界面
        let repaint_ctx = egui_ctx.clone();
        let waker: Waker = Arc::new(move || repaint_ctx.request_repaint());
        Self::with_backend(Box::new(RodioBackend), Some(waker), config, task_sender, result_receiver)
    }

    /// 使用指定的输出后端构建应用
    pub(crate) fn with_backend(
        backend: Box<dyn OutputBackend>,
        waker: Option<Waker>,
        config: ConfigManager,
        task_sender: crossbeam_channel::Sender<StoryTask>,
        result_receiver: crossbeam_channel::Receiver<StoryResult>,
    ) -> Self {
        let state = AppState::new(task_sender, result_receiver);
        let mut narrator = Narrator::new(backend, &config.get_config().audio, waker);

        let finished = Rc::clone(&state.playback.finished);
        narrator.set_on_ended(Rc::new(move || finished.set(true)));

        info!("Dreamweaver ready");

        DreamweaverApp {
            state,
            config,
            narrator,
        }
    }
}

impl eframe::App for DreamweaverApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        // 处理故事线程结果
        self.handle_story_results();

        // 更新播放进度
        self.narrator.tick();

        // 处理键盘输入
        self.handle_keyboard_input(ctx);

        // 渲染UI组件
        crate::app::ui::render_header(self, ctx);
        crate::app::ui::render_status_bar(self, ctx);
        crate::app::ui::render_main_panel(self, ctx);

        if self.state.generation.is_loading {
            self.state.rotate_loading_message(std::time::Instant::now());
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}
