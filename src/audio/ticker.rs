use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, warn};

/// 进度刷新时调用的唤醒函数（通常是请求界面重绘）
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// 可取消的周期任务：按固定间隔调用唤醒函数，直到被停止
pub struct ProgressTicker {
    stop_sender: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start(interval: Duration, waker: Waker) -> Self {
        let (stop_sender, stop_receiver) = bounded::<()>(1);

        let spawned = thread::Builder::new()
            .name("progress-ticker".to_string())
            .spawn(move || loop {
                match stop_receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => waker(),
                    // 收到停止信号或发送端已释放
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to spawn progress ticker: {}", e);
                None
            }
        };

        Self {
            stop_sender: Some(stop_sender),
            handle,
        }
    }

    /// 停止并等待线程退出，返回后不会再有唤醒
    pub fn stop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Progress ticker thread panicked");
            }
            debug!("Progress ticker stopped");
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
