use crate::core::config::ProducerConfig;
use crate::core::{MonitorError, MonitorResult};
use async_trait::async_trait;
use log::{info, warn};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// キャプチャプロセス(プロデューサー)の起動・停止を担う外部の管理者
#[async_trait]
pub trait ProducerSupervisor: Send + Sync {
    async fn start_capture(&self) -> MonitorResult<()>;

    /// 停止はベストエフォート。失敗は呼び出し側でログに残すだけ
    async fn stop_capture(&self) -> MonitorResult<()>;
}

/// 設定されたコマンドを子プロセスとして起動する
pub struct ProcessSupervisor {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl ProcessSupervisor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ProducerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    #[cfg(test)]
    async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }
}

#[async_trait]
impl ProducerSupervisor for ProcessSupervisor {
    async fn start_capture(&self) -> MonitorResult<()> {
        let mut guard = self.child.lock().await;

        // 前回起動したプロセスがまだ動いていればそれを使う
        if let Some(child) = guard.as_mut() {
            if let Ok(None) = child.try_wait() {
                info!("キャプチャプロセスは既に起動しています (pid: {:?})", child.id());
                return Ok(());
            }
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MonitorError::ProducerStart(format!("{}: {}", self.program, e)))?;

        info!("キャプチャプロセスを起動しました (pid: {:?})", child.id());
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, true));
        }

        *guard = Some(child);
        Ok(())
    }

    async fn stop_capture(&self) -> MonitorResult<()> {
        let child = self.child.lock().await.take();
        match child {
            Some(mut child) => {
                child
                    .kill()
                    .await
                    .map_err(|e| MonitorError::ProducerStop(e.to_string()))?;
                info!("キャプチャプロセスを停止しました");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// 子プロセスの出力を1行ずつログに流す
async fn forward_output<R>(reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            warn!("producer: {}", line);
        } else {
            info!("producer: {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_reuses_a_running_child_and_stop_kills_it() {
        let supervisor = ProcessSupervisor::new("sleep", vec!["30".to_string()]);

        supervisor.start_capture().await.unwrap();
        let pid = supervisor.pid().await;
        assert!(pid.is_some());

        supervisor.start_capture().await.unwrap();
        assert_eq!(supervisor.pid().await, pid);

        supervisor.stop_capture().await.unwrap();
        assert!(supervisor.pid().await.is_none());
        // 二度目の停止は何もしない
        supervisor.stop_capture().await.unwrap();
    }

    #[tokio::test]
    async fn missing_program_is_a_start_failure() {
        let supervisor = ProcessSupervisor::new("/nonexistent/packet-producer", Vec::new());
        let result = supervisor.start_capture().await;
        assert!(matches!(result, Err(MonitorError::ProducerStart(_))));
    }
}
