use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::timer::Timer;

/// Runs an opaque external command line and reports only whether it exited
/// successfully. The real implementation shells out; tests substitute a
/// scripted double so the suite never depends on actual modem hardware.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> bool;
}

/// Runs commands through the platform shell, matching the `os.system()`
/// semantics of the daemon this was ported from: the configured string is
/// handed to `sh -c` verbatim, so pipelines like `ifconfig ppp0 | grep ...`
/// work unmodified. Only the exit status is observed.
pub struct ShellCommandRunner {
    timeout: Duration,
}

impl ShellCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> bool {
        let mut child = match tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(command, error = %e, "failed to spawn external command");
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                warn!(command, error = %e, "external command failed to run");
                false
            }
            Err(_) => {
                warn!(command, timeout_secs = self.timeout.as_secs(), "external command timed out");
                let _ = child.start_kill();
                false
            }
        }
    }
}

/// Single-owner wrapper over the three external commands (`connect`,
/// `disconnect`, `is_connected`). Has no knowledge of clients — that
/// multiplexing lives one level up, in [`crate::proxy::ModemProxy`].
pub struct Modem {
    runner: Arc<dyn CommandRunner>,
    connect_cmd: String,
    disconnect_cmd: String,
    is_connected_cmd: String,
    pub timer: Timer,
}

impl Modem {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        connect_cmd: String,
        disconnect_cmd: String,
        is_connected_cmd: String,
    ) -> Self {
        Self {
            runner,
            connect_cmd,
            disconnect_cmd,
            is_connected_cmd,
            timer: Timer::new(),
        }
    }

    /// Reset the session timer and run the connect command.
    pub async fn dial(&mut self) -> bool {
        self.timer.reset();
        self.runner.run(&self.connect_cmd).await
    }

    /// Stop the session timer and run the disconnect command.
    pub async fn hang_up(&mut self) -> bool {
        self.timer.stop();
        self.runner.run(&self.disconnect_cmd).await
    }

    /// Probe link state. On success, ensures the timer is running (it may
    /// already be, from `dial`); on failure the timer is left untouched.
    pub async fn is_connected(&mut self) -> bool {
        if self.runner.run(&self.is_connected_cmd).await {
            if !self.timer.is_running() {
                self.timer.start();
            }
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedRunner;

    fn modem_with(runner: ScriptedRunner) -> Modem {
        Modem::new(
            Arc::new(runner),
            "connect".into(),
            "disconnect".into(),
            "is_connected".into(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn dial_resets_timer_and_runs_connect() {
        let mut modem = modem_with(ScriptedRunner::always(true));
        assert!(modem.dial().await);
        assert_eq!(modem.timer.elapsed_seconds(), 0);
    }

    #[tokio::test]
    async fn dial_failure_is_reported_not_raised() {
        let mut modem = modem_with(ScriptedRunner::always(false));
        assert!(!modem.dial().await);
    }

    #[tokio::test(start_paused = true)]
    async fn is_connected_starts_timer_on_success() {
        let mut modem = modem_with(ScriptedRunner::always(true));
        assert!(!modem.timer.is_running());
        assert!(modem.is_connected().await);
        assert!(modem.timer.is_running());
    }

    #[tokio::test]
    async fn is_connected_leaves_timer_untouched_on_failure() {
        let mut modem = modem_with(ScriptedRunner::always(false));
        assert!(!modem.is_connected().await);
        assert!(!modem.timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn hang_up_stops_timer() {
        let mut modem = modem_with(ScriptedRunner::always(true));
        modem.timer.start();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(modem.hang_up().await);
        assert!(!modem.timer.is_running());
        assert_eq!(modem.timer.elapsed_seconds(), 3);
    }
}
