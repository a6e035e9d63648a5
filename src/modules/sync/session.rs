use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::error;
use crate::constants::{HEARTBEAT_INTERVAL, POLL_INTERVAL, REQUEST_TIMEOUT, TYPING_IDLE_TIMEOUT};
use crate::modules::message::model::ThreadSnapshot;
use crate::modules::sync::backend::SyncBackend;

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub typing_idle_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            typing_idle_timeout: TYPING_IDLE_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Keystroke,
    StopTyping,
    Refresh,
}

/// Owner side of a running poll loop for one open conversation.
pub struct PollHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<Option<ThreadSnapshot>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Starts the loop: an immediate read and heartbeat, then periodic ones.
    pub fn spawn(
        backend: Arc<dyn SyncBackend + Send + Sync>,
        conversation_id: Uuid,
        config: PollConfig,
    ) -> Self {
        let (commands, rx) = mpsc::channel(32);
        let (snapshot_tx, snapshots) = watch::channel(None);
        let cancel = CancellationToken::new();

        let session = PollSession {
            backend,
            conversation_id,
            config,
            typing: false,
            snapshots: snapshot_tx,
        };
        let task = tokio::spawn(session.run(rx, cancel.clone()));

        PollHandle { commands, snapshots, cancel, task }
    }

    pub async fn keystroke(&self) {
        let _ = self.commands.send(SessionCommand::Keystroke).await;
    }

    pub async fn stop_typing(&self) {
        let _ = self.commands.send(SessionCommand::StopTyping).await;
    }

    pub async fn refresh(&self) {
        let _ = self.commands.send(SessionCommand::Refresh).await;
    }

    pub fn snapshots(&self) -> watch::Receiver<Option<ThreadSnapshot>> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Option<ThreadSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Cancels the loop and waits until it has cleared any typing flag.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "poll session task failed");
        }
    }
}

struct PollSession {
    backend: Arc<dyn SyncBackend + Send + Sync>,
    conversation_id: Uuid,
    config: PollConfig,
    typing: bool,
    snapshots: watch::Sender<Option<ThreadSnapshot>>,
}

impl PollSession {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, cancel: CancellationToken) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let idle = tokio::time::sleep(self.config.typing_idle_timeout);
        tokio::pin!(idle);

        tracing::info!(conversation = %self.conversation_id, "poll session started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                cmd = commands.recv() => match cmd {
                    Some(SessionCommand::Keystroke) => {
                        if !self.typing {
                            self.typing = true;
                            self.send_typing(true).await;
                        }
                        idle.as_mut().reset(Instant::now() + self.config.typing_idle_timeout);
                    }
                    Some(SessionCommand::StopTyping) => self.clear_typing().await,
                    Some(SessionCommand::Refresh) => self.poll_once().await,
                    None => break,
                },
                _ = &mut idle, if self.typing => self.clear_typing().await,
                _ = heartbeat.tick() => {
                    if let Err(e) = self.bounded(self.backend.heartbeat()).await {
                        tracing::warn!(error = %e, "heartbeat failed, retrying next interval");
                    }
                }
                _ = poll.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.poll_once() => {}
                    }
                }
            }
        }

        self.clear_typing().await;
        tracing::info!(conversation = %self.conversation_id, "poll session stopped");
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, error::SystemError>>,
    ) -> Result<T, error::SystemError> {
        tokio::time::timeout(self.config.request_timeout, fut)
            .await
            .map_err(|_| error::SystemError::upstream_unavailable("Request timed out"))?
    }

    async fn poll_once(&self) {
        match self.bounded(self.backend.read(&self.conversation_id)).await {
            Ok(snapshot) => {
                self.snapshots.send_replace(Some(snapshot));
            }
            Err(e) => {
                tracing::warn!(conversation = %self.conversation_id, error = %e, "poll failed");
            }
        }
    }

    async fn send_typing(&self, is_typing: bool) {
        if let Err(e) = self.bounded(self.backend.set_typing(&self.conversation_id, is_typing)).await
        {
            tracing::warn!(is_typing, error = %e, "typing update failed");
        }
    }

    async fn clear_typing(&mut self) {
        if self.typing {
            self.typing = false;
            self.send_typing(false).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::presence::model::PresenceLabel;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        reads: AtomicUsize,
        heartbeats: AtomicUsize,
        typing: Mutex<Vec<bool>>,
        fail_reads: AtomicBool,
        hang_reads: AtomicBool,
    }

    impl FakeBackend {
        fn typing_calls(&self) -> Vec<bool> {
            self.typing.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SyncBackend for FakeBackend {
        async fn read(&self, conversation_id: &Uuid) -> Result<ThreadSnapshot, error::SystemError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.hang_reads.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(error::SystemError::upstream_unavailable("down"));
            }
            Ok(ThreadSnapshot {
                conversation_id: *conversation_id,
                messages: vec![],
                typing: vec![],
                participants: vec![],
                participants_status: vec![],
                presence: PresenceLabel::Offline,
            })
        }

        async fn heartbeat(&self) -> Result<(), error::SystemError> {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn set_typing(&self, _: &Uuid, is_typing: bool) -> Result<(), error::SystemError> {
            self.typing.lock().unwrap().push(is_typing);
            Ok(())
        }
    }

    fn spawn(backend: &Arc<FakeBackend>) -> PollHandle {
        PollHandle::spawn(backend.clone(), Uuid::now_v7(), PollConfig::default())
    }

    async fn wait(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_keystrokes_send_typing_once_then_idle_clears() {
        let backend = Arc::new(FakeBackend::default());
        let handle = spawn(&backend);

        handle.keystroke().await;
        wait(1).await;
        handle.keystroke().await;
        wait(1).await;
        handle.keystroke().await;
        wait(1).await;
        assert_eq!(backend.typing_calls(), vec![true]);

        // idle deadline is measured from the last keystroke
        wait(2).await;
        assert_eq!(backend.typing_calls(), vec![true]);
        wait(2).await;
        assert_eq!(backend.typing_calls(), vec![true, false]);

        handle.stop().await;
        assert_eq!(backend.typing_calls(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_typing_clears_flag() {
        let backend = Arc::new(FakeBackend::default());
        let handle = spawn(&backend);

        handle.keystroke().await;
        wait(1).await;
        handle.stop().await;
        assert_eq!(backend.typing_calls(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_stop_typing() {
        let backend = Arc::new(FakeBackend::default());
        let handle = spawn(&backend);

        handle.stop_typing().await;
        wait(1).await;
        assert!(backend.typing_calls().is_empty());

        handle.keystroke().await;
        handle.stop_typing().await;
        wait(1).await;
        assert_eq!(backend.typing_calls(), vec![true, false]);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_polls_do_not_stop_the_loop() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_reads.store(true, Ordering::SeqCst);
        let handle = spawn(&backend);

        wait(10).await;
        assert!(backend.reads.load(Ordering::SeqCst) >= 3);
        assert!(handle.latest().is_none());

        backend.fail_reads.store(false, Ordering::SeqCst);
        wait(4).await;
        assert!(handle.latest().is_some());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_read_is_bounded_by_timeout() {
        let backend = Arc::new(FakeBackend::default());
        backend.hang_reads.store(true, Ordering::SeqCst);
        let handle = spawn(&backend);

        wait(25).await;
        assert!(backend.reads.load(Ordering::SeqCst) >= 2);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_runs_immediately_and_periodically() {
        let backend = Arc::new(FakeBackend::default());
        let handle = spawn(&backend);

        wait(1).await;
        assert_eq!(backend.heartbeats.load(Ordering::SeqCst), 1);
        wait(60).await;
        assert_eq!(backend.heartbeats.load(Ordering::SeqCst), 3);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_polls_immediately() {
        let backend = Arc::new(FakeBackend::default());
        let handle = spawn(&backend);
        wait(1).await;
        let before = backend.reads.load(Ordering::SeqCst);

        handle.refresh().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.reads.load(Ordering::SeqCst), before + 1);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_sessions_see_each_other() {
        use crate::modules::message::model::SenderLabel;
        use crate::modules::sync::backend::LocalBackend;
        use crate::test::TestHarness;

        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        h.sign_up("b@x.io", "Bob").await;
        let conversation_id =
            h.services.conversation.create_direct("a@x.io", "b@x.io").await.unwrap().conversation.id;

        let local = |identity: &str| {
            Arc::new(LocalBackend::new(
                identity,
                h.services.message.clone(),
                h.services.conversation.clone(),
                h.services.presence.clone(),
            ))
        };
        let alice = PollHandle::spawn(local("a@x.io"), conversation_id, PollConfig::default());
        let bob = PollHandle::spawn(local("b@x.io"), conversation_id, PollConfig::default());
        wait(1).await;

        alice.keystroke().await;
        wait(1).await;
        bob.refresh().await;
        wait(1).await;
        let snapshot = bob.latest().unwrap();
        assert_eq!(snapshot.typing, vec!["Alice".to_string()]);
        assert_eq!(snapshot.presence, PresenceLabel::Online);

        h.services.message.append(&conversation_id, "a@x.io", "hello bob", None).await.unwrap();
        bob.refresh().await;
        wait(1).await;
        let snapshot = bob.latest().unwrap();
        assert!(snapshot.typing.is_empty());
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].sender, SenderLabel::Them);
        assert_eq!(snapshot.messages[0].text, "hello bob");

        alice.keystroke().await;
        wait(1).await;
        alice.stop().await;
        let conversation = h.services.conversation.get_by_id(&conversation_id).await.unwrap();
        assert!(conversation.typing_users.is_empty());
        bob.stop().await;
    }
}
