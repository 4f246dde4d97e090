//! Single-flight coordination of token refresh
//!
//! At most one refresh call is ever outstanding. The first request to
//! observe an auth failure becomes the leader and performs the refresh;
//! requests that fail while it is outstanding join as followers and wait
//! for the shared outcome. The outcome is broadcast once, so followers
//! settle in broadcast order, not arrival order.

use std::sync::Mutex;

use tokio::sync::watch;

/// Shared result of one refresh episode. The error carries the refresh
/// failure message every queued request rejects with.
pub(crate) type RefreshOutcome = Result<(), String>;

type Slot = watch::Receiver<Option<RefreshOutcome>>;

/// Owns the refresh-in-flight state and the waiter queue
#[derive(Debug, Default)]
pub(crate) struct RefreshCoordinator {
    in_flight: Mutex<Option<Slot>>,
}

/// How a caller participates in the current refresh episode
pub(crate) enum RefreshRole<'a> {
    /// This caller must perform the refresh and settle the episode
    Leader(RefreshTicket<'a>),
    /// A refresh is already outstanding; wait for its outcome
    Follower(RefreshWaiter),
}

pub(crate) struct RefreshTicket<'a> {
    coordinator: &'a RefreshCoordinator,
    sender: watch::Sender<Option<RefreshOutcome>>,
    settled: bool,
}

pub(crate) struct RefreshWaiter {
    receiver: Slot,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight refresh episode, or start one
    pub(crate) fn begin(&self) -> RefreshRole<'_> {
        let mut slot = self
            .in_flight
            .lock()
            .expect("refresh coordinator lock poisoned");

        if let Some(receiver) = slot.as_ref() {
            return RefreshRole::Follower(RefreshWaiter {
                receiver: receiver.clone(),
            });
        }

        let (sender, receiver) = watch::channel(None);
        *slot = Some(receiver);
        RefreshRole::Leader(RefreshTicket {
            coordinator: self,
            sender,
            settled: false,
        })
    }

    fn clear(&self) {
        self.in_flight
            .lock()
            .expect("refresh coordinator lock poisoned")
            .take();
    }
}

impl RefreshTicket<'_> {
    /// Broadcast the outcome to every waiter and end the episode.
    ///
    /// The slot is cleared before the broadcast so a request failing
    /// after settlement starts a new episode instead of joining a
    /// finished one.
    pub(crate) fn settle(mut self, outcome: RefreshOutcome) {
        self.coordinator.clear();
        self.settled = true;
        let _ = self.sender.send(Some(outcome));
    }
}

impl Drop for RefreshTicket<'_> {
    fn drop(&mut self) {
        // A leader that never settled (e.g. its task was dropped) must
        // not leave the episode open forever; waiters observe the closed
        // channel as a failure.
        if !self.settled {
            self.coordinator.clear();
        }
    }
}

impl RefreshWaiter {
    /// Wait until the leader settles the episode
    pub(crate) async fn outcome(mut self) -> RefreshOutcome {
        match self.receiver.wait_for(Option::is_some).await {
            Ok(settled) => settled.clone().unwrap_or_else(|| {
                Err("refresh settled without an outcome".to_string())
            }),
            Err(_) => Err("refresh abandoned before settling".to_string()),
        }
    }
}
