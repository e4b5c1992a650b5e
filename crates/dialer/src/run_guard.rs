//! RAII guard for the lifetime of a dial run.
//!
//! Whatever way the run task exits, the session must go back to idle,
//! otherwise `isDialing` would stay stuck and no new run could start.

use tracing::{debug, warn};
use uuid::Uuid;

use events::{Event, EventBus};

use crate::session::SessionHandle;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub cancelled: bool,
}

/// Returns the session to idle when dropped.
///
/// Call [`finish`](Self::finish) on the normal exit path. If the guard is
/// dropped without it (the run task panicked or was aborted) the session is
/// still reset and a cancelled `dial.finished` event is emitted.
pub struct RunGuard {
    run_id: Uuid,
    session: SessionHandle,
    event_bus: Option<EventBus>,
    finished: bool,
}

impl RunGuard {
    pub fn new(run_id: Uuid, session: SessionHandle, event_bus: Option<EventBus>) -> Self {
        debug!(run_id = %run_id, "Run guard created");

        Self {
            run_id,
            session,
            event_bus,
            finished: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn finish(mut self, cancelled: bool) -> RunSummary {
        self.finished = true;
        self.release(cancelled)
    }

    fn release(&self, cancelled: bool) -> RunSummary {
        let progress = self.session.end_run();
        let (total, processed) = progress.map_or((0, 0), |p| (p.total, p.processed));

        if let Some(ref bus) = self.event_bus {
            bus.emit(Event::DialFinished {
                run_id: self.run_id,
                processed,
                cancelled,
            });
        }

        RunSummary {
            run_id: self.run_id,
            total,
            processed,
            cancelled,
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                run_id = %self.run_id,
                "Run guard dropped without finishing - resetting session"
            );
            self.release(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::RunState;

    #[test]
    fn test_finish_resets_session() {
        let session = SessionHandle::new();
        let run_id = Uuid::new_v4();
        session.begin_run(run_id, 2, true).unwrap();
        session.record_processed();

        let guard = RunGuard::new(run_id, session.clone(), None);
        let summary = guard.finish(false);

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.total, 2);
        assert!(!summary.cancelled);
        assert_eq!(session.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_drop_without_finish_emits_cancelled() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let session = SessionHandle::new();
        let run_id = Uuid::new_v4();
        session.begin_run(run_id, 1, true).unwrap();

        drop(RunGuard::new(run_id, session.clone(), Some(bus)));

        assert!(!session.is_dialing());
        match rx.recv().await.unwrap().event {
            Event::DialFinished {
                run_id: finished,
                cancelled,
                ..
            } => {
                assert_eq!(finished, run_id);
                assert!(cancelled);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_run_still_releases() {
        let session = SessionHandle::new();
        let run_id = Uuid::new_v4();
        session.begin_run(run_id, 1, true).unwrap();

        let task_session = session.clone();
        let handle = tokio::spawn(async move {
            let _guard = RunGuard::new(run_id, task_session, None);
            panic!("dial loop blew up");
        });

        assert!(handle.await.is_err());
        assert_eq!(session.state(), RunState::Idle);
    }
}
