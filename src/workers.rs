//! Background jobs: the periodic snapshot flush and stale lesson session
//! cleanup. Both run on an injected cron scheduler so tests can invoke the
//! underlying engine methods directly, without timers.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::engine::TutorEngine;
use crate::error::WorkerError;

const SESSION_CLEANUP_SCHEDULE: &str = "0 */5 * * * *";

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    engine: Arc<TutorEngine>,
    flush_schedule: String,
}

impl WorkerManager {
    pub async fn new(engine: Arc<TutorEngine>, flush_schedule: String) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            engine,
            flush_schedule,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let scheduler = self.scheduler.lock().await;

        {
            let engine = Arc::clone(&self.engine);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(self.flush_schedule.as_str(), move |_uuid, _lock| {
                let engine = Arc::clone(&engine);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        saved = engine.snapshot_all() => {
                            if saved > 0 {
                                info!(saved, "snapshot flush complete");
                            }
                        }
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %self.flush_schedule, "snapshot flush worker scheduled");
        }

        {
            let engine = Arc::clone(&self.engine);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(SESSION_CLEANUP_SCHEDULE, move |_uuid, _lock| {
                let engine = Arc::clone(&engine);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        _ = engine.remove_stale_sessions() => {}
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!("session cleanup worker scheduled (every 5 minutes)");
        }

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        info!("workers started");
        Ok(())
    }

    /// Signals jobs, stops the scheduler, and writes a final flush so a
    /// graceful shutdown never loses the last 30 seconds.
    pub async fn stop(&self) {
        info!("stopping workers");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "error shutting down scheduler");
        }
        drop(scheduler);

        let saved = self.engine.snapshot_all().await;
        info!(saved, "final snapshot flush complete");
    }
}
