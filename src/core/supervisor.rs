//! # Supervisor: hosts the registry, the control API and the shutdown path.
//!
//! The [`Supervisor`] owns the event bus, the [`Registry`] and the
//! [`SubscriberSet`]. [`Supervisor::run`] serves the control API until a
//! termination signal arrives, then drains every child within the grace period.
//!
//! ## High-level architecture
//! ```text
//! run(listener)
//!   ├─► subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   ├─► axum::serve(listener, api::router(registry))      (graceful on `stop`)
//!   ├─► autostart: sleep(autostart_delay) ─► registry.start_all()
//!   └─► select! {
//!         wait_for_shutdown_signal()  → shutdown requested
//!         server exits on its own     → shutdown with its error
//!       }
//!
//! Shutdown path:
//!   stop.cancel()                    → API stops accepting, autostart abandoned
//!   shutdown::drain(registry, grace):
//!        ├─ Ok (all exited)     → Bus.publish(AllStoppedWithin)
//!        └─ Timeout exceeded    → Bus.publish(GraceExceeded)
//!                                 RuntimeError::GraceExceeded { stuck }
//!   subscriber listener flushes the bus backlog, then SubscriberSet::shutdown()
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use mcpvisor::{ConfigStore, LogWriter, Subscribe, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = ConfigStore::load("mcp_config.json")?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default(), store)
//!         .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
//!         .build();
//!     sup.run(listener).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api;
use crate::config::{ConfigStore, SupervisorConfig};
use crate::error::RuntimeError;
use crate::events::Bus;
use crate::subscribers::SubscriberSet;

use super::builder::SupervisorBuilder;
use super::registry::Registry;
use super::shutdown;

/// Hosts the registry, event delivery and the control API.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    registry: Arc<Registry>,
    subs: Mutex<Option<SubscriberSet>>,
}

impl Supervisor {
    /// Starts building a supervisor over `store`.
    pub fn builder(cfg: SupervisorConfig, store: ConfigStore) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, store)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        registry: Arc<Registry>,
        subs: SubscriberSet,
    ) -> Self {
        Self {
            cfg,
            bus,
            registry,
            subs: Mutex::new(Some(subs)),
        }
    }

    /// The server registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The event bus shared with the registry and watchers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runtime settings.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Serves the control API on `listener` until a termination signal arrives,
    /// then stops every server.
    pub async fn run(&self, listener: TcpListener) -> Result<(), RuntimeError> {
        self.run_until(listener, shutdown::wait_for_shutdown_signal())
            .await
    }

    /// Like [`run`](Self::run), but shuts down when `signal` completes.
    ///
    /// A signal that resolves to an error still triggers the full shutdown;
    /// the error is returned afterwards.
    pub async fn run_until<F>(&self, listener: TcpListener, signal: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let stop = CancellationToken::new();
        let events_done = CancellationToken::new();
        let events = self.subscriber_listener(events_done.clone()).await;

        match listener.local_addr() {
            Ok(addr) => info!(%addr, servers = self.registry.store().len(), "control api listening"),
            Err(e) => warn!(error = %e, "control api listening on unknown address"),
        }
        let app = api::router(Arc::clone(&self.registry));
        let server_stop = stop.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(server_stop.cancelled_owned())
                .await
        });
        self.spawn_autostart(stop.clone());

        let mut server_finished = false;
        let trigger = tokio::select! {
            res = signal => match res {
                Ok(()) => {
                    info!("shutdown signal received");
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "signal handling failed, shutting down");
                    Err(RuntimeError::Signal(e))
                }
            },
            res = &mut server => {
                server_finished = true;
                let res = flatten_serve(res);
                if let Err(e) = &res {
                    error!(error = %e, "control api stopped unexpectedly");
                }
                res
            }
        };

        stop.cancel();
        let drained = shutdown::drain(&self.registry, &self.bus, self.cfg.grace).await;
        match &drained {
            Ok(()) => info!("all servers stopped"),
            Err(e) => warn!(error = %e, "shutdown incomplete"),
        }

        if !server_finished {
            match tokio::time::timeout(self.cfg.grace, &mut server).await {
                Ok(res) => {
                    if let Err(e) = flatten_serve(res) {
                        warn!(error = %e, "control api shut down with error");
                    }
                }
                Err(_) => {
                    warn!("control api did not close in time, aborting");
                    server.abort();
                }
            }
        }

        events_done.cancel();
        if let Some(events) = events {
            let _ = events.await;
        }

        trigger.and(drained)
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// Once `done` fires, the remaining backlog is flushed and the set is shut down.
    /// Returns `None` if the set was already taken by a previous run.
    async fn subscriber_listener(&self, done: CancellationToken) -> Option<JoinHandle<()>> {
        let set = self.subs.lock().await.take()?;
        let mut rx = self.bus.subscribe();

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber listener lagged behind the bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = done.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        }))
    }

    /// Schedules start-all after the configured delay, unless disabled.
    fn spawn_autostart(&self, stop: CancellationToken) {
        let Some(delay) = self.cfg.autostart_after() else {
            return;
        };
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let report = registry.start_all().await;
            info!(
                started = report.succeeded.len(),
                failed = report.failed.len(),
                "auto start finished"
            );
        });
    }
}

fn flatten_serve(
    res: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), RuntimeError> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RuntimeError::Serve(e)),
        Err(join) => Err(RuntimeError::Serve(std::io::Error::other(join))),
    }
}
