//! Component orchestration -- assembly, channel wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `catcher-daemon`.
//! It builds the log pipeline, the subscription broker, and the stream
//! server from one [`CatcherConfig`], wires them together, and runs the
//! main loop until a shutdown signal arrives.
//!
//! # Data Flow
//!
//! ```text
//! UDP syslog -> LogPipeline --mpsc<Event>--> Broker dispatcher
//!                                              |-> Subscription queue -> stream client
//!                                              |-> Subscription queue -> stream client
//! ```
//!
//! # Startup Order (consumers before producers)
//!
//! 1. Broker dispatcher (drains the event channel)
//! 2. Log Pipeline (binds the syslog socket, produces Events)
//! 3. Stream Server (accepts subscribers)
//!
//! # Shutdown Order
//!
//! 1. Log Pipeline (stop producing Events)
//! 2. Broker (close every subscription, stop the dispatcher)
//! 3. Stream Server (stop accepting, await open connections)

use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use catcher_broker::{Broker, BrokerConfig};
use catcher_core::config::CatcherConfig;
use catcher_core::event::Event;
use catcher_core::metrics as m;
use catcher_core::pipeline::{HealthStatus, Pipeline};
use catcher_log_pipeline::{LogPipeline, LogPipelineBuilder, PipelineConfig};

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::metrics_server;
use crate::stream_server::{StreamServer, StreamServerConfig};

/// How often the main loop polls component health.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// The main daemon orchestrator.
///
/// Manages the complete lifecycle of the daemon components:
/// configuration, channel wiring, ordered startup,
/// health monitoring, and graceful shutdown.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: CatcherConfig,
    /// Syslog ingestion and parsing.
    pipeline: LogPipeline,
    /// Subscription registry and fan-out.
    broker: Broker,
    /// Pipeline output, handed to the dispatcher on start.
    event_rx: Option<mpsc::Receiver<Event>>,
    dispatcher: Option<JoinHandle<()>>,
    stream_config: StreamServerConfig,
    stream_cancel: CancellationToken,
    stream_task: Option<JoinHandle<Result<()>>>,
    stream_addr: Option<SocketAddr>,
    /// Signals background tasks owned by the orchestrator itself.
    shutdown_token: CancellationToken,
    uptime_task: Option<JoinHandle<()>>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// This performs the following steps:
    /// 1. Load `catcher.toml` and apply environment variable overrides
    /// 2. Validate the configuration
    /// 3. Create the event channel
    /// 4. Build the pipeline, broker, and stream server settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - Any component fails to build (e.g. a bad template)
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = CatcherConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Useful for testing or when config has already been loaded.
    pub async fn build_from_config(config: CatcherConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before component initialization
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        tracing::debug!(
            capacity = config.broker.input_capacity,
            "creating pipeline -> broker event channel"
        );
        let (event_tx, event_rx) = mpsc::channel::<Event>(config.broker.input_capacity);

        tracing::info!("initializing broker");
        let broker_config = BrokerConfig::from_core(&config.broker)
            .map_err(|e| anyhow::anyhow!("failed to build broker: {}", e))?;
        let broker = Broker::new(broker_config);

        tracing::info!(templates = config.syslog.templates.len(), "initializing log pipeline");
        let (pipeline, _) = LogPipelineBuilder::new()
            .config(PipelineConfig::from_core(&config.syslog))
            .event_sender(event_tx)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build log pipeline: {}", e))?;

        let stream_config = StreamServerConfig::from_core(&config.stream);

        tracing::info!(
            patterns = pipeline.pattern_count(),
            stream_listen = %stream_config.listen,
            "orchestrator initialized"
        );

        if config.metrics.enabled {
            record_daemon_metrics();
        }

        Ok(Self {
            config,
            pipeline,
            broker,
            event_rx: Some(event_rx),
            dispatcher: None,
            stream_config,
            stream_cancel: CancellationToken::new(),
            stream_task: None,
            stream_addr: None,
            shutdown_token: CancellationToken::new(),
            uptime_task: None,
            start_time: Instant::now(),
        })
    }

    /// Start every component in dependency order.
    ///
    /// On failure, components that already started are stopped again.
    /// An orchestrator can be started once.
    pub async fn start(&mut self) -> Result<()> {
        let event_rx = self
            .event_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("orchestrator already started"))?;

        tracing::info!("starting broker dispatcher");
        self.dispatcher = Some(self.broker.spawn_dispatcher(event_rx));

        tracing::info!("starting log pipeline");
        if let Err(e) = self.pipeline.start().await {
            tracing::warn!("startup failed, rolling back already-started components");
            self.rollback().await;
            return Err(anyhow::anyhow!("failed to start log pipeline: {}", e));
        }

        tracing::info!("starting stream server");
        let server = match StreamServer::bind(
            self.stream_config.clone(),
            self.broker.clone(),
            self.stream_cancel.clone(),
        )
        .await
        {
            Ok(server) => server,
            Err(e) => {
                tracing::warn!("startup failed, rolling back already-started components");
                if let Err(stop_err) = self.pipeline.stop().await {
                    tracing::error!(
                        startup_error = %e,
                        rollback_error = %stop_err,
                        "rollback also failed during startup failure cleanup"
                    );
                }
                self.rollback().await;
                return Err(e);
            }
        };
        self.stream_addr = Some(server.local_addr());
        self.stream_task = Some(tokio::spawn(server.run()));

        if self.config.metrics.enabled {
            self.uptime_task = Some(spawn_uptime_updater(
                self.start_time,
                self.shutdown_token.clone(),
            ));
        }

        tracing::info!(
            syslog_addr = ?self.syslog_addr(),
            stream_addr = ?self.stream_addr,
            "all components started"
        );
        Ok(())
    }

    /// Close the broker and wait for the dispatcher after a failed start.
    async fn rollback(&mut self) {
        self.broker.close();
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.await;
        }
    }

    /// Start all components and enter the main event loop.
    ///
    /// This method blocks until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        let pid_file = self.config.general.pid_file.clone();
        if !pid_file.is_empty() {
            write_pid_file(Path::new(&pid_file))?;
        }

        if let Err(e) = self.start().await {
            tracing::error!(error = %e, "daemon startup failed");
            if !pid_file.is_empty() {
                remove_pid_file(Path::new(&pid_file));
            }
            return Err(e);
        }

        tracing::info!("entering main event loop");
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);
        let mut health_interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        health_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        health_interval.tick().await;

        let result = loop {
            tokio::select! {
                signal = &mut signal => {
                    match &signal {
                        Ok(name) => tracing::info!(signal = name, "shutdown signal received"),
                        Err(e) => tracing::error!(error = %e, "signal handling failed"),
                    }
                    break signal.map(|_| ());
                }
                _ = health_interval.tick() => {
                    let health = self.health().await;
                    match &health.status {
                        HealthStatus::Healthy => tracing::debug!(uptime_secs = health.uptime_secs, "daemon healthy"),
                        HealthStatus::Degraded(reason) => tracing::warn!(reason = %reason, "daemon degraded"),
                        HealthStatus::Unhealthy(reason) => tracing::error!(reason = %reason, "daemon unhealthy"),
                    }
                    for sub in &health.subscriptions {
                        tracing::debug!(
                            subscription = %sub.id,
                            queued = sub.queued,
                            delivered = sub.delivered,
                            dropped = sub.dropped,
                            "subscription status"
                        );
                    }
                }
            }
        };

        let shutdown = self.shutdown().await;

        if !pid_file.is_empty() {
            remove_pid_file(Path::new(&pid_file));
        }

        result.and(shutdown)
    }

    /// Perform graceful shutdown of all components.
    ///
    /// The pipeline stops first so no new events arrive; closing the broker
    /// then ends every subscription, which lets stream connections finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping all components");
        let mut first_error = None;

        if let Err(e) = self.pipeline.stop().await {
            tracing::warn!(error = %e, "log pipeline stop failed");
            first_error.get_or_insert_with(|| anyhow::anyhow!("failed to stop log pipeline: {}", e));
        }

        self.broker.close();
        if let Some(dispatcher) = self.dispatcher.take() {
            if let Err(e) = dispatcher.await {
                tracing::error!(error = %e, "broker dispatcher panicked");
            }
        }

        self.stream_cancel.cancel();
        if let Some(task) = self.stream_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "stream server exited with error");
                    first_error.get_or_insert(e);
                }
                Err(e) => tracing::error!(error = %e, "stream server task panicked"),
            }
        }

        self.shutdown_token.cancel();
        if let Some(task) = self.uptime_task.take() {
            let _ = task.await;
        }

        tracing::info!(broker = ?self.broker.stats(), "all components stopped");
        first_error.map_or(Ok(()), Err)
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let broker_status = if self.broker.is_closed() {
            HealthStatus::Unhealthy("broker closed".to_owned())
        } else if self.dispatcher.as_ref().is_some_and(JoinHandle::is_finished) {
            HealthStatus::Unhealthy("broker dispatcher stopped".to_owned())
        } else {
            HealthStatus::Healthy
        };
        let stream_status = match &self.stream_task {
            Some(task) if task.is_finished() => {
                HealthStatus::Unhealthy("stream server stopped".to_owned())
            }
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Degraded("stream server not started".to_owned()),
        };

        let modules = vec![
            ModuleHealth {
                name: "log-pipeline".to_owned(),
                enabled: true,
                status: self.pipeline.health_check().await,
            },
            ModuleHealth {
                name: "broker".to_owned(),
                enabled: true,
                status: broker_status,
            },
            ModuleHealth {
                name: "stream-server".to_owned(),
                enabled: true,
                status: stream_status,
            },
        ];

        let uptime_secs = self.start_time.elapsed().as_secs();
        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status: aggregate_status(&modules),
            uptime_secs,
            modules,
            subscriptions: self.broker.subscriptions(),
        }
    }

    /// Bound syslog UDP address, once started.
    pub fn syslog_addr(&self) -> Option<SocketAddr> {
        self.pipeline.local_addr()
    }

    /// Bound stream server address, once started.
    pub fn stream_addr(&self) -> Option<SocketAddr> {
        self.stream_addr
    }

    /// The subscription broker.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &CatcherConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create file (prevents TOCTOU races)
/// - Verifies the created file is a regular file
/// - Creates parent directory with restrictive permissions (0o700)
///
/// # Errors
///
/// Returns an error if the PID file cannot be written.
pub fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
pub fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove PID file"
        );
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

/// Record daemon-level metrics (build info).
fn record_daemon_metrics() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

/// Spawn a background task that periodically updates the uptime metric.
///
/// Updates every 10 seconds to keep the metric fresh for Prometheus scrapes.
fn spawn_uptime_updater(start_time: Instant, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown.cancelled() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
