//! 파이프라인 오케스트레이션 -- 수집/파싱/전달의 전체 흐름을 관리합니다.
//!
//! [`LogPipeline`]은 core의 [`Pipeline`](catcher_core::pipeline::Pipeline) trait을 구현하여
//! `catcher-daemon`에서 다른 모듈과 동일한 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! SyslogUdpCollector -> mpsc<RawLog> -> processing loop -> parse task (라인마다) -> mpsc<Event> -> broker
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use catcher_core::error::{CatcherError, ParseError, PipelineError};
use catcher_core::event::Event;
use catcher_core::metrics as m;
use catcher_core::pipeline::{HealthStatus, Pipeline};

use crate::collector::{RawLog, SyslogUdpCollector, SyslogUdpConfig};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::parser::TemplateParser;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 파이프라인 처리 통계
///
/// 파싱 태스크들이 동시에 갱신하므로 원자 카운터를 사용합니다.
#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    parsed: AtomicU64,
    unknown_format: AtomicU64,
    malformed: AtomicU64,
}

impl PipelineStats {
    /// 수신한 라인 수
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// 이벤트로 변환된 라인 수
    pub fn parsed(&self) -> u64 {
        self.parsed.load(Ordering::Relaxed)
    }

    /// 어떤 템플릿과도 맞지 않은 라인 수
    pub fn unknown_format(&self) -> u64 {
        self.unknown_format.load(Ordering::Relaxed)
    }

    /// 필드 추출에 실패한 라인 수
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// 전체 파싱 실패 수
    pub fn errors(&self) -> u64 {
        self.unknown_format() + self.malformed()
    }

    fn record_error(&self, err: &ParseError) {
        let counter = match err {
            ParseError::UnknownFormat { .. } => &self.unknown_format,
            ParseError::MalformedField { .. } => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 로그 파이프라인 -- UDP 수집, 템플릿 파싱, 이벤트 전달을 관리합니다.
///
/// core의 `Pipeline` trait을 구현하여 `catcher-daemon`에서
/// 다른 모듈과 동일한 생명주기(start/stop/health_check)로 관리됩니다.
///
/// # 사용 예시
/// ```ignore
/// use catcher_log_pipeline::LogPipelineBuilder;
///
/// let (mut pipeline, event_rx) = LogPipelineBuilder::new()
///     .config(config)
///     .build()?;
///
/// pipeline.start().await?;
/// ```
pub struct LogPipeline {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태
    state: PipelineState,
    /// 컴파일된 템플릿 파서 (파싱 태스크 간 공유)
    parser: Arc<TemplateParser>,
    /// 이벤트 전송 채널 (파이프라인 -> broker)
    event_tx: mpsc::Sender<Event>,
    /// 처리 통계
    stats: Arc<PipelineStats>,
    /// 실행 중 태스크 취소 토큰 (start마다 새로 생성)
    cancel_token: CancellationToken,
    /// 백그라운드 태스크 핸들
    tasks: Vec<JoinHandle<()>>,
    /// 수집기가 실제로 바인드한 주소
    local_addr: Option<SocketAddr>,
}

impl LogPipeline {
    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 처리 통계를 반환합니다.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// 컴파일된 템플릿 패턴 수를 반환합니다.
    pub fn pattern_count(&self) -> usize {
        self.parser.pattern_count()
    }

    /// 실행 중인 수집기의 바인드 주소를 반환합니다.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Pipeline for LogPipeline {
    async fn start(&mut self) -> Result<(), CatcherError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tracing::info!(
            bind = %self.config.syslog_bind,
            patterns = self.parser.pattern_count(),
            "starting log pipeline"
        );

        let cancel_token = CancellationToken::new();
        let (raw_tx, raw_rx) = mpsc::channel(self.config.raw_channel_capacity);

        // 1. 수집기 바인드 (실패 시 시작 중단)
        let collector = SyslogUdpCollector::bind(
            SyslogUdpConfig {
                bind_addr: self.config.syslog_bind.clone(),
                buf_size: self.config.buf_size,
            },
            raw_tx,
            cancel_token.clone(),
        )
        .await?;
        self.local_addr = Some(collector.local_addr());

        // 2. 수집기 태스크 스폰
        let collector_task = tokio::spawn(async move {
            if let Err(e) = collector.run().await {
                tracing::error!(error = %e, "UDP syslog collector failed");
            }
        });

        // 3. 메인 처리 루프 스폰
        let processing_task = tokio::spawn(process_loop(
            raw_rx,
            Arc::clone(&self.parser),
            self.event_tx.clone(),
            Arc::clone(&self.stats),
            self.config.max_inflight_parses,
            cancel_token.clone(),
        ));

        self.tasks = vec![collector_task, processing_task];
        self.cancel_token = cancel_token;
        self.state = PipelineState::Running;
        tracing::info!("log pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CatcherError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping log pipeline");

        self.cancel_token.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "pipeline task ended abnormally");
            }
        }

        self.local_addr = None;
        self.state = PipelineState::Stopped;
        tracing::info!(
            received = self.stats.received(),
            parsed = self.stats.parsed(),
            unknown_format = self.stats.unknown_format(),
            malformed = self.stats.malformed(),
            "log pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                if self.tasks.iter().any(JoinHandle::is_finished) {
                    HealthStatus::Degraded("pipeline task exited".to_owned())
                } else if self.event_tx.is_closed() {
                    HealthStatus::Degraded("event receiver closed".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 원시 로그를 받아 라인마다 파싱 태스크를 스폰합니다.
///
/// 태스크마다 세마포어 permit을 잡고 시작하며, permit이 모두 사용 중이면
/// 새 라인을 받지 않습니다. 취소되면 수신을 멈추고 남은 파싱 태스크를 기다립니다.
async fn process_loop(
    mut raw_rx: mpsc::Receiver<RawLog>,
    parser: Arc<TemplateParser>,
    event_tx: mpsc::Sender<Event>,
    stats: Arc<PipelineStats>,
    max_inflight: usize,
    cancel_token: CancellationToken,
) {
    let inflight = Arc::new(Semaphore::new(max_inflight));
    let mut parse_tasks = JoinSet::new();

    loop {
        while parse_tasks.try_join_next().is_some() {}

        let permit = tokio::select! {
            permit = Arc::clone(&inflight).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = cancel_token.cancelled() => {
                tracing::debug!("processing loop received shutdown signal");
                break;
            }
        };

        tokio::select! {
            raw = raw_rx.recv() => {
                let Some(raw) = raw else {
                    tracing::debug!("raw log channel closed");
                    break;
                };
                stats.received.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(m::SYSLOG_LINES_RECEIVED_TOTAL).increment(1);

                let line_task = handle_line(
                    raw,
                    Arc::clone(&parser),
                    event_tx.clone(),
                    Arc::clone(&stats),
                    cancel_token.clone(),
                );
                parse_tasks.spawn(async move {
                    line_task.await;
                    drop(permit);
                });
            }
            _ = cancel_token.cancelled() => {
                tracing::debug!("processing loop received shutdown signal");
                break;
            }
        }
    }

    while parse_tasks.join_next().await.is_some() {}
}

/// 라인 하나를 파싱하고 결과에 따라 전달하거나 기록합니다.
async fn handle_line(
    raw: RawLog,
    parser: Arc<TemplateParser>,
    event_tx: mpsc::Sender<Event>,
    stats: Arc<PipelineStats>,
    cancel_token: CancellationToken,
) {
    let line = raw.line();
    let started = Instant::now();
    let result = parser.parse(&line);
    metrics::histogram!(m::SYSLOG_PARSE_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(event) => {
            stats.parsed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(
                m::SYSLOG_EVENTS_PARSED_TOTAL,
                m::LABEL_KIND => event.kind.as_str()
            )
            .increment(1);

            tokio::select! {
                sent = event_tx.send(event) => {
                    if sent.is_err() {
                        tracing::debug!(source = %raw.source, "event receiver dropped, discarding event");
                    }
                }
                _ = cancel_token.cancelled() => {
                    tracing::debug!(source = %raw.source, "pipeline stopping, discarding pending event");
                }
            }
        }
        Err(err) => {
            stats.record_error(&err);
            metrics::counter!(
                m::SYSLOG_PARSE_ERRORS_TOTAL,
                m::LABEL_REASON => err.reason_label()
            )
            .increment(1);

            match &err {
                ParseError::UnknownFormat { .. } => {
                    tracing::debug!(source = %raw.source, error = %err, "unmatched syslog line");
                }
                ParseError::MalformedField { field, .. } => {
                    tracing::warn!(
                        source = %raw.source,
                        field = %field,
                        error = %err,
                        "malformed syslog line"
                    );
                }
            }
        }
    }
}

/// 로그 파이프라인 빌더
///
/// 템플릿을 컴파일하고 이벤트 채널을 구성합니다.
pub struct LogPipelineBuilder {
    config: PipelineConfig,
    event_tx: Option<mpsc::Sender<Event>>,
    event_channel_capacity: usize,
}

impl LogPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            event_tx: None,
            event_channel_capacity: 4096,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 외부 이벤트 전송 채널을 설정합니다.
    ///
    /// `catcher-daemon`에서 broker 입력 채널을 여기에 연결합니다.
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn event_sender(mut self, tx: mpsc::Sender<Event>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 이벤트 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// 템플릿 컴파일 실패는 여기서 에러로 반환됩니다.
    ///
    /// # Returns
    /// - `LogPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<Event>>`: 이벤트 수신 채널
    ///   (외부 event_sender를 설정한 경우 None)
    pub fn build(self) -> Result<(LogPipeline, Option<mpsc::Receiver<Event>>), LogPipelineError> {
        self.config.validate()?;
        if self.event_channel_capacity == 0 {
            return Err(LogPipelineError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let parser = TemplateParser::new(&self.config.templates)?;

        let (event_tx, event_rx) = match self.event_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.event_channel_capacity);
                (tx, Some(rx))
            }
        };

        let pipeline = LogPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            parser: Arc::new(parser),
            event_tx,
            stats: Arc::new(PipelineStats::default()),
            cancel_token: CancellationToken::new(),
            tasks: Vec::new(),
            local_addr: None,
        };

        Ok((pipeline, event_rx))
    }
}

impl Default for LogPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
