//! Main application orchestration and execution

use crate::{
    cli::Cli,
    client::{HttpProbeClient, ProbeClient, CANCELLED_MESSAGE},
    config::{display_config_summary, load_config, validate_config},
    error::{AppError, Result},
    executor::{ChannelSink, Scheduler, StartOutcome},
    log_debug, log_info, log_warn,
    logging::{Logger, LoggerFactory},
    models::Config,
    output::{JsonFormatter, OutputCoordinator, OutputFormatterFactory, ResultFormatter, ResultsReport},
    session::{StatusCounts, TestSession},
    types::TestStatus,
};
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

/// Report panics on stderr without ending the process.
///
/// Panics inside probes are caught by the scheduler and recorded on their entry.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
    }));
}

/// Resolves on Ctrl+C; never resolves where signals are unavailable
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    logger_factory: LoggerFactory,
    logger: Logger,
}

impl App {
    /// Load configuration from CLI arguments, `.env` and the environment
    pub fn new(cli: Cli) -> Result<Self> {
        Ok(Self::from_config(load_config(cli)?))
    }

    pub fn from_config(config: Config) -> Self {
        let logger_factory = LoggerFactory::new(config.clone());
        let logger = logger_factory.create_logger("APP");
        Self {
            config,
            logger_factory,
            logger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run against the configured provider over HTTP
    pub async fn run(self) -> Result<StatusCounts> {
        let probe = Arc::new(HttpProbeClient::new()?);
        self.run_with_probe(probe).await
    }

    /// Run with a specific probe client.
    ///
    /// Returns the final counts; Ctrl+C yields `AppError::Cancelled` after the
    /// partial results are printed.
    pub async fn run_with_probe(self, probe: Arc<dyn ProbeClient>) -> Result<StatusCounts> {
        self.run_until(probe, ctrl_c()).await
    }

    /// Run with a specific probe client, stopping early once `interrupt` resolves
    pub async fn run_until<I>(self, probe: Arc<dyn ProbeClient>, interrupt: I) -> Result<StatusCounts>
    where
        I: Future<Output = ()>,
    {
        let config = &self.config;
        colored::control::set_override(config.enable_color);

        let warnings = validate_config(config)?;
        let formatter = OutputFormatterFactory::create_formatter(config.enable_color, config.verbose);
        for warning in &warnings {
            eprintln!("{}", warning.format(config.enable_color));
        }
        if config.debug {
            eprintln!("Configuration Summary:\n{}\n", display_config_summary(config));
        }

        let session = Arc::new(TestSession::from_config(config));
        self.logger.set_session_id(session.id().to_string());
        self.logger.add_context_field("engine", session.provider().engine);
        self.logger.add_context_field("base_url", &session.provider().base_url);
        let (sink, mut updates) = ChannelSink::new();
        let scheduler = Scheduler::new(probe, Arc::new(sink))
            .with_probe_timeout(config.timeout())
            .with_logger(self.logger_factory.create_scheduler_logger());

        log_info!(
            self.logger,
            "Testing {} models at {} ({})",
            session.store().len(),
            session.provider().base_url,
            session.provider().engine
        );

        let started = Instant::now();
        let interrupted = match &config.only {
            Some(model) => {
                self.drive_single(&scheduler, &session, model, &mut updates, formatter.as_ref(), interrupt)
                    .await?
            }
            None => {
                self.drive_bulk(&scheduler, &session, &mut updates, formatter.as_ref(), interrupt)
                    .await?
            }
        };
        let elapsed = started.elapsed();

        scheduler.close(&session);
        while let Ok(name) = updates.try_recv() {
            self.print_progress(&session, &name, formatter.as_ref());
        }

        let filter = config.filter.as_deref();
        if config.json_output {
            println!("{}", JsonFormatter::format_report(&ResultsReport::capture(&session, filter, elapsed))?);
        } else {
            let coordinator = OutputCoordinator::new(formatter);
            println!();
            println!("{}", coordinator.display_results(&session, filter, elapsed)?);
        }

        let counts = session.store().counts();
        log_debug!(self.logger, "Finished: {} ok, {} failed", counts.success, counts.error);

        if interrupted {
            log_warn!(self.logger, "Interrupted with {} models not probed", counts.pending);
            return Err(AppError::cancelled("interrupted by Ctrl+C"));
        }
        Ok(counts)
    }

    /// Run every model; `interrupt` stops the run and waits for it to wind down.
    ///
    /// Returns whether the run was interrupted.
    async fn drive_bulk<I>(
        &self,
        scheduler: &Scheduler,
        session: &Arc<TestSession>,
        updates: &mut UnboundedReceiver<String>,
        formatter: &dyn ResultFormatter,
        interrupt: I,
    ) -> Result<bool>
    where
        I: Future<Output = ()>,
    {
        match scheduler.start_all(session, session.concurrency())? {
            StartOutcome::Started { run_id, workers } => {
                log_debug!(self.logger, "Bulk run {} started with {} workers", run_id, workers);
            }
            StartOutcome::AlreadyRunning { run_id } => {
                return Err(AppError::internal(format!("bulk run {} already active on a new session", run_id)));
            }
        }

        let mut idle = pin!(scheduler.wait_idle(session));
        let mut interrupt = pin!(interrupt);
        let mut interrupted = false;
        loop {
            tokio::select! {
                _ = &mut idle => break,
                Some(name) = updates.recv() => self.print_progress(session, &name, formatter),
                _ = &mut interrupt, if !interrupted => {
                    interrupted = true;
                    if !self.config.json_output {
                        eprintln!("{}", formatter.format_warning("Stopping; waiting for in-flight probes..."));
                    }
                    scheduler.stop(session);
                }
            }
        }

        Ok(interrupted)
    }

    /// Probe one model; `interrupt` abandons it and records it as cancelled.
    async fn drive_single<I>(
        &self,
        scheduler: &Scheduler,
        session: &Arc<TestSession>,
        model: &str,
        updates: &mut UnboundedReceiver<String>,
        formatter: &dyn ResultFormatter,
        interrupt: I,
    ) -> Result<bool>
    where
        I: Future<Output = ()>,
    {
        let mut work = pin!(scheduler.test_one(session, model));
        let mut interrupt = pin!(interrupt);
        loop {
            tokio::select! {
                result = &mut work => {
                    result?;
                    return Ok(false);
                }
                Some(name) = updates.recv() => self.print_progress(session, &name, formatter),
                _ = &mut interrupt => {
                    // The abandoned probe never writes its outcome.
                    if session.store().get(model)?.status == TestStatus::Testing {
                        session
                            .store()
                            .set(model, TestStatus::Error, None, Some(CANCELLED_MESSAGE.to_string()))?;
                        self.print_progress(session, model, formatter);
                    }
                    return Ok(true);
                }
            }
        }
    }

    fn print_progress(&self, session: &TestSession, display_name: &str, formatter: &dyn ResultFormatter) {
        if self.config.json_output {
            return;
        }
        if let Ok(entry) = session.store().get(display_name) {
            if entry.status.is_terminal() || (self.config.verbose && entry.status == TestStatus::Testing) {
                println!("{}", formatter.format_progress(&entry));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::client::{ProbeOutcome, ProbeRequest};
    use async_trait::async_trait;

    struct StubProbe;

    #[async_trait]
    impl ProbeClient for StubProbe {
        async fn check(&self, request: &ProbeRequest, _cancel: &CancelToken) -> Result<ProbeOutcome> {
            if request.model.contains("broken") {
                Ok(ProbeOutcome::failure("HTTP 404: model not found"))
            } else {
                Ok(ProbeOutcome::success(15))
            }
        }
    }

    /// Answers only once cancelled
    struct HangingProbe;

    #[async_trait]
    impl ProbeClient for HangingProbe {
        async fn check(&self, _request: &ProbeRequest, cancel: &CancelToken) -> Result<ProbeOutcome> {
            cancel.cancelled().await;
            Ok(ProbeOutcome::cancelled())
        }
    }

    fn wiring(app: &App) -> (Arc<TestSession>, Scheduler, UnboundedReceiver<String>) {
        let session = Arc::new(TestSession::from_config(app.config()));
        let (sink, updates) = ChannelSink::new();
        let scheduler = Scheduler::new(Arc::new(HangingProbe), Arc::new(sink));
        (session, scheduler, updates)
    }

    fn config() -> Config {
        Config {
            base_url: "https://api.example.com".to_string(),
            api_key: "sk-test".to_string(),
            models: vec!["gpt-4o".to_string(), "broken-model".to_string(), "gpt-4o-mini".to_string()],
            enable_color: false,
            json_output: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bulk_run_counts_failures_without_erroring() {
        let counts = App::from_config(config())
            .run_with_probe(Arc::new(StubProbe))
            .await
            .unwrap();

        assert_eq!(counts.success, 2);
        assert_eq!(counts.error, 1);
        assert_eq!(counts.pending, 0);
    }

    #[tokio::test]
    async fn test_only_runs_single_model() {
        let mut config = config();
        config.only = Some("gpt-4o-mini".to_string());
        config.json_output = false;

        let counts = App::from_config(config)
            .run_with_probe(Arc::new(StubProbe))
            .await
            .unwrap();

        assert_eq!(counts.success, 1);
        assert_eq!(counts.pending, 2);
    }

    #[tokio::test]
    async fn test_only_unknown_model_is_not_found() {
        let mut config = config();
        config.only = Some("claude".to_string());

        let result = App::from_config(config).run_with_probe(Arc::new(StubProbe)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_probing() {
        let mut config = config();
        config.base_url.clear();

        let result = App::from_config(config).run_with_probe(Arc::new(StubProbe)).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_interrupted_single_model_is_recorded_cancelled() {
        let app = App::from_config(config());
        let (session, scheduler, mut updates) = wiring(&app);
        let formatter = OutputFormatterFactory::create_plain_formatter();

        let interrupted = app
            .drive_single(
                &scheduler,
                &session,
                "gpt-4o",
                &mut updates,
                formatter.as_ref(),
                tokio::time::sleep(std::time::Duration::from_millis(50)),
            )
            .await
            .unwrap();

        assert!(interrupted);
        let entry = session.store().get("gpt-4o").unwrap();
        assert_eq!(entry.status, TestStatus::Error);
        assert_eq!(entry.error_message.as_deref(), Some(CANCELLED_MESSAGE));
        assert_eq!(session.store().counts().testing, 0);
    }

    #[tokio::test]
    async fn test_interrupted_bulk_run_winds_down() {
        let app = App::from_config(config());
        let (session, scheduler, mut updates) = wiring(&app);
        let formatter = OutputFormatterFactory::create_plain_formatter();

        let interrupted = app
            .drive_bulk(
                &scheduler,
                &session,
                &mut updates,
                formatter.as_ref(),
                tokio::time::sleep(std::time::Duration::from_millis(50)),
            )
            .await
            .unwrap();

        assert!(interrupted);
        assert!(!session.is_running());
        let counts = session.store().counts();
        assert_eq!(counts.testing, 0);
        assert_eq!(counts.error, 3);
    }

    #[tokio::test]
    async fn test_interrupted_run_returns_cancelled() {
        let mut config = config();
        config.only = Some("gpt-4o".to_string());

        let result = App::from_config(config)
            .run_until(Arc::new(HangingProbe), tokio::time::sleep(std::time::Duration::from_millis(50)))
            .await;
        assert!(matches!(result, Err(AppError::Cancelled(_))));
    }
}
