//! One inventory cycle: collect, build, seal, send.

use hostinv_client::{UploadClient, UploadReceipt, DEFAULT_TIMEOUT};
use hostinv_collect::{
    collect_report, CollectorOptions, CommandRunner, PlatformCollector, SystemRunner,
};
use hostinv_core::{InventoryError, Report, Result};
use hostinv_seal::{KeyProvider, PassphraseKey, SecureChannel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Whether a cycle is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Busy,
}

/// A cycle that reached the server
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// The report that was sent
    pub report: Report,
    /// Size of the sealed envelope on the wire
    pub envelope_len: usize,
    /// The server's answer
    pub receipt: UploadReceipt,
}

/// A cycle that failed.
///
/// Once the report was built, the plaintext JSON travels with the error so
/// the caller can still show it. Once it was sealed, the envelope does too,
/// so delivery can be retried without sealing again.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CycleFailure {
    #[source]
    pub error: InventoryError,
    pub report: Option<String>,
    pub envelope: Option<Vec<u8>>,
}

impl CycleFailure {
    fn before_report(error: InventoryError) -> Self {
        Self {
            error,
            report: None,
            envelope: None,
        }
    }
}

impl From<InventoryError> for CycleFailure {
    fn from(error: InventoryError) -> Self {
        Self::before_report(error)
    }
}

/// Runs inventory cycles, one at a time.
///
/// The agent is `Sync`; share it behind an `Arc` and a second concurrent
/// call fails fast with [`InventoryError::Busy`].
pub struct Agent {
    collector: PlatformCollector,
    channel: SecureChannel,
    uploader: Option<UploadClient>,
    busy: AtomicBool,
}

impl Agent {
    /// Create a builder
    #[must_use]
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Idle or Busy
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        if self.busy.load(Ordering::Acquire) {
            AgentStatus::Busy
        } else {
            AgentStatus::Idle
        }
    }

    /// The collector picked for this host
    #[must_use]
    pub const fn collector(&self) -> &PlatformCollector {
        &self.collector
    }

    /// The upload client, if a server is configured
    #[must_use]
    pub const fn uploader(&self) -> Option<&UploadClient> {
        self.uploader.as_ref()
    }

    /// Collect a report without sealing or sending it
    pub async fn scan(&self, cancel: &CancellationToken) -> Result<Report> {
        let _guard = self.acquire()?;
        collect_report(&self.collector, cancel).await
    }

    /// Collect, seal and upload one snapshot.
    ///
    /// A cancelled cycle stops at the next subprocess or network boundary and
    /// never seals or sends what it had gathered.
    pub async fn run_cycle(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<CycleOutcome, CycleFailure> {
        let _guard = self.acquire()?;
        info!(platform = self.collector.platform_name(), "inventory cycle started");

        let report = collect_report(&self.collector, cancel).await?;
        let plaintext = report.to_json_bytes()?;
        let report_json = String::from_utf8_lossy(&plaintext).into_owned();

        let fail = |error: InventoryError, envelope: Option<Vec<u8>>| CycleFailure {
            error,
            report: Some(report_json.clone()),
            envelope,
        };

        if cancel.is_cancelled() {
            return Err(CycleFailure::before_report(InventoryError::Cancelled));
        }

        let Some(uploader) = &self.uploader else {
            return Err(fail(
                InventoryError::Config("no server address configured".into()),
                None,
            ));
        };

        let envelope = self
            .channel
            .seal(&plaintext)
            .map_err(|e| fail(e, None))?
            .to_bytes();
        let envelope_len = envelope.len();

        match uploader.upload(envelope.clone(), cancel).await {
            Ok(receipt) => {
                info!(
                    software = report.software_count(),
                    envelope = envelope_len,
                    status = receipt.status,
                    "inventory cycle finished"
                );
                Ok(CycleOutcome {
                    report,
                    envelope_len,
                    receipt,
                })
            }
            Err(InventoryError::Cancelled) => {
                Err(CycleFailure::before_report(InventoryError::Cancelled))
            }
            Err(e) => {
                warn!(error = %e, "report delivery failed");
                Err(fail(e, Some(envelope)))
            }
        }
    }

    /// Send an already sealed envelope again
    pub async fn deliver(
        &self,
        envelope: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt> {
        let _guard = self.acquire()?;
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| InventoryError::Config("no server address configured".into()))?;
        uploader.upload(envelope, cancel).await
    }

    fn acquire(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| InventoryError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builder for configuring an [`Agent`]
pub struct AgentBuilder {
    server: Option<String>,
    options: CollectorOptions,
    command_timeout: Duration,
    upload_timeout: Duration,
    key_provider: Box<dyn KeyProvider>,
    runner: Option<Arc<dyn CommandRunner>>,
    collector: Option<PlatformCollector>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    /// Defaults: no server, built-in key, 60s commands, 30s uploads
    #[must_use]
    pub fn new() -> Self {
        Self {
            server: None,
            options: CollectorOptions::default(),
            command_timeout: hostinv_collect::runner::DEFAULT_COMMAND_TIMEOUT,
            upload_timeout: DEFAULT_TIMEOUT,
            key_provider: Box::new(PassphraseKey::default()),
            runner: None,
            collector: None,
        }
    }

    /// Collector server address; `/upload-report` is appended
    #[must_use]
    pub fn server(mut self, server: Option<String>) -> Self {
        self.server = server;
        self
    }

    /// Collector options (catalog query, machine name)
    #[must_use]
    pub fn collector_options(mut self, options: CollectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Budget for each package-manager or shell command
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Budget for the upload request
    #[must_use]
    pub const fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Key used to seal envelopes
    #[must_use]
    pub fn key_provider(mut self, provider: impl KeyProvider + 'static) -> Self {
        self.key_provider = Box::new(provider);
        self
    }

    /// Run commands through `runner` instead of real processes
    #[must_use]
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Use `collector` instead of detecting one for this host
    #[must_use]
    pub fn collector(mut self, collector: PlatformCollector) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Build the agent
    ///
    /// # Errors
    ///
    /// Fails on unsupported hosts, invalid server addresses and unusable keys.
    pub fn build(self) -> Result<Agent> {
        let collector = match self.collector {
            Some(collector) => collector,
            None => {
                let runner = self
                    .runner
                    .unwrap_or_else(|| Arc::new(SystemRunner::new(self.command_timeout)));
                PlatformCollector::detect(runner, &self.options)?
            }
        };

        let channel = SecureChannel::from_provider(self.key_provider.as_ref())?;

        let uploader = self
            .server
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|server| {
                UploadClient::builder(server)
                    .timeout(self.upload_timeout)
                    .build()
            })
            .transpose()?;

        info!(
            platform = collector.platform_name(),
            key = channel.key_fingerprint(),
            server = uploader.as_ref().map(|u| u.endpoint().as_str()),
            "agent ready"
        );

        Ok(Agent {
            collector,
            channel,
            uploader,
            busy: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hostinv_collect::collector::linux::{DF_PATH, DPKG_PATH};
    use hostinv_collect::collector::LinuxCollector;
    use hostinv_collect::{CannedRunner, CommandOutput};
    use hostinv_seal::StaticKey;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DPKG: &str = "ii  curl 7.68.0-1ubuntu2 amd64 command line tool\nii  zsh 5.9 amd64 shell\n";

    fn linux_collector() -> PlatformCollector {
        let runner = CannedRunner::new()
            .with_output(DPKG_PATH, DPKG)
            .with_output(DF_PATH, "/dev/sda1 50G 20G 30G 40% /\n");
        PlatformCollector::Linux(
            LinuxCollector::new(Arc::new(runner)).machine_name(Some("agent-test".into())),
        )
    }

    fn agent(server: Option<String>) -> Agent {
        Agent::builder()
            .server(server)
            .collector(linux_collector())
            .build()
            .unwrap()
    }

    /// Package listing that takes a while, or until cancelled
    struct SlowRunner;

    #[async_trait]
    impl CommandRunner for SlowRunner {
        fn exists(&self, program: &str) -> bool {
            program == DPKG_PATH
        }

        async fn run(
            &self,
            _program: &str,
            _args: &[&str],
            cancel: &CancellationToken,
        ) -> Result<CommandOutput> {
            tokio::select! {
                () = cancel.cancelled() => Err(InventoryError::Cancelled),
                () = tokio::time::sleep(Duration::from_millis(300)) => Ok(CommandOutput::ok(DPKG)),
            }
        }
    }

    #[tokio::test]
    async fn full_cycle_delivers_an_openable_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload-report"))
            .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
            .expect(1)
            .mount(&server)
            .await;

        let agent = agent(Some(server.uri()));
        let outcome = agent.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.receipt.body, "accepted");
        assert_eq!(outcome.report.software_count(), 2);
        assert_eq!(agent.status(), AgentStatus::Idle);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].body.len(), outcome.envelope_len);

        let channel = SecureChannel::from_provider(&PassphraseKey::default()).unwrap();
        let opened = Report::from_json_slice(&channel.open(&requests[0].body).unwrap()).unwrap();
        assert_eq!(opened, outcome.report);
    }

    #[tokio::test]
    async fn rejected_upload_carries_report_and_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let failure = agent(Some(server.uri()))
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.error.status_code(), Some(500));
        assert!(failure.report.as_deref().is_some_and(|r| r.contains("\"curl\"")));
        assert!(failure.envelope.is_some());
        assert!(failure.error.is_retryable());
    }

    #[tokio::test]
    async fn missing_server_still_returns_report() {
        let failure = agent(None)
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, InventoryError::Config(_)));
        assert!(failure.report.is_some());
        assert!(failure.envelope.is_none());
    }

    #[tokio::test]
    async fn cancelled_cycle_never_sends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let agent = Agent::builder()
            .server(Some(server.uri()))
            .collector(PlatformCollector::Linux(LinuxCollector::new(Arc::new(SlowRunner))))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let failure = agent.run_cycle(&cancel).await.unwrap_err();
        assert!(matches!(failure.error, InventoryError::Cancelled));
        assert!(failure.report.is_none());
        assert!(failure.envelope.is_none());
        assert_eq!(agent.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn second_cycle_is_refused_while_busy() {
        let agent = Arc::new(
            Agent::builder()
                .collector(PlatformCollector::Linux(LinuxCollector::new(Arc::new(SlowRunner))))
                .build()
                .unwrap(),
        );

        let first = {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move { agent.scan(&CancellationToken::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(agent.status(), AgentStatus::Busy);
        let err = agent.scan(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, InventoryError::Busy));

        let report = first.await.unwrap().unwrap();
        assert_eq!(report.software_count(), 2);
        assert_eq!(agent.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn deliver_resends_sealed_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("again"))
            .mount(&server)
            .await;

        let receipt = agent(Some(server.uri()))
            .deliver(vec![9; 40], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(receipt.status, 201);
        assert_eq!(receipt.body, "again");
    }

    #[test]
    fn bad_inputs_fail_at_build() {
        let err = Agent::builder()
            .collector(linux_collector())
            .key_provider(StaticKey::new(vec![1u8; 10]))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, InventoryError::Encryption(_)));

        let err = Agent::builder()
            .collector(linux_collector())
            .server(Some("ftp://nowhere".into()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, InventoryError::InvalidUrl(_)));

        let agent = Agent::builder()
            .collector(linux_collector())
            .server(Some("   ".into()))
            .build()
            .unwrap();
        assert!(agent.uploader().is_none());
    }
}
