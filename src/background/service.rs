use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::capture::capture_model::ElementRecord;
use crate::capture::orchestrator::{CaptureOrchestrator, PageCapture};
use crate::export::export_model::{ExportFile, ExportReport};
use crate::navigation::channel::{PageChannel, TabId};
use crate::navigation::coordinator::{BANNER_TIMEOUT, Effect, NavigationCoordinator, TransitionError};
use crate::navigation::delivery::{DeliveryOutcome, RetryPolicy, deliver_with_retry};
use crate::navigation::messages::Message;
use crate::navigation::session_state::CaptureSessionState;
use crate::registry::identity::IdentityRegistry;
use crate::registry::registry_model::{IdStyle, RegistryMap};
use crate::store::keys;
use crate::store::store::Store;
use crate::trace::journal::CaptureJournal;
use crate::trace::journal_entry::JournalEntry;

use super::error::BackgroundError;
use super::handle::{BackgroundHandle, ElementCapture, PageVisit, Request, SessionSnapshot};

pub const DEFAULT_PLATFORM: &str = "default";

const REQUEST_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    /// Platform used when the store has no `platformKey` yet.
    pub default_platform: String,
    pub retry: RetryPolicy,
    pub banner_timeout: Duration,
    pub id_style: IdStyle,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            default_platform: DEFAULT_PLATFORM.to_string(),
            retry: RetryPolicy::default(),
            banner_timeout: BANNER_TIMEOUT,
            id_style: IdStyle::default(),
        }
    }
}

/// Result of a resume delivery, reported back from its task.
///
/// `generation` identifies the `Effect::Resume` that started the delivery.
/// Only the most recent one may settle the coordinator.
struct ResumeSettled {
    generation: u64,
    outcome: DeliveryOutcome,
}

/// Long-lived owner of all durable state.
///
/// Runs as one tokio task and handles requests strictly one at a time, so
/// every read-modify-write of the store is serialized. Resume deliveries run
/// in their own tasks so a retry delay does not stall other requests.
pub struct BackgroundService {
    store: Box<dyn Store>,
    channel: Arc<dyn PageChannel>,
    journal: CaptureJournal,
    config: BackgroundConfig,
    platform: String,
    coordinator: NavigationCoordinator,
    banner_deadline: Option<Instant>,
    resume_generation: u64,
    resume_tx: mpsc::UnboundedSender<ResumeSettled>,
}

impl BackgroundService {
    /// Start the service on the current tokio runtime.
    pub fn spawn(
        store: impl Store + 'static,
        channel: Arc<dyn PageChannel>,
        journal: CaptureJournal,
        config: BackgroundConfig,
    ) -> BackgroundHandle {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let (resume_tx, resume_rx) = mpsc::unbounded_channel();

        let store: Box<dyn Store> = Box::new(store);
        let platform = match keys::read::<String>(&*store, keys::PLATFORM_KEY) {
            Ok(Some(p)) if !p.trim().is_empty() => p,
            Ok(_) => config.default_platform.clone(),
            Err(e) => {
                warn!(error = %e, "stored platform key unreadable, using default");
                config.default_platform.clone()
            }
        };

        let session = CaptureSessionState::load(&*store, &platform).unwrap_or_else(|e| {
            warn!(platform = %platform, error = %e, "session state unreadable, starting idle");
            CaptureSessionState::default()
        });

        let service = BackgroundService {
            store,
            channel,
            journal,
            banner_deadline: recovered_banner_deadline(&session, config.banner_timeout),
            config,
            coordinator: NavigationCoordinator::recover(&session),
            platform,
            resume_generation: 0,
            resume_tx,
        };

        tokio::spawn(service.run(rx, resume_rx));
        BackgroundHandle::new(tx)
    }

    async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        mut resumes: mpsc::UnboundedReceiver<ResumeSettled>,
    ) {
        info!(platform = %self.platform, state = ?self.coordinator.state(), "background service started");

        loop {
            let banner_deadline = self.banner_deadline;

            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => {
                        if self.handle(request).is_break() {
                            break;
                        }
                    }
                    None => break,
                },
                Some(settled) = resumes.recv() => self.on_resume_settled(settled),
                _ = sleep_until(banner_deadline.unwrap_or_else(Instant::now)), if banner_deadline.is_some() => {
                    self.on_banner_expired();
                }
            }
        }

        debug!("background service stopped");
    }

    fn handle(&mut self, request: Request) -> ControlFlow<()> {
        match request {
            Request::SetPlatform { platform, reply } => {
                let _ = reply.send(self.set_platform(&platform));
            }
            Request::EnableCapture { tab, reply } => {
                let _ = reply.send(self.transition(|c, s| c.toggle_on(s, tab)));
            }
            Request::DisableCapture { tab, reply } => {
                let _ = reply.send(self.transition(|c, s| c.toggle_off(s, tab)));
            }
            Request::CapturePage { visit, tab, reply } => {
                let _ = reply.send(self.capture_page(visit, tab));
            }
            Request::CaptureElement { capture, tab, reply } => {
                let _ = reply.send(self.capture_element(capture, tab));
            }
            Request::PageLoaded { tab, reply } => {
                let _ = reply.send(self.transition(|c, s| c.page_loaded(s, tab)));
            }
            Request::Dispatch { message, tab, reply } => {
                let _ = reply.send(self.dispatch(message, tab));
            }
            Request::Session { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Request::Registries { reply } => {
                let _ = reply.send(self.registry().export_all().map_err(Into::into));
            }
            Request::Export { reply } => {
                let _ = reply.send(
                    ExportFile::collect(&mut *self.store, &self.platform)
                        .map(ExportReport::new)
                        .map_err(Into::into),
                );
            }
            Request::ImportRegistries { data, reply } => {
                let _ = reply.send(self.import_registries(data));
            }
            Request::ResetRegistry { platform, reply } => {
                let platform = platform.unwrap_or_else(|| self.platform.clone());
                info!(platform = %platform, "resetting identity registry");
                let _ = reply.send(self.registry().reset_registry(&platform).map_err(Into::into));
            }
            Request::ResetSession { tab, reply } => {
                let _ = reply.send(self.reset_session(tab));
            }
            Request::Shutdown { reply } => {
                info!("background service shutting down");
                let _ = reply.send(Ok(()));
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ------------------------------------------------------------------------
    // Request handlers
    // ------------------------------------------------------------------------

    fn set_platform(&mut self, platform: &str) -> Result<(), BackgroundError> {
        let platform = platform.trim();
        if platform.is_empty() {
            return Err(BackgroundError::EmptyPlatform);
        }
        if platform == self.platform {
            return Ok(());
        }

        // Only the active platform has a banner timer.
        match self.load_session() {
            Ok(mut outgoing) if outgoing.pending_navigation => {
                self.coordinator.banner_expired(&mut outgoing);
                outgoing.save(&mut *self.store, &self.platform)?;
            }
            Ok(_) => {}
            Err(e) => warn!(platform = %self.platform, error = %e, "outgoing session unreadable"),
        }

        keys::write(&mut *self.store, keys::PLATFORM_KEY, &platform)?;
        let session = CaptureSessionState::load(&*self.store, platform)?;

        info!(from = %self.platform, to = %platform, "switching platform");
        self.platform = platform.to_string();
        self.coordinator = NavigationCoordinator::recover(&session);
        self.banner_deadline = recovered_banner_deadline(&session, self.config.banner_timeout);
        self.resume_generation += 1;
        Ok(())
    }

    fn capture_page(&mut self, visit: PageVisit, tab: Option<TabId>) -> Result<PageCapture, BackgroundError> {
        let capture = CaptureOrchestrator::new(&mut *self.store, &self.config.id_style).capture_page(
            &self.platform,
            &visit.url,
            &visit.title,
            visit.framework.as_deref(),
        )?;

        if let PageCapture::Created(record) = &capture {
            self.journal_log(&Message::LogCapturedPage { data: record.clone() }, tab);
        }
        Ok(capture)
    }

    fn capture_element(
        &mut self,
        capture: ElementCapture,
        tab: Option<TabId>,
    ) -> Result<ElementRecord, BackgroundError> {
        if !self.coordinator.is_capturing() {
            return Err(TransitionError::NotActive(self.coordinator.state()).into());
        }

        let record = CaptureOrchestrator::new(&mut *self.store, &self.config.id_style).capture_element(
            &self.platform,
            &capture.page_id,
            &capture.element,
            &capture.description,
            capture.kpi.as_deref(),
        )?;

        self.journal_log(&Message::LogCapturedElement { data: record.clone() }, tab);

        let element_id = record.element_id.clone();
        let navigates = capture.navigates;
        self.try_transition(|c, s| c.element_captured(s, &element_id, navigates))?;
        Ok(record)
    }

    fn dispatch(&mut self, message: Message, tab: Option<TabId>) -> Result<(), BackgroundError> {
        debug!(action = message.action(), ?tab, "inbound message");
        match message {
            Message::EnableCapture => self.transition(|c, s| c.toggle_on(s, tab)),
            Message::DisableCapture => self.transition(|c, s| c.toggle_off(s, tab)),
            Message::SetPlatformKey { platform_key } => self.set_platform(&platform_key),
            Message::ImportIdRegistry { data } => self.import_registries(data),
            Message::TemporaryDisableForNavigation { last_element_id } => {
                self.try_transition(|c, s| c.element_captured(s, &last_element_id, true))
            }
            Message::LogCapturedElement { .. } | Message::LogCapturedPage { .. } => {
                self.journal_log(&message, tab);
                Ok(())
            }
            Message::CheckPendingNavigation { .. } | Message::CaptureModeChanged { .. } => {
                Err(BackgroundError::Unsupported(message.action()))
            }
        }
    }

    fn snapshot(&self) -> Result<SessionSnapshot, BackgroundError> {
        Ok(SessionSnapshot {
            platform: self.platform.clone(),
            state: self.coordinator.state(),
            resume_latched: self.coordinator.resume_latched(),
            session: self.load_session()?,
        })
    }

    fn import_registries(&mut self, data: RegistryMap) -> Result<(), BackgroundError> {
        info!(platforms = data.len(), "importing identity registries");
        self.registry().import_all(data)?;
        Ok(())
    }

    fn reset_session(&mut self, tab: Option<TabId>) -> Result<(), BackgroundError> {
        let mut session = self.load_session().unwrap_or_default();
        let mut effects = self.coordinator.reset(&mut session);
        CaptureSessionState::clear(&mut *self.store, &self.platform)?;
        if let Some(tab) = tab {
            effects.push(Effect::Notify {
                tab,
                message: Message::DisableCapture,
            });
        }
        info!(platform = %self.platform, "capture session reset");
        self.apply(effects);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Timers and delivery results
    // ------------------------------------------------------------------------

    fn on_resume_settled(&mut self, settled: ResumeSettled) {
        if settled.generation != self.resume_generation {
            debug!(
                generation = settled.generation,
                current = self.resume_generation,
                "dropping superseded resume result"
            );
            return;
        }

        let delivered = settled.outcome.is_delivered();
        info!(delivered, attempts = settled.outcome.attempts(), "resume delivery settled");
        if let Err(e) = self.transition(|c, s| c.resume_settled(s, delivered)) {
            warn!(error = %e, "failed to record resume result");
        }
    }

    fn on_banner_expired(&mut self) {
        self.banner_deadline = None;
        let result = self.transition(|c, s| {
            c.banner_expired(s);
            Vec::new()
        });
        if let Err(e) = result {
            warn!(error = %e, "failed to clear pending-navigation banner");
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn registry(&mut self) -> IdentityRegistry<'_> {
        IdentityRegistry::new(&mut *self.store, &self.config.id_style)
    }

    fn load_session(&self) -> Result<CaptureSessionState, BackgroundError> {
        Ok(CaptureSessionState::load(&*self.store, &self.platform)?)
    }

    /// Load the session, run a transition, persist, then carry out effects.
    fn transition(
        &mut self,
        f: impl FnOnce(&mut NavigationCoordinator, &mut CaptureSessionState) -> Vec<Effect>,
    ) -> Result<(), BackgroundError> {
        self.try_transition(|c, s| Ok::<_, BackgroundError>(f(c, s)))
    }

    fn try_transition<E>(
        &mut self,
        f: impl FnOnce(&mut NavigationCoordinator, &mut CaptureSessionState) -> Result<Vec<Effect>, E>,
    ) -> Result<(), BackgroundError>
    where
        BackgroundError: From<E>,
    {
        let mut session = self.load_session()?;
        let effects = f(&mut self.coordinator, &mut session)?;
        session.save(&mut *self.store, &self.platform)?;
        self.apply(effects);
        Ok(())
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify { tab, message } => {
                    if let Err(e) = self.channel.send(tab, &message) {
                        debug!(%tab, action = message.action(), error = %e, "notification not delivered");
                    }
                }
                Effect::Resume { tab, message } => {
                    self.resume_generation += 1;
                    let generation = self.resume_generation;
                    let channel = Arc::clone(&self.channel);
                    let policy = self.config.retry;
                    let resume_tx = self.resume_tx.clone();
                    tokio::spawn(async move {
                        let outcome = deliver_with_retry(channel.as_ref(), tab, &message, &policy).await;
                        let _ = resume_tx.send(ResumeSettled { generation, outcome });
                    });
                }
                Effect::ArmBannerClear => {
                    self.banner_deadline = Some(Instant::now() + self.config.banner_timeout);
                }
                Effect::DisarmBannerClear => {
                    self.banner_deadline = None;
                }
            }
        }
    }

    fn journal_log(&self, message: &Message, tab: Option<TabId>) {
        self.journal
            .log(&JournalEntry::now(&self.platform, message).with_tab(tab));
    }
}

/// Clear timer for a session that comes back with its banner still up.
fn recovered_banner_deadline(session: &CaptureSessionState, timeout: Duration) -> Option<Instant> {
    session.pending_navigation.then(|| Instant::now() + timeout)
}
