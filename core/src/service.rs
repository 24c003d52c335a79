//! Request handling for the theme service.
//!
//! The service caches the catalog and the active theme id. Each request runs
//! as its own task; the cached state is locked only to read or swap it and
//! never across an await, so concurrent requests interleave and the last
//! write wins.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use async_channel::Receiver;
use async_channel::Sender;
use themer_protocol::AddPagesEvent;
use themer_protocol::InboundEvent;
use themer_protocol::OutboundEvent;
use themer_protocol::PluginStatusChangeEvent;
use themer_protocol::Theme;
use themer_protocol::ThemeId;
use themer_protocol::ThemeRequest;
use themer_protocol::ThemesReply;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::activator::ActivationReport;
use crate::activator::ThemeActivator;
use crate::compiler::StylesheetCompiler;
use crate::config::ThemerConfig;
use crate::error::ThemeError;
use crate::repository::ThemeCatalog;
use crate::repository::ThemeRepository;
use crate::store::ActiveThemeStore;

#[derive(Debug, Default)]
struct ServiceState {
    catalog: ThemeCatalog,
    active_id: Option<ThemeId>,
}

struct ServiceInner {
    namespace: String,
    repository: ThemeRepository,
    activator: ThemeActivator,
    state: Mutex<ServiceState>,
    tx_event: Sender<OutboundEvent>,
}

/// Cheap to clone; clones share the same cached state.
#[derive(Clone)]
pub struct ThemeService {
    inner: Arc<ServiceInner>,
}

impl ThemeService {
    /// Announces the theming page, loads the persisted active theme, reports
    /// the service as running and scans the catalog.
    ///
    /// Fails only when the active theme marker exists but cannot be read.
    pub async fn start(
        config: &ThemerConfig,
        compiler: Arc<dyn StylesheetCompiler>,
        tx_event: Sender<OutboundEvent>,
    ) -> Result<Self, ThemeError> {
        let repository = ThemeRepository::new(&config.themes_dir);
        let store = ActiveThemeStore::in_staging_dir(&config.staging_dir);
        let activator = ThemeActivator::new(&config.staging_dir, store, compiler);

        let service = Self {
            inner: Arc::new(ServiceInner {
                namespace: config.namespace.clone(),
                repository,
                activator,
                state: Mutex::new(ServiceState::default()),
                tx_event,
            }),
        };

        service
            .emit(AddPagesEvent::theming_page(&service.inner.namespace))
            .await;

        let active_id = service.inner.activator.store().read().await?;
        service.state().active_id = active_id;

        service.emit(PluginStatusChangeEvent::running()).await;

        let catalog = service.inner.repository.scan().await;
        info!(
            themes = catalog.len(),
            skipped = catalog.load_warnings().len(),
            "loaded themes"
        );
        service.state().catalog = catalog;

        Ok(service)
    }

    /// The cached catalog and active theme id, as sent in replies.
    pub fn snapshot(&self) -> (Vec<Theme>, Option<ThemeId>) {
        let state = self.state();
        (state.catalog.themes().to_vec(), state.active_id.clone())
    }

    /// Replies with the cached state without touching the filesystem.
    pub async fn get_themes(&self, reply: &str) {
        self.reply(reply).await;
    }

    /// Rescans the themes root, replaces the cached catalog and replies.
    /// The active theme id is left as is.
    pub async fn reload_themes(&self, reply: &str) {
        let catalog = self.inner.repository.scan().await;
        info!(
            themes = catalog.len(),
            skipped = catalog.load_warnings().len(),
            "reloaded themes"
        );
        self.state().catalog = catalog;
        self.reply(reply).await;
    }

    /// Marks `id` active, runs the activation and replies.
    ///
    /// The cached id is updated before activation starts and is kept even
    /// when activation fails; the reply carries no failure information. An
    /// id that is not a plain directory name never resolves outside the
    /// themes root; its copy step fails. The returned report is for
    /// in-process callers.
    pub async fn activate_theme(&self, reply: &str, id: &str) -> ActivationReport {
        let source_dir = {
            let mut state = self.state();
            state.active_id = Some(id.to_string());
            state
                .catalog
                .get(id)
                .map(|theme| theme.source_path.clone())
        }
        .or_else(|| self.inner.repository.theme_dir(id));

        let report = self
            .inner
            .activator
            .activate(id, source_dir.as_deref())
            .await;
        self.reply(reply).await;
        report
    }

    pub async fn handle(&self, request: ThemeRequest) {
        debug!(request = request.event_type(), reply = request.reply(), "handling request");
        match request {
            ThemeRequest::GetThemes { reply } => self.get_themes(&reply).await,
            ThemeRequest::ReloadThemes { reply } => self.reload_themes(&reply).await,
            ThemeRequest::ActivateTheme { reply, theme } => {
                self.activate_theme(&reply, &theme).await;
            }
        }
    }

    /// Serves inbound events until the channel closes, then waits for the
    /// requests still in flight.
    pub async fn run(&self, rx_event: Receiver<InboundEvent>) {
        let mut in_flight = JoinSet::new();

        while let Ok(event) = rx_event.recv().await {
            match ThemeRequest::from_event(&self.inner.namespace, event) {
                Ok(Some(request)) => {
                    let service = self.clone();
                    in_flight.spawn(async move { service.handle(request).await });
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "dropping request"),
            }
            while let Some(result) = in_flight.try_join_next() {
                log_join_error(result);
            }
        }

        while let Some(result) = in_flight.join_next().await {
            log_join_error(result);
        }
    }

    async fn reply(&self, reply: &str) {
        let (themes, active_theme) = self.snapshot();
        self.emit(ThemesReply::new(reply, themes, active_theme))
            .await;
    }

    async fn emit(&self, event: impl Into<OutboundEvent>) {
        let event = event.into();
        if let Err(err) = self.inner.tx_event.send(event).await {
            warn!(
                event_type = %err.0.meta().event_type,
                "event bus closed; dropping event"
            );
        }
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        error!(error = %err, "request task failed");
    }
}
