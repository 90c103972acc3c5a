use crate::display::{abbreviate_uri, format_timestamp, usage_report, DisplaySettings};
use crate::error::{PresenterError, Result};
use crate::sort::{sort_links, SortMode};
use async_trait::async_trait;
use look_later_coordinator::{CoordinatorError, RemoveClient};
use look_later_core::{Clock, LinkKey, LinkRecord, ReadLinkStore, SystemClock};
use tracing::{debug, info, trace, warn};

pub const LOADING_PLACEHOLDER: &str = "…";
pub const EMPTY_PLACEHOLDER: &str = "[ no stored link items ]";
pub const ERROR_PLACEHOLDER: &str = "[ error ]";

/// Asks the coordinator to delete a link and waits for the outcome.
#[async_trait]
pub trait LinkRemover: Send + Sync {
    async fn remove_link(&self, key: LinkKey) -> std::result::Result<(), CoordinatorError>;
}

#[async_trait]
impl LinkRemover for RemoveClient {
    async fn remove_link(&self, key: LinkKey) -> std::result::Result<(), CoordinatorError> {
        RemoveClient::remove_link(self, key).await
    }
}

/// Opens a URI in a new browser view.
pub trait Navigator: Send + Sync {
    fn open_in_new_view(&self, href: &str) -> Result<()>;
}

/// One rendered row of the link table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub key: LinkKey,
    pub href: String,
    pub href_preview: String,
    pub text: String,
    pub origin: String,
    pub origin_preview: String,
    pub captured_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ListView {
    #[default]
    Loading,
    Empty,
    Error,
    Rows(Vec<LinkRow>),
}

impl ListView {
    /// Text shown in place of the table, if any.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            ListView::Loading => Some(LOADING_PLACEHOLDER),
            ListView::Empty => Some(EMPTY_PLACEHOLDER),
            ListView::Error => Some(ERROR_PLACEHOLDER),
            ListView::Rows(_) => None,
        }
    }

    pub fn rows(&self) -> &[LinkRow] {
        match self {
            ListView::Rows(rows) => rows,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UsageView {
    #[default]
    Loading,
    Report(String),
    Error,
}

impl UsageView {
    pub fn text(&self) -> &str {
        match self {
            UsageView::Loading => LOADING_PLACEHOLDER,
            UsageView::Report(report) => report,
            UsageView::Error => ERROR_PLACEHOLDER,
        }
    }
}

/// Everything the popup draws.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopupView {
    pub list: ListView,
    pub link_count: usize,
    pub usage: UsageView,
}

/// Display and sort logic for one popup session.
///
/// The sort mode belongs to the instance, so it starts over each time a
/// popup opens. Reads go straight to the store; removals go through the
/// coordinator.
pub struct ListPresenter<R, M, N, C = SystemClock> {
    links: R,
    remover: M,
    navigator: N,
    clock: C,
    settings: DisplaySettings,
    sort_mode: Option<SortMode>,
    view: PopupView,
}

impl<R, M, N> ListPresenter<R, M, N, SystemClock>
where
    R: ReadLinkStore,
    M: LinkRemover,
    N: Navigator,
{
    pub fn new(links: R, remover: M, navigator: N, settings: DisplaySettings) -> Self {
        Self::with_clock(links, remover, navigator, SystemClock, settings)
    }
}

impl<R, M, N, C> ListPresenter<R, M, N, C>
where
    R: ReadLinkStore,
    M: LinkRemover,
    N: Navigator,
    C: Clock,
{
    pub fn with_clock(
        links: R,
        remover: M,
        navigator: N,
        clock: C,
        settings: DisplaySettings,
    ) -> Self {
        Self {
            links,
            remover,
            navigator,
            clock,
            settings,
            sort_mode: None,
            view: PopupView::default(),
        }
    }

    pub fn view(&self) -> &PopupView {
        &self.view
    }

    /// The mode in effect; forward time order until one is chosen.
    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode.unwrap_or_default()
    }

    /// Whether the control for `mode` carries the active indicator.
    /// Nothing is active before the first render.
    pub fn is_active(&self, mode: SortMode) -> bool {
        self.sort_mode == Some(mode)
    }

    /// First render of a freshly opened popup.
    pub async fn open(&mut self) -> &PopupView {
        if self.sort_mode.is_none() {
            self.sort_mode = Some(SortMode::default());
        }
        self.refresh().await;
        &self.view
    }

    /// Switches to `mode` and redisplays. Returns `false`, without touching
    /// the store, when `mode` is already active.
    pub async fn select_sort(&mut self, mode: SortMode) -> bool {
        if self.sort_mode == Some(mode) {
            trace!(mode = %mode, "sort mode already active");
            return false;
        }
        debug!(mode = %mode, "sort mode selected");
        self.sort_mode = Some(mode);
        self.refresh().await;
        true
    }

    /// Re-reads the links and usage and rebuilds the view.
    pub async fn refresh(&mut self) {
        self.view = PopupView::default();
        let (links, usage) = tokio::join!(self.links.get_all(), self.links.usage());

        self.view.usage = match usage {
            Ok(usage) => UsageView::Report(usage_report(&usage)),
            Err(e) => {
                warn!(error = %e, "could not read storage usage");
                UsageView::Error
            }
        };

        match links {
            Ok(links) => {
                let mut records = links.into_records();
                self.view.link_count = records.len();
                if records.is_empty() {
                    self.view.list = ListView::Empty;
                } else {
                    sort_links(&mut records, self.sort_mode());
                    let rows = records.iter().map(|r| self.row(r)).collect();
                    self.view.list = ListView::Rows(rows);
                }
            }
            Err(e) => {
                warn!(error = %e, "could not read links");
                self.view.list = ListView::Error;
            }
        }
        trace!(count = self.view.link_count, mode = %self.sort_mode(), "view rebuilt");
    }

    /// Removes a link and, only once that succeeded, opens it.
    pub async fn remove_and_navigate(&mut self, key: &LinkKey, href: &str) -> Result<()> {
        if let Err(e) = self.remover.remove_link(key.clone()).await {
            warn!(key = %key, error = %e, "remove failed, not navigating");
            return Err(PresenterError::Remove(e));
        }
        info!(key = %key, href, "opening removed link");
        self.navigator.open_in_new_view(href)
    }

    /// Removes a link and redisplays the list in place.
    pub async fn remove_only(&mut self, key: &LinkKey) -> Result<()> {
        if let Err(e) = self.remover.remove_link(key.clone()).await {
            warn!(key = %key, error = %e, "remove failed");
            return Err(PresenterError::Remove(e));
        }
        debug!(key = %key, "link removed");
        self.refresh().await;
        Ok(())
    }

    fn row(&self, record: &LinkRecord) -> LinkRow {
        let head = self.settings.uri_head_chars;
        let tail = self.settings.uri_tail_chars;
        LinkRow {
            key: record.key(),
            href: record.href.clone(),
            href_preview: abbreviate_uri(&record.href, head, tail),
            text: record.text.clone(),
            origin: record.origin.clone(),
            origin_preview: abbreviate_uri(&record.origin, head, tail),
            captured_at: format_timestamp(
                record.timestamp,
                self.clock.now(),
                &self.settings.time_zone,
            ),
        }
    }
}
