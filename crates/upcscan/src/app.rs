//! The scanner application controller.
//!
//! [`App`] coordinates the scanner lifecycle, the product lookup, the item
//! store and the connectivity state, and pushes every visible change to a
//! [`Renderer`]. All state lives in [`AppState`]; the controller is driven
//! either by calling its methods directly or through [`App::run`].

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::connectivity::ConnectivityEvent;
use crate::display::{item_views, ItemView, Renderer, ResultsView, ScanButton, OFFLINE_BANNER};
use crate::error::{Error, Result};
use crate::item::ScannedItem;
use crate::lookup::ProductApi;
use crate::scanner::{Decoder, DecoderConfig, DecoderError, Detection};
use crate::storage::ItemStore;

/// Capacity of the per-activation detection channel.
const DETECTION_BUFFER: usize = 16;

/// Scanner, network and lookup state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppState {
    scanning: bool,
    online: bool,
    lookup_in_flight: bool,
}

impl AppState {
    /// Create an idle state with the given connectivity.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            scanning: false,
            online,
            lookup_in_flight: false,
        }
    }

    /// Whether the scanner is active.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Whether the network is reachable.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Whether a lookup is currently running.
    #[must_use]
    pub fn is_lookup_in_flight(&self) -> bool {
        self.lookup_in_flight
    }

    /// Enter the scanning state. Fails while offline or already scanning.
    pub fn start_scanning(&mut self) -> bool {
        if self.scanning || !self.online {
            return false;
        }
        self.scanning = true;
        true
    }

    /// Leave the scanning state. Returns whether the scanner was active.
    pub fn stop_scanning(&mut self) -> bool {
        std::mem::replace(&mut self.scanning, false)
    }

    /// Record connectivity. Going offline also leaves the scanning state.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
        if !online {
            self.scanning = false;
        }
    }

    /// Claim the lookup slot. Returns `false` if a lookup is already running.
    pub fn begin_lookup(&mut self) -> bool {
        !std::mem::replace(&mut self.lookup_in_flight, true)
    }

    /// Release the lookup slot.
    pub fn end_lookup(&mut self) {
        self.lookup_in_flight = false;
    }
}

/// Input to the application event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The scan button was pressed.
    ScanButton,
    /// Network reachability changed.
    Connectivity(ConnectivityEvent),
    /// The session should end.
    Shutdown,
}

impl From<ConnectivityEvent> for AppEvent {
    fn from(event: ConnectivityEvent) -> Self {
        Self::Connectivity(event)
    }
}

/// How long an event loop session lasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionMode {
    /// End after the first completed lookup.
    #[default]
    Single,
    /// Re-arm the scanner after every lookup until shut down.
    Continuous,
}

/// Result of pressing the scan button.
#[derive(Debug)]
pub enum ButtonOutcome {
    /// The scanner started.
    Started,
    /// The scanner stopped.
    Stopped,
    /// The button is disabled (offline).
    Ignored,
    /// The decoder could not start; the app stays idle.
    StartFailed(DecoderError),
}

/// Result of one product lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// A product was found and stored.
    Saved(ScannedItem),
    /// The API knows no product for the barcode.
    NotFound,
    /// The lookup failed with the given message.
    Failed(String),
}

enum Next {
    Detection(Option<Detection>),
    Event(Option<AppEvent>),
}

async fn next_detection(rx: &mut Option<mpsc::Receiver<Detection>>) -> Option<Detection> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// The scanner application.
#[derive(Debug)]
pub struct App<A, D, R> {
    state: AppState,
    store: ItemStore,
    api: A,
    decoder: D,
    renderer: R,
    decoder_config: DecoderConfig,
    detections: Option<mpsc::Receiver<Detection>>,
}

impl<A, D, R> App<A, D, R>
where
    A: ProductApi,
    D: Decoder,
    R: Renderer,
{
    /// Create an idle application.
    #[must_use]
    pub fn new(
        store: ItemStore,
        api: A,
        decoder: D,
        renderer: R,
        decoder_config: DecoderConfig,
        online: bool,
    ) -> Self {
        Self {
            state: AppState::new(online),
            store,
            api,
            decoder,
            renderer,
            decoder_config,
            detections: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The item store.
    #[must_use]
    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// The product API.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The decoder.
    #[must_use]
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Show the initial screen: connectivity state and the stored items.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored items cannot be read.
    pub fn start(&mut self) -> Result<()> {
        self.set_online(self.state.is_online());
        self.render_stored()
    }

    /// Apply a connectivity change.
    ///
    /// Going offline stops an active scan and shows the offline banner;
    /// coming back online hides it. The scan button is enabled only while
    /// online.
    pub fn set_online(&mut self, online: bool) {
        if !online {
            self.stop_scanner();
        }
        self.state.set_online(online);
        self.renderer
            .render_banner(if online { None } else { Some(OFFLINE_BANNER) });
        self.render_button();
    }

    /// Press the scan button.
    ///
    /// # Errors
    ///
    /// Returns an error if a failed start cannot render the stored items.
    pub async fn click_scan_button(&mut self) -> Result<ButtonOutcome> {
        if !self.state.is_online() {
            debug!("Scan button is disabled while offline");
            return Ok(ButtonOutcome::Ignored);
        }

        if self.state.is_scanning() {
            self.stop_scanner();
            self.render_button();
            return Ok(ButtonOutcome::Stopped);
        }

        match self.start_scanner().await {
            Ok(()) => Ok(ButtonOutcome::Started),
            Err(e) => {
                error!(decoder = self.decoder.name(), error = %e, "Scanner failed to start");
                self.render_button();
                let items = self.stored_views()?;
                self.renderer.render_results(&ResultsView::Failed {
                    message: format!("Unable to start scanner: {e}"),
                    items,
                });
                Ok(ButtonOutcome::StartFailed(e))
            }
        }
    }

    /// Handle a decoded barcode.
    ///
    /// Only the first detection of an activation is looked up; detections
    /// arriving while idle or during a lookup are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup cannot render its result.
    pub async fn handle_detection(&mut self, detection: Detection) -> Result<Option<LookupOutcome>> {
        if !self.state.is_scanning() || self.state.is_lookup_in_flight() {
            debug!(code = %detection.code, "Ignoring detection outside an active scan");
            return Ok(None);
        }

        info!(code = %detection.code, symbology = %detection.symbology, "Barcode detected");
        self.stop_scanner();
        self.render_button();
        self.lookup(&detection.code).await.map(Some)
    }

    /// Look up `barcode`, store the result and render.
    ///
    /// Lookup failures are not errors: they are rendered above the stored
    /// items and reported as [`LookupOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::LookupInProgress`] if another lookup holds the
    /// lookup slot, or an error if the stored items cannot be read for
    /// display.
    pub async fn lookup(&mut self, barcode: &str) -> Result<LookupOutcome> {
        if !self.state.begin_lookup() {
            warn!(barcode, "A product lookup is already in progress");
            return Err(Error::LookupInProgress);
        }
        info!(barcode, "Looking up product");

        let result = self.fetch_and_save(barcode).await;
        self.state.end_lookup();

        match result {
            Ok(Some(item)) => {
                self.render_stored()?;
                Ok(LookupOutcome::Saved(item))
            }
            Ok(None) => {
                info!(barcode, "No product found");
                self.renderer.render_results(&ResultsView::NotFound {
                    barcode: barcode.to_string(),
                });
                Ok(LookupOutcome::NotFound)
            }
            Err(e) => {
                if e.is_offline() {
                    info!(barcode, "Lookup skipped while offline");
                } else if e.is_lookup_failure() {
                    warn!(barcode, error = %e, "Product lookup failed");
                } else {
                    error!(barcode, error = %e, "Product lookup could not be completed");
                }
                let message = e.to_string();
                let items = self.stored_views()?;
                self.renderer.render_results(&ResultsView::Failed {
                    message: format!("Error looking up product: {message}"),
                    items,
                });
                Ok(LookupOutcome::Failed(message))
            }
        }
    }

    /// Render every stored item.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored items cannot be read.
    pub fn render_stored(&mut self) -> Result<()> {
        let view = ResultsView::Items(self.stored_views()?);
        debug!(count = view.items().len(), "Rendering stored items");
        self.renderer.render_results(&view);
        Ok(())
    }

    /// Run the event loop until the session ends.
    ///
    /// The scanner is armed at the start and re-armed whenever it was
    /// stopped by a connectivity loss. In [`SessionMode::Continuous`] it is
    /// also re-armed after every lookup. Pressing the scan button toggles
    /// it as usual. The loop ends on [`AppEvent::Shutdown`], when `events`
    /// closes, when the scanner input ends, or after the first lookup in
    /// [`SessionMode::Single`].
    ///
    /// # Errors
    ///
    /// Returns an error if the scanner cannot be started or the stored
    /// items cannot be read.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<AppEvent>,
        mode: SessionMode,
    ) -> Result<()> {
        let mut wants_scan = true;

        loop {
            if wants_scan && self.state.is_online() && !self.state.is_scanning() {
                if let ButtonOutcome::StartFailed(e) = self.click_scan_button().await? {
                    return Err(e.into());
                }
            }

            let next = {
                let detections = &mut self.detections;
                tokio::select! {
                    biased;
                    detection = next_detection(detections) => Next::Detection(detection),
                    event = events.recv() => Next::Event(event),
                }
            };

            match next {
                Next::Detection(Some(detection)) => {
                    if self.handle_detection(detection).await?.is_some()
                        && mode == SessionMode::Single
                    {
                        break;
                    }
                }
                Next::Detection(None) => {
                    info!("Scanner input ended");
                    self.stop_scanner();
                    self.render_button();
                    break;
                }
                Next::Event(Some(AppEvent::ScanButton)) => match self.click_scan_button().await? {
                    ButtonOutcome::Started => wants_scan = true,
                    ButtonOutcome::Stopped => wants_scan = false,
                    ButtonOutcome::Ignored => {}
                    ButtonOutcome::StartFailed(e) => return Err(e.into()),
                },
                Next::Event(Some(AppEvent::Connectivity(event))) => {
                    self.set_online(event.is_online());
                }
                Next::Event(Some(AppEvent::Shutdown) | None) => {
                    self.stop_scanner();
                    self.render_button();
                    break;
                }
            }
        }

        Ok(())
    }

    async fn fetch_and_save(&self, barcode: &str) -> Result<Option<ScannedItem>> {
        if !self.state.is_online() {
            return Err(Error::Offline);
        }

        let response = self.api.fetch(barcode).await?;
        let Some(product) = response.first_item() else {
            return Ok(None);
        };

        let item = ScannedItem::from_product(barcode, product);
        self.store.save(&item)?;
        Ok(Some(item))
    }

    async fn start_scanner(&mut self) -> std::result::Result<(), DecoderError> {
        self.decoder.init(&self.decoder_config).await?;

        let (tx, rx) = mpsc::channel(DETECTION_BUFFER);
        self.decoder.start(tx)?;
        self.detections = Some(rx);
        self.state.start_scanning();
        self.render_button();

        info!(decoder = self.decoder.name(), "Scanner started");
        Ok(())
    }

    fn stop_scanner(&mut self) {
        self.decoder.stop();
        if let Some(mut detections) = self.detections.take() {
            while let Ok(detection) = detections.try_recv() {
                warn!(code = %detection.code, "Discarding detection from a stopped scanner");
            }
        }
        if self.state.stop_scanning() {
            info!(decoder = self.decoder.name(), "Scanner stopped");
        }
    }

    fn stored_views(&self) -> Result<Vec<ItemView>> {
        Ok(item_views(&self.store.get_all()?))
    }

    fn render_button(&mut self) {
        let button = ScanButton::new(self.state.is_scanning(), self.state.is_online());
        self.renderer.render_button(&button);
    }
}
