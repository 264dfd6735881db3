use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use playdock_profile::ProfileStore;
use playdock_protocol::{InstallRecord, ObserverEvent, Profile};
use playdock_runtime::GameRuntime;
use playdock_transfer::{TransferEngine, TransferEvent, TransferManager};
use playdock_unpack::{EXTRACT_DIR, UnpackEvent, Unpacker};
use tokio::sync::mpsc;

use crate::PipelineError;

/// Buffer size for the observer event channel.
const EVENT_BUFFER: usize = 256;

/// Pipeline construction parameters.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory holding one download subdirectory per item.
    pub downloads_root: PathBuf,
    /// Decoder program used for extraction.
    pub decoder: PathBuf,
}

impl PipelineConfig {
    /// Creates a config with the default `7z` decoder.
    pub fn new(downloads_root: impl Into<PathBuf>) -> Self {
        Self {
            downloads_root: downloads_root.into(),
            decoder: PathBuf::from("7z"),
        }
    }

    /// Overrides the decoder program.
    pub fn with_decoder(mut self, program: impl Into<PathBuf>) -> Self {
        self.decoder = program.into();
        self
    }
}

/// Orchestrates per-item acquisition and launch.
///
/// One acquisition per item id runs at a time; different items proceed
/// independently. All observer traffic goes through the single event
/// receiver handed out by [`take_events`](Self::take_events).
pub struct Pipeline {
    store: Arc<ProfileStore>,
    transfers: TransferManager,
    unpacker: Arc<Unpacker>,
    runtime: GameRuntime,
    active: Arc<Mutex<HashSet<String>>>,
    events_tx: mpsc::Sender<ObserverEvent>,
    events_rx: Option<mpsc::Receiver<ObserverEvent>>,
}

impl Pipeline {
    /// Creates a pipeline over the given transfer engine and profile store.
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        store: Arc<ProfileStore>,
        config: PipelineConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            transfers: TransferManager::new(engine, config.downloads_root),
            unpacker: Arc::new(Unpacker::with_decoder(config.decoder)),
            runtime: GameRuntime::new(Arc::clone(&store)),
            store,
            active: Arc::new(Mutex::new(HashSet::new())),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the observer event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ObserverEvent>> {
        self.events_rx.take()
    }

    /// Starts acquiring an item.
    ///
    /// Returns as soon as the transfer is registered; the stage chain runs
    /// in the background and reports through the observer channel, ending
    /// in exactly one terminal event for the item. A failure to even start
    /// (invalid id, id already in flight, engine refusal) is returned
    /// directly instead.
    pub async fn start_download(
        &self,
        locator: &str,
        item_id: &str,
    ) -> Result<(), PipelineError> {
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if !active.insert(item_id.to_string()) {
                return Err(PipelineError::AlreadyInProgress(item_id.to_string()));
            }
        }

        let rx = match self.transfers.start(locator, item_id).await {
            Ok(rx) => rx,
            Err(e) => {
                self.release(item_id);
                return Err(e.into());
            }
        };

        tracing::info!(item_id, "acquisition started");
        let job = AcquisitionJob {
            store: Arc::clone(&self.store),
            unpacker: Arc::clone(&self.unpacker),
            active: Arc::clone(&self.active),
            events: self.events_tx.clone(),
            download_dir: self.transfers.download_dir(item_id),
            item_id: item_id.to_string(),
        };
        tokio::spawn(job.run(rx));

        Ok(())
    }

    /// Launches an installed item and reports the updated playtime.
    pub async fn launch(&self, item_id: &str) -> Result<(), PipelineError> {
        let outcome = self.runtime.launch(item_id).await;
        if let Some(playtime) = outcome.playtime {
            let _ = self
                .events_tx
                .send(ObserverEvent::PlaytimeUpdated {
                    item_id: item_id.to_string(),
                    playtime,
                })
                .await;
        }
        outcome.result.map_err(PipelineError::from)
    }

    /// Loads the profile and broadcasts the library to the observer.
    pub async fn load_profile(&self) -> Profile {
        let profile = self.store.load();
        let _ = self
            .events_tx
            .send(ObserverEvent::LibraryLoaded {
                library: profile.library.clone(),
            })
            .await;
        profile
    }

    /// Persists a profile handed over by the UI.
    pub fn save_profile(&self, profile: &Profile) {
        self.store.save(profile);
    }

    /// Returns the persisted playtime for an item, 0 when unknown.
    pub fn playtime(&self, item_id: &str) -> u64 {
        self.runtime.playtime(item_id)
    }

    fn release(&self, item_id: &str) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(item_id);
    }
}

/// Everything one background acquisition needs to run to completion.
struct AcquisitionJob {
    store: Arc<ProfileStore>,
    unpacker: Arc<Unpacker>,
    active: Arc<Mutex<HashSet<String>>>,
    events: mpsc::Sender<ObserverEvent>,
    download_dir: PathBuf,
    item_id: String,
}

impl AcquisitionJob {
    async fn run(self, transfer_rx: mpsc::Receiver<TransferEvent>) {
        let terminal = self.run_stages(transfer_rx).await;

        // Free the item id before delivering the terminal event, so an
        // observer reacting to it can immediately start a new attempt.
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.remove(&self.item_id);
        }
        let _ = self.events.send(terminal).await;
    }

    /// Runs transfer and extraction; returns the terminal observer event.
    async fn run_stages(&self, mut transfer_rx: mpsc::Receiver<TransferEvent>) -> ObserverEvent {
        loop {
            match transfer_rx.recv().await {
                Some(TransferEvent::Progress(stats)) => {
                    let _ = self
                        .events
                        .send(ObserverEvent::TransferProgress {
                            item_id: self.item_id.clone(),
                            stats,
                        })
                        .await;
                }
                Some(TransferEvent::Done) => break,
                Some(TransferEvent::Failed(message)) => {
                    return ObserverEvent::TransferError {
                        item_id: self.item_id.clone(),
                        message,
                    };
                }
                None => {
                    return ObserverEvent::TransferError {
                        item_id: self.item_id.clone(),
                        message: "transfer stream ended unexpectedly".into(),
                    };
                }
            }
        }

        self.run_extraction().await
    }

    async fn run_extraction(&self) -> ObserverEvent {
        // The locator target comes from the library record; without one
        // there is nothing to search for.
        let target = self
            .store
            .load()
            .record(&self.item_id)
            .map(|record| record.executable.clone())
            .filter(|name| !name.is_empty());
        let Some(target) = target else {
            tracing::warn!(item_id = %self.item_id, "library record has no executable name");
            return ObserverEvent::DecompressionError {
                item_id: self.item_id.clone(),
                message: "target executable not found".into(),
            };
        };

        let (unpack_tx, mut unpack_rx) = mpsc::channel(EVENT_BUFFER);
        let forward_events = self.events.clone();
        let forward_item = self.item_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = unpack_rx.recv().await {
                let mapped = match event {
                    UnpackEvent::Started => ObserverEvent::DecompressionStart {
                        item_id: forward_item.clone(),
                    },
                    UnpackEvent::Progress(progress) => ObserverEvent::DecompressionProgress {
                        item_id: forward_item.clone(),
                        progress,
                    },
                };
                if forward_events.send(mapped).await.is_err() {
                    break;
                }
            }
        });

        let result = self
            .unpacker
            .extract(&self.download_dir, &self.item_id, &target, unpack_tx)
            .await;
        let _ = forwarder.await;

        match result {
            Ok(exec_path) => {
                let record = InstallRecord {
                    path: self
                        .download_dir
                        .join(EXTRACT_DIR)
                        .to_string_lossy()
                        .into_owned(),
                    exec_target: exec_path.to_string_lossy().into_owned(),
                };
                let item_id = self.item_id.clone();
                self.store
                    .update(move |profile| {
                        profile.extraction_paths.insert(item_id, record);
                    })
                    .await;

                ObserverEvent::DecompressionComplete {
                    item_id: self.item_id.clone(),
                    exec_path: exec_path.to_string_lossy().into_owned(),
                }
            }
            Err(e) => {
                tracing::warn!(item_id = %self.item_id, error = %e, "extraction stage failed");
                ObserverEvent::DecompressionError {
                    item_id: self.item_id.clone(),
                    message: e.to_string(),
                }
            }
        }
    }
}
