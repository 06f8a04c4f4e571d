use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::mpsc;

use crate::core::catalog::{FileWalker, MediaCatalog};
use crate::core::error::ShuffleError;

/// Request to scan a folder for media
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub request_id: u64,
}

/// Finished scan, delivered back to the coordinating thread
#[derive(Debug)]
pub struct ScanResult {
    pub request_id: u64,
    pub root: PathBuf,
    pub result: Result<MediaCatalog, ShuffleError>,
}

/// Runs catalog scans off the UI thread. Only the most recent request
/// counts: results of superseded scans are dropped when polled. A walk in
/// progress is never interrupted, its result is just ignored.
pub struct CatalogScanner {
    request_sender: mpsc::UnboundedSender<ScanRequest>,
    result_receiver: Mutex<mpsc::UnboundedReceiver<ScanResult>>,
    latest_request: Option<u64>,
    next_request_id: u64,
}

impl CatalogScanner {
    pub fn new(walker: Arc<dyn FileWalker>) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ScanRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<ScanResult>();

        thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to create scan runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                while let Some(request) = request_rx.recv().await {
                    let result_tx = result_tx.clone();
                    let walker = Arc::clone(&walker);

                    // Each walk runs on the blocking pool so a slow folder never
                    // holds up a newer request
                    tokio::task::spawn_blocking(move || {
                        log::debug!("Scanning {} (request {})", request.root.display(), request.request_id);
                        let result = MediaCatalog::scan(&request.root, walker.as_ref());

                        let response = ScanResult {
                            request_id: request.request_id,
                            root: request.root,
                            result,
                        };
                        if let Err(e) = result_tx.send(response) {
                            log::debug!("Scan result dropped, scanner is gone: {}", e);
                        }
                    });
                }
            });
            log::debug!("Scan worker exited");
        });

        Self {
            request_sender: request_tx,
            result_receiver: Mutex::new(result_rx),
            latest_request: None,
            next_request_id: 0,
        }
    }

    /// Queue a scan. Supersedes any scan still in flight.
    pub fn request_scan(&mut self, root: PathBuf) -> u64 {
        self.next_request_id += 1;
        let request_id = self.next_request_id;

        if let Some(previous) = self.latest_request.replace(request_id) {
            log::debug!("Scan request {} superseded by {}", previous, request_id);
        }

        if let Err(e) = self.request_sender.send(ScanRequest { root, request_id }) {
            log::error!("Failed to send scan request: {}", e);
        }

        request_id
    }

    pub fn is_scanning(&self) -> bool {
        self.latest_request.is_some()
    }

    /// Returns the result of the latest request once it is done (non-blocking)
    pub fn poll(&mut self) -> Option<ScanResult> {
        let mut finished = None;

        if let Ok(mut receiver) = self.result_receiver.lock() {
            while let Ok(result) = receiver.try_recv() {
                if Some(result.request_id) == self.latest_request {
                    finished = Some(result);
                } else {
                    log::debug!("Discarding superseded scan {} of {}", result.request_id, result.root.display());
                }
            }
        }

        if finished.is_some() {
            self.latest_request = None;
        }
        finished
    }
}
