//! Bounded worker pool that scores listings while scraping continues.

use crate::scorer::QualificationScorer;
use futures::stream::{FuturesUnordered, StreamExt};
use jobhound_core::{CandidateProfile, JobListing, QualificationResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Queue of extracted listings scored by at most `workers` concurrent calls.
///
/// Submission never blocks, so the scraping loop is independent of provider
/// latency. [`ScoringPool::finish`] closes the queue and waits for every
/// submitted listing to be scored.
pub struct ScoringPool {
    sender: mpsc::UnboundedSender<(usize, JobListing)>,
    dispatcher: JoinHandle<Vec<(usize, QualificationResult)>>,
    submitted: usize,
}

impl ScoringPool {
    /// Start the dispatcher task.
    #[must_use]
    pub fn spawn(scorer: QualificationScorer, profile: CandidateProfile, workers: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(
            Arc::new(scorer),
            Arc::new(profile),
            workers.max(1),
            receiver,
        ));
        Self {
            sender,
            dispatcher,
            submitted: 0,
        }
    }

    /// Queue a listing for scoring.
    pub fn submit(&mut self, listing: JobListing) {
        let index = self.submitted;
        if self.sender.send((index, listing)).is_err() {
            error!("scoring dispatcher stopped, listing dropped");
            return;
        }
        self.submitted += 1;
    }

    /// Listings queued so far.
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Close the queue and collect results in submission order.
    pub async fn finish(self) -> Vec<QualificationResult> {
        let Self {
            sender, dispatcher, ..
        } = self;
        drop(sender);

        match dispatcher.await {
            Ok(mut results) => {
                results.sort_by_key(|(index, _)| *index);
                results.into_iter().map(|(_, result)| result).collect()
            }
            Err(e) => {
                error!("scoring dispatcher failed: {e}");
                Vec::new()
            }
        }
    }
}

async fn dispatch(
    scorer: Arc<QualificationScorer>,
    profile: Arc<CandidateProfile>,
    workers: usize,
    mut receiver: mpsc::UnboundedReceiver<(usize, JobListing)>,
) -> Vec<(usize, QualificationResult)> {
    let mut in_flight = FuturesUnordered::new();
    let mut results = Vec::new();
    let mut open = true;

    loop {
        tokio::select! {
            next = receiver.recv(), if open && in_flight.len() < workers => match next {
                Some((index, listing)) => {
                    let scorer = Arc::clone(&scorer);
                    let profile = Arc::clone(&profile);
                    in_flight.push(async move {
                        let result = scorer.score(&listing, &profile).await;
                        (index, result)
                    });
                }
                None => open = false,
            },
            Some(done) = in_flight.next(), if !in_flight.is_empty() => results.push(done),
            else => break,
        }
    }

    debug!(scored = results.len(), "scoring queue drained");
    results
}
