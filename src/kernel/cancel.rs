use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use super::store::lock;

/// Independent request lanes. A new request only supersedes one in the same lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestRegion {
    TargetScan,
    PageTone,
    Ideation,
    Chat,
}

/// Proof that a request was started. Results may only be written while the
/// ticket is still current for its region.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub region: RequestRegion,
    pub generation: u64,
    pub token: CancellationToken,
}

#[derive(Debug, Default)]
struct Lane {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Last request wins: starting a request cancels the previous one in its region.
#[derive(Debug, Default)]
pub struct RequestGate {
    lanes: Mutex<HashMap<RequestRegion, Lane>>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, region: RequestRegion) -> RequestTicket {
        let mut lanes = lock(&self.lanes);
        let lane = lanes.entry(region).or_default();
        if let Some(previous) = lane.token.take() {
            previous.cancel();
        }
        lane.generation += 1;
        let token = CancellationToken::new();
        lane.token = Some(token.clone());
        RequestTicket {
            region,
            generation: lane.generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        !ticket.token.is_cancelled()
            && lock(&self.lanes)
                .get(&ticket.region)
                .is_some_and(|lane| lane.generation == ticket.generation)
    }

    /// Retires a finished ticket so later cancellations have nothing to hit.
    pub fn finish(&self, ticket: &RequestTicket) {
        let mut lanes = lock(&self.lanes);
        if let Some(lane) = lanes.get_mut(&ticket.region) {
            if lane.generation == ticket.generation {
                lane.token = None;
            }
        }
    }

    pub fn cancel(&self, region: RequestRegion) {
        let mut lanes = lock(&self.lanes);
        if let Some(lane) = lanes.get_mut(&region) {
            lane.generation += 1;
            if let Some(token) = lane.token.take() {
                token.cancel();
            }
        }
    }

    pub fn cancel_all(&self) {
        let mut lanes = lock(&self.lanes);
        for lane in lanes.values_mut() {
            lane.generation += 1;
            if let Some(token) = lane.token.take() {
                token.cancel();
            }
        }
    }
}
