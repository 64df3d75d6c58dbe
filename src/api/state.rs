//! API shared state

use std::sync::Arc;

use crate::store::EventStore;

/// Shared state passed to all API handlers. Unlike the teacher's actor
/// handles, the Read Aggregators need nothing but a store reference: C8 is
/// read-only and independent of the tick path.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn EventStore>,
}

impl ApiState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}
