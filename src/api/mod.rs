//! HTTP surface over the analyzer

pub mod handlers;
pub mod models;
pub mod routes;

use dashmap::DashMap;

use crate::analysis::FlightHeightAnalyzer;
use crate::session::Session;

pub use routes::create_router;

/// Shared state of the HTTP server
pub struct AppState {
    pub analyzer: FlightHeightAnalyzer,
    /// Sessions keyed by client-chosen id
    pub sessions: DashMap<String, Session>,
}

impl AppState {
    pub fn new(analyzer: FlightHeightAnalyzer) -> Self {
        Self {
            analyzer,
            sessions: DashMap::new(),
        }
    }
}
