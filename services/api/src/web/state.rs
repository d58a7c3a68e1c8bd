//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use studyforge_core::pipeline::GenerationPipeline;
use studyforge_core::ports::{GenerativeAiService, PaymentGateway, UserRecordStore};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn UserRecordStore>,
    pub config: Arc<Config>,
    pub ai: Arc<dyn GenerativeAiService>,
    pub payments: Arc<dyn PaymentGateway>,
    pub pipeline: GenerationPipeline,
}

impl AppState {
    /// Wires the shared state from its adapters. The pipeline reuses the
    /// same AI gateway and record store the handlers see.
    pub fn new(
        db: Arc<dyn UserRecordStore>,
        ai: Arc<dyn GenerativeAiService>,
        payments: Arc<dyn PaymentGateway>,
        config: Arc<Config>,
    ) -> Self {
        let pipeline = GenerationPipeline::new(ai.clone(), db.clone());
        Self {
            db,
            config,
            ai,
            payments,
            pipeline,
        }
    }
}
