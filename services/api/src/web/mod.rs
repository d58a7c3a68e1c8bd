pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers the binary wires into the router.
pub use middleware::require_auth;
pub use rest::{
    account_handler, chat_handler, generate_explanation_handler, generate_flashcards_handler,
    generate_quiz_handler, generate_summary_handler, initialize_payment_handler, uploads_handler,
};
