pub mod domain;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod ports;
pub mod prompt;
pub mod validate;

pub use domain::{
    ChatRole, ChatTurn, CheckoutRequest, CheckoutSession, Difficulty, ExtractedDocument,
    Flashcard, GenerationKind, GenerationOutput, GenerationTask, PlanTier, QuizQuestion,
    UploadFile, UsageCounters, UserAccount, UserCredentials,
};
pub use pipeline::{GenerationError, GenerationPhase, GenerationPipeline};
pub use ports::{
    AiError, AiResult, GenerativeAiService, PaymentGateway, PortError, PortResult,
    UserRecordStore,
};
