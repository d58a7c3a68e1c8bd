pub mod db;
pub mod gen_llm;
pub mod payment;

pub use db::DbAdapter;
pub use gen_llm::OpenAiGatewayAdapter;
pub use payment::ChapaAdapter;
