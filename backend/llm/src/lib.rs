pub mod backend;
pub mod payload_log;
pub mod providers;

pub use backend::{ModelBackend, BACKEND_ERROR_PREFIX};
pub use payload_log::PayloadLog;
pub use providers::llama_server::{LlamaServerProvider, DEFAULT_LLAMA_SERVER_URL};
pub use providers::mock::MockProvider;
