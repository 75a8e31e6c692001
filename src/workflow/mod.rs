pub mod session;
pub mod upload_ctx;
pub mod upload_flow;

pub use session::{SessionReport, StageOutput, StageResult, UploadSession};
pub use upload_ctx::UploadCtx;
pub use upload_flow::{StageDef, StagePolicy, UploadFlow, PIPELINE};
