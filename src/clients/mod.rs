pub mod grading_backend;
pub mod http_backend;

pub use grading_backend::{
    ConvertedImage, CreateScriptOutcome, GradingBackend, SaveOcrRequest, SavePageImageRequest, StartJobRequest,
};
pub use http_backend::{HttpBackend, ServiceUrls};
