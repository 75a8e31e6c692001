pub mod image_compressor;
pub mod job_poller;
pub mod script_registry;
pub mod warn_writer;

pub use image_compressor::{estimate_decoded_size, CompressionPreset, ImageCompressor, DEFAULT_PRESETS};
pub use job_poller::{JobPoller, PollOutcome, PollPolicy, Sleeper, TokioSleeper};
pub use script_registry::ScriptRegistry;
pub use warn_writer::WarnWriter;
