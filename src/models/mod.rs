pub mod enrichment;
pub mod job;
pub mod loaders;
pub mod ocr;
pub mod page_image;
pub mod script;
pub mod selection;
pub mod step;
pub mod variant;

pub use enrichment::EnrichmentStage;
pub use job::JobStatus;
pub use loaders::SelectionStore;
pub use ocr::{CombinedOcr, OcrResult};
pub use page_image::{CompressionInfo, PageImage};
pub use script::{CreatedScript, ScriptRecord};
pub use selection::{SelectionContext, SourceFile};
pub use step::{step_descriptors, Stage, StepDescriptor, INITIAL_STEP, TERMINAL_STEP};
pub use variant::{PipelineVariant, SecondaryJob};
