/// Default instructions for generating the shared backdrop.
pub const DEFAULT_BACKDROP_PROMPT: &str = "Generate a clean, evenly lit photo studio backdrop: \
a soft neutral grey gradient with a subtle floor shadow, no objects, no people, no text.";

/// Default instructions for compositing one job's subject onto the backdrop.
pub const DEFAULT_JOB_PROMPT: &str = "Place the main subject of the first image onto the \
backdrop in the second image. Keep the subject's identity, pose and proportions unchanged, \
match the lighting and shadows to the backdrop, and return a single image.";

/// Instruction texts sent with each kind of generation call.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub backdrop_instructions: String,
    pub job_instructions: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backdrop_instructions: DEFAULT_BACKDROP_PROMPT.to_string(),
            job_instructions: DEFAULT_JOB_PROMPT.to_string(),
        }
    }
}
