use crate::detector::ProgramMode;
use crate::harness::{self, javascript};
use crate::languages::LanguageConfig;

use super::{LanguageRuntime, RenderRequest, RenderedProgram};

/// Node.js, out of process in both modes
pub struct JavaScriptRuntime {
    config: LanguageConfig,
}

impl JavaScriptRuntime {
    pub fn new(config: LanguageConfig) -> Self {
        Self { config }
    }
}

impl LanguageRuntime for JavaScriptRuntime {
    fn config(&self) -> &LanguageConfig {
        &self.config
    }

    fn render(&self, request: &RenderRequest<'_>) -> RenderedProgram {
        let sentinel = &request.identity.sentinel;
        match request.mode {
            ProgramMode::Function => RenderedProgram {
                source: javascript::wrap_function(request.code, request.input, sentinel),
                stdin: None,
                sentinel: sentinel.clone(),
            },
            ProgramMode::FullProgram => {
                let code = javascript::with_global_input(request.code, request.input);
                let captured = javascript::capture_stdout(&code, sentinel);
                RenderedProgram {
                    source: captured.source,
                    stdin: Some(harness::format_stdin(request.input)),
                    sentinel: captured.sentinel,
                }
            }
        }
    }
}
