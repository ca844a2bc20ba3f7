use crate::detector::ProgramMode;
use crate::harness::{self, cpp};
use crate::languages::LanguageConfig;

use super::{LanguageRuntime, RenderRequest, RenderedProgram};

/// g++ with nlohmann/json for function mode
pub struct CppRuntime {
    config: LanguageConfig,
}

impl CppRuntime {
    pub fn new(config: LanguageConfig) -> Self {
        Self { config }
    }
}

impl LanguageRuntime for CppRuntime {
    fn config(&self) -> &LanguageConfig {
        &self.config
    }

    fn render(&self, request: &RenderRequest<'_>) -> RenderedProgram {
        let sentinel = &request.identity.sentinel;
        match request.mode {
            ProgramMode::Function => RenderedProgram {
                source: cpp::wrap_function(request.code, sentinel),
                stdin: Some(request.input.to_string()),
                sentinel: sentinel.clone(),
            },
            ProgramMode::FullProgram => {
                let captured = cpp::capture_stdout(request.code, sentinel);
                RenderedProgram {
                    source: captured.source,
                    stdin: Some(harness::format_stdin(request.input)),
                    sentinel: captured.sentinel,
                }
            }
        }
    }
}
