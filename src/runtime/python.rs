use crate::detector::ProgramMode;
use crate::harness::{self, python};
use crate::languages::LanguageConfig;

use super::{LanguageRuntime, RenderRequest, RenderedProgram};

pub struct PythonRuntime {
    config: LanguageConfig,
}

impl PythonRuntime {
    pub fn new(config: LanguageConfig) -> Self {
        Self { config }
    }
}

impl LanguageRuntime for PythonRuntime {
    fn config(&self) -> &LanguageConfig {
        &self.config
    }

    fn render(&self, request: &RenderRequest<'_>) -> RenderedProgram {
        let sentinel = &request.identity.sentinel;
        match request.mode {
            ProgramMode::Function => RenderedProgram {
                source: python::wrap_function(request.code, request.input, sentinel),
                stdin: None,
                sentinel: sentinel.clone(),
            },
            ProgramMode::FullProgram => {
                let captured = python::capture_stdout(request.code, sentinel);
                RenderedProgram {
                    source: captured.source,
                    stdin: Some(harness::format_stdin(request.input)),
                    sentinel: captured.sentinel,
                }
            }
        }
    }
}
