use crate::detector::ProgramMode;
use crate::harness::{self, java};
use crate::languages::LanguageConfig;

use super::{LanguageRuntime, RenderRequest, RenderedProgram};

/// javac + java. The generated source never embeds the input, so one
/// compilation serves every case of a submission.
pub struct JavaRuntime {
    config: LanguageConfig,
}

impl JavaRuntime {
    pub fn new(config: LanguageConfig) -> Self {
        Self { config }
    }
}

impl LanguageRuntime for JavaRuntime {
    fn config(&self) -> &LanguageConfig {
        &self.config
    }

    fn render(&self, request: &RenderRequest<'_>) -> RenderedProgram {
        let identity = request.identity;
        let launcher = identity.launcher_class();
        match request.mode {
            ProgramMode::Function => RenderedProgram {
                source: java::wrap_function(request.code, &launcher, &identity.sentinel),
                stdin: Some(request.input.to_string()),
                sentinel: identity.sentinel.clone(),
            },
            ProgramMode::FullProgram => {
                let captured = java::capture_stdout(request.code, &launcher, &identity.sentinel);
                RenderedProgram {
                    source: captured.source,
                    stdin: Some(harness::format_stdin(request.input)),
                    sentinel: captured.sentinel,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::{Language, LanguageRegistry};
    use crate::runtime::ProgramIdentity;
    use serde_json::json;

    #[test]
    fn test_source_is_input_independent() {
        let registry = LanguageRegistry::builtin().unwrap();
        let runtime = JavaRuntime::new(registry.get(Language::Java).unwrap().clone());
        let identity = ProgramIdentity::generate();
        let code = "int solve(int n) { return n * 2; }";

        let first = runtime.render(&RenderRequest {
            code,
            mode: ProgramMode::Function,
            input: &json!({"n": 1}),
            identity: &identity,
        });
        let second = runtime.render(&RenderRequest {
            code,
            mode: ProgramMode::Function,
            input: &json!({"n": 2}),
            identity: &identity,
        });

        assert_eq!(first.source, second.source);
        assert_eq!(first.stdin.as_deref(), Some("{\"n\":1}"));
        assert_eq!(second.stdin.as_deref(), Some("{\"n\":2}"));
    }
}
