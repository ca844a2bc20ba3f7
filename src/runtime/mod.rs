//! Language runtimes
//!
//! One adapter per language behind `LanguageRuntime`. An adapter knows how
//! to render user code into a runnable program (through the harness module),
//! where the files go, and which commands compile and run it. The supervisor
//! drives the lifecycle; adapters never spawn anything themselves.

pub mod cpp;
pub mod java;
pub mod javascript;
pub mod python;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::core::JudgeError;
use crate::detector::ProgramMode;
use crate::harness::sentinel_for;
use crate::languages::{expand_template, Language, LanguageConfig, LanguageRegistry};
use crate::runner::CommandSpec;

pub use cpp::CppRuntime;
pub use java::JavaRuntime;
pub use javascript::JavaScriptRuntime;
pub use python::PythonRuntime;

/// Names shared by every program generated for one submission
#[derive(Debug, Clone)]
pub struct ProgramIdentity {
    pub id: String,
    pub sentinel: String,
}

impl ProgramIdentity {
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            sentinel: sentinel_for(&id),
            id,
        }
    }

    /// Public class name for languages that need one
    pub fn launcher_class(&self) -> String {
        format!("Judge{}", self.id)
    }
}

pub struct RenderRequest<'a> {
    pub code: &'a str,
    pub mode: ProgramMode,
    pub input: &'a Value,
    pub identity: &'a ProgramIdentity,
}

/// Generated program ready to be laid out on disk
#[derive(Debug, Clone)]
pub struct RenderedProgram {
    pub source: String,
    pub stdin: Option<String>,
    pub sentinel: String,
}

/// File locations of one program inside its scratch directory
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    pub dir: PathBuf,
    pub source_path: PathBuf,
    pub binary_path: PathBuf,
    pub class_name: String,
}

impl ProgramLayout {
    pub fn source_file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub trait LanguageRuntime: Send + Sync {
    fn config(&self) -> &LanguageConfig;

    /// Produce the program for one input
    fn render(&self, request: &RenderRequest<'_>) -> RenderedProgram;

    fn language(&self) -> Language {
        self.config().language
    }

    fn requires_compilation(&self) -> bool {
        self.config().requires_compilation()
    }

    fn layout(&self, dir: &Path, identity: &ProgramIdentity) -> ProgramLayout {
        let class_name = identity.launcher_class();
        let source_file = self.config().source_file.replace("{class}", &class_name);
        ProgramLayout {
            dir: dir.to_path_buf(),
            source_path: dir.join(source_file),
            binary_path: dir.join(format!("prog_{}", identity.id)),
            class_name,
        }
    }

    fn compile_command(&self, layout: &ProgramLayout) -> Option<CommandSpec> {
        let template = self.config().compile_command.as_ref()?;
        Some(command_from_template(template, layout, None))
    }

    fn run_command(&self, layout: &ProgramLayout, memory_mb: u32) -> CommandSpec {
        command_from_template(&self.config().run_command, layout, Some(memory_mb))
    }

    /// Whether the run step gets an address-space rlimit
    fn limits_address_space(&self) -> bool {
        self.config().address_space_limit
    }
}

fn command_from_template(
    template: &[String],
    layout: &ProgramLayout,
    memory_mb: Option<u32>,
) -> CommandSpec {
    let dir = layout.dir.to_string_lossy();
    let source = layout.source_path.to_string_lossy();
    let binary = layout.binary_path.to_string_lossy();
    let memory = memory_mb.map(|m| m.to_string()).unwrap_or_default();
    let expanded = expand_template(
        template,
        &[
            ("dir", dir.as_ref()),
            ("source", source.as_ref()),
            ("binary", binary.as_ref()),
            ("class", layout.class_name.as_str()),
            ("memory_mb", memory.as_str()),
        ],
    );
    CommandSpec::from_vec(&expanded).with_work_dir(&layout.dir)
}

/// Lookup table from language to its runtime, built once at startup
#[derive(Clone)]
pub struct RuntimeRegistry {
    languages: LanguageRegistry,
    runtimes: HashMap<Language, Arc<dyn LanguageRuntime>>,
}

impl RuntimeRegistry {
    pub fn new(languages: LanguageRegistry) -> anyhow::Result<Self> {
        let mut runtimes: HashMap<Language, Arc<dyn LanguageRuntime>> = HashMap::new();
        for config in languages.configs() {
            let config = config.clone();
            let runtime: Arc<dyn LanguageRuntime> = match config.language {
                Language::JavaScript => Arc::new(JavaScriptRuntime::new(config)),
                Language::Python => Arc::new(PythonRuntime::new(config)),
                Language::Java => Arc::new(JavaRuntime::new(config)),
                Language::Cpp => Arc::new(CppRuntime::new(config)),
            };
            runtimes.insert(runtime.language(), runtime);
        }
        if let Some(missing) = Language::ALL.iter().find(|l| !runtimes.contains_key(*l)) {
            anyhow::bail!("No runtime configured for {}", missing);
        }
        Ok(Self {
            languages,
            runtimes,
        })
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Self::new(LanguageRegistry::builtin()?)
    }

    /// Resolve a user-supplied language name or alias
    pub fn resolve(&self, name: &str) -> Result<Language, JudgeError> {
        self.languages.resolve(name)
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn LanguageRuntime>> {
        self.runtimes.get(&language).cloned()
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }
}
