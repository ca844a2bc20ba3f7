//! Language configuration for compilation and execution
//!
//! Command templates come from `files/languages.toml` (embedded at build
//! time, overridable with a path at startup). The registry is built once and
//! handed to whoever needs it; there is no global state.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::JudgeError;

const BUILTIN_LANGUAGES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/files/languages.toml"
));

/// Supported languages. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::JavaScript,
        Language::Python,
        Language::Java,
        Language::Cpp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.name() == lowered)
            .ok_or_else(|| JudgeError::UnsupportedLanguage(s.to_string()))
    }
}

/// Configuration for a supported programming language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    pub language: Language,
    /// Name of the source file, may contain `{class}` (e.g., "{class}.java")
    pub source_file: String,
    /// Compile command template (None if not needed)
    pub compile_command: Option<Vec<String>>,
    /// Run command template
    pub run_command: Vec<String>,
    /// Memory limit multiplier and bonus: (multiplier, bonus_mb)
    /// actual_memory = base_memory * multiplier + bonus
    pub memory_limit: Option<(u32, u32)>,
    /// Apply RLIMIT_AS to the run step
    pub address_space_limit: bool,
}

impl LanguageConfig {
    pub fn requires_compilation(&self) -> bool {
        self.compile_command.is_some()
    }

    /// Calculate actual memory limit based on base memory limit
    pub fn calculate_memory_limit(&self, base_memory_mb: u32) -> u32 {
        match self.memory_limit {
            Some((multiplier, bonus_mb)) => base_memory_mb
                .saturating_mul(multiplier)
                .saturating_add(bonus_mb),
            None => base_memory_mb,
        }
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    source_file: String,
    compile_command: Option<String>,
    run_command: String,
    #[serde(default)]
    memory_limit: Vec<String>,
    #[serde(default)]
    address_space_limit: bool,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Lookup table from language (or alias) to its configuration
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    configs: HashMap<Language, LanguageConfig>,
    aliases: HashMap<String, Language>,
}

impl LanguageRegistry {
    /// Registry from the embedded `files/languages.toml`
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml(BUILTIN_LANGUAGES)
    }

    /// Registry from a TOML file, or the embedded table when `path` is None
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read language config {:?}", path))?;
                Self::from_toml(&content)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> =
            toml::from_str(content).context("Failed to parse language config")?;

        let mut configs = HashMap::new();
        let mut aliases = HashMap::new();

        for (name, raw) in raw_configs {
            let language = Language::from_str(&name)
                .with_context(|| format!("Unknown language in config: {}", name))?;

            let memory_limit = parse_limit(&name, &raw.memory_limit)?;
            let config = LanguageConfig {
                language,
                source_file: raw.source_file,
                compile_command: raw.compile_command.map(|cmd| into_command(&cmd)),
                run_command: into_command(&raw.run_command),
                memory_limit,
                address_space_limit: raw.address_space_limit,
            };
            if config.run_command.is_empty() {
                anyhow::bail!("Empty run command for {}", name);
            }

            aliases.insert(language.name().to_string(), language);
            for alias in raw.aliases {
                aliases.insert(alias.to_lowercase(), language);
            }
            configs.insert(language, config);
        }

        if let Some(missing) = Language::ALL.iter().find(|l| !configs.contains_key(*l)) {
            anyhow::bail!("Language config is missing {}", missing);
        }

        Ok(Self { configs, aliases })
    }

    /// Resolve a user-supplied language name or alias
    pub fn resolve(&self, name: &str) -> Result<Language, JudgeError> {
        self.aliases
            .get(&name.trim().to_lowercase())
            .copied()
            .ok_or_else(|| JudgeError::UnsupportedLanguage(name.to_string()))
    }

    pub fn get(&self, language: Language) -> Option<&LanguageConfig> {
        self.configs.get(&language)
    }

    pub fn configs(&self) -> impl Iterator<Item = &LanguageConfig> {
        self.configs.values()
    }

    /// All accepted names, aliases included
    pub fn supported_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aliases.keys().cloned().collect();
        names.sort();
        names
    }
}

fn parse_limit(name: &str, raw_limit: &[String]) -> anyhow::Result<Option<(u32, u32)>> {
    if raw_limit.is_empty() {
        return Ok(None);
    }
    if raw_limit.len() != 2 {
        anyhow::bail!("Invalid memory limit for {}: {:?}", name, raw_limit);
    }
    let multiplier = raw_limit[0]
        .parse::<u32>()
        .with_context(|| format!("Invalid memory multiplier for {}: {}", name, raw_limit[0]))?;
    let bonus = raw_limit[1]
        .parse::<u32>()
        .with_context(|| format!("Invalid memory bonus for {}: {}", name, raw_limit[1]))?;
    Ok(Some((multiplier, bonus)))
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

/// Substitute `{name}` placeholders in every token of a command template
pub fn expand_template(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|token| {
            vars.iter().fold(token.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{}}}", key), value)
            })
        })
        .collect()
}
