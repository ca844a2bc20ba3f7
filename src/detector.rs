//! Program mode detection
//!
//! Decides whether submitted code is a full program (reads stdin, writes
//! stdout) or a bare function/snippet the harness has to drive. Plain
//! substring heuristics; the caller's explicit flag always wins.

use serde::{Deserialize, Serialize};

use crate::languages::Language;

/// How the harness treats submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramMode {
    FullProgram,
    Function,
}

impl ProgramMode {
    fn from_flag(is_full_program: bool) -> Self {
        if is_full_program {
            ProgramMode::FullProgram
        } else {
            ProgramMode::Function
        }
    }
}

/// Heuristic check: true when `code` looks like a full program
pub fn detect(code: &str, language: Language) -> bool {
    match language {
        Language::JavaScript => {
            code.contains("console.log(")
                || code.contains("process.stdout.write(")
                || !has_output_assignment(code)
        }
        Language::Python => code.contains("print(") || !has_output_assignment(code),
        Language::Java => code.contains("static void main") || code.contains("System.out.print"),
        Language::Cpp => {
            code.contains("int main")
                || code.contains("signed main")
                || code.contains("void main")
                || code.contains("cout")
        }
    }
}

/// Explicit flag when given, detection otherwise
pub fn resolve_mode(code: &str, language: Language, explicit: Option<bool>) -> ProgramMode {
    ProgramMode::from_flag(explicit.unwrap_or_else(|| detect(code, language)))
}

/// Looks for `output =` (any spacing) where `output` is a whole identifier
/// and the `=` is an assignment rather than a comparison.
fn has_output_assignment(code: &str) -> bool {
    const MARKER: &str = "output";

    code.match_indices(MARKER).any(|(start, _)| {
        let before = code[..start].chars().next_back();
        if before.is_some_and(is_ident_char) {
            return false;
        }
        let rest = code[start + MARKER.len()..].trim_start_matches([' ', '\t']);
        let mut chars = rest.chars();
        chars.next() == Some('=') && chars.next() != Some('=')
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
