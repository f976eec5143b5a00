//! Layered prompt builder for agents.
//!
//! Prompts are assembled from a stack of plain-text fragments. File layers
//! are read from the prompts directory (`config/prompts/` by default); a
//! missing file is skipped, or replaced by a built-in fallback with
//! [`layer_or`](PromptBuilder::layer_or).
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all layers are joined.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

/// Fluent builder that assembles a layered prompt from template files.
///
/// ```rust
/// use career_sim::subsystems::agents::core::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("config/prompts")
///     .layer_or("narrator.md", "You are a Narrator Agent.")
///     .append("Career: {{career}}")
///     .var("career", "Chef")
///     .build();
/// assert!(prompt.contains("Career: Chef"));
/// ```
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append a layer by loading `filename` from the prompts directory.
    /// Silently skips the layer when the file does not exist.
    pub fn layer(mut self, filename: &str) -> Self {
        if let Some(text) = self.read_layer(filename) {
            self.parts.push(text);
        }
        self
    }

    /// Like [`layer`](Self::layer), but appends `fallback` when the file is
    /// missing or empty.
    pub fn layer_or(mut self, filename: &str, fallback: &str) -> Self {
        match self.read_layer(filename) {
            Some(text) => self.parts.push(text),
            None => self = self.append(fallback),
        }
        self
    }

    /// Directly append a text fragment (e.g. an already-loaded template body).
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim().to_string();
        if !trimmed.is_empty() {
            self.parts.push(trimmed);
        }
        self
    }

    /// Register `{{key}}` → `value` substitution pairs applied at build time.
    pub fn with_vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (k, v) in vars {
            self.vars.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Register a single variable.  Convenience wrapper around [`with_vars`](Self::with_vars).
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Assemble all layers, join with blank lines, and apply variable substitution.
    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{}}}}}", k);
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }

    fn read_layer(&self, filename: &str) -> Option<String> {
        let path = self.prompts_dir.join(filename);
        match fs::read_to_string(&path) {
            Ok(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
            Err(_) => {
                tracing::debug!("prompt: layer '{}' not found — skipped", path.display());
                None
            }
        }
    }
}
