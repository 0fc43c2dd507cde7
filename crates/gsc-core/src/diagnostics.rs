use std::fmt;

/// The step of script loading a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading the script source or enumerating scripts.
    Load,
    /// Source to assembly, including includes.
    Compile,
    /// Assembly to bytecode.
    Assemble,
    /// Compressing the stack segment.
    Compress,
    /// Writing a compiled script to the dump directory.
    Dump,
    /// Delegated host asset lookup.
    Lookup,
}

impl Stage {
    /// Lowercase verb used in messages ("failed to compile ...").
    pub fn as_verb(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Compile => "compile",
            Stage::Assemble => "assemble",
            Stage::Compress => "compress",
            Stage::Dump => "dump",
            Stage::Lookup => "look up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_verb())
    }
}

/// A single failure report about one script.
///
/// ```text
/// failed to compile 'scripts/foo':
/// at 3:5: uninitialized variable 'x'
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Canonical script name.
    pub script: String,
    /// Which step failed.
    pub stage: Stage,
    /// The underlying error message.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(script: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {} '{}':\n{}", self.stage, self.script, self.message)
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates a new, empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic to the collection.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Whether nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Iterate in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Diagnostics for one script.
    pub fn for_script<'a>(&'a self, script: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.script == script)
    }

    /// Number of diagnostics reported at `stage`.
    pub fn count_at(&self, stage: Stage) -> usize {
        self.diagnostics.iter().filter(|d| d.stage == stage).count()
    }

    /// Remove every diagnostic.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_console_wording() {
        let d = Diagnostic::new("scripts/foo", Stage::Assemble, "unresolved label 1 in 'main'");
        assert_eq!(
            d.to_string(),
            "failed to assemble 'scripts/foo':\nunresolved label 1 in 'main'"
        );
    }

    #[test]
    fn filters_by_script_and_stage() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_diagnostic(Diagnostic::new("a", Stage::Compile, "x"));
        diagnostics.add_diagnostic(Diagnostic::new("b", Stage::Compile, "y"));
        diagnostics.add_diagnostic(Diagnostic::new("a", Stage::Dump, "z"));

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.for_script("a").count(), 2);
        assert_eq!(diagnostics.count_at(Stage::Compile), 2);

        diagnostics.clear();
        assert!(diagnostics.is_empty());
    }
}
