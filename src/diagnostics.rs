use gsc_core::{Diagnostic, Diagnostics, Stage};
use parking_lot::Mutex;
use tracing::error;

/// Receives failure reports from the loader.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Writes diagnostics to the log the way the game console frames them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        let banner = match diagnostic.stage {
            Stage::Compile | Stage::Assemble => "script compile error",
            _ => "script load error",
        };
        error!(
            script = %diagnostic.script,
            stage = %diagnostic.stage,
            "******* {banner} *******\n{diagnostic}\n************************************"
        );
    }
}

/// Collects diagnostics in memory.
impl DiagnosticSink for Mutex<Diagnostics> {
    fn report(&self, diagnostic: Diagnostic) {
        self.lock().add_diagnostic(diagnostic);
    }
}
