/*!
 * Error Types
 * Leak reports (hard assertions) and ordinary recoverable errors, with
 * thiserror, miette and serde support
 */

use crate::core::id::HandleId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One handle that was still registered when its registry was torn down
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeakedHandle {
    pub id: HandleId,
    /// Type name of the wrapped resource
    pub type_name: String,
    /// Source location of the `Handle` constructor call
    pub origin: String,
    /// Rendered diagnostic snapshot captured at creation
    pub snapshot: String,
}

impl fmt::Display for LeakedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "leaked handle {} ({}) created at {}",
            self.id, self.type_name, self.origin
        )?;
        for line in self.snapshot.lines() {
            writeln!(f, "    {}", line)?;
        }
        Ok(())
    }
}

/// Leaks found at registry teardown
///
/// This is a failed hard assertion, not a recoverable error: the caller either
/// converts it into its own failure (test harness, exit code) or calls
/// [`LeakReport::fail`].
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[error("{} resource handle(s) leaked", .leaks.len())]
#[diagnostic(
    code(resguard::leak_detected),
    help("Every tracked handle must be released (directly or through deep_release) before teardown.")
)]
#[must_use = "a leak report is a failed assertion and must not be ignored"]
pub struct LeakReport {
    leaks: Vec<LeakedHandle>,
}

impl LeakReport {
    /// Build a report; entries are ordered by handle id
    pub fn new(mut leaks: Vec<LeakedHandle>) -> Self {
        leaks.sort_by_key(|leak| leak.id);
        Self { leaks }
    }

    pub fn leaks(&self) -> &[LeakedHandle] {
        &self.leaks
    }

    pub fn len(&self) -> usize {
        self.leaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaks.is_empty()
    }

    pub fn contains(&self, id: HandleId) -> bool {
        self.leaks.iter().any(|leak| leak.id == id)
    }

    /// Full text: headline followed by one block per leaked handle
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self);
        for leak in &self.leaks {
            out.push_str(&leak.to_string());
        }
        out
    }

    /// JSON form for tooling that collects reports
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Escalate to a panic carrying the rendered report
    #[track_caller]
    pub fn fail(self) -> ! {
        panic!("{}", self.render())
    }
}

/// Configuration errors (recoverable)
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: expected {expected}")]
    #[diagnostic(
        code(resguard::config::invalid_value),
        help("Unset the variable to use the default, or pick one of the listed values.")
    )]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
