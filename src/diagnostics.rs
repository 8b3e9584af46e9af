//! Diagnostic Reporting for the Rill Scripting Language
//!
//! The parser and the semantic analyzer are non-fatal: they report every
//! problem they find and keep going. Both stages receive a [`Reporter`]
//! explicitly (it is never process-global state), write one line per problem
//! to stderr, and let the driver decide what to do with the totals.
//!
//! Messages follow the `Error: <message> [line N]` shape and are retained so
//! tests and the driver can inspect what was reported.

/// Explicit diagnostic sink shared by the parser and the semantic analyzer.
#[derive(Debug, Default)]
pub struct Reporter {
    messages: Vec<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a single diagnostic, attributed to a source line.
    ///
    /// The rendered line goes to stderr immediately and is retained for
    /// later inspection.
    pub fn report(&mut self, line: usize, message: &str) {
        let rendered = format!("Error: {} [line {}]", message, line);
        eprintln!("{}", rendered);
        self.messages.push(rendered);
    }

    /// Number of diagnostics reported so far.
    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }

    /// The rendered diagnostic lines, in report order.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_rendered_messages() {
        let mut reporter = Reporter::new();
        assert!(!reporter.has_errors());

        reporter.report(3, "expected ';' after value");
        reporter.report(7, "undefined name 'x'");

        assert_eq!(reporter.count(), 2);
        assert!(reporter.has_errors());
        assert_eq!(
            reporter.messages()[0],
            "Error: expected ';' after value [line 3]"
        );
        assert_eq!(reporter.messages()[1], "Error: undefined name 'x' [line 7]");
    }
}
