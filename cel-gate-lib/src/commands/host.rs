use std::io::Write;

/// Where the commands print verdicts and diagnostics, and how they report a failed check.
pub trait Host: Send + Sync {
    /// Verdicts and validation summaries
    fn output(&mut self) -> impl Write;

    /// Notes that are not part of a verdict, such as a missing claims policy
    fn error(&mut self) -> impl Write;

    /// Report a rejected call or an invalid configuration with a non-zero status.
    fn exit(&mut self, code: i32);
}

/// Captures what a command printed so tests can assert on verdicts and exit codes
#[cfg(test)]
#[derive(Debug, Default)]
pub struct TestHost {
    pub verdicts: Vec<u8>,
    pub notes: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[cfg(test)]
impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.verdicts).into_owned()
    }

    pub fn error_text(&self) -> String {
        String::from_utf8_lossy(&self.notes).into_owned()
    }
}

#[cfg(test)]
impl Host for TestHost {
    fn output(&mut self) -> impl Write {
        &mut self.verdicts
    }

    fn error(&mut self) -> impl Write {
        &mut self.notes
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}
