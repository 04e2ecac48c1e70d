// src/output.rs

//! Turning an execution result into the single line the editor shows.
//!
//! Precedence is strict, first present field wins:
//! 1. stdout, verbatim
//! 2. runtime stderr, prefixed `Error: `
//! 3. compiler output, prefixed `Compilation error: `
//! 4. service message, prefixed `Message: ` (Judge0 only)
//! 5. a fixed fallback
//!
//! Empty strings count as absent.

pub const NO_OUTPUT_MESSAGE: &str = "Execution completed but no output was generated.";

/// The optional text fields of one execution, borrowed from either backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputFields<'a> {
    pub stdout: Option<&'a str>,
    pub stderr: Option<&'a str>,
    pub compile_output: Option<&'a str>,
    pub message: Option<&'a str>,
}

pub fn derive_output(fields: OutputFields<'_>) -> String {
    if let Some(out) = non_empty(fields.stdout) {
        return out.to_string();
    }
    if let Some(err) = non_empty(fields.stderr) {
        return format!("Error: {}", err);
    }
    if let Some(compile) = non_empty(fields.compile_output) {
        return format!("Compilation error: {}", compile);
    }
    if let Some(msg) = non_empty(fields.message) {
        return format!("Message: {}", msg);
    }

    NO_OUTPUT_MESSAGE.to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
