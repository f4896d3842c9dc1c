//! Message formatting utilities for consistent CLI output

/// Format an error message
pub fn error(msg: &str) -> String {
    format!("[ERROR] {}", msg)
}

/// Format a warning message
pub fn warning(msg: &str) -> String {
    format!("[WARNING] {}", msg)
}

/// Format an info message
pub fn info(msg: &str) -> String {
    format!("[INFO] {}", msg)
}
