//! System prompt wrapped around the retrieved context.

/// Fixed instructions placed before the context.
pub const SYSTEM_PREAMBLE: &str = "You are a business data assistant. \
Answer questions about the user's uploaded spreadsheets. \
The relevant file contents are listed below.";

/// Closing instruction for questions the files do not cover.
pub const FALLBACK_INSTRUCTION: &str = "If the files above do not contain the answer, \
say so briefly and answer from general knowledge.";

/// Builds the system turn: preamble, context block, fallback instruction.
///
/// An empty context still yields a complete prompt.
///
/// ```
/// use contextor::prompt::{build_system_prompt, SYSTEM_PREAMBLE};
/// let p = build_system_prompt("");
/// assert!(p.starts_with(SYSTEM_PREAMBLE));
/// assert!(p.contains("(no matching files)"));
/// ```
pub fn build_system_prompt(context: &str) -> String {
    let body = if context.trim().is_empty() {
        "(no matching files)"
    } else {
        context
    };
    format!("{SYSTEM_PREAMBLE}\n\nContext:\n{body}\n\n{FALLBACK_INSTRUCTION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_sits_between_preamble_and_fallback() {
        let p = build_system_prompt("File ID: 1\nContent: a\nScore: 0.9");
        let ctx = p.find("File ID: 1").unwrap();
        assert!(p.find(SYSTEM_PREAMBLE).unwrap() < ctx);
        assert!(ctx < p.find(FALLBACK_INSTRUCTION).unwrap());
    }
}
