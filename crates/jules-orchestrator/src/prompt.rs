//! Fix-request message sent back to the session

use jules_core::ReviewComment;

/// Shown instead of a line number for file-level comments
pub const LINE_PLACEHOLDER: &str = "N/A";

const FIX_HEADER: &str =
    "Automated code review has flagged several issues in the PR. Please address the following:\n\n";

const FIX_FOOTER: &str = "\nPlease apply the suggested fixes, prioritising security vulnerabilities \
     (hardcoded credentials, session fixation, CSRF, command injection) and logic errors \
     (race conditions, working-directory assumptions).";

/// Compose one consolidated message covering every comment, in input order
pub fn build_fix_message(comments: &[ReviewComment]) -> String {
    let mut message = String::from(FIX_HEADER);

    for comment in comments {
        let line = comment
            .line
            .map(|l| l.to_string())
            .unwrap_or_else(|| LINE_PLACEHOLDER.to_string());
        message.push_str(&format!("- File: {}, Line: {}\n", comment.path, line));
        message.push_str(&format!("  Issue: {}\n\n", comment.body));
    }

    message.push_str(FIX_FOOTER);
    message
}
