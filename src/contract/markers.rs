// src/contract/markers.rs

/// Printed instead of status lines when a job never reached a terminal state
/// within the poller's budget.
pub const UNVERIFIED_STATUS: &str = "Could not verify job status in time";

/// The HTTP status code the controller returns for an accepted job.
pub const ACCEPTED_STATUS_CODE: &str = "202";

/// The only job status that counts as success.
pub const COMPLETED_STATUS: &str = "Completed";

/// `>> <action> request HTTP response status code: <code>`
pub fn status_code_line(action: &str, code: u16) -> String {
    format!(">> {action} request HTTP response status code: {code}")
}

/// `"Status": "<status>"`
pub fn status_line(status: &str) -> String {
    format!("\"Status\": {}", quote(status))
}

/// `"Summary": "<summary>"` with the summary JSON-escaped onto one line.
pub fn summary_line(summary: &str) -> String {
    format!("\"Summary\": {}", quote(summary))
}

pub fn unverified_status_lines() -> [String; 2] {
    [
        format!("[*] {UNVERIFIED_STATUS}. It's taking too long."),
        "[*] Please validate the job's status manually".to_string(),
    ]
}

fn quote(value: &str) -> String {
    // Serializing a &str cannot fail.
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_use_exact_marker_syntax() {
        assert_eq!(status_line("Completed"), r#""Status": "Completed""#);
        assert_eq!(
            status_code_line("Executing provisioning task", 202),
            ">> Executing provisioning task request HTTP response status code: 202"
        );
    }

    #[test]
    fn summary_is_escaped_onto_one_line() {
        let line = summary_line("port 1/5: ok\nport 1/6:\t\"down\"");
        assert!(!line.contains('\n'));
        assert_eq!(line, r#""Summary": "port 1/5: ok\nport 1/6:\t\"down\"""#);
    }
}
