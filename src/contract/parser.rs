// src/contract/parser.rs

use std::sync::LazyLock;

use regex::Regex;

use super::markers::{ACCEPTED_STATUS_CODE, COMPLETED_STATUS, UNVERIFIED_STATUS};

static STATUS_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"HTTP response status code: (\d+)").expect("valid regex"));
static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""Status": "((?:[^"\\]|\\.)*)""#).expect("valid regex"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""Summary": "((?:[^"\\]|\\.)*)""#).expect("valid regex"));

/// Everything the orchestrator reads out of one operation's stdout.
///
/// Absent markers give `None` / empty vectors; parsing never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractReport {
    pub status_code: Option<String>,
    pub statuses: Vec<String>,
    pub summaries: Vec<String>,
    pub inconclusive: bool,
}

impl ContractReport {
    pub fn job_accepted(&self) -> bool {
        self.status_code.as_deref() == Some(ACCEPTED_STATUS_CODE)
    }

    /// Statuses other than `Completed`, in order of appearance.
    pub fn not_completed(&self) -> impl Iterator<Item = &str> {
        self.statuses
            .iter()
            .map(|s| s.trim())
            .filter(|s| *s != COMPLETED_STATUS)
    }

    /// Summaries with blank entries dropped.
    pub fn non_empty_summaries(&self) -> impl Iterator<Item = &str> {
        self.summaries
            .iter()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Scan raw operation output for contract markers.
pub fn parse(output: &str) -> ContractReport {
    let status_code = STATUS_CODE_RE
        .captures(output)
        .map(|caps| caps[1].to_string());

    let statuses = STATUS_RE
        .captures_iter(output)
        .map(|caps| unescape(&caps[1]))
        .collect();

    let summaries = SUMMARY_RE
        .captures_iter(output)
        .map(|caps| unescape(&caps[1]))
        .collect();

    ContractReport {
        status_code,
        statuses,
        summaries,
        inconclusive: output.contains(UNVERIFIED_STATUS),
    }
}

/// Undo JSON string escaping for the sequences operations actually emit.
/// Unknown escapes are kept as written.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPTED_OUTPUT: &str = r#"
======================================================================
[*] Running job 42
"Status": "Completed"
"Summary": "10.0.0.1:\n\tvlan 5 created"
"Status": "Completed"
"Summary": ""
======================================================================
[*] Executing provisioning task results:
>> Executing provisioning task request HTTP response status code: 202
"#;

    #[test]
    fn extracts_all_markers_in_order() {
        let report = parse(ACCEPTED_OUTPUT);

        assert_eq!(report.status_code.as_deref(), Some("202"));
        assert!(report.job_accepted());
        assert_eq!(report.statuses, vec!["Completed", "Completed"]);
        assert_eq!(report.summaries, vec!["10.0.0.1:\n\tvlan 5 created", ""]);
        assert_eq!(report.non_empty_summaries().count(), 1);
        assert!(!report.inconclusive);
    }

    #[test]
    fn missing_markers_are_not_an_error() {
        let report = parse("nothing interesting here");
        assert_eq!(report, ContractReport::default());
        assert!(!report.job_accepted());
    }

    #[test]
    fn first_status_code_wins() {
        let report = parse(
            "HTTP response status code: 500\nHTTP response status code: 202\n",
        );
        assert_eq!(report.status_code.as_deref(), Some("500"));
    }

    #[test]
    fn not_completed_trims_and_keeps_order() {
        let report = parse(
            r#""Status": "Completed" "Status": " Failed " "Status": "Aborted""#,
        );
        assert_eq!(report.not_completed().collect::<Vec<_>>(), vec!["Failed", "Aborted"]);
    }

    #[test]
    fn unverified_marker_sets_inconclusive() {
        let report = parse(
            "[*] Could not verify job status in time. It's taking too long.\n\
             >> x request HTTP response status code: 202",
        );
        assert!(report.inconclusive);
        assert!(report.statuses.is_empty());
    }

    #[test]
    fn escaped_quotes_stay_inside_the_value() {
        let report = parse(r#""Summary": "port \"1/5\" is \\down\\""#);
        assert_eq!(report.summaries, vec![r#"port "1/5" is \down\"#]);
    }
}
