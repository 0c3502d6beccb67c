// tests/contract_properties.rs

use proptest::prelude::*;

use provrun::contract::markers::{status_code_line, status_line, summary_line};
use provrun::contract::parse;

proptest! {
    #[test]
    fn summaries_survive_emit_then_parse(summary in "[ -~\\n\\t]{0,80}") {
        let text = format!("noise\n{}\nmore noise", summary_line(&summary));
        let report = parse(&text);
        prop_assert_eq!(report.summaries, vec![summary]);
    }

    #[test]
    fn every_status_line_is_found_in_order(
        statuses in prop::collection::vec("[A-Za-z ]{1,24}", 0..8),
        code in 100u16..600,
    ) {
        let mut lines: Vec<String> = statuses.iter().map(|s| status_line(s)).collect();
        lines.push(status_code_line("Executing provisioning task", code));
        let report = parse(&lines.join("\n"));

        prop_assert_eq!(report.statuses, statuses);
        let expected_code = code.to_string();
        prop_assert_eq!(report.status_code.as_deref(), Some(expected_code.as_str()));
    }

    #[test]
    fn parsing_arbitrary_text_never_panics(text in "\\PC{0,200}") {
        let _ = parse(&text);
    }
}
