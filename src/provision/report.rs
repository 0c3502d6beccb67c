// src/provision/report.rs

//! Console framing around one controller action.

use std::io::{self, Write};

use crate::contract::markers::status_code_line;

use super::ActionResponse;

const FRAME_WIDTH: usize = 70;

/// Connection details shown in the settings header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub server: String,
    pub protocol: String,
    pub username: String,
}

fn frame(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(FRAME_WIDTH))
}

pub fn print_header(
    out: &mut dyn Write,
    description: &str,
    connection: &ConnectionInfo,
) -> io::Result<()> {
    frame(out)?;
    writeln!(out, "<<< Controller - {description} >>>")?;
    writeln!(out, "{}", "-".repeat(FRAME_WIDTH))?;
    writeln!(out, "[*] Running settings:")?;
    writeln!(out, " -> Controller address: {}", connection.server)?;
    writeln!(out, " -> Protocol: {}", connection.protocol)?;
    writeln!(out, " -> User name: {}", connection.username)?;
    frame(out)
}

/// Print the status code marker, and the body when it is an error or the
/// action asked for it.
pub fn print_response(
    out: &mut dyn Write,
    description: &str,
    response: &ActionResponse,
) -> io::Result<()> {
    frame(out)?;
    writeln!(out, "[*] {description} results:")?;
    writeln!(out, "{}", status_code_line(description, response.status))?;
    if !(200..=204).contains(&response.status) || response.print_body {
        writeln!(out, ">> {description} request HTTP response text:")?;
        writeln!(out, "{}", response.body)?;
    }
    frame(out)
}

/// Titled data block printed by list/details style actions.
pub fn print_data(out: &mut dyn Write, title: &str, data: &str) -> io::Result<()> {
    frame(out)?;
    writeln!(out, "[*] {title}:")?;
    writeln!(out, "{data}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::parse;

    fn printed(response: &ActionResponse) -> String {
        let mut out = Vec::new();
        print_response(&mut out, "Executing provisioning task", response).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn status_code_line_is_readable_by_the_parser() {
        let text = printed(&ActionResponse {
            status: 202,
            body: "{}".to_string(),
            print_body: false,
        });
        assert_eq!(parse(&text).status_code.as_deref(), Some("202"));
        assert!(!text.contains("response text"));
    }

    #[test]
    fn error_status_prints_the_body() {
        let text = printed(&ActionResponse {
            status: 500,
            body: "boom".to_string(),
            print_body: false,
        });
        assert!(text.contains("response text:\nboom"));
    }
}
