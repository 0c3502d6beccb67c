// src/exec/command.rs

//! Command lines for the operations the orchestrator spawns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SessionConfig;
use crate::errors::Result;
use crate::types::Protocol;

use super::bounded::ExecRequest;

/// Builds `provrun provision ...` / `provrun systems ...` invocations for one
/// session.
#[derive(Debug, Clone)]
pub struct OperationCommand {
    program: PathBuf,
    server: String,
    protocol: Protocol,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

impl OperationCommand {
    /// Use the session's `operation_program`, or this very executable.
    pub fn from_session(session: &SessionConfig) -> Result<Self> {
        let program = match &session.operation_program {
            Some(p) => p.clone(),
            None => std::env::current_exe()?,
        };
        Ok(Self::with_program(program, session))
    }

    pub fn with_program(program: impl Into<PathBuf>, session: &SessionConfig) -> Self {
        Self {
            program: program.into(),
            server: session.controller.trim().to_string(),
            protocol: session.protocol,
            port: session.effective_port(),
            username: session.username.clone(),
            password: session.password.clone(),
            timeout: session.effective_timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one template in blocking mode so the job poller runs in the child.
    pub fn provision(&self, template: &str, payload: &Path) -> ExecRequest {
        let mut args = vec!["provision".to_string()];
        args.extend(self.connection_args());
        args.extend([
            "execute".to_string(),
            "--template".to_string(),
            template.to_string(),
            "--file".to_string(),
            payload.display().to_string(),
            "--blocking".to_string(),
        ]);
        ExecRequest::new(&self.program, args, self.timeout)
    }

    /// List the controller's systems (used for target discovery).
    pub fn list_systems(&self) -> ExecRequest {
        let mut args = vec!["systems".to_string()];
        args.extend(self.connection_args());
        args.push("list".to_string());
        ExecRequest::new(&self.program, args, self.timeout)
    }

    fn connection_args(&self) -> Vec<String> {
        vec![
            "--server".to_string(),
            self.server.clone(),
            "--protocol".to_string(),
            self.protocol.to_string(),
            "--port".to_string(),
            self.port.to_string(),
            "--username".to_string(),
            self.username.clone(),
            "--password".to_string(),
            self.password.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;

    #[test]
    fn provision_command_carries_session_and_template() {
        let raw = load_from_str(
            r#"
[session]
controller = " 10.0.0.9 "
username = "admin"
password = "secret"
template_timeout = "30s"
targets = ["10.0.0.1"]
"#,
        )
        .unwrap();
        let command = OperationCommand::with_program("/bin/provrun", &raw.session);

        let request = command.provision("vlan", Path::new("data/abc"));

        assert_eq!(request.program, PathBuf::from("/bin/provrun"));
        assert_eq!(request.timeout, Duration::from_secs(30));
        assert_eq!(
            request.args,
            vec![
                "provision", "--server", "10.0.0.9", "--protocol", "http", "--port", "80",
                "--username", "admin", "--password", "secret", "execute", "--template", "vlan",
                "--file", "data/abc", "--blocking",
            ]
        );
    }
}
