//! Out-of-process execution of AppleScript requests.
//!
//! One interpreter process is spawned per request. The request goes in on
//! stdin; stdout is the response literal; anything at all on stderr fails the
//! call with the full request attached.

use crate::error::{Result, XlError};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;
use xlrange_engine::engine::Value;
use xlrange_engine::script::{envelope, parse_literal};

/// Sends a request text somewhere and returns the raw response text.
pub trait Transport {
    fn execute(&mut self, request: &str) -> Result<String>;
}

/// Runs an external interpreter (`osascript -s s -` by default).
#[derive(Clone, Debug)]
pub struct ProcessTransport {
    program: String,
    args: Vec<String>,
}

impl ProcessTransport {
    /// `command[0]` is the program, the rest are its arguments.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| XlError::Config("interpreter command is empty".to_string()))?;
        Ok(ProcessTransport {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn failure(&self, message: String, request: &str) -> XlError {
        XlError::EngineCommunication {
            message: format!("{}: {}", self.program, message),
            request: request.to_string(),
        }
    }
}

impl Transport for ProcessTransport {
    fn execute(&mut self, request: &str) -> Result<String> {
        debug!(program = %self.program, bytes = request.len(), "spawning interpreter");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("failed to start: {}", e), request))?;

        // Feed stdin from a separate thread so a chatty interpreter cannot
        // fill its stdout pipe while we are still blocked writing.
        let writer = child.stdin.take().map(|mut stdin| {
            let payload = request.as_bytes().to_vec();
            thread::spawn(move || match stdin.write_all(&payload) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| self.failure(format!("failed to collect output: {}", e), request))?;
        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(self.failure(format!("failed to send request: {}", e), request)),
                Err(_) => return Err(self.failure("request writer panicked".to_string(), request)),
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim_end();
        if !stderr.is_empty() {
            return Err(self.failure(stderr.to_string(), request));
        }
        if !output.status.success() {
            return Err(self.failure(format!("exited with {}", output.status), request));
        }

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.ends_with('\n') {
            stdout.pop();
            if stdout.ends_with('\r') {
                stdout.pop();
            }
        }
        debug!(bytes = stdout.len(), "interpreter responded");
        Ok(stdout)
    }
}

/// Builds enveloped requests for one application and runs them.
pub struct ScriptTransport {
    application: String,
    channel: Box<dyn Transport>,
}

impl ScriptTransport {
    pub fn new(application: impl Into<String>, channel: Box<dyn Transport>) -> Self {
        ScriptTransport {
            application: application.into(),
            channel,
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn build(&self, body: &str) -> String {
        envelope(&self.application, body)
    }

    pub fn execute(&mut self, request: &str) -> Result<String> {
        self.channel.execute(request)
    }

    /// Build and execute; returns the raw response text.
    pub fn run(&mut self, body: &str) -> Result<String> {
        let request = self.build(body);
        self.execute(&request)
    }

    /// Build, execute and parse the response literal. An empty response is `Null`.
    pub fn query(&mut self, body: &str) -> Result<Value> {
        let response = self.run(body)?;
        if response.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(parse_literal(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_interpreter_command_is_a_config_error() {
        assert!(matches!(ProcessTransport::new(&[]), Err(XlError::Config(_))));
    }

    #[test]
    fn test_missing_program_is_a_communication_error() {
        let mut t = ProcessTransport::new(&["/nonexistent/xlrange-interpreter".to_string()]).unwrap();
        match t.execute("return 1") {
            Err(XlError::EngineCommunication { request, .. }) => assert_eq!(request, "return 1"),
            other => panic!("expected communication error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    fn sh(script: &str) -> ProcessTransport {
        ProcessTransport::new(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_returned_without_trailing_newline() {
        let mut t = sh("cat");
        assert_eq!(t.execute("{1, 2}\n").unwrap(), "{1, 2}");
    }

    #[cfg(unix)]
    #[test]
    fn test_any_stderr_output_fails_with_full_request() {
        let mut t = sh("cat >/dev/null; echo '{1}'; echo 'execution error' >&2");
        let request = "tell application \"X\"\nreturn 1\nend tell";
        match t.execute(request) {
            Err(XlError::EngineCommunication { message, request: sent }) => {
                assert!(message.contains("execution error"));
                assert_eq!(sent, request);
            }
            other => panic!("expected communication error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_without_stderr_fails() {
        let mut t = sh("cat >/dev/null; exit 3");
        assert!(matches!(t.execute("x"), Err(XlError::EngineCommunication { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_query_parses_response_literal() {
        let mut st = ScriptTransport::new("Microsoft Excel", Box::new(sh("cat >/dev/null; printf '{\"a\", 2}\\n'")));
        assert_eq!(
            st.query("return {\"a\", 2}").unwrap(),
            Value::List(vec![Value::from("a"), Value::Number(2.0)])
        );
    }
}
