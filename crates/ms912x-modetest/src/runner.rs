use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), envs: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, envs: Vec<(String, String)>) -> Self {
        self.envs.extend(envs);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
}

/// Runs an [`Invocation`] to completion. `Err` means the process could not
/// be started at all; a non-zero exit is reported through [`Captured`].
pub trait Runner {
    fn run(&self, inv: &Invocation) -> io::Result<Captured>;
}

/// Spawns real processes and blocks until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, inv: &Invocation) -> io::Result<Captured> {
        tracing::debug!(program = %inv.program, args = ?inv.args, "exec");
        let out = Command::new(&inv.program)
            .args(&inv.args)
            .envs(inv.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .output()?;
        Ok(Captured {
            success: out.status.success(),
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        })
    }
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(&self, inv: &Invocation) -> io::Result<Captured> {
        (**self).run(inv)
    }
}

impl<R: Runner + ?Sized> Runner for Arc<R> {
    fn run(&self, inv: &Invocation) -> io::Result<Captured> {
        (**self).run(inv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_args_and_envs() {
        let inv = Invocation::new("modetest")
            .arg("-M")
            .args(["ms912x", "-p"])
            .envs(vec![("DISPLAY".into(), ":1".into())]);
        assert_eq!(inv.program, "modetest");
        assert_eq!(inv.args, vec!["-M", "ms912x", "-p"]);
        assert_eq!(inv.envs, vec![("DISPLAY".to_string(), ":1".to_string())]);
    }

    #[test]
    fn missing_binary_is_an_io_error() {
        let inv = Invocation::new("ms912x-tray-definitely-not-installed");
        let err = SystemRunner.run(&inv).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
