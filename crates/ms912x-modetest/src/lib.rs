use std::io;

use ms912x_core::config::{Config, SessionConfig, ToolsConfig};
use ms912x_core::model::{self, Mode};
use ms912x_core::{Error, Result};

pub mod parse;
pub mod runner;

pub use runner::{Captured, Invocation, Runner, SystemRunner};

/// Handle on one ms912x adapter: the kernel module plus the tools used to
/// inspect and reconfigure it.
#[derive(Debug, Clone)]
pub struct Adapter<R = SystemRunner> {
    runner: R,
    driver: String,
    refresh_hz: u32,
    tools: ToolsConfig,
    session: SessionConfig,
}

impl Adapter<SystemRunner> {
    pub fn system(config: &Config) -> Self {
        Self::new(config, SystemRunner)
    }
}

impl<R: Runner> Adapter<R> {
    pub fn new(config: &Config, runner: R) -> Self {
        Self {
            runner,
            driver: config.driver.clone(),
            refresh_hz: config.refresh_hz,
            tools: config.tools.clone(),
            session: config.session.clone(),
        }
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn refresh_hz(&self) -> u32 {
        self.refresh_hz
    }

    fn exec(&self, inv: &Invocation) -> Result<Captured> {
        self.runner.run(inv).map_err(|source| Error::Spawn {
            program: inv.program.clone(),
            source,
        })
    }

    /// Whether the kernel module is loaded. Any failure to list modules
    /// counts as "not loaded".
    pub fn driver_loaded(&self) -> bool {
        let inv = Invocation::new(&self.tools.lsmod);
        match self.runner.run(&inv) {
            Ok(out) if out.success => parse::module_listed(&out.stdout, &self.driver),
            Ok(out) => {
                tracing::debug!("{} exited with {:?}", inv.program, out.code);
                false
            }
            Err(e) => {
                tracing::debug!("failed to run {}: {e}", inv.program);
                false
            }
        }
    }

    fn probe_invocation(&self) -> Invocation {
        Invocation::new(&self.tools.modetest)
            .args(["-M", self.driver.as_str(), "-p"])
            .envs(self.session.envs())
    }

    /// Raw `modetest -p` output. The exit status is not checked; whatever
    /// reached stdout is returned.
    pub fn probe(&self) -> Result<String> {
        self.exec(&self.probe_invocation()).map(|out| out.stdout)
    }

    fn probe_or_log(&self) -> Option<String> {
        self.probe()
            .map_err(|e| tracing::warn!("probe failed: {e}"))
            .ok()
    }

    pub fn connector_id(&self) -> Option<String> {
        parse::connector_id(&self.probe_or_log()?)
    }

    /// Current resolution as modetest prints it, e.g. "1920x1080".
    pub fn current_mode(&self) -> Option<String> {
        parse::current_mode(&self.probe_or_log()?)
    }

    fn set_invocation(&self, connector: &str, mode: Mode) -> Invocation {
        // pkexec scrubs the environment, so the session has to be passed
        // through env(1) on the elevated side.
        let env_args = self
            .session
            .envs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"));
        Invocation::new(&self.tools.pkexec)
            .arg("env")
            .args(env_args)
            .args([self.tools.modetest.as_str(), "-M", self.driver.as_str(), "-s"])
            .arg(mode.set_arg(connector, self.refresh_hz))
    }

    /// Switch the adapter to `mode` at the configured refresh rate.
    ///
    /// Timings missing from the adapter's mode table are refused before any
    /// command runs. The connector is looked up fresh each time. Whether
    /// modetest actually applied the mode is not verified.
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        if !model::is_supported(mode, self.refresh_hz) {
            return Err(Error::Unsupported { mode, refresh_hz: self.refresh_hz });
        }
        let connector = self
            .connector_id()
            .ok_or_else(|| Error::NoConnector(self.driver.clone()))?;
        let inv = self.set_invocation(&connector, mode);
        let out = self.exec(&inv)?;
        if !out.success {
            tracing::warn!(
                "modetest -s {} exited with {:?}",
                mode.set_arg(&connector, self.refresh_hz),
                out.code
            );
        }
        Ok(())
    }

    /// Remove the kernel module through pkexec, or directly when pkexec is
    /// not installed. The exit status is not checked.
    pub fn unload_driver(&self) -> Result<()> {
        let elevated = Invocation::new(&self.tools.pkexec)
            .args([self.tools.rmmod.as_str(), self.driver.as_str()]);
        let out = match self.runner.run(&elevated) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    "{} not found, calling {} directly",
                    self.tools.pkexec,
                    self.tools.rmmod
                );
                let direct = Invocation::new(&self.tools.rmmod).arg(self.driver.as_str());
                self.exec(&direct)?
            }
            Err(source) => {
                return Err(Error::Spawn { program: elevated.program, source });
            }
            Ok(out) => out,
        };
        if !out.success {
            tracing::warn!("unloading {} exited with {:?}", self.driver, out.code);
        }
        Ok(())
    }
}
