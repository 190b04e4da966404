use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ms912x_core::config::{self, Config};
use ms912x_core::model::{self, Mode};
use ms912x_modetest::{Adapter, Runner};
use tracing_subscriber::EnvFilter;
use which::which;

mod cli;
mod tray;

use cli::{Cli, Command};
use tray::Ms912xTray;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = config::load(cli.config.as_ref());
    let adapter = Adapter::system(&config);

    match cli.command.unwrap_or(Command::Tray) {
        Command::Tray => cmd_tray(&config, adapter),
        Command::Status => cmd_status(&config, &adapter),
        Command::Set { mode } => cmd_set(&adapter, mode),
        Command::Unload => cmd_unload(&adapter),
    }
}

fn cmd_tray<R>(config: &Config, adapter: Adapter<R>) -> Result<()>
where
    R: Runner + Send + Sync + 'static,
{
    if !adapter.driver_loaded() {
        tracing::info!("{} is not loaded, nothing to do", adapter.driver());
        return Ok(());
    }

    let adapter = Arc::new(adapter);
    let tray = Ms912xTray::new(Arc::clone(&adapter), config.menu_modes(), config.unload_on_exit);
    let service = ksni::TrayService::new(tray);
    let handle = service.handle();
    service.spawn();
    tracing::info!("tray started for {}", adapter.driver());

    wait_until_unloaded(&adapter, config.poll_interval());
    handle.shutdown();
    Ok(())
}

/// Blocks until the module goes away (unplugged or rmmod from elsewhere).
fn wait_until_unloaded<R: Runner>(adapter: &Adapter<R>, interval: Duration) {
    loop {
        thread::sleep(interval);
        if !adapter.driver_loaded() {
            tracing::info!("{} is no longer loaded, exiting", adapter.driver());
            return;
        }
    }
}

/// Firmware mode number for the reported resolution, e.g. "0x8100".
fn firmware_code(current: Option<&str>, refresh_hz: u32) -> Option<String> {
    let mode: Mode = current?.parse().ok()?;
    model::lookup(mode, refresh_hz).map(|m| format!("0x{:04x}", m.code))
}

fn cmd_status(config: &Config, adapter: &Adapter) -> Result<()> {
    let loaded = adapter.driver_loaded();
    println!(
        "  {} {} {}",
        "Driver:".bold(),
        adapter.driver(),
        if loaded { "loaded".green() } else { "not loaded".red() }
    );
    if loaded {
        let connector = adapter.connector_id();
        let current = adapter.current_mode();
        println!("  {} {}", "Connector:".bold(), connector.as_deref().unwrap_or("-"));
        println!("  {} {}", "Mode:".bold(), current.as_deref().unwrap_or("unknown"));
        if let Some(code) = firmware_code(current.as_deref(), adapter.refresh_hz()) {
            println!("  {} {}", "Firmware mode:".bold(), code.dimmed());
        }
    }

    println!("  {}", "Tools:".bold());
    let tools = &config.tools;
    for name in [&tools.lsmod, &tools.modetest, &tools.pkexec, &tools.rmmod] {
        match which(name) {
            Ok(path) => println!("    {} {}", name, path.display().to_string().dimmed()),
            Err(_) => println!("    {} {}", name, "missing".yellow()),
        }
    }
    Ok(())
}

fn cmd_set(adapter: &Adapter, mode: Mode) -> Result<()> {
    adapter
        .set_mode(mode)
        .with_context(|| format!("switching to {mode}"))?;
    println!("Requested {}", mode.to_string().cyan());
    Ok(())
}

fn cmd_unload(adapter: &Adapter) -> Result<()> {
    adapter
        .unload_driver()
        .with_context(|| format!("unloading {}", adapter.driver()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms912x_modetest::{Captured, Invocation};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// lsmod lists the driver for the first `present_for` calls, then drops it.
    /// Any other program succeeds with empty output.
    struct Lsmod {
        present_for: usize,
        missing_tool: bool,
        lsmod_calls: AtomicUsize,
        programs: Mutex<Vec<String>>,
    }

    impl Lsmod {
        fn new(present_for: usize) -> Self {
            Self {
                present_for,
                missing_tool: false,
                lsmod_calls: AtomicUsize::new(0),
                programs: Mutex::new(Vec::new()),
            }
        }
    }

    impl Runner for Lsmod {
        fn run(&self, inv: &Invocation) -> io::Result<Captured> {
            self.programs.lock().unwrap().push(inv.program.clone());
            if inv.program != "lsmod" {
                return Ok(Captured { success: true, code: Some(0), stdout: String::new() });
            }
            if self.missing_tool {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            let n = self.lsmod_calls.fetch_add(1, Ordering::SeqCst);
            let stdout = if n < self.present_for { "ms912x 24576 1\n" } else { "snd 1 0\n" };
            Ok(Captured { success: true, code: Some(0), stdout: stdout.to_string() })
        }
    }

    #[test]
    fn tray_not_started_without_driver() {
        let config = Config::default();
        let runner = Arc::new(Lsmod { missing_tool: true, ..Lsmod::new(0) });
        let adapter = Adapter::new(&config, Arc::clone(&runner));
        assert!(cmd_tray(&config, adapter).is_ok());
        // Only lsmod ran: the tray reads the mode on construction, so none was built.
        assert_eq!(*runner.programs.lock().unwrap(), vec!["lsmod".to_string()]);
    }

    #[test]
    fn tray_not_started_when_module_unlisted() {
        let config = Config::default();
        let runner = Arc::new(Lsmod::new(0));
        let adapter = Adapter::new(&config, Arc::clone(&runner));
        assert!(cmd_tray(&config, adapter).is_ok());
        assert_eq!(*runner.programs.lock().unwrap(), vec!["lsmod".to_string()]);
    }

    #[test]
    fn poll_returns_once_driver_disappears() {
        let runner = Arc::new(Lsmod::new(3));
        let adapter = Adapter::new(&Config::default(), Arc::clone(&runner));
        wait_until_unloaded(&adapter, Duration::from_millis(1));
        assert_eq!(runner.lsmod_calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn firmware_code_for_known_modes() {
        assert_eq!(firmware_code(Some("1920x1080"), 60).as_deref(), Some("0x8100"));
        assert_eq!(firmware_code(Some("720x576"), 50).as_deref(), Some("0x1100"));
        assert_eq!(firmware_code(Some("720x576"), 60), None);
        assert_eq!(firmware_code(Some("garbage"), 60), None);
        assert_eq!(firmware_code(None, 60), None);
    }
}
