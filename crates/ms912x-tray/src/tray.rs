use std::sync::Arc;

use ksni::menu::{MenuItem, StandardItem};
use ms912x_core::model::Mode;
use ms912x_modetest::{Adapter, Runner};

const UNKNOWN_MODE: &str = "неизвестно";

pub struct Ms912xTray<R: Runner> {
    adapter: Arc<Adapter<R>>,
    modes: Vec<Mode>,
    current: Option<String>,
    unload_on_exit: bool,
}

impl<R: Runner> Ms912xTray<R> {
    pub fn new(adapter: Arc<Adapter<R>>, modes: Vec<Mode>, unload_on_exit: bool) -> Self {
        let current = adapter.current_mode();
        Self { adapter, modes, current, unload_on_exit }
    }

    fn current_label(&self) -> String {
        format!("Текущий режим: {}", self.current.as_deref().unwrap_or(UNKNOWN_MODE))
    }

    /// Label follows the request even if modetest silently refused it.
    fn switch_to(&mut self, mode: Mode) {
        match self.adapter.set_mode(mode) {
            Ok(()) => self.current = Some(mode.to_string()),
            Err(e) => tracing::warn!("failed to switch to {mode}: {e}"),
        }
    }

    fn unload(&self) {
        if let Err(e) = self.adapter.unload_driver() {
            tracing::warn!("failed to unload {}: {e}", self.adapter.driver());
        }
    }
}

impl<R: Runner + Send + Sync + 'static> ksni::Tray for Ms912xTray<R> {
    fn id(&self) -> String { "com.ms912x.tray".into() }
    fn title(&self) -> String { "MS912x".into() }
    fn icon_name(&self) -> String { "video-display".into() }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let mut items: Vec<MenuItem<Self>> = Vec::new();
        items.push(MenuItem::Standard(StandardItem {
            label: self.current_label(),
            enabled: false,
            ..Default::default()
        }));
        items.push(MenuItem::Separator);
        for &mode in &self.modes {
            items.push(MenuItem::Standard(StandardItem {
                label: mode.to_string(),
                activate: Box::new(move |this: &mut Self| this.switch_to(mode)),
                ..Default::default()
            }));
        }
        items.push(MenuItem::Separator);
        items.push(MenuItem::Standard(StandardItem {
            label: "Выгрузить драйвер".into(),
            icon_name: "media-eject".into(),
            activate: Box::new(|this: &mut Self| {
                this.unload();
                tracing::info!("driver unloaded from menu, exiting");
                std::process::exit(0);
            }),
            ..Default::default()
        }));
        items.push(MenuItem::Standard(StandardItem {
            label: "Выход".into(),
            icon_name: "application-exit".into(),
            activate: Box::new(|this: &mut Self| {
                if this.unload_on_exit {
                    this.unload();
                }
                std::process::exit(0);
            }),
            ..Default::default()
        }));
        items
    }

    // Клик по значку: перечитать текущий режим
    // (его могли сменить в обход трея).
    fn activate(&mut self, _x: i32, _y: i32) {
        self.current = self.adapter.current_mode();
        tracing::debug!("current mode re-read: {:?}", self.current);
    }
}
