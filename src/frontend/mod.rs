//! Frontend module for egui UI
//!
//! This module provides the main window using eframe/egui. It sends user
//! actions to the backend through crossbeam channels and renders what the
//! backend publishes.
//!
//! # Main Types
//!
//! - [`RecorderApp`] - Main application state implementing [`eframe::App`]
//! - [`Topics`] - Data published by the backend
//!
//! # Submodules
//!
//! - `panels` - Control panel and live view
//! - `status_bar` - Bottom status bar
//! - `state` - Actions emitted by panels
//! - `widgets` - Status indicators, value displays, progress bar

mod panels;
pub mod state;
pub mod status_bar;
pub mod topics;
pub mod widgets;

pub use panels::{to_color_image, ControlPanel, LiveView};
pub use state::AppAction;
pub use topics::Topics;

use crate::backend::FrontendReceiver;
use crate::config::{settings::RuntimeSettings, AppConfig, AppState};
use crate::types::AcquisitionState;
use status_bar::{render_status_bar, StatusBarContext};

/// Main application state for the recorder window
pub struct RecorderApp {
    // === Communication ===
    frontend: FrontendReceiver,

    // === Shared State ===
    config: AppConfig,
    app_state: AppState,
    settings: RuntimeSettings,
    last_error: Option<String>,

    // === All published data (state, frames, stats) ===
    topics: Topics,

    // === Views ===
    live_view: LiveView,
}

impl RecorderApp {
    /// Create a new application instance
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        frontend: FrontendReceiver,
        config: AppConfig,
        app_state: AppState,
    ) -> Self {
        if app_state.ui_preferences.dark_mode {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        }

        let settings = RuntimeSettings::from_app_state(&app_state);

        Self {
            frontend,
            config,
            app_state,
            settings,
            last_error: None,
            topics: Topics::default(),
            live_view: LiveView::default(),
        }
    }

    fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            let started = matches!(
                msg,
                crate::backend::BackendMessage::AcquisitionState(state) if state.is_active()
            );
            if let Some(error) = self.topics.apply(msg) {
                self.last_error = Some(error);
            } else if started {
                self.last_error = None;
            }
        }

        had_messages
    }

    fn handle_action(&mut self, ctx: &egui::Context, action: AppAction) {
        match action {
            AppAction::StartSweep => self.start_sweep(),
            AppAction::StartDisplay => {
                self.frontend
                    .start_display(self.settings.display_pulse_voltage());
            }
            AppAction::Stop => {
                self.frontend.stop();
            }
            AppAction::Quit => {
                tracing::info!("Quit requested");
                self.frontend.stop();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            AppAction::ToggleDarkMode => {
                let dark = !self.app_state.ui_preferences.dark_mode;
                self.app_state.ui_preferences.dark_mode = dark;
                ctx.set_visuals(if dark {
                    egui::Visuals::dark()
                } else {
                    egui::Visuals::light()
                });
            }
        }
    }

    /// Validate the inputs, ask for an output folder and start the sweep
    fn start_sweep(&mut self) {
        let params = match state::prepare_sweep(&self.settings, &self.config.sweep.frequencies_mhz)
        {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!("Sweep not started: {}", e);
                self.last_error = Some(e.to_string());
                return;
            }
        };

        let mut dialog = rfd::FileDialog::new().set_title("Select the output folder");
        if let Some(folder) = &self.settings.output_folder {
            dialog = dialog.set_directory(folder);
        }

        match state::require_output_folder(dialog.pick_folder()) {
            Ok(folder) => {
                tracing::info!("Output folder: {:?}", folder);
                self.settings.output_folder = Some(folder.clone());
                self.app_state.remember_sweep(&self.settings);
                self.last_error = None;
                self.frontend.start_sweep(params, folder);
            }
            Err(e) => {
                tracing::warn!("Sweep not started: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }
}

impl eframe::App for RecorderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.process_backend_messages();

        if self.topics.acquisition_state.is_active() || had_messages {
            ctx.request_repaint_after(self.config.acquisition.poll_interval());
        }

        let mut actions = Vec::new();

        // Menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Quit").clicked() {
                        actions.push(AppAction::Quit);
                        ui.close();
                    }
                });

                ui.menu_button("View", |ui| {
                    let label = if self.app_state.ui_preferences.dark_mode {
                        "Light mode"
                    } else {
                        "Dark mode"
                    };
                    if ui.button(label).clicked() {
                        actions.push(AppAction::ToggleDarkMode);
                        ui.close();
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.topics.acquisition_state == AcquisitionState::Recording {
                        ui.colored_label(egui::Color32::LIGHT_RED, "Recording");
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let status_ctx = StatusBarContext {
                topics: &self.topics,
                output_folder: self.settings.output_folder.as_deref(),
                last_error: self.last_error.as_deref(),
            };
            render_status_bar(ui, &status_ctx);
        });

        egui::SidePanel::left("controls")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| {
                actions.extend(ControlPanel::render(ui, &mut self.settings, &self.topics));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.live_view.show(ui, &self.topics);
        });

        for action in actions {
            self.handle_action(ctx, action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.frontend.stop();
        self.frontend.shutdown();

        self.app_state.remember_sweep(&self.settings);
        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}
