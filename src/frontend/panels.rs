//! Panel components for the frontend UI
//!
//! # Panels
//!
//! - [`ControlPanel`] - Pulse inputs, Start/Stop toggle, Display and Quit
//! - [`LiveView`] - Latest probe image shown as a texture

use crate::config::settings::RuntimeSettings;
use crate::frontend::state::AppAction;
use crate::frontend::topics::Topics;
use crate::frontend::widgets::{SweepProgressBar, ValueDisplay};
use crate::session::FrameImage;
use crate::types::AcquisitionState;
use egui::{Color32, RichText, Ui};

/// Highest pulse voltage the inputs accept (V)
const MAX_PULSE_VOLTAGE: u32 = 100;

/// Renders the sweep controls
pub struct ControlPanel;

impl ControlPanel {
    /// Render the controls and return the actions the user triggered
    pub fn render(ui: &mut Ui, settings: &mut RuntimeSettings, topics: &Topics) -> Vec<AppAction> {
        let mut actions = Vec::new();
        let state = topics.acquisition_state;
        let idle = state == AcquisitionState::Idle;

        ui.heading("Pulse voltage");
        ui.add_enabled_ui(idle, |ui| {
            egui::Grid::new("pulse_inputs")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Min:");
                    ui.add(
                        egui::DragValue::new(&mut settings.pulse_min)
                            .range(0..=MAX_PULSE_VOLTAGE)
                            .suffix(" V"),
                    );
                    ui.end_row();

                    ui.label("Max:");
                    ui.add(
                        egui::DragValue::new(&mut settings.pulse_max)
                            .range(0..=MAX_PULSE_VOLTAGE)
                            .suffix(" V"),
                    );
                    ui.end_row();

                    ui.label("Step:");
                    ui.add(
                        egui::DragValue::new(&mut settings.pulse_step)
                            .range(0..=MAX_PULSE_VOLTAGE)
                            .suffix(" V"),
                    );
                    ui.end_row();
                });
        });

        ui.separator();

        ui.horizontal(|ui| {
            // Start/Stop toggle
            if idle {
                if ui
                    .button(RichText::new("● Start").color(Color32::LIGHT_RED))
                    .on_hover_text("Choose an output folder and record the sweep")
                    .clicked()
                {
                    actions.push(AppAction::StartSweep);
                }
            } else if ui.button("■ Stop").clicked() {
                actions.push(AppAction::Stop);
            }

            if ui
                .add_enabled(idle, egui::Button::new("👁 Display"))
                .on_hover_text("Show the probe image at the first frequency")
                .clicked()
            {
                actions.push(AppAction::StartDisplay);
            }

            if ui.button("Quit").clicked() {
                actions.push(AppAction::Quit);
            }
        });

        ui.separator();

        if let Some(tag) = topics.current_settings {
            ui.add(ValueDisplay::from_f64("Frequency", tag.frequency_mhz, 1).with_unit("MHz"));
            let pulse = ValueDisplay::new("Pulse", tag.pulse_voltage.to_string()).with_unit("V");
            if state.is_recording() {
                ui.add(pulse.with_color(Color32::LIGHT_RED));
            } else {
                ui.add(pulse);
            }
        }
        if let Some(progress) = topics.progress {
            ui.add(SweepProgressBar::new(progress, state.is_recording()));
        }
        if let Some(tag) = topics.last_capture {
            ui.label(RichText::new(format!("Last capture: {}", tag)).small());
        }
        if topics.reconnecting {
            ui.colored_label(Color32::YELLOW, "No images received, reconnecting...");
        }

        actions
    }
}

/// Convert a grayscale probe image to an egui image
pub fn to_color_image(image: &FrameImage) -> Option<egui::ColorImage> {
    if image.is_empty() || !image.is_consistent() {
        return None;
    }
    Some(egui::ColorImage::from_gray(
        [image.width, image.height],
        &image.pixels,
    ))
}

/// Texture holding the latest probe image
#[derive(Default)]
pub struct LiveView {
    texture: Option<egui::TextureHandle>,
    generation: u64,
}

impl LiveView {
    /// Upload the latest frame if it changed, then draw it scaled to the panel
    pub fn show(&mut self, ui: &mut Ui, topics: &Topics) {
        if topics.live_generation != self.generation {
            self.generation = topics.live_generation;
            if let Some(image) = topics.live_frame.as_ref().and_then(to_color_image) {
                match &mut self.texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.texture = Some(ui.ctx().load_texture(
                            "live_frame",
                            image,
                            egui::TextureOptions::LINEAR,
                        ))
                    }
                }
            }
        }

        let Some(texture) = &self.texture else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No image").weak());
            });
            return;
        };

        let available = ui.available_size();
        let [w, h] = texture.size();
        let scale = (available.x / w.max(1) as f32).min(available.y / h.max(1) as f32);
        let size = egui::vec2(w as f32 * scale, h as f32 * scale);
        ui.centered_and_justified(|ui| {
            ui.add(egui::Image::from_texture(egui::load::SizedTexture::new(
                texture.id(),
                size,
            )));
        });
    }
}
