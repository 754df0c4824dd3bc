//! Status bar panel: bottom bar showing connection, sweep stats, and error info.

use egui::{Color32, RichText, Ui};

use crate::frontend::topics::Topics;
use crate::frontend::widgets::StatusIndicator;

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub topics: &'a Topics,
    pub output_folder: Option<&'a std::path::Path>,
    pub last_error: Option<&'a str>,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection + acquisition state ===
        let connection = StatusIndicator::for_connection(ctx.topics.connection_status);
        let connection = if ctx.topics.reconnecting {
            connection.with_tooltip("Reconnecting after a stall")
        } else {
            connection
        };
        ui.add(connection);
        ui.add(StatusIndicator::for_acquisition(ctx.topics.acquisition_state));

        if let Some(tag) = ctx.topics.current_settings {
            ui.label(RichText::new(tag.to_string()).small().monospace());
        }

        ui.separator();

        let stats = &ctx.topics.stats;

        // === Captured / rejected ===
        ui.label(RichText::new(format!("Frames: {}", stats.frames_captured)).small());

        let rejected_color = if stats.frames_rejected > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            rejected_color,
            RichText::new(format!("Rejected: {}", stats.frames_rejected)).small(),
        );

        ui.separator();

        // === Stall recovery ===
        let reconnect_color = if stats.reconnects > 0 {
            Color32::YELLOW
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            reconnect_color,
            RichText::new(format!("Reconnects: {}", stats.reconnects)).small(),
        );
        ui.label(RichText::new(format!("Missed polls: {}", stats.missed_polls)).small());

        // === Last report ===
        if let Some(report) = &ctx.topics.last_report {
            ui.separator();
            ui.label(RichText::new(format!("Saved: {} file(s)", report.written.len())).small());
        }

        if let Some(folder) = ctx.output_folder {
            ui.separator();
            ui.label(RichText::new(folder.display().to_string()).small().weak());
        }

        // === Error message (right-aligned) ===
        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}
