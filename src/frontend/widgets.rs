//! Custom widgets for the recorder UI
//!
//! # Widgets
//!
//! - [`StatusIndicator`] - Colored status dot with label (connected, error, etc.)
//! - [`ValueDisplay`] - Formatted value with label and optional unit
//! - [`SweepProgressBar`] - Progress of the running sweep with step count

use egui::{Color32, Response, Ui, Widget};

use crate::types::{AcquisitionState, ConnectionStatus, SweepProgress};

/// A widget that displays a colored status indicator
pub struct StatusIndicator {
    color: Color32,
    label: String,
    tooltip: Option<String>,
}

impl StatusIndicator {
    /// Create a new status indicator with the given color and label
    pub fn new(color: Color32, label: impl Into<String>) -> Self {
        Self {
            color,
            label: label.into(),
            tooltip: None,
        }
    }

    /// Indicator for a probe connection status
    pub fn for_connection(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => Self::new(Color32::GREEN, "Connected"),
            ConnectionStatus::Connecting => Self::new(Color32::YELLOW, "Connecting..."),
            ConnectionStatus::Disconnected => Self::new(Color32::GRAY, "Disconnected"),
            ConnectionStatus::Error => Self::new(Color32::RED, "Error"),
        }
    }

    /// Indicator for an acquisition state
    pub fn for_acquisition(state: AcquisitionState) -> Self {
        let color = match state {
            AcquisitionState::Idle => Color32::GRAY,
            AcquisitionState::DisplayOnly => Color32::LIGHT_BLUE,
            AcquisitionState::Recording => Color32::LIGHT_RED,
        };
        Self::new(color, state.display_name())
    }

    /// Add a tooltip to the indicator
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

impl Widget for StatusIndicator {
    fn ui(self, ui: &mut Ui) -> Response {
        let response = ui.horizontal(|ui| {
            ui.colored_label(self.color, "●");
            ui.label(egui::RichText::new(&self.label).small());
        });

        let response = response.response;

        if let Some(tooltip) = self.tooltip {
            response.on_hover_text(tooltip)
        } else {
            response
        }
    }
}

/// A widget for displaying a value with a label and optional unit
pub struct ValueDisplay {
    label: String,
    value: String,
    unit: Option<String>,
    color: Option<Color32>,
}

impl ValueDisplay {
    /// Create a new value display
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            unit: None,
            color: None,
        }
    }

    /// Create a new value display from a numeric value
    pub fn from_f64(label: impl Into<String>, value: f64, precision: usize) -> Self {
        Self::new(
            label,
            format!("{:.precision$}", value, precision = precision),
        )
    }

    /// Add a unit to the display
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the color of the value
    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = Some(color);
        self
    }
}

impl Widget for ValueDisplay {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            ui.label(format!("{}:", self.label));

            let value_text = if let Some(unit) = self.unit {
                format!("{} {}", self.value, unit)
            } else {
                self.value
            };

            if let Some(color) = self.color {
                ui.colored_label(color, value_text);
            } else {
                ui.strong(value_text);
            }
        })
        .response
    }
}

/// Progress of a sweep as a bar labelled `step / total`
pub struct SweepProgressBar {
    progress: SweepProgress,
    is_running: bool,
}

impl SweepProgressBar {
    pub fn new(progress: SweepProgress, is_running: bool) -> Self {
        Self {
            progress,
            is_running,
        }
    }

    fn text(&self) -> String {
        format!("{} / {}", self.progress.step, self.progress.total)
    }
}

impl Widget for SweepProgressBar {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            if self.is_running {
                ui.spinner();
            }
            ui.add(
                egui::ProgressBar::new(self.progress.fraction())
                    .desired_width(160.0)
                    .text(self.text()),
            );
        })
        .response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_indicator() {
        let indicator = StatusIndicator::for_connection(ConnectionStatus::Connected);
        assert_eq!(indicator.label, "Connected");
        assert_eq!(indicator.color, Color32::GREEN);
    }

    #[test]
    fn test_acquisition_indicator() {
        let indicator = StatusIndicator::for_acquisition(AcquisitionState::Recording);
        assert_eq!(indicator.label, AcquisitionState::Recording.display_name());
        assert_eq!(indicator.color, Color32::LIGHT_RED);
    }

    #[test]
    fn test_value_display() {
        let display = ValueDisplay::from_f64("Frequency", 7.5, 1).with_unit("MHz");
        assert_eq!(display.label, "Frequency");
        assert_eq!(display.value, "7.5");
        assert_eq!(display.unit, Some("MHz".to_string()));
    }

    #[test]
    fn test_progress_text() {
        let bar = SweepProgressBar::new(SweepProgress { step: 4, total: 9 }, true);
        assert_eq!(bar.text(), "4 / 9");
    }
}
