//! Desktop window: port entry, start/stop toggle, CSV export and the device table.

use crate::app::RunError;
use crate::controller::{Controller, Update};
use crate::export::{ExportError, default_file_name, export_to_path};
use crate::ingest::{POLL_INTERVAL, SerialTransport};
use chrono::Local;
use egui_extras::{Column, TableBuilder};
use log::{error, info};
use rfd::{MessageButtons, MessageDialog, MessageLevel};

const TITLE: &str = "Bluetooth Device Scanner";

/// Table columns and their fixed widths in points.
const COLUMNS: [(&str, f32); 5] = [
    ("Device Name", 200.0),
    ("MAC Address", 150.0),
    ("RSSI", 100.0),
    ("Proximity", 100.0),
    ("Last Seen", 150.0),
];

pub struct ScannerApp {
    controller: Controller<SerialTransport>,
    port: String,
    /// Last transport error, cleared when a new scan starts
    last_error: Option<String>,
}

impl ScannerApp {
    pub fn new(port: String) -> Self {
        ScannerApp {
            controller: Controller::new(SerialTransport::default()),
            port,
            last_error: None,
        }
    }

    fn toggle_scan(&mut self) {
        if self.controller.is_scanning() {
            if let Some(e) = self.controller.stop() {
                self.last_error = Some(e.to_string());
            }
            return;
        }

        match self.controller.start(&self.port) {
            Ok(()) => self.last_error = None,
            Err(e) => {
                error!("error starting scan: {}", e);
                show_message(
                    MessageLevel::Error,
                    "Scan Error",
                    &format!("Error starting scan: {e}"),
                );
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn export_csv(&self) {
        let history = self.controller.registry().history();
        if history.is_empty() {
            show_message(
                MessageLevel::Warning,
                "No Data",
                "No device data available to export.",
            );
            return;
        }

        let Some(path) = rfd::FileDialog::new()
            .set_title("Export CSV")
            .set_file_name(default_file_name(Local::now()))
            .add_filter("CSV files", &["csv"])
            .save_file()
        else {
            info!("export cancelled");
            return;
        };

        match export_to_path(history, &path) {
            Ok(_) => show_message(
                MessageLevel::Info,
                "Success",
                &format!("Data exported successfully to {}", path.display()),
            ),
            Err(ExportError::NoData) => {}
            Err(e) => {
                error!("export to {} failed: {}", path.display(), e);
                show_message(
                    MessageLevel::Error,
                    "Export Error",
                    &format!("Error exporting data: {e}"),
                );
            }
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("COM Port:");
            ui.add_enabled(
                !self.controller.is_scanning(),
                egui::TextEdit::singleline(&mut self.port).desired_width(120.0),
            );

            let label = if self.controller.is_scanning() {
                "Stop Scan"
            } else {
                "Start Scan"
            };
            if ui.button(label).clicked() {
                self.toggle_scan();
            }
            if ui.button("Export CSV").clicked() {
                self.export_csv();
            }
        });
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.controller.port() {
                Some(port) => ui.label(format!("Scanning {port}")),
                None => ui.label("Stopped"),
            };
            ui.separator();
            let registry = self.controller.registry();
            ui.label(format!(
                "{} devices, {} readings",
                registry.len(),
                registry.history().len()
            ));
            if let Some(e) = &self.last_error {
                ui.separator();
                ui.colored_label(ui.visuals().error_fg_color, e);
            }
        });
    }

    fn device_table(&self, ui: &mut egui::Ui) {
        let mut table = TableBuilder::new(ui)
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .min_scrolled_height(0.0);
        for (_, width) in COLUMNS {
            table = table.column(Column::exact(width));
        }

        table
            .header(20.0, |mut header| {
                for (title, _) in COLUMNS {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for reading in self.controller.registry().snapshot() {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.label(reading.name.as_str());
                        });
                        row.col(|ui| {
                            ui.label(reading.address.as_str());
                        });
                        row.col(|ui| {
                            ui.label(reading.rssi.to_string());
                        });
                        row.col(|ui| {
                            ui.label(reading.proximity.label());
                        });
                        row.col(|ui| {
                            ui.label(reading.last_seen());
                        });
                    });
                }
            });
    }
}

impl eframe::App for ScannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for update in self.controller.pump() {
            if let Update::Stopped(Some(e)) = update {
                self.last_error = Some(e.to_string());
            }
        }
        if self.controller.is_scanning() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            self.controls(ui);
            ui.add_space(6.0);
        });
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.status_bar(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.device_table(ui));
    }
}

fn show_message(level: MessageLevel, title: &str, description: &str) {
    MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Open the window and block until it is closed.
pub fn run(port: String) -> Result<(), RunError> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(ScannerApp::new(port)))),
    )
    .map_err(|e| RunError::Gui(e.to_string()))
}
