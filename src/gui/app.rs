//! Live current-voltage viewer built on eframe/egui.

use super::plot::{error_bar_segments, mean_points, status_line};
use crate::config::PlotConfig;
use crate::data::write_csv;
use crate::experiment::SweepMonitor;
use eframe::egui;
use egui_plot::{Line, Plot, Points};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// Window showing a running or finished sweep.
pub struct IvCurveApp {
    monitor: SweepMonitor,
    config: PlotConfig,
    save_path: String,
    message: Option<Result<String, String>>,
}

impl IvCurveApp {
    /// Create the viewer. `save_path` pre-fills the export field.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        monitor: SweepMonitor,
        config: PlotConfig,
        save_path: PathBuf,
    ) -> Self {
        if config.light_theme {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        }
        Self {
            monitor,
            config,
            save_path: save_path.display().to_string(),
            message: None,
        }
    }

    fn save(&mut self) {
        let result = self.monitor.snapshot().result;
        let path = PathBuf::from(self.save_path.trim());
        self.message = Some(match write_csv(&path, &result) {
            Ok(()) => {
                info!("Saved {} points to '{}'", result.len(), path.display());
                Ok(format!("Saved to {}", path.display()))
            }
            Err(e) => {
                error!("Export failed: {}", e);
                Err(e.to_string())
            }
        });
    }
}

impl eframe::App for IvCurveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let progress = self.monitor.snapshot();
        let running = !progress.state.is_done();

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(running, egui::Button::new("Stop scanning"))
                    .clicked()
                {
                    self.monitor.cancel();
                }
                ui.separator();
                ui.label("Save as:");
                ui.text_edit_singleline(&mut self.save_path);
                if ui
                    .add_enabled(!running, egui::Button::new("Save"))
                    .clicked()
                {
                    self.save();
                }
            });
            ui.label(status_line(&progress));
            match &self.message {
                Some(Ok(text)) => {
                    ui.label(text);
                }
                Some(Err(text)) => {
                    ui.colored_label(egui::Color32::RED, text);
                }
                None => {}
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(&self.config.title);
            let foreground = ui.visuals().strong_text_color();
            Plot::new("iv_curve")
                .x_axis_label(self.config.x_label.clone())
                .y_axis_label(self.config.y_label.clone())
                .show(ui, |plot_ui| {
                    for segment in error_bar_segments(&progress.result) {
                        plot_ui.line(Line::new(segment.to_vec()).color(foreground).width(1.0));
                    }
                    plot_ui.points(
                        Points::new(mean_points(&progress.result))
                            .radius(self.config.marker_radius)
                            .color(foreground),
                    );
                });
        });

        if running {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }
}

/// Open the viewer window and block until it is closed.
pub fn run_viewer(
    monitor: SweepMonitor,
    config: PlotConfig,
    save_path: PathBuf,
) -> eframe::Result<()> {
    let title = config.title.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 650.0])
            .with_title(title.clone()),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| Ok(Box::new(IvCurveApp::new(cc, monitor, config, save_path)))),
    )
}
