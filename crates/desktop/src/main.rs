//! Goal Planner Desktop — application entry.

mod app;
mod markdown;

use eframe::egui;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 720.0])
            .with_min_inner_size([720.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Goal Planner",
        options,
        Box::new(|cc| Box::new(app::PlannerApp::new(cc))),
    )
}
