//! Top-level entry point for running LSTMVis as a native window.

use eframe::egui;

use crate::config::LstmVisConfig;
use crate::controllers::StateController;
use crate::coordinator::ViewCoordinator;
use crate::events::EventBus;
use crate::transport::HttpTransport;

use super::LstmVisApp;

/// Open the explorer on `query` (a URL query string such as
/// `project=ptb&source=states::states1&pos=100`) against
/// `cfg.server_url`.
///
/// The call blocks until the window is closed.
pub fn run_lstmvis(cfg: LstmVisConfig, query: &str) -> eframe::Result<()> {
    let title = cfg.title.clone();
    let mut viewport = egui::ViewportBuilder::default().with_title(&title);
    if let Some([w, h]) = cfg.window_size {
        viewport = viewport.with_inner_size(egui::vec2(w, h));
    }
    let opts = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let query = query.to_string();
    log::info!("connecting to {}", cfg.server_url);
    eframe::run_native(
        &title,
        opts,
        Box::new(move |cc| {
            let repaint = cc.egui_ctx.clone();
            let transport =
                HttpTransport::new(cfg.server_url.clone())?.on_reply(move || repaint.request_repaint());
            let controller = StateController::new(EventBus::global(), Box::new(transport))
                .with_config(&cfg)
                .with_query(&query);
            let coordinator = ViewCoordinator::new(controller, &cfg);
            Ok(Box::new(LstmVisApp::new(coordinator, cfg)))
        }),
    )
}
