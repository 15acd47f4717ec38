//! `lstmvis [API_URL] [QUERY]`
//!
//! Opens the explorer.  `API_URL` overrides the configured server, `QUERY`
//! is the initial URL query string, e.g.
//! `project=ptb&source=states::states1&pos=100`.

use lstmvis::LstmVisConfig;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cfg = match LstmVisConfig::load_from_default_path() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::info!("using default configuration ({})", e);
            LstmVisConfig::default()
        }
    };

    let mut args = std::env::args().skip(1);
    if let Some(url) = args.next() {
        cfg.server_url = url;
    }
    let query = args.next().unwrap_or_default();

    lstmvis::run_lstmvis(cfg, query.trim_start_matches('?'))
}
