use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = commondx::config::Settings::load();

    #[cfg(target_os = "macos")]
    {
        if let Err(e) = commondx::run(settings) {
            tracing::error!("commondx failed to start: {e}");
            std::process::exit(1);
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        let _ = settings;
        eprintln!("commondx requires macOS (Finder and the event tap are macOS services)");
        std::process::exit(1);
    }
}
