use std::path::Path;

use audiosocket_server::{config, load_audio, Server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    #[cfg(debug_assertions)]
    {
        use tracing::Level;
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::fmt::init();
    }

    let audio = match load_audio(Path::new(&config::audio_file())) {
        Ok(audio) => audio,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let server = Server::new(audio).with_max_call_duration(config::max_call_duration());

    let on_signal = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.shutdown();
        }
    });

    let addr = format!("0.0.0.0:{}", config::listen_port());
    if let Err(e) = server.run(&addr).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
    info!("Exiting");
}
