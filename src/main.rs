use log::info;
use signal_hook::consts::{SIGINT, SIGTERM};
use udp_tracker::bootstrap::app;
use udp_tracker::servers::udp::server::UdpServer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (configuration, tracker) = app::setup()?;

    let server = UdpServer::start(tracker, &configuration.udp_tracker)?;

    let quit = server.quit_flag();
    signal_hook::flag::register(SIGINT, quit.clone())?;
    signal_hook::flag::register(SIGTERM, quit)?;
    info!("send SIGINT or SIGTERM to quit");

    // The main thread becomes the supervisor: stats line and reaper pass
    // once per minute, then a clean join of the workers on shutdown.
    server.supervise();

    Ok(())
}
