//! Background worker turning published marketplace events into in-app notifications.

use dotenvy::dotenv;

use dental_marketplace::db::establish_connection_pool;
use dental_marketplace::models::config::ServerConfig;
use dental_marketplace::models::zmq::DentalEvent;
use dental_marketplace::repository::{DieselRepository, NotificationWriter};
use dental_marketplace::services::notifications::store_event_notifications;

fn process_event<R>(repo: &R, payload: &[u8])
where
    R: NotificationWriter,
{
    let event = match serde_json::from_slice::<DentalEvent>(payload) {
        Ok(event) => event,
        Err(e) => {
            log::error!("Error parsing event message: {e}");
            return;
        }
    };
    match store_event_notifications(repo, &event) {
        Ok(0) => log::debug!("No recipients for {event:?}"),
        Ok(stored) => log::info!("Stored {stored} notification(s) for {event:?}"),
        Err(e) => log::error!("Error storing notifications for {event:?}: {e}"),
    }
}

fn subscribe(endpoint: &str) -> Result<(zmq::Context, zmq::Socket), zmq::Error> {
    let context = zmq::Context::new();
    let socket = context.socket(zmq::SUB)?;
    socket.connect(endpoint)?;
    socket.set_subscribe(b"")?;
    Ok((context, socket))
}

fn main() {
    dotenv().ok(); // Load .env file
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let server_config = match ServerConfig::load() {
        Ok(server_config) => server_config,
        Err(err) => {
            log::error!("Error loading server config: {err}");
            std::process::exit(1);
        }
    };

    let (_context, events) = match subscribe(&server_config.zmq_events_pub) {
        Ok(subscription) => subscription,
        Err(e) => {
            log::error!(
                "Cannot subscribe to {}: {e}",
                server_config.zmq_events_pub
            );
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&server_config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let repo = DieselRepository::new(pool);

    log::info!("Starting notification worker");

    loop {
        match events.recv_bytes(0) {
            Ok(msg) => process_event(&repo, &msg),
            Err(e) => log::error!("Error receiving event message: {e}"),
        }
    }
}
