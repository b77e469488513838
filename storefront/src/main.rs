// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use storefront::config::AppConfig;
use storefront::payments::card_http::HttpCardProvider;
use storefront::payments::CardProvider;
use storefront::services::notifier::LogNotifier;
use storefront::services::payment_mock::SimulatedCardNetwork;
use storefront::state::AppState;
use storefront::store::memory::MemoryStore;
use storefront::store::postgres::PgStore;
use storefront::store::Stores;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let stores = match &app_config.database_url {
    Some(url) => match PgStore::connect(url).await {
      Ok(store) => {
        tracing::info!("Connected to the database and applied schema.");
        Stores::postgres(Arc::new(store))
      }
      Err(e) => {
        tracing::error!(error = %e, "Failed to connect to the database.");
        return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
      }
    },
    None => {
      tracing::warn!("DATABASE_URL not set; using the in-memory store.");
      Stores::memory(Arc::new(MemoryStore::new()))
    }
  };

  let card_provider: Arc<dyn CardProvider> = match &app_config.card.api_key {
    Some(key) => match HttpCardProvider::new(&app_config.card.api_base, key, app_config.card.timeout) {
      Ok(provider) => Arc::new(provider),
      Err(e) => {
        tracing::error!(error = %e, "Failed to build the card network client.");
        return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
      }
    },
    None => {
      tracing::warn!("CARD_API_KEY not set; card payments use the simulated network.");
      Arc::new(SimulatedCardNetwork::new())
    }
  };

  let notifier = Arc::new(LogNotifier::new(app_config.store.mail_sender.clone()));
  let app_state = AppState::new(app_config.clone(), stores, card_provider, notifier);
  tracing::info!("Order flows registered.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(storefront::web::routes::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
