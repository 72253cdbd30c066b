//! In-process stand-in for the clinic API used by unit tests

use axum::Router;
use common::{ApiClient, ApiConfig};

/// Serve `routes` under `/api` on an ephemeral port and return a client for it
pub async fn spawn_api(routes: Router) -> ApiClient {
    let app = Router::new().nest("/api", routes);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let config = ApiConfig {
        base_url: format!("http://{}/api", addr),
        ..ApiConfig::default()
    };
    ApiClient::new(&config).expect("client").with_token("test-token")
}
