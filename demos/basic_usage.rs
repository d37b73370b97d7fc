//! Basic usage example for the access log middleware
//!
//! Run with:
//! ```bash
//! FULL_ACCESS_LOG_ENABLED=true \
//! RUST_LOG=accesslog_actix=debug \
//! cargo run --example basic_usage
//! ```
//!
//! Then:
//! ```bash
//! curl -X POST 'localhost:8080/login?api_key=k1' \
//!      -H 'content-type: application/json' \
//!      -d '{"user":"alice","password":"secret"}'
//! ```

use std::sync::Arc;

use accesslog_actix::prelude::*;
use actix_web::{web, App, HttpMessage, HttpRequest, HttpResponse, HttpServer};

async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Hello!")
}

async fn login(req: HttpRequest, body: web::Json<serde_json::Value>) -> HttpResponse {
    // Tell the access log what must never appear in clear text
    req.extensions_mut()
        .insert(MaskedRequestFields::from("password"));
    req.extensions_mut()
        .insert(MaskedResponseFields::from("access_token"));
    req.extensions_mut()
        .insert(MaskedQueryParams::from("api_key"));

    let user = body.get("user").and_then(|u| u.as_str()).unwrap_or("anonymous");
    req.extensions_mut().insert(UserId::from(user));

    HttpResponse::Ok().json(serde_json::json!({
        "user": user,
        "access_token": "eyJhbGciOiJIUzI1NiJ9.demo",
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().into_arc();
    let sink: Arc<dyn LogSink> = Arc::new(StdoutSink);

    println!("Starting example server on http://0.0.0.0:8080");

    HttpServer::new(move || {
        App::new()
            .wrap(AccessLog::with_shared(config.clone(), sink.clone()))
            .service(web::resource("/").name("index").route(web::get().to(index)))
            .service(web::resource("/login").name("login").route(web::post().to(login)))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
