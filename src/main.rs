// src/main.rs
mod config;
mod controller;
mod dtos;
mod error;
mod handlers;
mod models;
mod repositories;
mod services;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::info;
use reqwest::Client;

use crate::config::{get_pg_pool, mask_key, Backend, BoardConfig};
use crate::controller::feed::FeedController;
use crate::handlers::auth_handlers::{login, logout, restore_session};
use crate::handlers::draft_handlers::{attach_image, remove_image, update_draft};
use crate::handlers::feed_handlers::{dismiss_notice, get_feed, refresh_feed, serve_blob, submit_post};
use crate::repositories::blob_store::{BlobStore, SupabaseStorage};
use crate::repositories::memory::{CallLog, MemoryBlobStore, MemoryPostStore};
use crate::repositories::pg_post_repository::PgPostRepository;
use crate::repositories::post_repository::{PostRepository, PostStore};
use crate::services::auth_services::AuthService;
use crate::services::identity::{IdentityService, LocalIdentity};

/// Base64 images travel in JSON bodies.
const JSON_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedController>,
    pub identity: Arc<dyn IdentityService>,
    /// Set only with the in-memory backend, whose images are served by this process.
    pub local_blobs: Option<Arc<MemoryBlobStore>>,
}

struct Backends {
    identity: Arc<dyn IdentityService>,
    blobs: Arc<dyn BlobStore>,
    posts: Arc<dyn PostStore>,
    local_blobs: Option<Arc<MemoryBlobStore>>,
}

fn build_backends(cfg: &BoardConfig) -> anyhow::Result<Backends> {
    let supabase = match (cfg.backend, &cfg.supabase) {
        (Backend::Memory, _) => None,
        (_, Some(supabase)) => Some(supabase),
        (_, None) => anyhow::bail!("supabase settings missing"),
    };

    let Some(supabase) = supabase else {
        info!("using in-memory backends");
        let log = CallLog::default();
        let blobs = Arc::new(MemoryBlobStore::new(&cfg.public_base_url, &cfg.bucket, log.clone()));
        return Ok(Backends {
            identity: Arc::new(LocalIdentity::new()),
            blobs: blobs.clone(),
            posts: Arc::new(MemoryPostStore::new(log)),
            local_blobs: Some(blobs),
        });
    };

    info!("Supabase URL: {}", supabase.url);
    info!("Supabase Key: {}", mask_key(&supabase.anon_key));

    let http_client = Client::builder()
        .user_agent("board-shell/0.1")
        .timeout(cfg.http_timeout)
        .build()
        .context("failed to build http client")?;

    let posts: Arc<dyn PostStore> = match cfg.backend {
        Backend::Postgres => {
            let pool = get_pg_pool()?;
            Arc::new(PgPostRepository::new(pool, &cfg.posts_table)?)
        }
        _ => Arc::new(PostRepository::new(
            http_client.clone(),
            &supabase.url,
            &supabase.anon_key,
            &cfg.posts_table,
        )),
    };

    Ok(Backends {
        identity: Arc::new(AuthService::new(http_client.clone(), supabase)),
        blobs: Arc::new(SupabaseStorage::new(
            http_client,
            &supabase.url,
            &supabase.anon_key,
            &cfg.bucket,
        )),
        posts,
        local_blobs: None,
    })
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT))
        .service(
            web::scope("/auth")
                .service(login) // POST /auth/login
                .service(restore_session) // POST /auth/session
                .service(logout), // POST /auth/logout
        )
        .service(
            web::scope("/api")
                .service(get_feed) // GET /api/feed
                .service(refresh_feed) // POST /api/feed/refresh
                .service(update_draft) // PUT /api/draft
                .service(attach_image) // POST /api/draft/image
                .service(remove_image) // DELETE /api/draft/image
                .service(submit_post) // POST /api/posts
                .service(dismiss_notice), // DELETE /api/notice
        )
        .service(serve_blob); // GET /blobs/{key}
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cfg = BoardConfig::from_env()?;
    let backends = build_backends(&cfg)?;

    let feed = FeedController::mount(backends.identity.clone(), backends.blobs, backends.posts).await;

    let state = web::Data::new(AppState {
        feed: Arc::new(feed),
        identity: backends.identity,
        local_blobs: backends.local_blobs,
    });

    let bind_address = cfg.bind_address();
    info!("Starting server on {}", bind_address);

    let allowed_origins = cfg.allowed_origins.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["authorization", "content-type", "accept", "x-requested-with"])
            .supports_credentials()
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
