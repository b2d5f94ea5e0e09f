// src/main.rs

mod app_state;
mod auth;
mod booking;
mod config;
mod contact;
mod date_range;
mod db;
mod event;
mod file_store;
mod gallery;
mod news;
mod operational;
mod user_management;
mod video;
mod visit;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpResponse, HttpServer,
};
use env_logger::Env;
use futures::future::{ok, Ready};
use log::info;

use crate::app_state::AppState;
use crate::auth::{login, logout, validate_jwt, verify_session, AuthUser, TOKEN_COOKIE};
use crate::booking::{
    create_booking, delete_booking, get_booking, list_bookings, update_booking_status,
};
use crate::contact::{create_contact, delete_contact, list_contacts};
use crate::event::{create_event, delete_event, get_event, list_events, update_event};
use crate::file_store::{delete_file, fetch_file, upload_file, FileStore};
use crate::gallery::{
    create_gallery_item, delete_gallery_item, get_gallery_item, list_gallery, update_gallery_item,
};
use crate::news::{create_news, delete_news, get_news, list_news, update_news};
use crate::operational::{get_status, update_status};
use crate::user_management::{create_admin, delete_admin, list_admins, update_admin};
use crate::video::{create_video, delete_video, get_video, list_videos, update_video};
use crate::visit::{create_visit, list_visits, visit_stats};

/// Decodes the session token (cookie or Bearer header) and inserts an
/// AuthUser extension when it is valid. Requests without a usable token
/// pass through untouched; each handler decides whether auth is required.
#[derive(Debug)]
pub struct Authentication {
    jwt_secret: String,
}

impl Authentication {
    pub fn new(jwt_secret: String) -> Self {
        Authentication { jwt_secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            jwt_secret: self.jwt_secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    jwt_secret: String,
}

fn token_from_request(req: &ServiceRequest) -> Option<String> {
    if let Some(header_value) = req.headers().get(http::header::AUTHORIZATION) {
        if let Ok(auth_str) = header_value.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }
    let cookie_header = req.headers().get(http::header::COOKIE)?;
    let cookies = cookie_header.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(token) = token_from_request(&req) {
            if let Ok(claims) = validate_jwt(&token, &self.jwt_secret) {
                req.extensions_mut().insert(AuthUser {
                    id: claims.sub,
                    role: claims.role,
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(db::MongoDB::init(&config.mongo_uri, &config.database_name).await);
    mongodb.ensure_indexes().await;
    let files = FileStore::new(&mongodb.db);

    let bind_addr = (config.host.clone(), config.port);
    info!("Server running at http://{}:{}", config.host, config.port);
    info!("Allowed CORS origin: {}", config.frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication::new(config.jwt_secret.clone()))
            .app_data(web::Data::new(AppState {
                mongodb: mongodb.clone(),
                files: files.clone(),
                config: config.clone(),
            }))
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(health))
                    .service(
                        web::scope("/auth")
                            .route("/login", web::post().to(login))
                            .route("/logout", web::post().to(logout))
                            .route("/verify", web::get().to(verify_session)),
                    )
                    .service(
                        web::scope("/news")
                            .route("", web::get().to(list_news))
                            .route("", web::post().to(create_news))
                            .route("/{id}", web::get().to(get_news))
                            .route("/{id}", web::put().to(update_news))
                            .route("/{id}", web::delete().to(delete_news)),
                    )
                    .service(
                        web::scope("/events")
                            .route("", web::get().to(list_events))
                            .route("", web::post().to(create_event))
                            .route("/{id}", web::get().to(get_event))
                            .route("/{id}", web::put().to(update_event))
                            .route("/{id}", web::delete().to(delete_event)),
                    )
                    .service(
                        web::scope("/gallery")
                            .route("", web::get().to(list_gallery))
                            .route("", web::post().to(create_gallery_item))
                            .route("/{id}", web::get().to(get_gallery_item))
                            .route("/{id}", web::put().to(update_gallery_item))
                            .route("/{id}", web::delete().to(delete_gallery_item)),
                    )
                    .service(
                        web::scope("/videos")
                            .route("", web::get().to(list_videos))
                            .route("", web::post().to(create_video))
                            .route("/{id}", web::get().to(get_video))
                            .route("/{id}", web::put().to(update_video))
                            .route("/{id}", web::delete().to(delete_video)),
                    )
                    .service(
                        web::scope("/contacts")
                            .route("", web::get().to(list_contacts))
                            .route("", web::post().to(create_contact))
                            .route("/{id}", web::delete().to(delete_contact)),
                    )
                    .service(
                        web::scope("/requests")
                            .route("", web::get().to(list_bookings))
                            .route("", web::post().to(create_booking))
                            .route("/{id}", web::get().to(get_booking))
                            .route("/{id}/status", web::put().to(update_booking_status))
                            .route("/{id}", web::delete().to(delete_booking)),
                    )
                    .service(
                        web::scope("/visits")
                            .route("", web::get().to(list_visits))
                            .route("", web::post().to(create_visit))
                            .route("/stats", web::get().to(visit_stats)),
                    )
                    .service(
                        web::scope("/users")
                            .route("", web::get().to(list_admins))
                            .route("", web::post().to(create_admin))
                            .route("/{id}", web::put().to(update_admin))
                            .route("/{id}", web::delete().to(delete_admin)),
                    )
                    .service(
                        web::scope("/operational-status")
                            .route("", web::get().to(get_status))
                            .route("", web::put().to(update_status)),
                    )
                    .service(
                        web::scope("/files")
                            .route("", web::post().to(upload_file))
                            .route("/{id}", web::get().to(fetch_file))
                            .route("/{id}", web::delete().to(delete_file)),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
