// src/auth.rs

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;

pub const TOKEN_COOKIE: &str = "token";
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
    Superadmin,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: AdminRole,
    pub exp: usize,
}

/// Decoded identity inserted as a request extension by the
/// authentication middleware in main.rs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: AdminRole,
}

/// Admin account as stored in the `admins` collection. The password
/// hash stays in this struct for persistence; responses go through
/// [`AdminView`], which never carries it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: AdminRole,
    #[serde(rename = "lastLogin", skip_serializing_if = "Option::is_none")]
    pub last_login: Option<BsonDateTime>,
}

#[derive(Debug, Serialize)]
pub struct AdminView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: AdminRole,
    #[serde(rename = "lastLogin", skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl Admin {
    pub fn view(&self) -> AdminView {
        AdminView {
            id: self.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            last_login: self
                .last_login
                .and_then(|dt| dt.try_to_rfc3339_string().ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Canonical form for stored and queried admin emails. Both the unique
/// index and the login lookup rely on every path applying this.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn create_jwt(admin_id: &str, role: AdminRole, secret: &str) -> String {
    let expiration = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);
    let claims = Claims {
        sub: admin_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .unwrap_or_default()
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Authenticated identity or a ready-made 401 response.
pub fn require_auth(req: &HttpRequest) -> Result<AuthUser, HttpResponse> {
    req.extensions().get::<AuthUser>().cloned().ok_or_else(|| {
        HttpResponse::Unauthorized().json(json!({ "error": "Autentikasi diperlukan" }))
    })
}

/// Superadmin identity, or 401 when unauthenticated / 403 otherwise.
pub fn require_superadmin(req: &HttpRequest) -> Result<AuthUser, HttpResponse> {
    let user = require_auth(req)?;
    match user.role {
        AdminRole::Superadmin => Ok(user),
        AdminRole::Admin => Err(HttpResponse::Forbidden()
            .json(json!({ "error": "Hanya superadmin yang dapat mengakses" }))),
    }
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(TOKEN_TTL_HOURS))
        .finish()
}

/// POST /api/auth/login
pub async fn login(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> impl Responder {
    let mut details = Vec::new();
    if payload.email.trim().is_empty() {
        details.push("email wajib diisi".to_string());
    }
    if payload.password.is_empty() {
        details.push("password wajib diisi".to_string());
    }
    if !details.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "Validasi gagal", "details": details }));
    }

    let email = normalize_email(&payload.email);
    let admins = data.mongodb.db.collection::<Admin>("admins");
    let admin = match admins.find_one(doc! { "email": &email }).await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            return HttpResponse::Unauthorized()
                .json(json!({ "error": "Email atau password salah" }))
        }
        Err(e) => {
            error!("Error fetching admin during login: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal melakukan login" }));
        }
    };

    if !verify(&payload.password, &admin.password).unwrap_or(false) {
        return HttpResponse::Unauthorized().json(json!({ "error": "Email atau password salah" }));
    }

    let admin_id = admin.id.map(|oid| oid.to_hex()).unwrap_or_default();
    if let Err(e) = admins
        .update_one(
            doc! { "email": &email },
            doc! { "$set": { "lastLogin": BsonDateTime::now() } },
        )
        .await
    {
        // Login still succeeds; the timestamp is best-effort.
        error!("Error updating lastLogin for {}: {}", admin_id, e);
    }

    let token = create_jwt(&admin_id, admin.role, &data.config.jwt_secret);
    info!("Admin {} logged in", admin.username);
    HttpResponse::Ok()
        .cookie(session_cookie(token.clone()))
        .json(json!({ "user": admin.view(), "token": token }))
}

/// POST /api/auth/logout: clears the session cookie.
pub async fn logout() -> impl Responder {
    let mut cookie = session_cookie(String::new());
    cookie.set_max_age(CookieDuration::ZERO);
    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Logout berhasil" }))
}

/// GET /api/auth/verify: cookie or Bearer token, already decoded by the
/// middleware when valid.
pub async fn verify_session(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let user = match req.extensions().get::<AuthUser>().cloned() {
        Some(user) => user,
        None => return HttpResponse::Unauthorized().json(json!({ "valid": false })),
    };

    let oid = match ObjectId::parse_str(&user.id) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::Unauthorized().json(json!({ "valid": false })),
    };
    let admins = data.mongodb.db.collection::<Admin>("admins");
    match admins.find_one(doc! { "_id": oid }).await {
        Ok(Some(admin)) => HttpResponse::Ok().json(json!({ "valid": true, "user": admin.view() })),
        Ok(None) => HttpResponse::Unauthorized().json(json!({ "valid": false })),
        Err(e) => {
            error!("Error verifying session: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal memverifikasi sesi" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trip_preserves_claims() {
        let token = create_jwt("abc123", AdminRole::Superadmin, "test-secret");
        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "abc123");
        assert_eq!(claims.role, AdminRole::Superadmin);
    }

    #[test]
    fn email_normalization_matches_stored_form() {
        // Accounts are stored lowercased; the login lookup must land on
        // the same key regardless of how the email is typed.
        assert_eq!(normalize_email("  Foo@Bar.com "), "foo@bar.com");
        assert_eq!(normalize_email("ADMIN@RPTRA.EXAMPLE"), "admin@rptra.example");
        assert_eq!(normalize_email("petugas@rptra.example"), "petugas@rptra.example");
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let token = create_jwt("abc123", AdminRole::Admin, "test-secret");
        assert!(validate_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AdminRole::Superadmin).unwrap(),
            "\"superadmin\""
        );
        assert_eq!(serde_json::to_string(&AdminRole::Admin).unwrap(), "\"admin\"");
    }
}
