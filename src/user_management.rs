// src/user_management.rs
//
// Admin-account CRUD, superadmin only. Password hashes never leave the
// server; every response goes through AdminView.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use bcrypt::{hash, DEFAULT_COST};
use futures::stream::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{normalize_email, require_superadmin, Admin, AdminRole};

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<AdminRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<AdminRole>,
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        &*e.kind,
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

pub fn validate_create(payload: &CreateAdminRequest) -> Vec<String> {
    let mut details = Vec::new();
    if payload
        .username
        .as_deref()
        .map_or(true, |v| v.trim().len() < 3)
    {
        details.push("username minimal 3 karakter".to_string());
    }
    if payload
        .email
        .as_deref()
        .map_or(true, |v| !crate::contact::is_valid_email(v.trim()))
    {
        details.push("email tidak valid".to_string());
    }
    if payload.password.as_deref().map_or(true, |v| v.len() < 8) {
        details.push("password minimal 8 karakter".to_string());
    }
    details
}

/// GET /api/users
pub async fn list_admins(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if let Err(resp) = require_superadmin(&req) {
        return resp;
    }
    let collection = data.mongodb.db.collection::<Admin>("admins");
    let result = match collection.find(doc! {}).sort(doc! { "username": 1 }).await {
        Ok(cursor) => cursor.try_collect::<Vec<Admin>>().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(admins) => {
            let views: Vec<_> = admins.iter().map(Admin::view).collect();
            HttpResponse::Ok().json(views)
        }
        Err(e) => {
            error!("Error fetching admins: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil pengguna" }))
        }
    }
}

/// POST /api/users
pub async fn create_admin(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateAdminRequest>,
) -> impl Responder {
    if let Err(resp) = require_superadmin(&req) {
        return resp;
    }
    let details = validate_create(&payload);
    if !details.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "Validasi gagal", "details": details }));
    }

    let hashed = match hash(payload.password.as_deref().unwrap_or_default(), DEFAULT_COST) {
        Ok(hashed) => hashed,
        Err(e) => {
            error!("Error hashing password: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal membuat pengguna" }));
        }
    };

    let admin = Admin {
        id: None,
        username: payload.username.clone().unwrap_or_default().trim().to_string(),
        email: normalize_email(payload.email.as_deref().unwrap_or_default()),
        password: hashed,
        role: payload.role.unwrap_or(AdminRole::Admin),
        last_login: None,
    };

    let collection = data.mongodb.db.collection::<Admin>("admins");
    match collection.insert_one(&admin).await {
        Ok(result) => {
            info!("Admin account created: {}", admin.username);
            HttpResponse::Created()
                .json(json!({ "id": result.inserted_id, "username": admin.username }))
        }
        Err(e) if is_duplicate_key(&e) => HttpResponse::BadRequest()
            .json(json!({ "error": "Email atau username sudah terdaftar" })),
        Err(e) => {
            error!("Error inserting admin: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal membuat pengguna" }))
        }
    }
}

/// PUT /api/users/{id}
pub async fn update_admin(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateAdminRequest>,
) -> impl Responder {
    if let Err(resp) = require_superadmin(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID pengguna tidak valid" }))
        }
    };

    let mut update_doc = doc! {};
    if let Some(username) = &payload.username {
        if username.trim().len() < 3 {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "username minimal 3 karakter" }));
        }
        update_doc.insert("username", username.trim());
    }
    if let Some(email) = &payload.email {
        if !crate::contact::is_valid_email(email.trim()) {
            return HttpResponse::BadRequest().json(json!({ "error": "email tidak valid" }));
        }
        update_doc.insert("email", normalize_email(email));
    }
    if let Some(password) = &payload.password {
        if password.len() < 8 {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "password minimal 8 karakter" }));
        }
        match hash(password, DEFAULT_COST) {
            Ok(hashed) => {
                update_doc.insert("password", hashed);
            }
            Err(e) => {
                error!("Error hashing password: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal memperbarui pengguna" }));
            }
        }
    }
    if let Some(role) = payload.role {
        match to_bson(&role) {
            Ok(value) => {
                update_doc.insert("role", value);
            }
            Err(e) => {
                error!("Error serializing role: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal memperbarui pengguna" }));
            }
        }
    }
    if update_doc.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "Tidak ada field untuk diubah" }));
    }

    let collection = data.mongodb.db.collection::<Admin>("admins");
    match collection
        .update_one(doc! { "_id": oid }, doc! { "$set": update_doc })
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Pengguna tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Pengguna berhasil diperbarui" })),
        Err(e) if is_duplicate_key(&e) => HttpResponse::BadRequest()
            .json(json!({ "error": "Email atau username sudah terdaftar" })),
        Err(e) => {
            error!("Error updating admin: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal memperbarui pengguna" }))
        }
    }
}

/// DELETE /api/users/{id}: a superadmin cannot delete their own account.
pub async fn delete_admin(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let current = match require_superadmin(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let id = path.into_inner();
    if current.id == id {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "Tidak dapat menghapus akun sendiri" }));
    }
    let oid = match ObjectId::parse_str(&id) {
        Ok(oid) => oid,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID pengguna tidak valid" }))
        }
    };
    let collection = data.mongodb.db.collection::<Admin>("admins");
    match collection.delete_one(doc! { "_id": oid }).await {
        Ok(result) if result.deleted_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Pengguna tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Pengguna berhasil dihapus" })),
        Err(e) => {
            error!("Error deleting admin: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menghapus pengguna" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_validation_reports_all_problems() {
        let payload = CreateAdminRequest {
            username: Some("ab".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("short".to_string()),
            role: None,
        };
        assert_eq!(validate_create(&payload).len(), 3);
    }

    #[test]
    fn create_validation_passes_good_payload() {
        let payload = CreateAdminRequest {
            username: Some("petugas1".to_string()),
            email: Some("petugas@rptra.example".to_string()),
            password: Some("rahasia-banget".to_string()),
            role: Some(AdminRole::Admin),
        };
        assert!(validate_create(&payload).is_empty());
    }
}
