// src/contact.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures::stream::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;

use crate::app_state::AppState;
use crate::auth::require_auth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactCategory {
    Umum,
    Keluhan,
    Saran,
    Kerjasama,
    Lainnya,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub category: ContactCategory,
    pub message: String,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub category: Option<ContactCategory>,
    pub message: Option<String>,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9\- ]{6,13}[0-9]$").expect("phone regex is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(phone)
}

pub fn validate_create(payload: &CreateContactRequest) -> Vec<String> {
    let mut details = Vec::new();

    match payload.name.as_deref().map(str::trim) {
        None => details.push("name wajib diisi".to_string()),
        Some(name) if name.len() < 2 || name.len() > 100 => {
            details.push("name harus 2-100 karakter".to_string());
        }
        Some(_) => {}
    }
    match payload.email.as_deref().map(str::trim) {
        None => details.push("email wajib diisi".to_string()),
        Some(email) if !is_valid_email(email) => {
            details.push("email tidak valid".to_string());
        }
        Some(_) => {}
    }
    match payload.phone.as_deref().map(str::trim) {
        None => details.push("phone wajib diisi".to_string()),
        Some(phone) if !is_valid_phone(phone) => {
            details.push("phone harus 8-15 digit".to_string());
        }
        Some(_) => {}
    }
    match payload.subject.as_deref().map(str::trim) {
        None => details.push("subject wajib diisi".to_string()),
        Some(subject) if subject.len() < 3 || subject.len() > 200 => {
            details.push("subject harus 3-200 karakter".to_string());
        }
        Some(_) => {}
    }
    if payload.category.is_none() {
        details.push("category wajib diisi".to_string());
    }
    match payload.message.as_deref().map(str::trim) {
        None => details.push("message wajib diisi".to_string()),
        Some(message) if message.len() < 10 || message.len() > 2000 => {
            details.push("message harus 10-2000 karakter".to_string());
        }
        Some(_) => {}
    }
    details
}

/// POST /api/contacts: public form submission.
pub async fn create_contact(
    data: web::Data<AppState>,
    payload: web::Json<CreateContactRequest>,
) -> impl Responder {
    let details = validate_create(&payload);
    if !details.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "Validasi gagal", "details": details }));
    }

    let contact = Contact {
        id: None,
        name: payload.name.clone().unwrap_or_default().trim().to_string(),
        email: payload.email.clone().unwrap_or_default().trim().to_string(),
        phone: payload.phone.clone().unwrap_or_default().trim().to_string(),
        subject: payload.subject.clone().unwrap_or_default().trim().to_string(),
        category: payload.category.unwrap_or(ContactCategory::Umum),
        message: payload.message.clone().unwrap_or_default().trim().to_string(),
        created_at: BsonDateTime::now(),
    };

    let collection = data.mongodb.db.collection::<Contact>("contacts");
    match collection.insert_one(&contact).await {
        Ok(result) => {
            info!("Contact message received from {}", contact.email);
            HttpResponse::Created().json(json!({ "id": result.inserted_id }))
        }
        Err(e) => {
            error!("Error inserting contact: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menyimpan pesan" }))
        }
    }
}

/// GET /api/contacts
pub async fn list_contacts(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let collection = data.mongodb.db.collection::<Contact>("contacts");
    let result = match collection.find(doc! {}).sort(doc! { "createdAt": -1 }).await {
        Ok(cursor) => cursor.try_collect::<Vec<Contact>>().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(contacts) => HttpResponse::Ok().json(contacts),
        Err(e) => {
            error!("Error fetching contacts: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil pesan" }))
        }
    }
}

/// DELETE /api/contacts/{id}
pub async fn delete_contact(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::BadRequest().json(json!({ "error": "ID pesan tidak valid" })),
    };
    let collection = data.mongodb.db.collection::<Contact>("contacts");
    match collection.delete_one(doc! { "_id": oid }).await {
        Ok(result) if result.deleted_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Pesan tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Pesan berhasil dihapus" })),
        Err(e) => {
            error!("Error deleting contact: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menghapus pesan" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_payload() -> CreateContactRequest {
        CreateContactRequest {
            name: Some("Siti Aminah".to_string()),
            email: Some("siti@example.com".to_string()),
            phone: Some("081234567890".to_string()),
            subject: Some("Jadwal kegiatan".to_string()),
            category: Some(ContactCategory::Umum),
            message: Some("Apakah taman buka saat libur nasional?".to_string()),
        }
    }

    #[test]
    fn complete_payload_passes() {
        assert!(validate_create(&complete_payload()).is_empty());
    }

    #[test]
    fn email_format_enforced() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("user@@example"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn phone_length_enforced() {
        assert!(is_valid_phone("081234567890"));
        assert!(is_valid_phone("+6281234567890"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("abcdefghij"));
    }

    #[test]
    fn short_message_rejected() {
        let mut payload = complete_payload();
        payload.message = Some("hai".to_string());
        let details = validate_create(&payload);
        assert_eq!(details.len(), 1);
        assert!(details[0].contains("message"));
    }
}
