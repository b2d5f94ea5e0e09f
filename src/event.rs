// src/event.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures::stream::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::require_auth;
use crate::video::is_valid_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Finished,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub category: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub location: String,
    pub status: EventStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub status: Option<EventStatus>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub status: Option<EventStatus>,
    pub images: Option<Vec<String>>,
}

pub fn validate_create(payload: &CreateEventRequest) -> Vec<String> {
    let mut details = Vec::new();
    let require = |value: &Option<String>, field: &str, details: &mut Vec<String>| {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            details.push(format!("{} wajib diisi", field));
        }
    };
    require(&payload.title, "title", &mut details);
    require(&payload.category, "category", &mut details);
    require(&payload.location, "location", &mut details);
    match payload.date.as_deref() {
        None => details.push("date wajib diisi".to_string()),
        Some(date) if !is_valid_date(date.trim()) => {
            details.push("date harus berformat YYYY-MM-DD".to_string());
        }
        Some(_) => {}
    }
    details
}

/// GET /api/events
pub async fn list_events(data: web::Data<AppState>) -> impl Responder {
    let collection = data.mongodb.db.collection::<Event>("events");
    let result = match collection.find(doc! {}).sort(doc! { "date": -1 }).await {
        Ok(cursor) => cursor.try_collect::<Vec<Event>>().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(events) => HttpResponse::Ok().json(events),
        Err(e) => {
            error!("Error fetching events: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil acara" }))
        }
    }
}

/// GET /api/events/{id}
pub async fn get_event(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::BadRequest().json(json!({ "error": "ID acara tidak valid" })),
    };
    let collection = data.mongodb.db.collection::<Event>("events");
    match collection.find_one(doc! { "_id": oid }).await {
        Ok(Some(event)) => HttpResponse::Ok().json(event),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "Acara tidak ditemukan" })),
        Err(e) => {
            error!("Error fetching event: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil acara" }))
        }
    }
}

/// POST /api/events
pub async fn create_event(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateEventRequest>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let details = validate_create(&payload);
    if !details.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "Validasi gagal", "details": details }));
    }

    let now = BsonDateTime::now();
    let event = Event {
        id: None,
        title: payload.title.clone().unwrap_or_default().trim().to_string(),
        category: payload.category.clone().unwrap_or_default().trim().to_string(),
        date: payload.date.clone().unwrap_or_default().trim().to_string(),
        location: payload.location.clone().unwrap_or_default().trim().to_string(),
        status: payload.status.unwrap_or(EventStatus::Upcoming),
        images: payload.images.clone().unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let collection = data.mongodb.db.collection::<Event>("events");
    match collection.insert_one(&event).await {
        Ok(result) => {
            info!("Event created: {}", event.title);
            HttpResponse::Created().json(json!({ "id": result.inserted_id, "title": event.title }))
        }
        Err(e) => {
            error!("Error inserting event: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menyimpan acara" }))
        }
    }
}

/// PUT /api/events/{id}
pub async fn update_event(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateEventRequest>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::BadRequest().json(json!({ "error": "ID acara tidak valid" })),
    };

    let mut update_doc = doc! {};
    if let Some(title) = &payload.title {
        update_doc.insert("title", title.trim());
    }
    if let Some(category) = &payload.category {
        update_doc.insert("category", category.trim());
    }
    if let Some(date) = &payload.date {
        if !is_valid_date(date.trim()) {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "date harus berformat YYYY-MM-DD" }));
        }
        update_doc.insert("date", date.trim());
    }
    if let Some(location) = &payload.location {
        update_doc.insert("location", location.trim());
    }
    if let Some(status) = payload.status {
        match to_bson(&status) {
            Ok(value) => {
                update_doc.insert("status", value);
            }
            Err(e) => {
                error!("Error serializing event status: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal memperbarui acara" }));
            }
        }
    }
    if let Some(images) = &payload.images {
        update_doc.insert("images", images.clone());
    }
    if update_doc.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "Tidak ada field untuk diubah" }));
    }
    update_doc.insert("updatedAt", BsonDateTime::now());

    let collection = data.mongodb.db.collection::<Event>("events");
    match collection
        .update_one(doc! { "_id": oid }, doc! { "$set": update_doc })
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Acara tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Acara berhasil diperbarui" })),
        Err(e) => {
            error!("Error updating event: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal memperbarui acara" }))
        }
    }
}

/// DELETE /api/events/{id}
pub async fn delete_event(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::BadRequest().json(json!({ "error": "ID acara tidak valid" })),
    };
    let collection = data.mongodb.db.collection::<Event>("events");
    match collection.delete_one(doc! { "_id": oid }).await {
        Ok(result) if result.deleted_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Acara tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Acara berhasil dihapus" })),
        Err(e) => {
            error!("Error deleting event: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menghapus acara" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> CreateEventRequest {
        CreateEventRequest {
            title: Some("Lomba 17 Agustus".to_string()),
            category: Some("komunitas".to_string()),
            date: Some("2024-08-17".to_string()),
            location: Some("Lapangan RPTRA".to_string()),
            status: None,
            images: None,
        }
    }

    #[test]
    fn create_reports_every_missing_field() {
        let payload = CreateEventRequest {
            title: None,
            category: None,
            date: None,
            location: None,
            status: None,
            images: None,
        };
        assert_eq!(validate_create(&payload).len(), 4);
    }

    #[test]
    fn create_rejects_malformed_date() {
        let mut payload = base_payload();
        payload.date = Some("17-08-2024".to_string());
        let details = validate_create(&payload);
        assert_eq!(details.len(), 1);
        assert!(details[0].contains("YYYY-MM-DD"));
    }

    #[test]
    fn create_accepts_complete_payload() {
        assert!(validate_create(&base_payload()).is_empty());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&EventStatus::Upcoming).unwrap(),
            "\"upcoming\""
        );
    }
}
