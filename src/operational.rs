// src/operational.rs
//
// Singleton open/closed flag shown on the public site. Exactly one live
// document with _id "current".

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::require_auth;

pub const OPERATIONAL_ID: &str = "current";

#[derive(Debug, Serialize, Deserialize)]
pub struct OperationalStatus {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: bool,
    #[serde(rename = "updatedBy")]
    pub updated_by: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

impl OperationalStatus {
    fn initial() -> Self {
        OperationalStatus {
            id: OPERATIONAL_ID.to_string(),
            status: true,
            updated_by: "system".to_string(),
            updated_at: BsonDateTime::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    /// Explicit target state; omitted means "flip the current one".
    pub status: Option<bool>,
}

/// GET /api/operational-status: creates the default document on first
/// read so the singleton always exists.
pub async fn get_status(data: web::Data<AppState>) -> impl Responder {
    let collection = data
        .mongodb
        .db
        .collection::<OperationalStatus>("operational");
    match collection.find_one(doc! { "_id": OPERATIONAL_ID }).await {
        Ok(Some(status)) => HttpResponse::Ok().json(status),
        Ok(None) => {
            let initial = OperationalStatus::initial();
            if let Err(e) = collection.insert_one(&initial).await {
                error!("Error seeding operational status: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal mengambil status operasional" }));
            }
            HttpResponse::Ok().json(initial)
        }
        Err(e) => {
            error!("Error fetching operational status: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal mengambil status operasional" }))
        }
    }
}

/// PUT /api/operational-status: auth required.
///
/// This is a read-then-write toggle with no concurrency protection; two
/// simultaneous toggles can lose one update. Accepted for this workload
/// (a single staff member flips the flag a few times a day).
pub async fn update_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<ToggleRequest>,
) -> impl Responder {
    let user = match require_auth(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let collection = data
        .mongodb
        .db
        .collection::<OperationalStatus>("operational");
    let current = match collection.find_one(doc! { "_id": OPERATIONAL_ID }).await {
        Ok(Some(status)) => status.status,
        Ok(None) => OperationalStatus::initial().status,
        Err(e) => {
            error!("Error reading operational status: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal memperbarui status operasional" }));
        }
    };
    let next = payload.status.unwrap_or(!current);

    let update = doc! {
        "$set": {
            "status": next,
            "updatedBy": &user.id,
            "updatedAt": BsonDateTime::now(),
        }
    };
    match collection
        .update_one(doc! { "_id": OPERATIONAL_ID }, update)
        .upsert(true)
        .await
    {
        Ok(_) => {
            info!("Operational status set to {} by {}", next, user.id);
            HttpResponse::Ok().json(json!({ "status": next, "updatedBy": user.id }))
        }
        Err(e) => {
            error!("Error updating operational status: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal memperbarui status operasional" }))
        }
    }
}
