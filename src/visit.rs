// src/visit.rs
//
// Daily visitor tallies per age bracket and the aggregated statistics
// consumed by the admin dashboard. Bucketing uses the Asia/Jakarta
// calendar ranges from date_range.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures::stream::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::require_auth;
use crate::date_range::{self, DateRange};
use crate::video::is_valid_date;

#[derive(Debug, Serialize, Deserialize)]
pub struct Visit {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub balita: i64,
    #[serde(default)]
    pub anak: i64,
    #[serde(default)]
    pub remaja: i64,
    #[serde(default)]
    pub dewasa: i64,
    #[serde(default)]
    pub lansia: i64,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateVisitRequest {
    pub date: Option<String>,
    pub balita: Option<i64>,
    pub anak: Option<i64>,
    pub remaja: Option<i64>,
    pub dewasa: Option<i64>,
    pub lansia: Option<i64>,
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct VisitSummary {
    pub balita: i64,
    pub anak: i64,
    pub remaja: i64,
    pub dewasa: i64,
    pub lansia: i64,
    pub total: i64,
}

impl VisitSummary {
    fn add(&mut self, visit: &Visit) {
        self.balita += visit.balita;
        self.anak += visit.anak;
        self.remaja += visit.remaja;
        self.dewasa += visit.dewasa;
        self.lansia += visit.lansia;
        self.total += visit.balita + visit.anak + visit.remaja + visit.dewasa + visit.lansia;
    }
}

pub fn summarize(visits: &[Visit], range: DateRange) -> VisitSummary {
    let mut summary = VisitSummary::default();
    for visit in visits {
        let Some(date) = date_range::parse_date(&visit.date) else {
            continue;
        };
        if date_range::is_in_range(date_range::day_start(date), range.start, range.end) {
            summary.add(visit);
        }
    }
    summary
}

pub fn validate_create(payload: &CreateVisitRequest) -> Vec<String> {
    let mut details = Vec::new();
    match payload.date.as_deref() {
        None => details.push("date wajib diisi".to_string()),
        Some(date) if !is_valid_date(date.trim()) => {
            details.push("date harus berformat YYYY-MM-DD".to_string());
        }
        Some(_) => {}
    }
    for (value, field) in [
        (payload.balita, "balita"),
        (payload.anak, "anak"),
        (payload.remaja, "remaja"),
        (payload.dewasa, "dewasa"),
        (payload.lansia, "lansia"),
    ] {
        if value.map_or(false, |n| n < 0) {
            details.push(format!("{} tidak boleh negatif", field));
        }
    }
    details
}

/// POST /api/visits: counts default to 0 when absent.
pub async fn create_visit(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateVisitRequest>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let details = validate_create(&payload);
    if !details.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "Validasi gagal", "details": details }));
    }

    let visit = Visit {
        id: None,
        date: payload.date.clone().unwrap_or_default().trim().to_string(),
        balita: payload.balita.unwrap_or(0),
        anak: payload.anak.unwrap_or(0),
        remaja: payload.remaja.unwrap_or(0),
        dewasa: payload.dewasa.unwrap_or(0),
        lansia: payload.lansia.unwrap_or(0),
        created_at: BsonDateTime::now(),
    };

    let collection = data.mongodb.db.collection::<Visit>("visits");
    match collection.insert_one(&visit).await {
        Ok(result) => {
            info!("Visit recorded for {}", visit.date);
            HttpResponse::Created().json(json!({ "id": result.inserted_id, "date": visit.date }))
        }
        Err(e) => {
            error!("Error inserting visit: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal menyimpan kunjungan" }))
        }
    }
}

/// GET /api/visits
pub async fn list_visits(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let collection = data.mongodb.db.collection::<Visit>("visits");
    let result = match collection.find(doc! {}).sort(doc! { "date": -1 }).await {
        Ok(cursor) => cursor.try_collect::<Vec<Visit>>().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(visits) => HttpResponse::Ok().json(visits),
        Err(e) => {
            error!("Error fetching visits: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal mengambil kunjungan" }))
        }
    }
}

/// GET /api/visits/stats: per-bracket sums for current and previous
/// week, month and year.
pub async fn visit_stats(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let collection = data.mongodb.db.collection::<Visit>("visits");
    let visits: Vec<Visit> = match collection.find(doc! {}).await {
        Ok(cursor) => match cursor.try_collect().await {
            Ok(visits) => visits,
            Err(e) => {
                error!("Error reading visits cursor: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal mengambil statistik" }));
            }
        },
        Err(e) => {
            error!("Error fetching visits for stats: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal mengambil statistik" }));
        }
    };

    HttpResponse::Ok().json(json!({
        "week": {
            "current": summarize(&visits, date_range::current_week_range()),
            "previous": summarize(&visits, date_range::previous_week_range()),
        },
        "month": {
            "current": summarize(&visits, date_range::current_month_range()),
            "previous": summarize(&visits, date_range::previous_month_range()),
        },
        "year": {
            "current": summarize(&visits, date_range::current_year_range()),
            "previous": summarize(&visits, date_range::previous_year_range()),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(date: &str, counts: [i64; 5]) -> Visit {
        Visit {
            id: None,
            date: date.to_string(),
            balita: counts[0],
            anak: counts[1],
            remaja: counts[2],
            dewasa: counts[3],
            lansia: counts[4],
            created_at: BsonDateTime::now(),
        }
    }

    fn range(start: &str, end: &str) -> DateRange {
        let parse = |s| date_range::parse_date(s).unwrap();
        DateRange {
            start: date_range::day_start(parse(start)),
            end: date_range::day_end(parse(end)),
        }
    }

    #[test]
    fn summarize_only_counts_visits_inside_range() {
        let visits = vec![
            visit("2024-03-04", [1, 2, 3, 4, 5]),
            visit("2024-03-10", [1, 0, 0, 0, 0]),
            visit("2024-03-11", [9, 9, 9, 9, 9]),
        ];
        let summary = summarize(&visits, range("2024-03-04", "2024-03-10"));
        assert_eq!(summary.balita, 2);
        assert_eq!(summary.anak, 2);
        assert_eq!(summary.total, 16);
    }

    #[test]
    fn summarize_skips_unparseable_dates() {
        let visits = vec![
            visit("garbage", [5, 5, 5, 5, 5]),
            visit("2024-03-05", [1, 1, 1, 1, 1]),
        ];
        let summary = summarize(&visits, range("2024-03-01", "2024-03-31"));
        assert_eq!(summary.total, 5);
    }

    #[test]
    fn negative_counts_rejected() {
        let payload = CreateVisitRequest {
            date: Some("2024-03-05".to_string()),
            balita: Some(-1),
            anak: None,
            remaja: None,
            dewasa: None,
            lansia: None,
        };
        let details = validate_create(&payload);
        assert_eq!(details.len(), 1);
        assert!(details[0].contains("balita"));
    }

    #[test]
    fn absent_counts_default_to_zero() {
        let payload = CreateVisitRequest {
            date: Some("2024-03-05".to_string()),
            balita: None,
            anak: None,
            remaja: None,
            dewasa: None,
            lansia: None,
        };
        assert!(validate_create(&payload).is_empty());
    }
}
