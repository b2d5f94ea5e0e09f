// src/db.rs
//
// Connection lifecycle: initialized once in main, shared behind an Arc,
// reused for every request, dropped at process exit.

use log::{error, info};
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> Self {
        let client_options = ClientOptions::parse(uri)
            .await
            .expect("Failed to parse MongoDB connection string");
        let client = Client::with_options(client_options).expect("Failed to initialize client");
        let db = client.database(db_name);
        MongoDB { client, db }
    }

    /// Uniqueness of admin email and username is delegated to the
    /// database; the handlers only translate the duplicate-key error.
    pub async fn ensure_indexes(&self) {
        let unique = |keys: Document| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        let admins = self.db.collection::<Document>("admins");
        match admins
            .create_indexes(vec![unique(doc! { "email": 1 }), unique(doc! { "username": 1 })])
            .await
        {
            Ok(_) => info!("Admin unique indexes ensured"),
            Err(e) => error!("Failed to create admin indexes: {}", e),
        }
    }
}
