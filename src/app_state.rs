use crate::config::Config;
use crate::db::MongoDB;
use crate::file_store::FileStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub mongodb: Arc<MongoDB>,
    pub files: FileStore,
    pub config: Config,
}
