//! 共享的只读应用状态

use std::sync::Arc;

use crate::clients::ChatModel;
use crate::config::Config;
use crate::infrastructure::UploadStore;
use crate::workflow::QuestionFlow;

/// 所有请求共享的状态，构建后不再修改
pub struct AppState {
    pub config: Config,
    pub upload_store: UploadStore,
    pub flow: QuestionFlow,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn ChatModel>) -> Self {
        Self {
            upload_store: UploadStore::new(config.upload_dir.clone()),
            flow: QuestionFlow::new(model, &config),
            config,
        }
    }
}
