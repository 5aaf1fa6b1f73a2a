//! Model introspection types

use delve_core::ModelInfo;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Resolved provider and model for one stage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageModelInfo {
    #[schema(example = "query_generator")]
    pub stage: String,
    #[schema(example = "gemini")]
    pub provider: String,
    #[schema(example = "gemini-2.0-flash")]
    pub model_name: String,
    pub api_key_set: bool,
}

impl From<ModelInfo> for StageModelInfo {
    fn from(info: ModelInfo) -> Self {
        Self {
            stage: info.stage.to_string(),
            provider: info.provider.to_string(),
            model_name: info.model_name,
            api_key_set: info.api_key_set,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelsResponse {
    pub models: Vec<StageModelInfo>,
    /// Environment variables of keys missing for providers in use
    #[schema(example = json!(["SILICONFLOW_API_KEY"]))]
    pub missing_keys: Vec<String>,
}
