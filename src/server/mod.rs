//! HTTP 层
//!
//! `POST /execute-task` 接收单个上传文件，跑完整条流水线后同步返回结果；
//! `GET /api/health` 用于探活。流水线的类型化错误在这里映射为状态码。

pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent::TaskPipeline;
use crate::config::ServerSection;
use crate::core::PipelineError;

pub use upload::{receive_upload, UploadError, UploadedFile};

pub const SUCCESS_MESSAGE: &str = "Task executed successfully";

/// 成功响应；降级模式下 result 缺省
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// 所有请求共享的只读状态
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<dyn TaskPipeline>,
    pub upload_dir: PathBuf,
    /// true 时流水线失败仍返回 200（result 缺省）
    pub degrade_on_pipeline_error: bool,
}

pub fn build_router(state: AppState, server: &ServerSection) -> Router {
    Router::new()
        .route("/execute-task", post(execute_task))
        .route("/api/health", get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(server.allowed_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 只允许配置的来源跨域 POST；未配置时放开来源
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST])
        .allow_headers(Any);
    match allowed_origin.map(str::trim).filter(|o| !o.is_empty()) {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => cors.allow_origin(AllowOrigin::exact(value)),
            Err(_) => {
                tracing::warn!(origin, "invalid allowed origin, cross-origin requests disabled");
                cors
            }
        },
        None => {
            tracing::warn!("no allowed origin configured, accepting any origin");
            cors.allow_origin(Any)
        }
    }
}

/// 流水线错误 -> HTTP 响应
pub fn pipeline_error_response(err: &PipelineError, degrade: bool) -> Response {
    if degrade {
        return Json(TaskResponse {
            message: SUCCESS_MESSAGE,
            result: None,
        })
        .into_response();
    }
    let (status, error) = match err {
        PipelineError::Extraction(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Failed to extract document text.",
        ),
        PipelineError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Task timed out."),
        PipelineError::Agent(_) | PipelineError::Join(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to execute task.")
        }
    };
    (status, Json(ErrorBody { error })).into_response()
}

async fn execute_task(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            tracing::info!(reason = %rejection, "request is not a multipart upload");
            return UploadError::NoFile.into_response();
        }
    };
    let upload = match receive_upload(&state.upload_dir, multipart).await {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(error = %e, "upload rejected");
            return e.into_response();
        }
    };

    match state.pipeline.process_file(&upload.path).await {
        Ok(result) => Json(TaskResponse {
            message: SUCCESS_MESSAGE,
            result: Some(result),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, file = %upload.path.display(), "task failed");
            pipeline_error_response(&e, state.degrade_on_pipeline_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AgentError, ExtractionError};

    #[test]
    fn test_status_mapping() {
        let extraction = PipelineError::Extraction(ExtractionError::UnsupportedFormat(".jpg".into()));
        assert_eq!(
            pipeline_error_response(&extraction, false).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let agent = PipelineError::Agent(AgentError::ExceededSteps {
            limit: 10,
            what: "tool invocations",
        });
        assert_eq!(
            pipeline_error_response(&agent, false).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            pipeline_error_response(&PipelineError::Timeout(300), false).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(pipeline_error_response(&agent, true).status(), StatusCode::OK);
    }

    #[test]
    fn test_degraded_response_omits_result() {
        let body = serde_json::to_value(TaskResponse {
            message: SUCCESS_MESSAGE,
            result: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"message": "Task executed successfully"}));
    }
}
