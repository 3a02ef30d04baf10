//! HTTP 接口集成测试：Router::oneshot + 手工拼装的 multipart 请求体

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use taskbee::agent::{AgentComponents, DocumentPipeline, TaskPipeline};
    use taskbee::config::ServerSection;
    use taskbee::core::{AgentError, ExtractionError, PipelineError};
    use taskbee::llm::MockLlmClient;
    use taskbee::react::LoopLimits;
    use taskbee::server::{build_router, AppState};
    use taskbee::tools::ToolRegistry;

    const BOUNDARY: &str = "taskbee-test-boundary";

    /// 把上传文件内容原样作为结果返回
    struct EchoPipeline;

    #[async_trait]
    impl TaskPipeline for EchoPipeline {
        async fn process_file(&self, path: &Path) -> Result<String, PipelineError> {
            let text = tokio::fs::read_to_string(path).await.unwrap_or_default();
            Ok(format!("solved: {}", text))
        }
    }

    struct FailingPipeline;

    #[async_trait]
    impl TaskPipeline for FailingPipeline {
        async fn process_file(&self, path: &Path) -> Result<String, PipelineError> {
            if path.extension().and_then(|e| e.to_str()) == Some("bin") {
                Err(ExtractionError::UnsupportedFormat(".bin".to_string()).into())
            } else {
                Err(AgentError::ExceededSteps {
                    limit: 10,
                    what: "tool invocations",
                }
                .into())
            }
        }
    }

    fn router(pipeline: impl TaskPipeline + 'static, upload_dir: &Path, degrade: bool) -> Router {
        let state = AppState {
            pipeline: Arc::new(pipeline),
            upload_dir: upload_dir.to_path_buf(),
            degrade_on_pipeline_error: degrade,
        };
        build_router(
            state,
            &ServerSection {
                allowed_origin: Some("http://localhost:5173".to_string()),
                ..ServerSection::default()
            },
        )
    }

    /// parts: (字段名, 文件名, 内容)；文件名为 None 时是普通文本字段
    fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, f
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        Request::builder()
            .method("POST")
            .uri("/execute-task")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn stored_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_missing_file_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(EchoPipeline, dir.path(), false)
            .oneshot(multipart_request(&[("note", None, "hello")]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({"error": "No file received."}));
        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/execute-task")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let resp = router(EchoPipeline, dir.path(), false).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({"error": "No file received."}));
    }

    #[tokio::test]
    async fn test_valid_upload_returns_result() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(EchoPipeline, dir.path(), false)
            .oneshot(multipart_request(&[(
                "file",
                Some("homework.txt"),
                "1. What is 2+2?",
            )]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            json_body(resp).await,
            json!({"message": "Task executed successfully", "result": "solved: 1. What is 2+2?"})
        );

        let files = stored_files(dir.path());
        assert_eq!(files.len(), 1);
        let stem = files[0].strip_suffix(".txt").expect("extension preserved");
        assert!(!stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_two_file_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(EchoPipeline, dir.path(), false)
            .oneshot(multipart_request(&[
                ("file", Some("a.txt"), "a"),
                ("file", Some("b.txt"), "b"),
            ]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(resp).await,
            json!({"error": "Only one file may be uploaded."})
        );
    }

    #[tokio::test]
    async fn test_extraction_failure_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(FailingPipeline, dir.path(), false)
            .oneshot(multipart_request(&[("file", Some("blob.bin"), "\u{1}\u{2}")]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_body(resp).await,
            json!({"error": "Failed to extract document text."})
        );
    }

    #[tokio::test]
    async fn test_agent_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(FailingPipeline, dir.path(), false)
            .oneshot(multipart_request(&[("file", Some("hw.txt"), "loop forever")]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await, json!({"error": "Failed to execute task."}));
    }

    #[tokio::test]
    async fn test_degrade_mode_answers_200_without_result() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(FailingPipeline, dir.path(), true)
            .oneshot(multipart_request(&[("file", Some("blob.bin"), "x")]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            json_body(resp).await,
            json!({"message": "Task executed successfully"})
        );
    }

    #[tokio::test]
    async fn test_real_pipeline_over_text_upload() {
        let dir = tempfile::tempdir().unwrap();
        let components = AgentComponents::new(
            Arc::new(MockLlmClient::scripted(["2 + 2 = 4"])),
            ToolRegistry::new(),
            5,
            LoopLimits::default(),
        );
        let pipeline = DocumentPipeline::new(Arc::new(components), 1000, 30);
        let resp = router(pipeline, dir.path(), false)
            .oneshot(multipart_request(&[("file", Some("hw.txt"), "What is 2+2?")]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["result"], "2 + 2 = 4");
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = router(EchoPipeline, dir.path(), false).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }
}
