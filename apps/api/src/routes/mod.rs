pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::reactions::handlers as reactions;
use crate::state::AppState;
use crate::voters::handlers as voters;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Voters API
        .route("/api/v1/voters", get(voters::handle_sample_voters))
        .route("/api/v1/voters/facets", get(voters::handle_facets))
        // Reactions API
        .route(
            "/api/v1/reactions",
            post(reactions::handle_generate_reactions),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::{LlmError, TextGenerator};
    use crate::reactions::generator::{GenerationSettings, ReactionGenerator};
    use crate::reactions::models::FAILURE_PLACEHOLDER;
    use crate::voters::cache::VoterCache;
    use crate::voters::store::test_data::VOTER_CSV;

    /// Echoes the voter's party back; fails for Republicans.
    struct PartyEcho;

    #[async_trait]
    impl TextGenerator for PartyEcho {
        async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
            if prompt.contains("Republican") {
                return Err(LlmError::Blocked {
                    reason: "SAFETY".to_string(),
                    detail: None,
                });
            }
            Ok("I'm listening.".to_string())
        }
    }

    fn test_config(voter_file: &Path) -> Config {
        Config {
            voter_file: voter_file.to_path_buf(),
            gemini_api_key: None,
            gemini_base_url: "http://localhost".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            reaction_concurrency: 2,
            reaction_timeout_secs: 5,
            reaction_max_retries: 0,
            reaction_backoff_ms: 1,
            default_sample_size: 3,
        }
    }

    fn app_for(voter_file: &Path) -> Router {
        let config = test_config(voter_file);
        build_router(AppState {
            voters: Arc::new(VoterCache::new(voter_file)),
            reactions: ReactionGenerator::new(
                Arc::new(PartyEcho),
                GenerationSettings {
                    max_retries: 0,
                    ..GenerationSettings::default()
                },
            ),
            config,
        })
    }

    fn voter_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VOTER_CSV.as_bytes()).unwrap();
        file
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let file = voter_file();
        let (status, body) = send(app_for(file.path()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_facets() {
        let file = voter_file();
        let (status, body) = send(app_for(file.path()), get("/api/v1/voters/facets")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["party_id"],
            serde_json::json!(["Democrat", "Independent", "Republican"])
        );
    }

    #[tokio::test]
    async fn test_sample_voters_applies_filters() {
        let file = voter_file();
        let (status, body) = send(
            app_for(file.path()),
            get("/api/v1/voters?party_id=Democrat&sample_size=10&seed=3"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_matching"], 3);
        let voters = body["voters"].as_array().unwrap();
        assert_eq!(voters.len(), 3);
        assert!(voters.iter().all(|v| v["party_id"] == "Democrat"));
    }

    #[tokio::test]
    async fn test_negative_sample_size_is_rejected() {
        let file = voter_file();
        let (status, body) =
            send(app_for(file.path()), get("/api/v1/voters?sample_size=-1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "SAMPLE_ERROR");
    }

    #[tokio::test]
    async fn test_reactions_report_failures_inline() {
        let file = voter_file();
        let (status, body) = send(
            app_for(file.path()),
            post_json(
                "/api/v1/reactions",
                serde_json::json!({
                    "speech": "We will build more housing.",
                    "filters": {"ideology": ["Conservative", "Liberal"]},
                    "sample_size": 10,
                    "seed": 11
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        // v1, v2, v4 match; all three are eligible.
        assert_eq!(results.len(), 3);
        for result in results {
            if result["voter"]["party_id"] == "Republican" {
                assert_eq!(result["reaction"]["status"], "generation_failed");
                assert_eq!(result["reaction"]["reason"], "content_blocked");
                assert_eq!(result["display"], FAILURE_PLACEHOLDER);
            } else {
                assert_eq!(result["reaction"]["status"], "reaction");
                assert_eq!(result["display"], "I'm listening.");
            }
        }
    }

    #[tokio::test]
    async fn test_reactions_with_empty_pool_return_no_results() {
        let file = voter_file();
        let (status, body) = send(
            app_for(file.path()),
            post_json(
                "/api/v1/reactions",
                serde_json::json!({
                    "speech": "Hello",
                    "filters": {"party_id": ["Libertarian"]}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_speech_is_rejected() {
        let file = voter_file();
        let (status, body) = send(
            app_for(file.path()),
            post_json("/api/v1/reactions", serde_json::json!({"speech": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_voter_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app_for(&dir.path().join("missing.csv")),
            post_json("/api/v1/reactions", serde_json::json!({"speech": "Hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "LOAD_ERROR");
    }
}
