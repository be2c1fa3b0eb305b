//! Integration tests for the classroom comfort HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use classroom_comfort::model::{
        ClassifierModel, FeatureColumns, LinearRegressor, LogisticClassifier, RegressorModel,
        StandardScaler,
    };
    use classroom_comfort::prediction::CLASSIFIER_COLUMNS;
    use classroom_comfort::server::{run, ServerConfig, ServerState};
    use classroom_comfort::{Config, EngagementHandle, ModelBundle, PredictionService};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    /// Carries the last observed values forward, always predicts "Acceptable".
    fn persistence_bundle() -> ModelBundle {
        let mut coefficients = vec![vec![0.0; 5]; 5];
        for (i, row) in coefficients.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        ModelBundle {
            scaler: StandardScaler::identity(5),
            regressor: RegressorModel::Linear(LinearRegressor {
                coefficients,
                intercepts: vec![0.0; 5],
                training_run: None,
            }),
            classifier: ClassifierModel::Logistic(LogisticClassifier {
                classes: vec![1, 2, 3],
                coefficients: vec![vec![0.0; CLASSIFIER_COLUMNS.len()]; 3],
                intercepts: vec![0.0, 1.0, 0.0],
                training_run: None,
            }),
            feature_columns: FeatureColumns {
                columns: ["temperature", "humidity", "gas", "light", "sound"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                training_run: None,
            },
        }
    }

    async fn start_degraded() -> (SocketAddr, oneshot::Sender<()>) {
        let service = PredictionService::new(&Config::default(), Err("no artifacts".to_string()));
        start(service).await
    }

    async fn start_with_models(dir: &TempDir) -> (SocketAddr, oneshot::Sender<()>) {
        persistence_bundle().save(dir.path()).unwrap();
        let config = Config {
            model_dir: dir.path().to_path_buf(),
            data_path: dir.path().to_path_buf(),
            ..Config::default()
        };
        let service =
            PredictionService::from_config_strict(&config).expect("Failed to load models");
        start(service).await
    }

    async fn start(service: PredictionService) -> (SocketAddr, oneshot::Sender<()>) {
        let state = Arc::new(ServerState::new(Arc::new(service), EngagementHandle::new()));
        let result = run(ServerConfig::new(0), state)
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        result
    }

    fn reading_body(minute: u32) -> serde_json::Value {
        serde_json::json!({
            "timestamp": format!("2024-03-04T09:{:02}:00Z", minute),
            "temperature": 23.0,
            "humidity": 45.0,
            "gas": 600.0,
            "light": 200.0,
            "sound": 45.0,
            "occupancy": 20,
            "high_engagement": 15,
            "low_engagement": 3
        })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown_tx) = start_degraded().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());
        assert_eq!(body["models_loaded"], false);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_score_works_without_models() {
        let (addr, shutdown_tx) = start_degraded().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/api/comfort/score", addr))
            .json(&serde_json::json!({
                "temperature": 23.0,
                "humidity": 45.0,
                "gas": 600.0,
                "light": 200.0,
                "sound": 45.0
            }))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], true);
        assert_eq!(body["score"], 5.0);
        assert_eq!(body["level"], "Optimal");
        assert_eq!(body["level_code"], 3);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_forecast_without_models_is_unavailable() {
        let (addr, shutdown_tx) = start_degraded().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/api/prediction/forecast", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "MODEL_NOT_LOADED");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_incomplete_reading_rejected() {
        let (addr, shutdown_tx) = start_degraded().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/api/readings", addr))
            .json(&serde_json::json!({
                "temperature": 23.0,
                "humidity": 45.0,
                "occupancy": 1,
                "high_engagement": 1,
                "low_engagement": 0
            }))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INCOMPLETE_READING");
        assert!(body["error"].as_str().unwrap_or("").contains("gas"));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_reading_without_engagement_before_camera() {
        let (addr, shutdown_tx) = start_degraded().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/api/readings", addr))
            .json(&serde_json::json!({
                "temperature": 23.0,
                "humidity": 45.0,
                "gas": 600.0,
                "light": 200.0,
                "sound": 45.0
            }))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INCOMPLETE_READING");
        assert!(body["error"].as_str().unwrap_or("").contains("occupancy"));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_reading_uses_camera_engagement() {
        let (addr, shutdown_tx) = start_degraded().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/api/engagement", addr))
            .json(&serde_json::json!({ "happy": 8, "neutral": 2, "sad": 1, "fear": 1 }))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["occupancy"], 12);

        let response = client
            .post(format!("http://{}/api/readings", addr))
            .json(&serde_json::json!({
                "temperature": 23.0,
                "humidity": 45.0,
                "gas": 600.0,
                "light": 200.0,
                "sound": 45.0
            }))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], true);
        assert_eq!(body["buffer_size"], 1);
        assert_eq!(body["reading"]["occupancy"], 12);
        assert_eq!(body["reading"]["high_engagement"], 10);
        assert_eq!(body["reading"]["low_engagement"], 2);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_forecast_lifecycle() {
        let dir = TempDir::new().unwrap();
        let (addr, shutdown_tx) = start_with_models(&dir).await;
        let client = reqwest::Client::new();

        for minute in 0..5 {
            let response = client
                .post(format!("http://{}/api/readings", addr))
                .json(&reading_body(minute))
                .send()
                .await
                .expect("Failed to send request");
            assert!(response.status().is_success());
        }

        // Not enough history yet: a normal answer, not a server error
        let response = client
            .get(format!("http://{}/api/prediction/forecast", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INSUFFICIENT_DATA");
        assert_eq!(body["readings_available"], 5);
        assert_eq!(body["readings_needed"], 11);

        for minute in 5..15 {
            client
                .post(format!("http://{}/api/readings", addr))
                .json(&reading_body(minute))
                .send()
                .await
                .expect("Failed to send request");
        }

        let response = client
            .get(format!("http://{}/api/prediction/status", addr))
            .send()
            .await
            .expect("Failed to send request");
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["models_loaded"], true);
        assert_eq!(body["ready"], true);
        assert_eq!(body["memory_buffer"]["buffer_size"], 15);
        assert_eq!(body["current_conditions"]["environmental_score"], 90.0);

        let response = client
            .get(format!("http://{}/api/prediction/forecast", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], true);
        assert_eq!(body["predicted"]["temperature"], 23.0);
        assert_eq!(body["comfort"]["level"], "Acceptable");
        assert_eq!(body["data_points_used"], 15);
        assert!(body["forecast_id"].as_str().is_some());

        let response = client
            .get(format!("http://{}/api/alerts/check", addr))
            .send()
            .await
            .expect("Failed to send request");
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], true);
        let ids: Vec<&str> = body["alerts"]
            .as_array()
            .expect("alerts array")
            .iter()
            .filter_map(|a| a["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["sensor_light_low"]);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (addr, shutdown_tx) = start_degraded().await;

        // Send OPTIONS request to check CORS
        let client = reqwest::Client::new();
        let response = client
            .request(
                reqwest::Method::OPTIONS,
                format!("http://{}/api/readings", addr),
            )
            .header("Origin", "http://localhost")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("Failed to send request");

        // CORS preflight should succeed
        assert!(
            response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
            "CORS preflight failed: {}",
            response.status()
        );

        let _ = shutdown_tx.send(());
    }
}
