use erp_service::config::{ErpConfig, MongoConfig, NumberingConfig, TotalsConfig};
use erp_service::models::LineDiscountMode;
use erp_service::services::{ErpDb, SequenceStrategy};
use erp_service::startup::Application;
use mongodb::bson::oid::ObjectId;
use service_core::config::Config as CoreConfig;

pub struct TestApp {
    pub http_address: String,
    pub db: ErpDb,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(SequenceStrategy::Counter, LineDiscountMode::Ignore).await
    }

    pub async fn spawn_with(strategy: SequenceStrategy, line_discount: LineDiscountMode) -> Self {
        // Use random port and a throwaway database per test
        let config = ErpConfig {
            common: CoreConfig {
                port: 0,
                log_level: "info".to_string(),
            },
            mongodb: MongoConfig {
                uri: std::env::var("TEST_MONGODB_URI")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                database: format!("erp_test_{}", ObjectId::new().to_hex()),
            },
            numbering: NumberingConfig {
                strategy: strategy.as_str().to_string(),
            },
            totals: TotalsConfig {
                sales_line_discount: line_discount.as_str().to_string(),
            },
            otlp_endpoint: None,
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped(std::future::pending()).await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", http_port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address: format!("http://127.0.0.1:{}", http_port),
            db,
        }
    }
}
