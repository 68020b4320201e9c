use std::{path::PathBuf, str::FromStr};

use advisorhub::{
    AppState,
    auth::{Role, generate_token},
    config::{Config, DatabaseConfig, JwtConfig, ObservabilityConfig, ServerConfig},
    routes::router,
};
use advisorhub_points::{
    Command, PointsConfig, RuleLimits, SaveItemInput, SaveRuleInput, SaveTierInput,
};
use advisorhub_shared::{Metadata, State};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub config: Config,
    pub command: Command,
}

fn config(path: &PathBuf) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        },
        database: DatabaseConfig {
            url: format!("sqlite:{}", path.to_str().unwrap()),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test_secret_key_minimum_32_characters_long".to_owned(),
            issuer: "advisorhub-identity".to_owned(),
            audience: "advisorhub".to_owned(),
            expiration_days: 1,
        },
        observability: ObservabilityConfig::default(),
        points: PointsConfig::default(),
    }
}

pub async fn setup_test_app(path: PathBuf) -> anyhow::Result<TestApp> {
    let config = config(&path);
    let opts = SqliteConnectOptions::from_str(&config.database.url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;
    advisorhub_db::migrate(&pool).await?;

    let command = Command::new(State::from_pool(pool.clone()), config.points.clone());
    seed_catalog(&command).await?;

    let state = AppState {
        config: config.clone(),
        command: command.clone(),
        audit: advisorhub_audit::Query(pool.clone()),
        pool,
    };

    Ok(TestApp {
        router: router(state),
        config,
        command,
    })
}

async fn seed_catalog(command: &Command) -> anyhow::Result<()> {
    let metadata = Metadata::by("seed");

    command
        .save_tier(
            SaveTierInput {
                id: "basic".to_owned(),
                name: "Basic".to_owned(),
                priority: 0,
                points_multiplier: 1.0,
                permissions: Default::default(),
                is_active: true,
                is_default: true,
                is_permanent: false,
            },
            &metadata,
        )
        .await?;

    command
        .save_rule(
            SaveRuleInput {
                id: command.config.rules.daily_login.to_owned(),
                name: "Daily login".to_owned(),
                category: "engagement".to_owned(),
                points: 10,
                limits: RuleLimits {
                    daily_max: Some(10),
                    ..Default::default()
                },
                is_active: true,
                is_system_rule: true,
            },
            &metadata,
        )
        .await?;

    command
        .save_item(
            SaveItemInput {
                id: "report".to_owned(),
                name: "Market report".to_owned(),
                points_cost: 30,
                stock: 10,
                limits: Default::default(),
                is_active: true,
            },
            &metadata,
        )
        .await?;

    Ok(())
}

impl TestApp {
    pub fn token(&self, sub: &str, role: Role) -> String {
        generate_token(&self.config.jwt, sub, None, role).unwrap()
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok((status, json))
    }
}
