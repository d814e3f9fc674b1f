use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{expenses, participants, settlement, statistics, trips, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/trip", post(trips::trip_new).get(trips::get))
        .route("/trip/{trip_id}", axum::routing::delete(trips::delete))
        .route(
            "/trip/{trip_id}/participants",
            get(participants::list).post(participants::add),
        )
        .route(
            "/trip/{trip_id}/participants/{participant_id}",
            axum::routing::delete(participants::remove),
        )
        .route("/expense", post(expenses::expense_new))
        .route("/expenses", get(expenses::list))
        .route(
            "/expenses/{id}",
            axum::routing::patch(expenses::update).delete(expenses::delete),
        )
        .route("/settlement", get(settlement::get))
        .route("/stats", get(statistics::get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let backend = db.get_database_backend();
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec!["alice".into(), "password".into()],
        ))
        .await
        .unwrap();

        let engine = Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn authed(method: &str, uri: &str, body: Value) -> HttpRequest<Body> {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode("alice:password");
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Basic {credentials}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_credentials() {
        let app = test_router().await;
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/trip")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"id": "nope"}).to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn settles_a_trip_end_to_end() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(authed("POST", "/trip", json!({"name": "Weekend"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let trip_id = json_body(response).await["id"]
            .as_str()
            .unwrap()
            .to_string();

        for name in ["Alice", "Bob"] {
            let response = app
                .clone()
                .oneshot(authed(
                    "POST",
                    &format!("/trip/{trip_id}/participants"),
                    json!({"name": name}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                "/expense",
                json!({
                    "trip_id": trip_id,
                    "title": "Dinner",
                    "amount_minor": 100_00,
                    "payer": "Alice",
                    "category": "food",
                    "split": {"mode": "equal", "sharers": ["Alice", "Bob"]},
                    "occurred_at": "2026-02-10T20:00:00+01:00",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(authed("GET", "/settlement", json!({"trip_id": trip_id})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total_spent_minor"], 100_00);
        assert_eq!(
            body["payments"],
            json!([{"from": "Bob", "to": "Alice", "amount_minor": 50_00}])
        );
    }

    #[tokio::test]
    async fn unknown_trip_is_not_found() {
        let app = test_router().await;
        let response = app
            .oneshot(authed("GET", "/settlement", json!({"trip_id": "missing"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_equal_split_is_unprocessable() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(authed("POST", "/trip", json!({"name": "Weekend"})))
            .await
            .unwrap();
        let trip_id = json_body(response).await["id"]
            .as_str()
            .unwrap()
            .to_string();
        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                &format!("/trip/{trip_id}/participants"),
                json!({"name": "Alice"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                "/expense",
                json!({
                    "trip_id": trip_id,
                    "title": "Dinner",
                    "amount_minor": 100_00,
                    "payer": "Alice",
                    "category": null,
                    "split": {"mode": "equal", "sharers": []},
                    "occurred_at": "2026-02-10T20:00:00+01:00",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
