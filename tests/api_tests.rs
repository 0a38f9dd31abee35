use std::sync::Arc;

use actix_web::{App, test, web};
use serde_json::Value;
use sysgpio::{AppConfig, AppState, GpioManager, MockBackend};

fn sample_config() -> AppConfig {
    AppConfig::from_json(
        r#"
        {
            "http": {
                "host": "localhost:8080",
                "path": "/api/v1"
            },
            "sysfs": {
                "backend": "mock"
            },
            "pins": {
                "24": {
                    "name": "LED B",
                    "direction": "out"
                },
                "33": {
                    "name": "BUTTON K",
                    "direction": "in"
                }
            }
        }
        "#,
    )
    .expect("valid sample config")
}

fn app_state(cfg: &AppConfig, backend: Arc<MockBackend>) -> AppState<MockBackend> {
    let manager = Arc::new(GpioManager::new(cfg, backend).expect("manager"));
    AppState { manager }
}

#[actix_rt::test]
async fn list_pins_returns_all() {
    let cfg = sample_config();
    let state = app_state(&cfg, Arc::new(MockBackend::default()));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/pins").to_request();
    let response: Value = test::call_and_read_body_json(&app, req).await;

    let pins = response.as_object().expect("object");
    assert_eq!(pins.len(), 2);
    let led = &response["24"];
    assert_eq!(led["name"], "LED B");
    assert_eq!(led["logical"], 12);
    assert_eq!(led["direction"], "out");
    assert_eq!(led["state"], "created");
    assert_eq!(led["reported_direction"], Value::Null);
    assert_eq!(response["33"]["logical"], 28);
    assert_eq!(response["33"]["direction"], "in");
}

#[actix_rt::test]
async fn unknown_pin_returns_404() {
    let cfg = sample_config();
    let state = app_state(&cfg, Arc::new(MockBackend::default()));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/pin/25").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get().uri("/api/v1/pin/led").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn wrong_method_returns_405() {
    let cfg = sample_config();
    let state = app_state(&cfg, Arc::new(MockBackend::default()));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/pin/24/init")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 405);

    let req = test::TestRequest::delete()
        .uri("/api/v1/pin/24/on")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 405);
}

#[actix_rt::test]
async fn init_and_switch_output_pin() {
    let cfg = sample_config();
    let backend = Arc::new(MockBackend::default());
    let state = app_state(&cfg, backend.clone());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/24/init")
        .to_request();
    let desc: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(desc["state"], "ready");
    assert_eq!(desc["reported_direction"], "out");
    assert!(backend.is_exported(12));

    let req = test::TestRequest::post().uri("/api/v1/pin/24/on").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["ok"], true);

    let req = test::TestRequest::get().uri("/api/v1/pin/24/on").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["on"], true);

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/24/off")
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["ok"], true);

    let req = test::TestRequest::get().uri("/api/v1/pin/24/on").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["on"], false);
}

#[actix_rt::test]
async fn read_value_on_output_pin_is_rejected() {
    let cfg = sample_config();
    let backend = Arc::new(MockBackend::default());
    let state = app_state(&cfg, backend.clone());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/24/init")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let ops_before = backend.ops().len();
    let req = test::TestRequest::get()
        .uri("/api/v1/pin/24/value")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(backend.ops().len(), ops_before);
}

#[actix_rt::test]
async fn read_input_pin_value() {
    let cfg = sample_config();
    let backend = Arc::new(MockBackend::default());
    let state = app_state(&cfg, backend.clone());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/33/init")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    backend.set_attr(backend.layout().value_path(28), "1");
    let req = test::TestRequest::get()
        .uri("/api/v1/pin/33/value")
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["value"], "1");

    let req = test::TestRequest::post().uri("/api/v1/pin/33/on").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn export_failure_returns_500_and_pin_stays_created() {
    let cfg = sample_config();
    let backend = Arc::new(MockBackend::default());
    backend.fail_on(backend.layout().export_path());
    let state = app_state(&cfg, backend.clone());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/24/init")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Pin 12 could not be exported");

    let req = test::TestRequest::get().uri("/api/v1/pin/24").to_request();
    let desc: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(desc["state"], "created");
}

#[actix_rt::test]
async fn released_pin_reports_soft_failures() {
    let cfg = sample_config();
    let backend = Arc::new(MockBackend::default());
    let state = app_state(&cfg, backend.clone());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(state.api_scope(&cfg.http.path)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/24/init")
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/24/unexport")
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["ok"], true);
    assert!(!backend.is_exported(12));

    let req = test::TestRequest::post().uri("/api/v1/pin/24/on").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["ok"], false);

    let req = test::TestRequest::post()
        .uri("/api/v1/pin/24/init")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn release_all_unexports_live_pins() {
    let cfg = sample_config();
    let backend = Arc::new(MockBackend::default());
    let manager = GpioManager::new(&cfg, backend.clone()).expect("manager");

    manager.initialize(24).await.expect("init 24");
    manager.initialize(33).await.expect("init 33");
    assert_eq!(manager.release_all().await, 2);
    assert!(!backend.is_exported(12));
    assert!(!backend.is_exported(28));
    assert_eq!(manager.release_all().await, 0);
}
