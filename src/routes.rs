use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, guard, http::Method, web};
use serde_json::json;

use crate::error::GpioError;
use crate::gpio::{GpioManager, SysfsBackend};

pub struct AppState<B: SysfsBackend> {
    pub manager: Arc<GpioManager<B>>,
}

impl<B: SysfsBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<B: SysfsBackend> AppState<B> {
    pub fn api_scope(&self, base_path: &str) -> actix_web::Scope {
        web::scope(base_path)
            .service(
                web::resource("/pins")
                    .route(web::get().to(list_pins::<B>))
                    .route(not_allowed(&[Method::GET])),
            )
            .service(
                web::resource("/pin/{pin}")
                    .route(web::get().to(pin_descriptor::<B>))
                    .route(not_allowed(&[Method::GET])),
            )
            .service(
                web::resource("/pin/{pin}/init")
                    .route(web::post().to(initialize::<B>))
                    .route(not_allowed(&[Method::POST])),
            )
            .service(
                web::resource("/pin/{pin}/on")
                    .route(web::get().to(is_on::<B>))
                    .route(web::post().to(turn_on::<B>))
                    .route(not_allowed(&[Method::GET, Method::POST])),
            )
            .service(
                web::resource("/pin/{pin}/off")
                    .route(web::post().to(turn_off::<B>))
                    .route(not_allowed(&[Method::POST])),
            )
            .service(
                web::resource("/pin/{pin}/value")
                    .route(web::get().to(read_value::<B>))
                    .route(not_allowed(&[Method::GET])),
            )
            .service(
                web::resource("/pin/{pin}/unexport")
                    .route(web::post().to(unexport::<B>))
                    .route(not_allowed(&[Method::POST])),
            )
    }
}

async fn list_pins<B: SysfsBackend>(
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pins = state.manager.list_pins().await;

    Ok(web::Json(pins))
}

async fn pin_descriptor<B: SysfsBackend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pin = parse_pin(&req)?;
    let desc = state.manager.get_pin_descriptor(pin).await?;

    Ok(web::Json(desc))
}

async fn initialize<B: SysfsBackend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pin = parse_pin(&req)?;
    let desc = state.manager.initialize(pin).await?;

    Ok(web::Json(desc))
}

async fn turn_on<B: SysfsBackend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pin = parse_pin(&req)?;
    let ok = state.manager.turn_on(pin).await?;

    Ok(web::Json(json!({ "ok": ok })))
}

async fn turn_off<B: SysfsBackend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pin = parse_pin(&req)?;
    let ok = state.manager.turn_off(pin).await?;

    Ok(web::Json(json!({ "ok": ok })))
}

async fn is_on<B: SysfsBackend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pin = parse_pin(&req)?;
    let on = state.manager.is_on(pin).await?;

    Ok(web::Json(json!({ "on": on })))
}

async fn read_value<B: SysfsBackend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pin = parse_pin(&req)?;
    let value = state.manager.read_value(pin).await?;

    Ok(web::Json(json!({ "value": value })))
}

async fn unexport<B: SysfsBackend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, GpioError> {
    let pin = parse_pin(&req)?;
    let ok = state.manager.unexport(pin).await?;

    Ok(web::Json(json!({ "ok": ok })))
}

fn parse_pin(req: &HttpRequest) -> Result<u32, GpioError> {
    let pin = req
        .match_info()
        .get("pin")
        .ok_or_else(|| GpioError::InvalidValue("Missing pin number".into()))?;
    let pin = pin
        .parse::<u32>()
        .map_err(|_| GpioError::InvalidValue("Invalid pin number".into()))?;

    Ok(pin)
}

fn not_allowed(methods: &[Method]) -> actix_web::Route {
    web::route()
        .guard(guard_not_methods(methods))
        .to(method_not_allowed)
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

fn guard_not_methods(methods: &[Method]) -> impl guard::Guard + use<> {
    let allowed: Vec<Method> = methods.to_vec();
    guard::fn_guard(move |ctx| !allowed.iter().any(|m| m == ctx.head().method))
}
