use actix_web::{web, App, HttpServer, Responder, HttpResponse, middleware::Logger};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use reqwest::Client;
use std::env;
use std::sync::Arc;
use log::{info, error, debug, warn};
use actix_governor::{Governor, GovernorConfigBuilder};

mod analysis;
mod bert;
mod config;
mod error;
mod foursquare;
mod logging;
mod models;
mod pipeline;
mod places;
mod rating;
mod render;
mod sentiment;
mod utils;

#[cfg(test)]
mod test_utils;

use crate::analysis::Analysis;
use crate::config::Config;
use crate::error::SearchError;
use crate::models::{RatingResult, SkippedVenue};
use crate::pipeline::SearchOutcome;
use crate::places::{PlacesSource, SearchQuery};
use crate::render::PageBody;
use crate::sentiment::SentimentModel;

pub struct AppState {
    places: Arc<dyn PlacesSource>,
    model: Arc<dyn SentimentModel>,
    search_radius_m: u32,
    search_limit: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchParams {
    cuisine: String,
    location: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    expected_format: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SearchResponse<'a> {
    query: &'a SearchQuery,
    results: &'a [RatingResult],
    skipped: &'a [SkippedVenue],
    analysis: &'a Analysis,
}

fn expected_format() -> serde_json::Value {
    serde_json::json!({
        "cuisine": "sushi",
        "location": "Boston"
    })
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "message": "Server is running"
    }))
}

async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render::render_page("", "", PageBody::Empty))
}

async fn perform_search(
    request_id: &str,
    params: &SearchParams,
    state: &AppState,
) -> Result<(SearchQuery, SearchOutcome), SearchError> {
    let query = SearchQuery::new(
        &params.cuisine,
        &params.location,
        state.search_radius_m,
        state.search_limit,
    )?;
    debug!("Request {}: Search query: {:?}", request_id, query);

    let outcome = pipeline::run_search(request_id, state.places.as_ref(), state.model.clone(), &query).await?;
    Ok((query, outcome))
}

fn html_page(params: &SearchParams, body: PageBody<'_>) -> String {
    render::render_page(&params.cuisine, &params.location, body)
}

async fn search_page(
    params: web::Query<SearchParams>,
    state: web::Data<AppState>,
) -> impl Responder {
    let request_id = utils::request_id();
    info!("Request {}: Search page for '{}' near '{}'", request_id, params.cuisine, params.location);

    match perform_search(&request_id, &params, &state).await {
        Ok((_, outcome)) => {
            let analysis = analysis::analyze(&outcome.results);
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(html_page(&params, PageBody::Results {
                    results: &outcome.results,
                    skipped: &outcome.skipped,
                    analysis: &analysis,
                }))
        }
        Err(SearchError::EmptyResult) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html_page(&params, PageBody::Message {
                title: "No restaurants found",
                detail: "Try another cuisine or a nearby location.",
            })),
        Err(SearchError::InvalidInput(msg)) => {
            warn!("Request {}: {}", request_id, msg);
            HttpResponse::BadRequest()
                .content_type("text/html; charset=utf-8")
                .body(html_page(&params, PageBody::Message {
                    title: "Please check your search",
                    detail: &msg,
                }))
        }
        Err(e) => {
            error!("Request {}: Search failed: {}", request_id, e);
            HttpResponse::BadGateway()
                .content_type("text/html; charset=utf-8")
                .body(html_page(&params, PageBody::Message {
                    title: "Could not reach the places service",
                    detail: &e.to_string(),
                }))
        }
    }
}

async fn api_search(
    params: web::Query<SearchParams>,
    state: web::Data<AppState>,
) -> impl Responder {
    let request_id = utils::request_id();
    info!("Request {}: API search for '{}' near '{}'", request_id, params.cuisine, params.location);

    match perform_search(&request_id, &params, &state).await {
        Ok((query, outcome)) => {
            let analysis = analysis::analyze(&outcome.results);
            HttpResponse::Ok().json(SearchResponse {
                query: &query,
                results: &outcome.results,
                skipped: &outcome.skipped,
                analysis: &analysis,
            })
        }
        Err(SearchError::EmptyResult) => HttpResponse::NotFound().json(ErrorResponse {
            error: "No restaurants found".to_string(),
            expected_format: expected_format(),
        }),
        Err(SearchError::InvalidInput(msg)) => {
            warn!("Request {}: {}", request_id, msg);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: msg,
                expected_format: expected_format(),
            })
        }
        Err(e) => {
            error!("Request {}: Search failed: {}", request_id, e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: format!("Failed to search places: {}", e),
                expected_format: expected_format(),
            })
        }
    }
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/search", web::get().to(search_page))
        .route("/api/search", web::get().to(api_search))
        .route("/health", web::get().to(health_check));
}

fn log_environment_variables() {
    let env_vars = utils::masked_env(env::vars());
    match serde_json::to_string_pretty(&env_vars) {
        Ok(json) => info!("Environment variables: {}", json),
        Err(e) => warn!("Could not serialise environment variables: {}", e),
    }
}

fn startup_error(message: String) -> std::io::Error {
    eprintln!("{}", message);
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env().map_err(|e| startup_error(format!("Invalid configuration: {}", e)))?;

    if let Err(e) = logging::setup_logging(config.log_level) {
        return Err(startup_error(format!("Failed to set up logging: {}", e)));
    }

    log_environment_variables();

    let model_source = config.model.clone();
    let model = web::block(move || bert::BertSentimentModel::load(&model_source))
        .await
        .map_err(|e| startup_error(format!("Model loading task failed: {}", e)))?
        .map_err(|e| {
            error!("Failed to load sentiment model: {}", e);
            startup_error(format!("Failed to load sentiment model: {}", e))
        })?;

    let client = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|e| startup_error(format!("Failed to build HTTP client: {}", e)))?;

    let state = web::Data::new(AppState {
        places: Arc::new(foursquare::FoursquareClient::from_config(client, &config)),
        model: Arc::new(model),
        search_radius_m: config.search_radius_m,
        search_limit: config.search_limit,
    });

    let governor_config = GovernorConfigBuilder::default()
        .per_second(5)
        .burst_size(10)
        .finish()
        .ok_or_else(|| startup_error("Invalid rate limit configuration".to_string()))?;

    info!("Starting Palate server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Governor::new(&governor_config))
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test};
    use crate::test_utils::{init_logging, test_venue, DigitModel, FakePlaces};

    fn state_with(places: FakePlaces) -> web::Data<AppState> {
        web::Data::new(AppState {
            places: Arc::new(places),
            model: Arc::new(DigitModel),
            search_radius_m: 5000,
            search_limit: 10,
        })
    }

    fn sushi_places() -> FakePlaces {
        FakePlaces::new()
            .with_venue(test_venue("b", "Venue B"), &["5 fresh", "4 good", "5 lovely", "4 fine"])
            .with_failing_tips(test_venue("x", "Broken Venue"))
            .with_venue(test_venue("a", "Venue A"), &["5 fresh", "4 good", "5 lovely", "4 fine", "5 yes", "4 ok"])
    }

    #[actix_web::test]
    async fn health_reports_healthy() {
        let app = actix_test::init_service(App::new().configure(configure)).await;
        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
    }

    #[actix_web::test]
    async fn index_renders_search_form() {
        let app = actix_test::init_service(App::new().configure(configure)).await;
        let req = actix_test::TestRequest::get().uri("/").to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<form action=\"/search\""));
    }

    #[actix_web::test]
    async fn api_search_returns_ranked_results() {
        init_logging();
        let app = actix_test::init_service(
            App::new().app_data(state_with(sushi_places())).configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/api/search?cuisine=sushi&location=Boston")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["venue"]["id"], "a");
        assert_eq!(results[0]["rating"]["status"], "rated");
        assert_eq!(results[0]["rating"]["stars"], 4.5);
        assert_eq!(results[0]["review_count"], 6);
        assert_eq!(results[1]["venue"]["id"], "b");
        assert_eq!(body["skipped"][0]["venue_id"], "x");
        assert_eq!(body["query"]["cuisine"], "sushi");
        assert!(body["analysis"]["cuisines"].is_array());
    }

    #[actix_web::test]
    async fn api_search_without_venues_is_not_found() {
        let app = actix_test::init_service(
            App::new().app_data(state_with(FakePlaces::new())).configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/api/search?cuisine=sushi&location=Boston")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "No restaurants found");
    }

    #[actix_web::test]
    async fn api_search_rejects_blank_input() {
        let app = actix_test::init_service(
            App::new().app_data(state_with(FakePlaces::new())).configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/api/search?cuisine=&location=Boston")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["expected_format"]["cuisine"], "sushi");
    }

    #[actix_web::test]
    async fn search_page_shows_no_restaurants_message() {
        let app = actix_test::init_service(
            App::new().app_data(state_with(FakePlaces::new())).configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/search?cuisine=sushi&location=Boston")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = String::from_utf8(actix_test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("No restaurants found"));
        assert!(!html.contains("id=\"map\""));
    }

    #[actix_web::test]
    async fn search_page_reports_unreachable_places_service() {
        let app = actix_test::init_service(
            App::new().app_data(state_with(FakePlaces::failing_search())).configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/search?cuisine=sushi&location=Boston")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let html = String::from_utf8(actix_test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("Could not reach the places service"));
    }

    #[actix_web::test]
    async fn search_page_renders_ranked_list_and_map() {
        let app = actix_test::init_service(
            App::new().app_data(state_with(sushi_places())).configure(configure),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/search?cuisine=sushi&location=Boston")
            .to_request();
        let html = String::from_utf8(actix_test::call_and_read_body(&app, req).await.to_vec()).unwrap();

        let a = html.find("Venue A").unwrap();
        let b = html.find("Venue B").unwrap();
        assert!(a < b);
        assert!(html.contains("id=\"map\""));
        assert!(html.contains("Broken Venue"));
    }
}
