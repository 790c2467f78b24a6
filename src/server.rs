use rmcp::{
    ServerHandler,
    tool,
    model::{
        ServerCapabilities, Implementation, ProtocolVersion, CallToolResult,
        RawResource, ListResourcesResult, ReadResourceResult, ResourceContents,
        ReadResourceRequestParams, AnnotateAble,
    },
    handler::server::wrapper::Parameters,
    service::{RequestContext, RoleServer},
    ErrorData as McpError,
};
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::collaborative::{NewInteraction, SIMILAR_USERS_TOP_K};
use crate::errors::MunchiesError;
use crate::preferences::Preferences;
use crate::ranker::{format_recommendations, HybridRanker, Recommendation, RecommendationRequest};

const CATALOG_URI: &str = "munchies://catalog";

pub struct MunchiesService {
    /// `None` when the engine failed to start; every tool then answers 503.
    engine: Option<Arc<HybridRanker>>,
    start_time: Instant,
}

impl MunchiesService {
    pub fn new(engine: Option<Arc<HybridRanker>>) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
        }
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn engine(&self) -> Result<&Arc<HybridRanker>, CallToolResult> {
        self.engine
            .as_ref()
            .ok_or_else(|| engine_error_to_result(MunchiesError::Unavailable))
    }
}

// Parameter structs

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationParams {
    /// Current mood: happy, sad, stressed, adventurous, relaxed, celebratory
    pub mood: String,
    /// Occasion: casual meal, celebration, quick bite, date night, family dinner
    pub occasion: String,
    /// Preferred cuisine, or "any"
    pub cuisine: String,
    /// vegetarian, vegan, gluten-free or non-vegetarian
    pub dietary_preference: String,
    /// breakfast, brunch, lunch, dinner or snack
    pub time: String,
    /// Where the user is (optional)
    pub location: Option<String>,
    /// Free-text notes such as "somewhere quiet and not too pricey" (optional)
    pub additional_notes: Option<String>,
    /// Enables collaborative recommendations from similar users (optional)
    pub user_id: Option<String>,
    /// Free-text query; extracted intent overrides the fields above (optional)
    pub search_query: Option<String>,
    /// Ask the AI provider for new restaurants matching the query (default: true)
    pub use_ai_fetch: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Natural language query, e.g. "cheap tacos for a quick lunch" (required)
    pub query: String,
    /// Location hint passed to the AI provider (optional)
    pub location: Option<String>,
    /// User id for collaborative recommendations (optional)
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackInteractionParams {
    /// User id (required)
    pub user_id: String,
    /// Restaurant id (required)
    pub restaurant_id: i64,
    /// Rating 0-5, clamped (optional)
    pub rating: Option<f64>,
    /// The user clicked the recommendation (default: false)
    pub clicked: Option<bool>,
    /// The user viewed the recommendation (default: false)
    pub viewed: Option<bool>,
}

fn request_span(tool: &'static str) -> tracing::Span {
    tracing::info_span!("tool_call", tool, request_id = %Uuid::new_v4())
}

// Helper: convert MunchiesError to CallToolResult with isError: true
fn engine_error_to_result(err: MunchiesError) -> CallToolResult {
    let status = err.status_code();
    match err {
        MunchiesError::Validation { message, field } => {
            let mut obj = json!({
                "isError": true,
                "status": status,
                "error": message,
            });
            if let Some(f) = field {
                obj["field"] = json!(f);
            }
            CallToolResult::structured_error(obj)
        }
        MunchiesError::Unavailable => CallToolResult::structured_error(json!({
            "isError": true,
            "status": status,
            "error": err.to_string(),
            "hint": "Check that the restaurant catalog exists and restart the server"
        })),
        other => CallToolResult::structured_error(json!({
            "isError": true,
            "status": status,
            "error": other.to_string()
        })),
    }
}

fn recommendation_response(rec: &Recommendation, mood: &str, occasion: &str) -> serde_json::Value {
    let items = format_recommendations(&rec.ranked, mood, occasion);
    json!({
        "recommendations": items,
        "count": items.len(),
        "preferences": rec.preferences,
        "extractedPreferences": rec.extracted,
        "fetchedNew": rec.fetched_new,
    })
}

// Tool implementations
#[rmcp::tool_router]
impl MunchiesService {
    #[tool(description = "Recommend up to 9 restaurants for a mood, occasion, cuisine, dietary preference and time of day. Optionally blends in a free-text query, similar users' history and AI-fetched restaurants.")]
    async fn get_recommendations(
        &self,
        Parameters(params): Parameters<RecommendationParams>,
    ) -> Result<CallToolResult, McpError> {
        async move {
            tracing::info!(
                mood = %params.mood,
                occasion = %params.occasion,
                cuisine = %params.cuisine,
                has_query = params.search_query.is_some(),
                has_user = params.user_id.is_some(),
                "Tool called"
            );

            let engine = match self.engine() {
                Ok(engine) => engine,
                Err(result) => return Ok(result),
            };

            for (field, value) in [
                ("mood", &params.mood),
                ("occasion", &params.occasion),
                ("cuisine", &params.cuisine),
                ("dietaryPreference", &params.dietary_preference),
                ("time", &params.time),
            ] {
                if value.trim().is_empty() {
                    return Ok(engine_error_to_result(MunchiesError::validation(
                        field,
                        &format!("Field '{}' is required and cannot be empty", field),
                    )));
                }
            }

            let request = RecommendationRequest {
                preferences: Preferences {
                    mood: params.mood.clone(),
                    occasion: params.occasion.clone(),
                    cuisine: params.cuisine,
                    dietary_preference: params.dietary_preference,
                    time: params.time,
                    location: params.location.filter(|l| !l.trim().is_empty()),
                    additional_notes: params.additional_notes,
                },
                user_id: params.user_id,
                search_query: params.search_query,
                use_ai_fetch: params.use_ai_fetch.unwrap_or(true),
            };

            let rec = engine.recommend(&request).await;
            // Reasons quote the caller's own mood and occasion
            Ok(CallToolResult::structured(recommendation_response(&rec, &params.mood, &params.occasion)))
        }
        .instrument(request_span("get_recommendations"))
        .await
    }

    #[tool(description = "Search restaurants with a natural language query. Preferences are inferred from the query and AI enrichment is always attempted.")]
    async fn search_restaurants(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        async move {
            tracing::info!(query = %params.query, "Tool called");

            let engine = match self.engine() {
                Ok(engine) => engine,
                Err(result) => return Ok(result),
            };

            match engine.search(&params.query, params.location, params.user_id).await {
                Ok(rec) => {
                    let (mood, occasion) = rec
                        .extracted
                        .as_ref()
                        .map(|e| (e.mood.clone().unwrap_or_default(), e.occasion.clone().unwrap_or_default()))
                        .unwrap_or_default();
                    let mut response = recommendation_response(&rec, &mood, &occasion);
                    response["query"] = json!(params.query);
                    Ok(CallToolResult::structured(response))
                }
                Err(e) => Ok(engine_error_to_result(e)),
            }
        }
        .instrument(request_span("search_restaurants"))
        .await
    }

    #[tool(description = "Record a user interaction (rating, click, view) with a restaurant. Feeds collaborative recommendations.")]
    async fn track_interaction(
        &self,
        Parameters(params): Parameters<TrackInteractionParams>,
    ) -> Result<CallToolResult, McpError> {
        async move {
            tracing::info!(
                user_id = %params.user_id,
                restaurant_id = params.restaurant_id,
                rating = ?params.rating,
                "Tool called"
            );

            let engine = match self.engine() {
                Ok(engine) => engine,
                Err(result) => return Ok(result),
            };

            let input = NewInteraction {
                user_id: params.user_id,
                restaurant_id: params.restaurant_id,
                rating: params.rating,
                clicked: params.clicked.unwrap_or(false),
                viewed: params.viewed.unwrap_or(false),
            };

            match engine.track_interaction(input).await {
                Ok(interaction) => {
                    let similar_users: Vec<serde_json::Value> = engine
                        .similar_users(&interaction.user_id, SIMILAR_USERS_TOP_K)
                        .await
                        .into_iter()
                        .map(|(user_id, similarity)| json!({"userId": user_id, "similarity": similarity}))
                        .collect();
                    Ok(CallToolResult::structured(json!({
                        "status": "success",
                        "message": "Interaction tracked",
                        "interaction": interaction,
                        "similarUsers": similar_users,
                    })))
                }
                Err(e) => Ok(engine_error_to_result(e)),
            }
        }
        .instrument(request_span("track_interaction"))
        .await
    }

    #[tool(description = "Check server health: engine status, catalog size, interactions and AI provider")]
    async fn health_check(
        &self,
    ) -> Result<CallToolResult, McpError> {
        async move {
            tracing::info!("Tool called");

            let mut response = json!({
                "status": "healthy",
                "engine_loaded": self.engine.is_some(),
                "api_status": "running",
                "version": env!("CARGO_PKG_VERSION"),
                "uptime_seconds": self.uptime_seconds(),
            });
            if let Some(engine) = &self.engine {
                response["engine"] = json!(engine.status().await);
            }

            Ok(CallToolResult::structured(response))
        }
        .instrument(request_span("health_check"))
        .await
    }
}

// ServerHandler implementation
#[rmcp::tool_handler(router = Self::tool_router())]
impl ServerHandler for MunchiesService {
    fn get_info(&self) -> rmcp::model::InitializeResult {
        rmcp::model::InitializeResult {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "munchies".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("Mood-aware hybrid restaurant recommendations".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Restaurant recommender. Tools: get_recommendations, search_restaurants, track_interaction, health_check. Resources: munchies://catalog (restaurants currently known).".to_string()
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            meta: None,
            resources: vec![
                RawResource {
                    uri: CATALOG_URI.to_string(),
                    name: "catalog".to_string(),
                    title: Some("Restaurant Catalog".to_string()),
                    description: Some("Base and AI-fetched restaurants with ids".to_string()),
                    mime_type: Some("text/plain".to_string()),
                    size: None,
                    icons: None,
                    meta: None,
                }
                .no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if request.uri != CATALOG_URI {
            return Err(McpError::resource_not_found(
                format!("Resource not found: {}", request.uri),
                None,
            ));
        }
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| McpError::internal_error(MunchiesError::Unavailable.to_string(), None))?;

        let snapshot = engine.snapshot().await;
        let text = snapshot
            .restaurants
            .iter()
            .map(|r| {
                format!(
                    "[{}] {} | {} | {} | {}",
                    r.id, r.restaurant_name, r.cuisine, r.price_range, r.location
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}
