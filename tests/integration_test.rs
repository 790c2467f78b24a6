use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::io::{Write, BufRead, BufReader};
use std::sync::mpsc::{channel, Sender, Receiver};
use std::thread;
use std::time::Duration;
use serde_json::{json, Value};

/// Fresh data directory under the system temp dir, removed on drop.
struct DataDir {
    path: PathBuf,
}

impl DataDir {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("munchies-it-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).expect("Failed to create temp data dir");
        DataDir { path }
    }

    /// Data dir holding a small base catalog.
    fn seeded() -> Self {
        let dir = Self::new();
        let catalog = json!({
            "restaurants": [
                {
                    "id": 1,
                    "restaurantName": "Luigi's Trattoria",
                    "cuisine": "italian",
                    "location": "Springfield",
                    "address": "1 Main St",
                    "contactDetails": "555-0101",
                    "popularDishes": ["Lasagna", "Tiramisu"],
                    "dietaryOptions": ["vegetarian"],
                    "priceRange": "moderate",
                    "ambiance": "warm and romantic",
                    "moodScores": {"happy": 0.9, "celebratory": 0.8},
                    "occasionScores": {"celebration": 0.85, "date night": 0.9},
                    "timeScores": {"dinner": 0.9}
                },
                {
                    "id": 2,
                    "restaurantName": "Taco Town",
                    "cuisine": "mexican",
                    "location": "Springfield",
                    "address": "2 Main St",
                    "contactDetails": "555-0102",
                    "popularDishes": ["Al Pastor Tacos"],
                    "dietaryOptions": ["non-vegetarian"],
                    "priceRange": "affordable",
                    "ambiance": "lively and casual",
                    "moodScores": {"happy": 0.8},
                    "occasionScores": {"quick bite": 0.9, "casual meal": 0.8},
                    "timeScores": {"lunch": 0.9}
                },
                {
                    "id": 3,
                    "restaurantName": "Curry House",
                    "cuisine": "indian",
                    "location": "Springfield",
                    "address": "3 Main St",
                    "popularDishes": ["Paneer Tikka"],
                    "dietaryOptions": ["vegetarian", "vegan"],
                    "priceRange": "affordable",
                    "ambiance": "cozy family friendly",
                    "moodScores": {"relaxed": 0.8},
                    "occasionScores": {"family dinner": 0.9},
                    "timeScores": {"dinner": 0.8}
                }
            ],
            "metadata": {}
        });
        std::fs::write(dir.path.join("restaurants.json"), catalog.to_string()).expect("Failed to write catalog");
        dir
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Helper struct to manage server process with async I/O
struct McpClient {
    child: std::process::Child,
    tx: Sender<Value>,
    rx: Receiver<Value>,
}

impl McpClient {
    fn spawn(data_dir: &Path) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_munchies"))
            .current_dir(data_dir)
            .env("MUNCHIES_DATA_DIR", data_dir)
            .env("MUNCHIES_ENRICHMENT__ENABLED", "false")
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())  // Suppress log output in tests
            .spawn()
            .expect("Failed to spawn munchies binary");

        let mut stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = child.stdout.take().expect("Failed to get stdout");

        // Channel for sending requests
        let (req_tx, req_rx) = channel::<Value>();

        // Channel for receiving responses
        let (resp_tx, resp_rx) = channel::<Value>();

        // Thread to write requests to stdin
        thread::spawn(move || {
            while let Ok(request) = req_rx.recv() {
                let request_str = serde_json::to_string(&request).expect("Failed to serialize");
                if writeln!(stdin, "{}", request_str).is_err() {
                    break;
                }
                if stdin.flush().is_err() {
                    break;
                }
            }
        });

        // Thread to read responses from stdout
        thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        if let Ok(value) = serde_json::from_str::<Value>(&line) {
                            if resp_tx.send(value).is_err() {
                                break;
                            }
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        McpClient {
            child,
            tx: req_tx,
            rx: resp_rx,
        }
    }

    /// Spawn and complete the initialize handshake.
    fn ready(data_dir: &Path) -> Self {
        let client = Self::spawn(data_dir);
        client
            .send_request(json!({
                "jsonrpc": "2.0",
                "method": "initialize",
                "id": 1,
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test", "version": "1.0"}
                }
            }))
            .expect("Failed to initialize");
        client.send_notification(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }));
        client
    }

    fn send_request(&self, request: Value) -> Option<Value> {
        self.tx.send(request).ok()?;
        self.rx.recv_timeout(Duration::from_secs(5)).ok()
    }

    fn send_notification(&self, notification: Value) {
        let _ = self.tx.send(notification);
        // Notifications don't have responses, give server time to process
        thread::sleep(Duration::from_millis(50));
    }

    fn call_tool(&self, id: u64, name: &str, arguments: Value) -> Value {
        let response = self
            .send_request(json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "id": id,
                "params": {"name": name, "arguments": arguments}
            }))
            .unwrap_or_else(|| panic!("No response from {}", name));
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], id);
        assert!(response["result"].is_object(), "Unexpected response: {}", response);
        response["result"].clone()
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn italian_dinner() -> Value {
    json!({
        "mood": "happy",
        "occasion": "celebration",
        "cuisine": "italian",
        "dietaryPreference": "vegetarian",
        "time": "dinner",
        "location": "Springfield"
    })
}

#[test]
fn test_initialize_handshake() {
    let dir = DataDir::seeded();
    let client = McpClient::spawn(dir.path());

    let response = client.send_request(json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "id": 1,
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }))
    .expect("Failed to get initialize response");

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);

    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert!(result["capabilities"]["tools"].is_object());
    assert_eq!(result["serverInfo"]["name"], "munchies");
    assert!(result["serverInfo"]["version"].is_string());
    assert!(result["serverInfo"]["description"].is_string());

    client.send_notification(json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }));
}

#[test]
fn test_tool_discovery() {
    let dir = DataDir::seeded();
    let client = McpClient::ready(dir.path());

    let response = client
        .send_request(json!({
            "jsonrpc": "2.0",
            "method": "tools/list",
            "id": 2
        }))
        .expect("Failed to get tools/list response");

    let tools = response["result"]["tools"].as_array().expect("tools should be an array");
    assert_eq!(tools.len(), 4, "Should have exactly 4 tools");

    let tool_names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in ["get_recommendations", "search_restaurants", "track_interaction", "health_check"] {
        assert!(tool_names.contains(&expected), "missing tool {}", expected);
    }

    for tool in tools {
        assert!(tool["description"].is_string());
        assert!(tool["inputSchema"].is_object());
    }
}

#[test]
fn test_get_recommendations() {
    let dir = DataDir::seeded();
    let client = McpClient::ready(dir.path());

    let result = client.call_tool(2, "get_recommendations", italian_dinner());
    assert!(result["isError"].is_null() || result["isError"] == false);

    let content = &result["structuredContent"];
    let recs = content["recommendations"].as_array().expect("recommendations array");
    // Taco Town is not vegetarian
    assert!(recs.iter().all(|r| r["restaurantName"] != "Taco Town"));

    let top = &recs[0];
    assert_eq!(top["restaurantName"], "Luigi's Trattoria");
    assert_eq!(top["foodSuggestion"], "Lasagna");
    assert_eq!(top["contactDetails"], "555-0101");
    let reason = top["reasonForRecommendation"].as_str().unwrap();
    assert!(reason.contains("perfect for your happy mood"), "reason: {}", reason);
    assert!(reason.ends_with('.'));
}

#[test]
fn test_get_recommendations_validation_error() {
    let dir = DataDir::seeded();
    let client = McpClient::ready(dir.path());

    let mut args = italian_dinner();
    args["mood"] = json!("  ");
    let result = client.call_tool(2, "get_recommendations", args);
    assert_eq!(result["isError"], true, "Should have isError: true");

    let content_arr = result["content"].as_array().expect("content should be array");
    let error_text = content_arr[0]["text"].as_str().expect("should have error text");
    assert!(error_text.contains("mood"), "Error message should mention 'mood': {}", error_text);
}

#[test]
fn test_search_restaurants() {
    let dir = DataDir::seeded();
    let client = McpClient::ready(dir.path());

    let result = client.call_tool(2, "search_restaurants", json!({"query": "cheap tacos"}));
    assert!(result["isError"].is_null() || result["isError"] == false);

    let content = &result["structuredContent"];
    assert_eq!(content["query"], "cheap tacos");
    assert_eq!(content["extractedPreferences"]["cuisine"], "mexican");
    let recs = content["recommendations"].as_array().unwrap();
    assert_eq!(recs[0]["restaurantName"], "Taco Town");
}

#[test]
fn test_track_interaction_persists() {
    let dir = DataDir::seeded();
    let client = McpClient::ready(dir.path());

    let result = client.call_tool(
        2,
        "track_interaction",
        json!({"userId": "alice", "restaurantId": 2, "rating": 9, "clicked": true}),
    );
    let content = &result["structuredContent"];
    assert_eq!(content["status"], "success");
    assert_eq!(content["message"], "Interaction tracked");
    assert_eq!(content["interaction"]["rating"], 5.0);

    let saved = std::fs::read_to_string(dir.path().join("user_interactions.json")).expect("interaction log written");
    let log: Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(log["interactions"][0]["userId"], "alice");
    assert_eq!(content["similarUsers"].as_array().map(Vec::len), Some(0));

    let second = client.call_tool(
        4,
        "track_interaction",
        json!({"userId": "bob", "restaurantId": 2, "rating": 4}),
    );
    let neighbours = second["structuredContent"]["similarUsers"].as_array().expect("similarUsers array");
    assert_eq!(neighbours[0]["userId"], "alice");
    assert!(neighbours[0]["similarity"].as_f64().unwrap() > 0.99);

    let rejected = client.call_tool(3, "track_interaction", json!({"userId": "", "restaurantId": 2}));
    assert_eq!(rejected["isError"], true);
}

#[test]
fn test_health_check() {
    let dir = DataDir::seeded();
    let client = McpClient::ready(dir.path());

    let result = client.call_tool(2, "health_check", json!({}));
    assert!(result["isError"].is_null() || result["isError"] == false);

    let health = &result["structuredContent"];
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["engine_loaded"], true);
    assert_eq!(health["api_status"], "running");
    assert!(health["uptime_seconds"].is_number());
    assert_eq!(health["engine"]["restaurants"], 3);
    assert!(health["engine"]["aiProvider"].is_null());
}

#[test]
fn test_missing_catalog_reports_unavailable() {
    let dir = DataDir::new();
    let client = McpClient::ready(dir.path());

    let health = client.call_tool(2, "health_check", json!({}));
    assert_eq!(health["structuredContent"]["engine_loaded"], false);

    let result = client.call_tool(3, "get_recommendations", italian_dinner());
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["status"], 503);
    assert_eq!(result["structuredContent"]["error"], "Recommendation engine is not available");
}
