//! Integration tests for Atelier.
//!
//! Each test starts three servers on ephemeral ports: an in-memory
//! marketplace backend speaking the RPC gateway protocol, an identity
//! provider that issues a delegation for whatever principal is passed as the
//! authorization code, and the storefront itself wired to both.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use atelier_core::{
    BrandConfig, Category, Item, ItemId, PriceCents, Principal, UserProfile, UserRole,
};
use atelier_storefront::app;
use atelier_storefront::config::{BackendConfig, CacheConfig, IdentityConfig, StorefrontConfig};
use atelier_storefront::state::AppState;

/// Artist principal used across tests.
pub const ALICE: &str = "rdmx6-jaaaa-aaaaa-aaadq-cai";
/// Second member principal.
pub const BOB: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";
/// Administrator principal.
pub const ADMIN: &str = "aaaaa-aa";

/// Anonymous principal seen by the backend for guests.
const ANONYMOUS: &str = "2vxsx-fae";

/// Checkout URL returned by default.
pub const CHECKOUT_URL: &str = "https://checkout.stripe.com/c/pay/cs_test_1";

const DELEGATION_PREFIX: &str = "delegation:";

// =============================================================================
// Fake marketplace backend
// =============================================================================

/// In-memory marketplace state behind the fake backend.
#[derive(Debug)]
pub struct Marketplace {
    pub items: Vec<Item>,
    pub profiles: HashMap<String, UserProfile>,
    pub roles: HashMap<String, UserRole>,
    pub artists: HashSet<String>,
    pub stripe_configured: bool,
    pub brand: BrandConfig,
    /// URL put in checkout session payloads; `None` leaves it out.
    pub checkout_url: Option<String>,
    /// Arguments of every `createCheckoutSession` call.
    pub checkout_requests: Vec<Vec<Value>>,
    /// Reply to `generateItemDescription`.
    pub description_reply: Result<String, String>,
    /// `(method, caller)` for every call received.
    pub calls: Vec<(String, String)>,
}

impl Default for Marketplace {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            profiles: HashMap::new(),
            roles: HashMap::from([(ADMIN.to_string(), UserRole::Admin)]),
            artists: HashSet::new(),
            stripe_configured: false,
            brand: BrandConfig {
                fee_percentage: 10,
                ..BrandConfig::default()
            },
            checkout_url: Some(CHECKOUT_URL.to_string()),
            checkout_requests: Vec::new(),
            description_reply: Err("description generation unavailable".to_string()),
            calls: Vec::new(),
        }
    }
}

fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T, String> {
    let value = args
        .get(index)
        .cloned()
        .ok_or_else(|| format!("missing argument {index}"))?;
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

impl Marketplace {
    /// Store a profile for `principal`.
    pub fn set_profile(&mut self, principal: &str, name: &str) {
        self.profiles.insert(
            principal.to_string(),
            UserProfile {
                name: name.to_string(),
            },
        );
    }

    /// Make `principal` an artist with Stripe configured.
    pub fn make_seller(&mut self, principal: &str) {
        self.artists.insert(principal.to_string());
        self.stripe_configured = true;
    }

    /// Number of calls to `method`.
    #[must_use]
    pub fn count(&self, method: &str) -> usize {
        self.calls.iter().filter(|(m, _)| m == method).count()
    }

    fn is_admin(&self, caller: &str) -> bool {
        self.roles.get(caller) == Some(&UserRole::Admin)
    }

    fn require_user(caller: &str) -> Result<(), String> {
        if caller == ANONYMOUS {
            Err("Unauthorized: only users can perform this action".to_string())
        } else {
            Ok(())
        }
    }

    fn require_admin(&self, caller: &str) -> Result<(), String> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err("Unauthorized: only admins can perform this action".to_string())
        }
    }

    fn handle(&mut self, caller: &str, method: &str, args: &[Value]) -> Result<Value, String> {
        self.calls.push((method.to_string(), caller.to_string()));

        match method {
            "getItems" => to_value(&self.items),
            "getItemsByCategory" => {
                let category: Category = arg(args, 0)?;
                let items: Vec<&Item> = self
                    .items
                    .iter()
                    .filter(|item| item.category == category)
                    .collect();
                to_value(&items)
            }
            "addItem" => {
                Self::require_user(caller)?;
                if !self.artists.contains(caller) {
                    return Err("Only artists can add items".to_string());
                }
                let item: Item = arg(args, 0)?;
                self.items.push(item);
                Ok(Value::Null)
            }
            "updateItem" => {
                let item: Item = arg(args, 0)?;
                let admin = self.is_admin(caller);
                let existing = self
                    .items
                    .iter_mut()
                    .find(|existing| existing.id == item.id)
                    .ok_or("Item not found")?;
                if existing.creator.as_str() != caller && !admin {
                    return Err("Unauthorized: only the creator can update this item".to_string());
                }
                *existing = item;
                Ok(Value::Null)
            }
            "removeItem" => {
                let id: ItemId = arg(args, 0)?;
                let admin = self.is_admin(caller);
                let before = self.items.len();
                self.items
                    .retain(|item| item.id != id || (item.creator.as_str() != caller && !admin));
                if self.items.len() == before {
                    return Err("Item not found or not permitted".to_string());
                }
                Ok(Value::Null)
            }
            "getCallerUserProfile" => to_value(&self.profiles.get(caller)),
            "getUserProfile" => {
                let user: Principal = arg(args, 0)?;
                to_value(&self.profiles.get(user.as_str()))
            }
            "saveCallerUserProfile" => {
                Self::require_user(caller)?;
                let profile: UserProfile = arg(args, 0)?;
                self.profiles.insert(caller.to_string(), profile);
                Ok(Value::Null)
            }
            "isArtist" => Ok(json!(self.artists.contains(caller))),
            "updateArtistStatus" => {
                Self::require_user(caller)?;
                let enabled: bool = arg(args, 0)?;
                if enabled {
                    self.artists.insert(caller.to_string());
                } else {
                    self.artists.remove(caller);
                }
                Ok(Value::Null)
            }
            "isCallerAdmin" => Ok(json!(self.is_admin(caller))),
            "getCallerUserRole" => to_value(&self.roles.get(caller).copied().unwrap_or_default()),
            "assignCallerUserRole" => {
                self.require_admin(caller)?;
                let user: Principal = arg(args, 0)?;
                let role: UserRole = arg(args, 1)?;
                self.roles.insert(user.as_str().to_string(), role);
                Ok(Value::Null)
            }
            "getBrandConfig" => to_value(&self.brand),
            "updateBrandConfig" => {
                self.require_admin(caller)?;
                self.brand = arg(args, 0)?;
                Ok(Value::Null)
            }
            "isStripeConfigured" => Ok(json!(self.stripe_configured)),
            "setStripeConfiguration" => {
                Self::require_user(caller)?;
                let config: Value = arg(args, 0)?;
                if config.get("secretKey").and_then(Value::as_str).is_none() {
                    return Err("secretKey is required".to_string());
                }
                self.stripe_configured = true;
                Ok(Value::Null)
            }
            "createCheckoutSession" => {
                self.checkout_requests.push(args.to_vec());
                let mut session = json!({"id": "cs_test_1"});
                if let (Some(url), Some(fields)) = (&self.checkout_url, session.as_object_mut()) {
                    fields.insert("url".to_string(), json!(url));
                }
                Ok(json!(session.to_string()))
            }
            "getStripeSessionStatus" => {
                let id: String = arg(args, 0)?;
                if id == "cs_failed" {
                    Ok(json!({"failed": {"error": "Card declined"}}))
                } else {
                    Ok(json!({"completed": {"response": "paid"}}))
                }
            }
            "generateItemDescription" => self.description_reply.clone().map(|d| json!(d)),
            other => Err(format!("unknown method {other}")),
        }
    }
}

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    args: Vec<Value>,
}

type SharedMarketplace = Arc<Mutex<Marketplace>>;

fn caller_from(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| token.strip_prefix(DELEGATION_PREFIX))
        .map_or_else(|| ANONYMOUS.to_string(), str::to_string)
}

async fn rpc(
    State(market): State<SharedMarketplace>,
    Path(method): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RpcRequest>,
) -> Json<Value> {
    let caller = caller_from(&headers);
    let reply = market
        .lock()
        .expect("marketplace lock poisoned")
        .handle(&caller, &method, &request.args);

    Json(match reply {
        Ok(value) => json!({"ok": value}),
        Err(message) => json!({"err": message}),
    })
}

async fn status() -> &'static str {
    "ok"
}

// =============================================================================
// Fake identity provider
// =============================================================================

#[derive(Deserialize)]
struct TokenRequest {
    code: String,
    client_secret: String,
}

/// Issues a delegation for the principal given as the authorization code.
async fn token(Form(request): Form<TokenRequest>) -> (StatusCode, Json<Value>) {
    if request.code == "refused" || request.client_secret.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "principal": request.code,
            "delegation": format!("{DELEGATION_PREFIX}{}", request.code),
            "expires_in": 3600,
        })),
    )
}

fn spawn(router: Router, listener: TcpListener) {
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("test server failed");
    });
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    (listener, format!("http://{addr}"))
}

// =============================================================================
// Test context
// =============================================================================

/// Running storefront with its fake backend and identity provider.
pub struct TestContext {
    pub base_url: String,
    market: SharedMarketplace,
}

impl TestContext {
    /// Start all servers with `market` as the initial backend state.
    ///
    /// Returns once the storefront reports ready.
    pub async fn start(market: Marketplace) -> Self {
        let market = Arc::new(Mutex::new(market));

        let (backend_listener, backend_url) = bind().await;
        let backend = Router::new()
            .route("/rpc/{method}", post(rpc))
            .route("/status", get(status))
            .with_state(market.clone());
        spawn(backend, backend_listener);

        let (identity_listener, identity_url) = bind().await;
        spawn(Router::new().route("/token", post(token)), identity_listener);

        let (listener, base_url) = bind().await;
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().expect("valid address"),
            port: 0,
            base_url: base_url.clone(),
            backend: BackendConfig {
                url: backend_url,
                timeout: Duration::from_secs(5),
            },
            identity: IdentityConfig {
                provider_url: identity_url,
                client_id: "atelier-tests".to_string(),
                client_secret: SecretString::from("q8Zr2xVn7LpT4kWm9YsB3dHc"),
            },
            cache: CacheConfig::default(),
            max_upload_bytes: 5 * 1024 * 1024,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config).expect("Failed to build storefront state");
        state.start_backend_connection();
        spawn(app(state), listener);

        let ctx = Self { base_url, market };
        ctx.wait_until_ready().await;
        ctx
    }

    async fn wait_until_ready(&self) {
        let client = Client::new();
        for _ in 0..100 {
            if let Ok(response) = client.get(self.url("/health/ready")).send().await
                && response.status().is_success()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("storefront never became ready");
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Backend state, for seeding and assertions.
    pub fn market(&self) -> MutexGuard<'_, Marketplace> {
        self.market.lock().expect("marketplace lock poisoned")
    }

    /// Browser-like client: keeps cookies, does not follow redirects.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Run the login flow for `principal` on `client`.
    pub async fn login(&self, client: &Client, principal: &str) {
        let response = client
            .get(self.url("/auth/login?return_to=/settings"))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let authorize = url::Url::parse(&location(&response)).expect("authorize URL");
        let state = authorize
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter");

        let response = client
            .get(self.url("/auth/callback"))
            .query(&[("code", principal), ("state", state.as_str())])
            .send()
            .await
            .expect("callback request failed");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/settings");
    }
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// An item listed by `creator`.
#[must_use]
pub fn item(id: &str, title: &str, category: Category, creator: &str, cents: u64) -> Item {
    Item {
        id: ItemId::new(id),
        title: title.to_string(),
        description: format!("{title}, an original work."),
        creator: Principal::parse(creator).expect("valid principal"),
        category,
        price: PriceCents::from_cents(cents),
        images: Vec::new(),
        timestamp: 1_700_000_000_000_000_000,
    }
}
