use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[path = "../canvas.rs"]
mod canvas;
#[path = "../chart.rs"]
mod chart;
#[path = "../overlay.rs"]
mod overlay;
#[path = "../profile.rs"]
mod profile;
#[path = "../renderer.rs"]
mod renderer;

use profile::{EnergyProfile, InputError, ReactionInput};
use renderer::{DiagramRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Parser, Debug)]
#[command(name = "enthalpy-web", about = "Serve the interactive enthalpy diagram page")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "ENTHALPY_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,
    /// Diagram width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,
    /// Diagram height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,
}

#[derive(Clone)]
struct AppState {
    renderer: Arc<Mutex<DiagramRenderer>>,
    width: u32,
    height: u32,
}

impl AppState {
    fn new(width: u32, height: u32) -> Self {
        AppState {
            renderer: Arc::new(Mutex::new(DiagramRenderer::new(width, height))),
            width,
            height,
        }
    }
}

#[derive(Deserialize)]
struct DiagramQuery {
    reactants: Option<String>,
    products: Option<String>,
    delta_h: Option<String>,
}

impl DiagramQuery {
    fn parse(&self) -> Result<ReactionInput, InputError> {
        ReactionInput::parse(
            self.reactants.as_deref().unwrap_or(""),
            self.products.as_deref().unwrap_or(""),
            self.delta_h.as_deref().unwrap_or(""),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiagramResponse {
    chart_id: Option<u64>,
    profile: EnergyProfile,
    equation: String,
    chart_svg: String,
    overlay_svg: String,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Enthalpy Diagram</title>
    <style>
      html, body { margin: 0; padding: 0; background: #f4f6f8; color: #1b1f24; font-family: "Segoe UI", sans-serif; }
      body.dark-mode { background: #0b0c10; color: #e6e6e6; }
      #panel { max-width: 860px; margin: 24px auto; padding: 16px; background: #ffffff; border: 1px solid #d5dae0; border-radius: 10px; box-shadow: 0 10px 28px rgba(0,0,0,0.08); }
      body.dark-mode #panel { background: #11151b; border-color: #2a2f36; box-shadow: 0 10px 28px rgba(0,0,0,0.35); }
      .brand { font-size: 18px; font-weight: 600; letter-spacing: 0.02em; }
      .row { display: flex; align-items: center; gap: 8px; margin-top: 8px; flex-wrap: wrap; }
      .row label { font-size: 12px; min-width: 120px; }
      input { flex: 1; min-width: 160px; border: 1px solid #c3cad3; border-radius: 6px; padding: 6px 8px; font-size: 13px; }
      body.dark-mode input { background: #0f141b; color: #e6e6e6; border-color: #2a2f36; }
      button { background: #1a2736; color: #e6e6e6; border: 1px solid #3c6a9e; border-radius: 6px; padding: 6px 12px; font-size: 13px; cursor: pointer; }
      #toggleTheme { position: absolute; top: 12px; right: 12px; background: transparent; border: 1px solid #8a96a3; color: inherit; }
      #diagram { position: relative; margin-top: 16px; background: #ffffff; border-radius: 8px; }
      #diagram .layer { position: absolute; top: 0; left: 0; }
      #overlayLayer { pointer-events: none; }
      #thermochemical-output { margin-top: 12px; min-height: 28px; }
      body.dark-mode #thermochemical-output strong { color: #e6e6e6 !important; }
    </style>
  </head>
  <body>
    <button id="toggleTheme" onclick="toggleTheme()">🌙</button>
    <div id="panel">
      <div class="brand">Potential Energy Diagram</div>
      <form id="chemistry-form">
        <div class="row">
          <label for="reactants">Reactants (comma separated)</label>
          <input id="reactants" type="text" placeholder="H2, O2" required />
        </div>
        <div class="row">
          <label for="products">Products (comma separated)</label>
          <input id="products" type="text" placeholder="H2O" required />
        </div>
        <div class="row">
          <label for="enthalpy-change">ΔH (kJ)</label>
          <input id="enthalpy-change" type="text" placeholder="-241.8" required />
          <button type="submit">Generate</button>
        </div>
      </form>
      <div id="diagram" style="width: __WIDTH__px; height: __HEIGHT__px;">
        <div id="chartLayer" class="layer"></div>
        <div id="overlayLayer" class="layer"></div>
      </div>
      <div id="thermochemical-output"></div>
    </div>
    <script>
      document.getElementById('chemistry-form').addEventListener('submit', async (e) => {
        e.preventDefault();
        const params = new URLSearchParams({
          reactants: document.getElementById('reactants').value,
          products: document.getElementById('products').value,
          delta_h: document.getElementById('enthalpy-change').value,
        });
        const res = await fetch(`/diagram?${params.toString()}`);
        const data = await res.json();
        if (!res.ok) {
          alert(data.error);
          return;
        }
        document.getElementById('chartLayer').innerHTML = data.chartSvg;
        document.getElementById('overlayLayer').innerHTML = data.overlaySvg;

        const out = document.getElementById('thermochemical-output');
        const strong = document.createElement('strong');
        strong.style.fontSize = '20px';
        strong.style.color = 'black';
        strong.textContent = data.equation;
        out.replaceChildren(strong);
      });

      function toggleTheme() {
        document.body.classList.toggle('dark-mode');
        const button = document.getElementById('toggleTheme');
        button.textContent = document.body.classList.contains('dark-mode') ? '🌞' : '🌙';
      }
    </script>
  </body>
</html>
"##;

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let page = INDEX_HTML
        .replace("__WIDTH__", &state.width.to_string())
        .replace("__HEIGHT__", &state.height.to_string());
    Html(page)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn bad_request(err: &InputError) -> Response {
    warn!(error = %err, "rejected diagram request");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: err.user_message().to_string(),
        }),
    )
        .into_response()
}

fn internal_error(err: String) -> Response {
    warn!(error = %err, "diagram export failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: err }),
    )
        .into_response()
}

async fn diagram(State(state): State<AppState>, Query(q): Query<DiagramQuery>) -> Response {
    let input = match q.parse() {
        Ok(input) => input,
        Err(err) => return bad_request(&err),
    };
    let profile = input.profile();
    let equation = input.equation();

    let mut renderer = state.renderer.lock().await;
    if !renderer.present(profile.clone()).await {
        warn!("overlay was not drawn");
    }

    let (chart_svg, overlay_svg) = match (renderer.chart_svg(), renderer.overlay_svg()) {
        (Ok(chart), Ok(overlay)) => (chart, overlay),
        (Err(err), _) | (_, Err(err)) => return internal_error(err),
    };
    let out = DiagramResponse {
        chart_id: renderer.current_chart_id().map(|id| id.0),
        profile,
        equation,
        chart_svg,
        overlay_svg,
        width: renderer.width(),
        height: renderer.height(),
    };
    Json(out).into_response()
}

async fn diagram_svg(State(state): State<AppState>, Query(q): Query<DiagramQuery>) -> Response {
    let input = match q.parse() {
        Ok(input) => input,
        Err(err) => return bad_request(&err),
    };

    let mut renderer = state.renderer.lock().await;
    if !renderer.present(input.profile()).await {
        warn!("overlay was not drawn");
    }
    match renderer.composite_svg() {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(err) => internal_error(err),
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/diagram", get(diagram))
        .route("/diagram.svg", get(diagram_svg))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();
    let state = AppState::new(args.width, args.height);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!("Serving on http://{}", args.addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get(uri: &str) -> (StatusCode, String) {
        let response = app(AppState::new(DEFAULT_WIDTH, DEFAULT_HEIGHT))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_page() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("chemistry-form"));
        assert!(body.contains("width: 800px"));
    }

    #[tokio::test]
    async fn test_diagram_json() {
        let (status, body) = get("/diagram?reactants=H2,%20O2&products=H2O&delta_h=-241.8").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["equation"], "H2 + O2 → H2O  ΔH = -241.8 kJ");
        assert_eq!(json["profile"]["reactantsLabel"], "H2 + O2");
        assert_eq!(json["profile"]["isEndothermic"], false);
        assert_eq!(json["profile"]["productEnergy"], -241.8);
        assert!(json["overlaySvg"].as_str().unwrap().contains("ΔH = -241.8 kJ"));
        assert!(json["chartSvg"].as_str().unwrap().contains("Reaction Progress"));
    }

    #[tokio::test]
    async fn test_invalid_delta_h() {
        for uri in [
            "/diagram?reactants=A&products=B&delta_h=0",
            "/diagram?reactants=A&products=B&delta_h=abc",
            "/diagram?reactants=A&products=B",
        ] {
            let (status, body) = get(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.contains(profile::INVALID_DELTA_H_MESSAGE));
        }
    }

    #[tokio::test]
    async fn test_index_does_not_wait_for_renderer() {
        let state = AppState::new(640, 480);
        let _busy = state.renderer.lock().await;
        let response = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            app(state.clone()).oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()),
        )
        .await
        .expect("page load blocked on the renderer lock")
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("width: 640px; height: 480px"));
    }

    #[tokio::test]
    async fn test_oversized_delta_h_rejected() {
        let (status, body) = get("/diagram?reactants=A&products=B&delta_h=-1e308").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.contains("NaN"));
    }

    #[tokio::test]
    async fn test_diagram_svg() {
        let response = app(AppState::new(400, 300))
            .oneshot(
                Request::builder()
                    .uri("/diagram.svg?reactants=N2O4&products=NO2&delta_h=57")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(svg.contains(r#"width="400""#));
        assert!(svg.contains("Ea = 107 kJ"));
    }

    #[tokio::test]
    async fn test_shared_renderer_replaces_chart() {
        let state = AppState::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        for delta_h in ["100", "-200"] {
            let uri = format!("/diagram?reactants=A&products=B&delta_h={delta_h}");
            let response = app(state.clone())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let renderer = state.renderer.lock().await;
        assert_eq!(renderer.current_chart_id().map(|id| id.0), Some(2));
        assert_eq!(renderer.profile().map(|p| p.raw_delta_h), Some(-200.0));
    }
}
