mod common;

use std::thread;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use common::IMAGE_SIZE;
use embiggen_core::backend::{
    manifest_candidates, Annotation, AnnotationShape, DetectionBackend, HttpBackend,
    SyntheticBackend, TilesResponse,
};
use embiggen_core::error::EmbiggenError;
use embiggen_core::resource::ResourceRegistry;
use embiggen_core::settings::BackendConfig;

fn prefixes() -> Vec<String> {
    vec!["/tiles".to_string(), "/static".to_string()]
}

/// Serve `app` on a loopback port from a background runtime and return its
/// base URL. The server lives until the test process exits.
fn serve(app: Router) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    format!("http://{addr}")
}

/// Router that only serves a manifest at each of `paths`.
fn manifests(paths: &[&str]) -> Router {
    paths.iter().fold(Router::new(), |router, path| {
        router.route(path, get(|| async { "{}" }))
    })
}

fn backend_for(base_url: String) -> HttpBackend {
    HttpBackend::new(&BackendConfig {
        base_url,
        ..BackendConfig::default()
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Manifest URL candidates
// ---------------------------------------------------------------------------

#[test]
fn test_candidates_follow_prefix_order() {
    let urls = manifest_candidates("http://localhost:8000", &prefixes(), "sample/sample.dzi");
    assert_eq!(
        urls,
        vec![
            "http://localhost:8000/tiles/sample/sample.dzi",
            "http://localhost:8000/static/sample/sample.dzi",
        ]
    );
}

#[test]
fn test_candidates_strip_repeated_prefix() {
    let urls = manifest_candidates("http://localhost:8000/", &prefixes(), "/tiles/sample.dzi");
    assert_eq!(urls[0], "http://localhost:8000/tiles/sample.dzi");
    assert_eq!(urls[1], "http://localhost:8000/static/tiles/sample.dzi");
}

#[test]
fn test_candidates_do_not_strip_partial_segment() {
    let urls = manifest_candidates("http://localhost:8000", &prefixes(), "tilesets/a.dzi");
    assert_eq!(urls[0], "http://localhost:8000/tiles/tilesets/a.dzi");
}

#[test]
fn test_candidates_pass_absolute_urls_through() {
    let urls = manifest_candidates(
        "http://localhost:8000",
        &prefixes(),
        "https://cdn.example.org/a.dzi",
    );
    assert_eq!(urls, vec!["https://cdn.example.org/a.dzi"]);
}

#[test]
fn test_candidates_without_prefixes_use_base() {
    let urls = manifest_candidates("http://localhost:8000", &[], "a.dzi");
    assert_eq!(urls, vec!["http://localhost:8000/a.dzi"]);
}

#[test]
fn test_candidates_are_deduplicated() {
    let prefixes = vec!["/tiles".to_string(), "tiles/".to_string()];
    let urls = manifest_candidates("http://localhost:8000", &prefixes, "a.dzi");
    assert_eq!(urls, vec!["http://localhost:8000/tiles/a.dzi"]);
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[test]
fn test_annotation_json_shape() {
    let annotation = Annotation {
        id: Some(3),
        shape: AnnotationShape::Rect {
            x: 0.1,
            y: 0.2,
            w: 0.3,
            h: 0.4,
        },
    };
    let json = serde_json::to_value(&annotation).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"id": 3, "type": "rect", "x": 0.1, "y": 0.2, "w": 0.3, "h": 0.4})
    );
}

#[test]
fn test_annotation_without_id() {
    let annotation: Annotation =
        serde_json::from_str(r#"{"type":"point","x":0.5,"y":0.25}"#).unwrap();
    assert_eq!(annotation.id, None);
    assert_eq!(
        annotation.shape,
        AnnotationShape::Point { x: 0.5, y: 0.25 }
    );
    assert_eq!(annotation.to_string(), "point (0.500, 0.250)");
}

#[test]
fn test_new_shape_serializes_without_id() {
    let json = serde_json::to_value(AnnotationShape::Point { x: 1.0, y: 0.0 }).unwrap();
    assert_eq!(json, serde_json::json!({"type": "point", "x": 1.0, "y": 0.0}));
}

#[test]
fn test_tiles_response() {
    let tiles: TilesResponse = serde_json::from_str(r#"{"dzi_path":"a/a.dzi"}"#).unwrap();
    assert_eq!(tiles.dzi_path, "a/a.dzi");
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[test]
fn test_manifest_resolution_prefers_first_prefix() {
    let backend = backend_for(serve(manifests(&["/tiles/a/a.dzi", "/static/a/a.dzi"])));
    let url = backend.resolve_manifest_url("a/a.dzi").unwrap();
    assert_eq!(url, format!("{}/tiles/a/a.dzi", backend.base_url()));
}

#[test]
fn test_manifest_resolution_falls_back_on_not_found() {
    let backend = backend_for(serve(manifests(&["/static/a/a.dzi"])));
    let url = backend.resolve_manifest_url("a/a.dzi").unwrap();
    assert_eq!(url, format!("{}/static/a/a.dzi", backend.base_url()));
}

#[test]
fn test_manifest_resolution_reports_every_candidate() {
    let backend = backend_for(serve(manifests(&["/tiles/b/b.dzi"])));
    match backend.resolve_manifest_url("a/a.dzi").unwrap_err() {
        EmbiggenError::ManifestNotFound { tried } => assert_eq!(tried.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_manifest_lookup_aborts_on_server_error() {
    let app = Router::new().fallback(|| async { StatusCode::INTERNAL_SERVER_ERROR });
    let backend = backend_for(serve(app));
    let err = backend.resolve_manifest_url("a/a.dzi").unwrap_err();
    assert!(matches!(err, EmbiggenError::HttpStatus { status: 500, .. }));
}

#[test]
fn test_health_over_http() {
    let app = Router::new().route(
        "/health",
        get(|| async { Json(serde_json::json!({ "ok": true })) }),
    );
    let backend = backend_for(serve(app));
    assert!(backend.health().unwrap().ok);
}

#[test]
fn test_detect_on_path_surfaces_status() {
    let app = Router::new().fallback(|| async { StatusCode::SERVICE_UNAVAILABLE });
    let backend = backend_for(serve(app));
    let err = backend.detect_on_path("uploads/a.png", 2).unwrap_err();
    assert!(matches!(err, EmbiggenError::HttpStatus { status: 503, .. }));
}

#[test]
fn test_http_backend_rejects_non_http_url() {
    let config = BackendConfig {
        base_url: "ftp://localhost".into(),
        ..BackendConfig::default()
    };
    let err = HttpBackend::new(&config).err().unwrap();
    assert!(matches!(err, EmbiggenError::InvalidUrl(_)));
}

#[test]
fn test_http_backend_trims_trailing_slash() {
    let config = BackendConfig {
        base_url: "http://localhost:8000/".into(),
        ..BackendConfig::default()
    };
    let backend = HttpBackend::new(&config).unwrap();
    assert_eq!(backend.base_url(), "http://localhost:8000");
}

#[test]
fn test_synthetic_heatmap_shrinks_with_level() {
    let backend = SyntheticBackend::new(IMAGE_SIZE);
    assert_eq!(backend.render(0).dimensions(), (2000, 1000));
    assert_eq!(backend.render(2).dimensions(), (1000, 500));
    assert_eq!(backend.render(8).dimensions(), (250, 125));
}

#[test]
fn test_synthetic_heatmap_is_decodable_png() {
    let backend = SyntheticBackend::new(IMAGE_SIZE);
    let bytes = backend.detect_on_path("uploads/a.png", 4).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");

    let registry = ResourceRegistry::new();
    let resource = registry.create(bytes);
    assert_eq!(resource.dimensions().unwrap(), (500, 250));
    assert_eq!(registry.live_count(), 1);
    drop(resource);
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn test_synthetic_heatmap_has_minimum_edge() {
    let backend = SyntheticBackend::new(embiggen_core::geometry::ContentSize::new(40, 10));
    assert_eq!(backend.render(8).dimensions(), (32, 32));
}
