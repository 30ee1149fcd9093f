//! `examcrop serve`: browser upload form in front of the pipeline.
//!
//! `GET /` serves the form; `POST /` takes a multipart upload and answers
//! with the zip. Each upload converts on the blocking pool in its own
//! temporary directory.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use examcrop_core::metadata::MetadataOverrides;
use pdf::raster::Rasterizer;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::pipeline::{self, ConversionRequest};
use crate::prelude::{eprintln, *};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// How far into an upload to look for the `%PDF-` header.
const PDF_MAGIC_WINDOW: usize = 1024;

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>examcrop</title></head>
<body>
<h1>Exam PDF to question images</h1>
<form method="post" action="/" enctype="multipart/form-data">
  <p><label>Test PDF <input type="file" name="test_pdf" accept="application/pdf" required></label></p>
  <p><label>Solutions PDF <input type="file" name="sol_pdf" accept="application/pdf" required></label></p>
  <p><label>Year <input type="text" name="year" placeholder="2024"></label></p>
  <p><label>Month <input type="text" name="month" placeholder="Feb"></label></p>
  <p><label>Type <input type="text" name="type" placeholder="Reg"></label></p>
  <p><label>Level <input type="text" name="level" placeholder="Geometry"></label></p>
  <p><label>Division
    <select name="indiv">
      <option value="">(detect)</option>
      <option value="Indiv">Individual</option>
      <option value="Team">Team</option>
    </select></label></p>
  <p><button type="submit">Convert</button></p>
</form>
</body>
</html>
"#;

#[derive(Debug, clap::Args, Clone)]
pub struct ServeOptions {
    /// Address to bind
    #[arg(long, env = "EXAMCROP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "EXAMCROP_PORT", default_value = "8000")]
    pub port: u16,
}

/// Builds a rasterizer for one request. Rasterizers hold library handles
/// that are not shareable across threads, so each conversion gets its own.
pub type RasterizerFactory = Arc<dyn Fn() -> Box<dyn Rasterizer> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rasterizer: RasterizerFactory,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        if e.is_client_error() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        log::warn!("{}: {}", status, message);
        (status, message).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index).post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

pub async fn run(options: ServeOptions, config: Config, global: &crate::Global) -> Result<()> {
    let addr = format!("{}:{}", options.host, options.port);

    let pdfium_path = config.pdfium_path.clone();
    let state = AppState {
        config: Arc::new(config),
        rasterizer: Arc::new(move || pdf::raster::system_rasterizer(pdfium_path.as_deref())),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    if global.verbose {
        eprintln!("examcrop listening on http://{}", addr);
    }
    log::info!("listening on {}", addr);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn is_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(PDF_MAGIC_WINDOW)];
    head.windows(5).any(|w| w == b"%PDF-")
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Pull the two documents and the metadata fields out of the form.
async fn read_form(mut multipart: Multipart) -> Result<ConversionRequest, ApiError> {
    let bad = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.to_string());

    let mut test_pdf = None;
    let mut solution_pdf = None;
    let mut overrides = MetadataOverrides::default();

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "test_pdf" => test_pdf = Some(field.bytes().await.map_err(bad)?.to_vec()),
            "sol_pdf" => solution_pdf = Some(field.bytes().await.map_err(bad)?.to_vec()),
            "year" => overrides.year = non_blank(field.text().await.map_err(bad)?),
            "month" => overrides.month = non_blank(field.text().await.map_err(bad)?),
            "type" => overrides.exam_type = non_blank(field.text().await.map_err(bad)?),
            "level" => overrides.level = non_blank(field.text().await.map_err(bad)?),
            "indiv" => overrides.division = non_blank(field.text().await.map_err(bad)?),
            other => log::debug!("ignoring form field {}", other),
        }
    }

    let document = |bytes: Option<Vec<u8>>, field: &str| -> Result<Vec<u8>, Error> {
        let bytes = bytes
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::MissingUpload(field.to_string()))?;
        if !is_pdf(&bytes) {
            return Err(Error::NotPdf(field.to_string()));
        }
        Ok(bytes)
    };

    Ok(ConversionRequest {
        test_pdf: document(test_pdf, "test_pdf")?,
        solution_pdf: document(solution_pdf, "sol_pdf")?,
        overrides,
    })
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ApiError> {
    let request = read_form(multipart).await?;
    let config = state.config.clone();
    let factory = state.rasterizer.clone();

    let (base_name, archive) = tokio::task::spawn_blocking(move || -> Result<_, Error> {
        let rasterizer = (*factory)();
        let work_dir = tempfile::tempdir()?;
        let report = pipeline::convert(&config, rasterizer.as_ref(), &request, work_dir.path())?;
        let archive = std::fs::read(&report.archive)?;
        Ok((report.base_name, archive))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("conversion task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.zip\"", base_name),
            ),
        ],
        archive,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::fixtures::{sample_solution_pdf, sample_test_pdf, MockRasterizer};

    const BOUNDARY: &str = "examcrop-test-boundary";

    fn state() -> AppState {
        AppState {
            config: Arc::new(Config::default()),
            rasterizer: Arc::new(|| Box::new(MockRasterizer) as Box<dyn Rasterizer>),
        }
    }

    enum Part<'a> {
        File(&'a str, Vec<u8>),
        Text(&'a str, &'a str),
    }

    fn multipart_request(parts: Vec<Part<'_>>) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::File(name, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.pdf\"\r\n\
                             Content-Type: application/pdf\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&data);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(is_pdf(b"\xef\xbb\xbf%PDF-1.4"));
        assert!(!is_pdf(b"PK\x03\x04"));
        assert!(!is_pdf(b""));
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let response = router(state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("name=\"test_pdf\""));
        assert!(html.contains("name=\"sol_pdf\""));
    }

    #[tokio::test]
    async fn test_upload_returns_zip() {
        let request = multipart_request(vec![
            Part::File("test_pdf", sample_test_pdf()),
            Part::File("sol_pdf", sample_solution_pdf()),
            Part::Text("year", "2024"),
            Part::Text("month", "Feb"),
            Part::Text("type", "Reg"),
            Part::Text("level", "Geometry"),
            Part::Text("indiv", "Team"),
        ]);
        let response = router(state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/zip"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"2024_Feb_Reg_Geometry_Team.zip\""
        );

        let archive = zip::ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
        assert_eq!(archive.len(), 10);
        assert!(archive
            .file_names()
            .any(|n| n == "000015_2024_Feb_Reg_Geometry_Team.png"));
    }

    #[tokio::test]
    async fn test_missing_solution_upload_is_bad_request() {
        let request = multipart_request(vec![Part::File("test_pdf", sample_test_pdf())]);
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(message.contains("sol_pdf"));
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_bad_request() {
        let request = multipart_request(vec![
            Part::File("test_pdf", b"just some text".to_vec()),
            Part::File("sol_pdf", sample_solution_pdf()),
        ]);
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(message.contains("Not a PDF"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_server_error() {
        let request = multipart_request(vec![
            Part::File("test_pdf", b"%PDF-1.5 truncated".to_vec()),
            Part::File("sol_pdf", sample_solution_pdf()),
        ]);
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
