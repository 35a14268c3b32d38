use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /generate - Runs the pipeline and writes the report
pub async fn generate(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state.generator.generate().await?;
    Ok("done")
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    /// Run the pipeline first when no report exists yet.
    #[serde(default)]
    pub generate: bool,
}

/// GET /download - Serves the last report as an attachment
pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let generator = &state.generator;
    let path = generator.output_path();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if !params.generate {
                return Err(ApiError::NotGenerated);
            }
            log::info!("No report on disk, generating before download");
            generator.generate().await?;
            tokio::fs::read(path).await?
        }
        Err(e) => return Err(e.into()),
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| popcoords::render::DEFAULT_OUTPUT_FILE.to_string());

    Ok((
        [
            (header::CONTENT_TYPE, generator.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
