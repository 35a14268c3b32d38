use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// GET / - Landing page with the live log and the generate/download controls
pub async fn home() -> Html<&'static str> {
    Html(INDEX_HTML)
}
