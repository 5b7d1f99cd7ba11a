use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = std::env::var("NOTES_LOG_JSON").is_ok_and(|v| v == "1");
    dogpack_axum::telemetry::init_tracing(json_logs)?;

    let notes = notes_axum::build()?;

    let host = notes
        .config
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());

    let port = notes
        .config
        .get_string("http.port")
        .unwrap_or_else(|| "3036".to_string());

    let addr = format!("{host}:{port}");

    notes.app.listen(addr).await?;

    Ok(())
}
