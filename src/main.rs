mod assemble;
mod config;
mod gateway;
mod heuristics;
mod normalize;
mod pipeline;
mod server;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gateway::{HttpGateway, Upload};
use heuristics::ExtractionOptions;
use pipeline::InvoicePipeline;
use server::{ApiStatus, AppState, UploadResponse};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/invoice_reader.toml";

#[derive(Parser)]
#[command(name = "invoice_reader", version, about = "Invoice OCR upload service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        long,
        global = true,
        env = "INVOICE_READER_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Run one local file through the extractor and print the JSON result
    Extract {
        /// Image, PDF, or a .txt file holding already recognized text
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::Config::load_or_default(&cli.config)?;
    info!(
        path = %cli.config.display(),
        backend = cfg.gateway.backend.as_str(),
        "Configuration loaded"
    );

    let gateway_config = cfg.gateway_config();
    let api_status = ApiStatus::new(&gateway_config);
    if !api_status.api_key_configured {
        info!(
            env = %cfg.gateway.api_key_env,
            "No API key set, uploads will return test data"
        );
    }

    let gateway = HttpGateway::new(gateway_config)?;
    let options: ExtractionOptions = cfg.extraction.clone().into();
    let pipeline = InvoicePipeline::new(Arc::new(gateway), options);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Extract { file } => {
            let bytes = tokio::fs::read(&file).await?;
            let response =
                extract_bytes(&pipeline, &options, cfg.upload.accept_pdf, &file, bytes).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Serve => {
            let state = Arc::new(AppState {
                pipeline,
                upload: cfg.upload.clone(),
                api_status,
            });
            let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(addr = %addr, "Invoice reader listening");

            axum::serve(listener, server::router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("Server stopped");
            Ok(())
        }
    }
}

/// Build the same envelope `/upload-invoice` would return for this file.
///
/// Plain `.txt` files are treated as already recognized text and skip the OCR call.
/// Everything else goes through the upload content-type rules first.
async fn extract_bytes(
    pipeline: &InvoicePipeline,
    options: &ExtractionOptions,
    accept_pdf: bool,
    path: &Path,
    bytes: Vec<u8>,
) -> UploadResponse {
    let filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
    let content_type = guess_content_type(path);

    if content_type == "text/plain" {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let outcome = assemble::assemble(Ok(Value::String(text)), options);
        return UploadResponse::from_outcome(filename, outcome);
    }

    let upload = Upload {
        filename,
        content_type: content_type.to_string(),
        bytes,
    };
    if let Err(e) = server::validate_content_type(&upload, accept_pdf) {
        warn!(error = %e, "File rejected");
        return UploadResponse::error(upload.filename, e.to_string());
    }

    let outcome = pipeline.process(&upload).await;
    UploadResponse::from_outcome(upload.filename, outcome)
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use gateway::stub::StubGateway;
    use serde_json::json;

    const SAMPLE: &str = "Faktura: INV-2024-001\n15.01.2024\nAcme Company DOO\nUKUPNO: 15.000,00 RSD";

    fn pipeline(gateway: &Arc<StubGateway>) -> InvoicePipeline {
        InvoicePipeline::new(gateway.clone(), ExtractionOptions::default())
    }

    async fn run(gateway: &Arc<StubGateway>, accept_pdf: bool, path: &str) -> Value {
        let response = extract_bytes(
            &pipeline(gateway),
            &ExtractionOptions::default(),
            accept_pdf,
            Path::new(path),
            SAMPLE.as_bytes().to_vec(),
        )
        .await;
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["invoice_reader"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["invoice_reader", "serve", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.command, Some(Command::Serve));
        assert_eq!(cli.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn cli_extract_takes_a_file() {
        let cli = Cli::try_parse_from(["invoice_reader", "extract", "racun.png"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Extract {
                file: PathBuf::from("racun.png")
            })
        );
        assert!(Cli::try_parse_from(["invoice_reader", "extract"]).is_err());
        assert!(Cli::try_parse_from(["invoice_reader", "bogus"]).is_err());
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(guess_content_type(Path::new("a/Racun.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("scan.png")), "image/png");
        assert_eq!(guess_content_type(Path::new("f.pdf")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("ocr.txt")), "text/plain");
        assert_eq!(guess_content_type(Path::new("README")), "application/octet-stream");
    }

    #[tokio::test]
    async fn extract_text_file_skips_the_gateway() {
        let gateway = Arc::new(StubGateway::text(""));

        let body = run(&gateway, false, "ocr.txt").await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["extracted_data"]["invoice_number"], "INV-2024-001");
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn extract_honours_the_pdf_flag() {
        let gateway = Arc::new(StubGateway::text(SAMPLE));

        let body = run(&gateway, false, "faktura.pdf").await;
        assert_eq!(
            body,
            json!({
                "status": "error",
                "filename": "faktura.pdf",
                "message": "PDF format trenutno nije podržan, pošaljite sliku (JPEG, PNG)",
            })
        );
        assert_eq!(gateway.calls(), 0);

        let body = run(&gateway, true, "faktura.pdf").await;
        assert_eq!(body["status"], "success");
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn extract_rejects_unknown_file_types() {
        let gateway = Arc::new(StubGateway::text(SAMPLE));

        let body = run(&gateway, true, "notes.docx").await;

        assert_eq!(body["status"], "error");
        assert!(body.get("extracted_data").is_none());
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn extract_sends_images_through_the_pipeline() {
        let gateway = Arc::new(StubGateway::text(SAMPLE));

        let body = run(&gateway, false, "racun.jpg").await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["filename"], "racun.jpg");
        assert_eq!(body["extracted_data"]["vendor_name"], "Acme Company DOO");
        assert_eq!(gateway.calls(), 1);
    }
}
