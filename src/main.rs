use std::sync::Arc;

use anyhow::Context;

use payslip_router::config::{MailConfig, OracleConfig, ServiceConfig, StoreBackend};
use payslip_router::document::PdftoppmRasterizer;
use payslip_router::mail::create_mailer;
use payslip_router::oracle::{NameExtractor, OpenRouterOracle};
use payslip_router::pipeline::{
    DispatchCoordinator, ExtractionCoordinator, ExtractionSettings, PayslipService,
};
use payslip_router::server::api_routes;
use payslip_router::store::{
    self, EXPIRY_SWEEP_INTERVAL, InMemoryProcessStore, LibSqlProcessStore, ProcessStore,
};
use payslip_router::template::CompanyTemplate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let service_config = ServiceConfig::from_env()?;
    let oracle_config = OracleConfig::from_env()?;
    let mail_config = MailConfig::from_env()?;

    let template = CompanyTemplate::load(&service_config.template_path).with_context(|| {
        format!(
            "Failed to load company template from {}",
            service_config.template_path.display()
        )
    })?;

    eprintln!("📄 Payslip Router v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Company: {} ({})", template.company_name, template.company_id);
    eprintln!("   Employees: {}", template.employee_emails.len());
    eprintln!("   Model: {}", oracle_config.model);
    eprintln!("   Workers: {}  DPI: {}", service_config.workers, service_config.dpi);
    eprintln!("   API: http://{}/api/health\n", service_config.bind_addr);

    // ── Oracle + extraction ──────────────────────────────────────────────
    let oracle_timeout = oracle_config.timeout;
    let oracle = Arc::new(OpenRouterOracle::new(oracle_config)?);
    let extractor = Arc::new(NameExtractor::new(oracle).with_timeout(oracle_timeout));

    let extraction = ExtractionCoordinator::new(
        Arc::new(PdftoppmRasterizer::new()),
        extractor,
        ExtractionSettings {
            dpi: service_config.dpi,
            workers: service_config.workers,
            debug_crops_dir: service_config.debug_crops_dir.clone(),
            company_id: template.company_id.clone(),
        },
    );

    // ── Process store ────────────────────────────────────────────────────
    let store: Arc<dyn ProcessStore> = match &service_config.store {
        StoreBackend::Memory => InMemoryProcessStore::with_ttl(service_config.process_ttl),
        StoreBackend::LibSql(path) => Arc::new(
            LibSqlProcessStore::new_local(path)
                .await
                .with_context(|| format!("Failed to open process store at {}", path.display()))?
                .with_ttl(service_config.process_ttl),
        ),
    };
    store::spawn_expiry_task(
        Arc::clone(&store),
        service_config.process_ttl,
        EXPIRY_SWEEP_INTERVAL,
    );

    // ── Mail + dispatch ──────────────────────────────────────────────────
    let mailer = create_mailer(&mail_config)?;
    tracing::info!(backend = mailer.name(), "Mail backend ready");
    let dispatch = DispatchCoordinator::new(Arc::clone(&store), mailer, template.company_id.clone());

    let service = Arc::new(PayslipService::new(
        extraction,
        dispatch,
        store,
        service_config.max_upload_bytes,
    ));

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = api_routes(service, Arc::new(template));
    let listener = tokio::net::TcpListener::bind(&service_config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", service_config.bind_addr))?;
    tracing::info!(addr = %service_config.bind_addr, "Payslip API server started");

    axum::serve(listener, app).await?;
    Ok(())
}
