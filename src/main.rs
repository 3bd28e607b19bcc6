use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vti_backend::clients::{HttpMailer, HttpObjectStorage, HttpPdfRenderer};
use vti_backend::config::{DatabaseConfig, EnvironmentConfig};
use vti_backend::database::{create_pool, mask_database_url, run_migrations};
use vti_backend::services::Notifier;
use vti_backend::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚗 RTO - Backend de talleres de revisión técnica");
    info!("================================================");

    let config = EnvironmentConfig::from_env().context("Configuración inválida")?;
    let db_config = DatabaseConfig::from_env()?;

    // Inicializar base de datos
    let pool = match create_pool(&db_config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(
                "❌ Error conectando a la base de datos {}: {}",
                mask_database_url(&db_config.url),
                e
            );
            return Err(e);
        }
    };
    run_migrations(&pool)
        .await
        .context("Error ejecutando migraciones")?;
    info!("✅ Base de datos lista");

    // Servicios externos
    let storage = HttpObjectStorage::new(&config.storage_url, &config.storage_api_key)?;
    let renderer = HttpPdfRenderer::new(&config.pdf_renderer_url)?;
    let mailer = HttpMailer::new(&config.mailer_url, &config.mailer_api_key)?;
    let (notifier, notifier_handle) = Notifier::spawn(Arc::new(mailer));

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .context("HOST/PORT inválidos")?;

    let state = AppState::new(
        pool,
        config,
        Arc::new(storage),
        Arc::new(renderer),
        notifier,
    );
    let app = create_router(state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Estado de la base de datos");
    info!("📝 Trámites:");
    info!("   POST /applications - Crear trámite");
    info!("   GET  /applications?workshop_id= - Listar trámites");
    info!("   GET  /applications/:id - Detalle del trámite");
    info!("   PUT  /applications/:id/owner|driver|vehicle - Datos del trámite");
    info!("   POST /applications/:id/enqueue|consume-slot|start-inspection|finalize");
    info!("   POST /applications/:id/second-inspection|second-finalize");
    info!("🔧 Inspecciones:");
    info!("   GET  /inspections/steps/:workshop_id - Pasos del taller");
    info!("   PUT  /inspections/applications/:id/details - Resultado de un paso");
    info!("🏷️ Obleas y pagos:");
    info!("   POST /stickers/orders - Cargar obleas");
    info!("   POST /payments - Orden de pago de cupos");
    info!("   PUT  /payments/admin/:id/status - Aprobar o rechazar");
    info!("🔎 Públicos:");
    info!("   GET  /qr/get-qr-data/:sticker_number - Verificación de oblea");
    info!("   POST /cron/condicional-expired - Vencimiento de condicionales (X-Api-Key)");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    // El router ya soltó su copia del Notifier; la cola se drena y el worker termina
    if let Err(e) = notifier_handle.await {
        error!("❌ Worker de notificaciones terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
