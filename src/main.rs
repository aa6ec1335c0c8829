use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};

use fleet_ledger::config::{DatabaseConfig, EnvironmentConfig, StoreBackend};
use fleet_ledger::database::DatabaseConnection;
use fleet_ledger::repositories::{MemoryStore, PgStore, Store};
use fleet_ledger::routes::create_app_router;
use fleet_ledger::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    info!("🚗 Fleet Ledger - Libro de viajes y odómetros");
    info!("================================================");
    info!("🌍 Entorno: {}", config.environment);

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Memory => {
            info!("🧪 Usando store en memoria (los datos no persisten)");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let db_connection = match DatabaseConnection::new(&db_config).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            db_connection.run_migrations().await?;
            Arc::new(PgStore::new(db_connection.pool().clone()))
        }
    };

    let app_state = AppState::new(config.clone(), store);
    let app = create_app_router(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚗 Vehículos y conductores:");
    info!("   POST /api/vehicles - Registrar vehículo");
    info!("   GET  /api/vehicles - Listar vehículos");
    info!("   GET  /api/vehicles/:id - Obtener vehículo");
    info!("   POST /api/vehicles/:id/recompute-odometer - Recalcular odómetro");
    info!("   POST /api/drivers - Registrar conductor");
    info!("🧭 Viajes:");
    info!("   POST /api/trips - Crear viaje (tiempo real o manual)");
    info!("   GET  /api/trips - Listar viajes");
    info!("   GET  /api/trips/:id - Obtener viaje");
    info!("   POST /api/trips/:id/end - Finalizar viaje");
    info!("   POST /api/trips/:id/cancel - Cancelar viaje");
    info!("   DELETE /api/trips/:id - Borrado lógico");
    info!("   POST /api/trips/import - Importación masiva");
    info!("💶 Tarifas de consultor:");
    info!("   GET  /api/consultant-rates - Listar tarifas");
    info!("   POST /api/consultant-rates - Activar tarifa");
    info!("   POST /api/consultant-rates/:id/activate - Reactivar tarifa");
    info!("   POST /api/consultant-rates/:id/deactivate - Desactivar tarifa");
    info!("   GET  /api/reports/consultant-payments - Informe de pagos");
    info!("🔧 Mantenimiento:");
    info!("   GET  /api/maintenance/integrity - Informe de integridad");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
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
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
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
