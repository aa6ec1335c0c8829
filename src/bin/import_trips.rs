//! Importación de viajes manuales desde CSV
//!
//! Uso: import_trips <fichero.csv> [--skip-errors] [--batch-size N] [--dry-run] [--by-vehicle]

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use tracing::info;

use fleet_ledger::config::{DatabaseConfig, EnvironmentConfig};
use fleet_ledger::database::DatabaseConnection;
use fleet_ledger::repositories::{PgStore, Store};
use fleet_ledger::services::bulk_importer::read_csv;
use fleet_ledger::services::{BulkImporter, ImportOptions, ImportSummary, TripLedger};

struct CliArgs {
    csv_path: String,
    options: ImportOptions,
    by_vehicle: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let program = args.first().map(String::as_str).unwrap_or("import_trips");
    let mut csv_path = None;
    let mut options = ImportOptions {
        skip_on_error: false,
        ..ImportOptions::default()
    };
    let mut by_vehicle = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--skip-errors" => options.skip_on_error = true,
            "--dry-run" => options.dry_run = true,
            "--by-vehicle" => by_vehicle = true,
            "--batch-size" => {
                let value = iter.next().context("--batch-size necesita un valor")?;
                options.batch_size = value
                    .parse()
                    .with_context(|| format!("--batch-size inválido: '{}'", value))?;
                if options.batch_size == 0 {
                    bail!("--batch-size debe ser mayor que 0");
                }
            }
            flag if flag.starts_with("--") => bail!("Opción desconocida: {}", flag),
            path if csv_path.is_none() => csv_path = Some(path.to_string()),
            extra => bail!("Argumento inesperado: {}", extra),
        }
    }

    let Some(csv_path) = csv_path else {
        bail!(
            "Uso: {} <fichero.csv> [--skip-errors] [--batch-size N] [--dry-run] [--by-vehicle]",
            program
        );
    };

    Ok(CliArgs {
        csv_path,
        options,
        by_vehicle,
    })
}

fn print_summary(summary: &ImportSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("🧪 DRY RUN: no se ha guardado ningún cambio");
    }
    println!("📊 Resumen de importación");
    println!("   ✅ Creados:  {}", summary.created);
    println!("   ❌ Errores:  {}", summary.errored);
    println!("   ⏭️  Omitidos: {}", summary.skipped);

    if !summary.error_details.is_empty() {
        println!();
        println!("❌ Detalle de errores:");
        for error in &summary.error_details {
            println!("   {}", error);
        }
    }

    if !summary.warnings.is_empty() {
        println!();
        println!("⚠️  Avisos de consistencia:");
        for warning in &summary.warnings {
            println!("   {}", warning);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    info!("📄 Leyendo viajes desde {}", cli.csv_path);
    let content = tokio::fs::read_to_string(&cli.csv_path)
        .await
        .with_context(|| format!("No se pudo leer {}", cli.csv_path))?;
    let rows = read_csv(&content)?;
    info!("📦 {} filas encontradas", rows.len());

    let db_config = DatabaseConfig::from_env()?;
    let db_connection = DatabaseConnection::new(&db_config).await?;
    db_connection.run_migrations().await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_connection.pool().clone()));
    let importer = BulkImporter::new(store.clone(), TripLedger::new(store));

    let summary = if cli.by_vehicle {
        importer.import_by_vehicle(&rows, &cli.options).await
    } else {
        importer.import(&rows, &cli.options).await
    };

    print_summary(&summary, cli.options.dry_run);

    if summary.errored > 0 && !cli.options.skip_on_error {
        bail!("Importación abortada en la primera fila con errores");
    }
    Ok(())
}
