use clap::Parser;
use log::{error, info};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use vigie::configuration::config::Config;
use vigie::notify::{NoopNotifier, Notifier, SmtpNotifier};
use vigie::report::PdfRenderer;
use vigie::scan_provider::HttpScanProvider;
use vigie::scheduler::Scheduler;
use vigie::session_management::controller::LifecycleController;
use vigie::storage::{
    DatabaseSessionStore, FileReportStore, MemorySessionStore, SessionStore,
};
use vigie::web_interface::WebServer;

#[derive(Parser)]
#[command(name = "vigie")]
#[command(version = "0.1.0")]
#[command(about = "URL scanning service with PDF report delivery")]
struct Args {
    config_file: String,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
██╗   ██╗██╗ ██████╗ ██╗███████╗
██║   ██║██║██╔════╝ ██║██╔════╝
██║   ██║██║██║  ███╗██║█████╗
╚██╗ ██╔╝██║██║   ██║██║██╔══╝
 ╚████╔╝ ██║╚██████╔╝██║███████╗
  ╚═══╝  ╚═╝ ╚═════╝ ╚═╝╚══════╝
================================
 URL scan reports, watched over
================================
"
    );

    info!("Importing configuration");
    let args = Args::parse();
    let config = match Config::from_file(Path::new(args.config_file.as_str())) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration from file: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration imported successfully");

    let sessions: Arc<dyn SessionStore> = match &config.database_file {
        Some(file) => {
            let path = config.storage_path.join(file);
            match DatabaseSessionStore::open(&path).await {
                Ok(store) => {
                    info!("Session database at {}", path.display());
                    Arc::new(store)
                }
                Err(e) => {
                    error!("Unable to open session database: {}, exiting...", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            info!("No database file configured, keeping sessions in memory");
            Arc::new(MemorySessionStore::new())
        }
    };

    let reports = match FileReportStore::new(&config.storage_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Unable to initialize report storage: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    let provider = match HttpScanProvider::new(
        &config.provider.base_url,
        &config.provider.api_token,
        Duration::from_secs(config.provider.timeout_secs),
    ) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!("Unable to create scan provider client: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => match SmtpNotifier::new(smtp) {
            Ok(notifier) => {
                info!("Email delivery enabled via {}", smtp.host);
                Arc::new(notifier)
            }
            Err(e) => {
                error!("Unable to configure SMTP: {}, exiting...", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("No SMTP relay configured, email delivery disabled");
            Arc::new(NoopNotifier)
        }
    };

    let controller = Arc::new(LifecycleController::new(
        sessions.clone(),
        reports,
        provider,
        Arc::new(PdfRenderer),
        notifier,
        config.retry.clone(),
        config.session_ttl_hours,
        Duration::from_secs(config.provider.timeout_secs),
    ));

    let scheduler = Scheduler::new(
        controller.clone(),
        sessions,
        Duration::from_secs(config.scheduler_interval_secs),
    );
    tokio::spawn(async move {
        scheduler.run().await;
    });

    let bind_ip: std::net::IpAddr = match config.bind_address.parse() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid bind address: {}, exiting...", e);
            std::process::exit(1);
        }
    };
    let server = WebServer::new(controller);
    server.start((bind_ip, config.web_port).into()).await;
}
