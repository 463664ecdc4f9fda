use std::net::SocketAddr;
use std::sync::Arc;

use log::info;
use warp::Filter;

use crate::session_management::controller::LifecycleController;
use crate::web_interface::routes;

/// Web server for the scan HTTP API.
pub struct WebServer {
    controller: Arc<LifecycleController>,
}

impl WebServer {
    /// Create a new WebServer instance
    pub fn new(controller: Arc<LifecycleController>) -> Self {
        Self { controller }
    }

    /// Start the web server on the given address
    pub async fn start(&self, addr: SocketAddr) {
        let api = routes::dashboard_route()
            .or(routes::create_scan_route(self.controller.clone()))
            .or(routes::download_report_route(self.controller.clone()))
            .or(routes::request_email_route(self.controller.clone()))
            .or(routes::get_status_route(self.controller.clone()));

        info!("Web server listening on {}", addr);
        // Start server (warp 0.4)
        warp::serve(api).run(addr).await;
    }
}
