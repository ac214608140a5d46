// Route exports
pub mod info;
pub mod predict;

pub use predict::AppState;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(info::service_info))
        .service(
            web::scope("/api")
                .configure(predict::configure),
        );
}
