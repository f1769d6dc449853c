use actix_files::NamedFile;
use actix_web::web;
use std::path::PathBuf;

/// Directory the HTML pages and their assets are served from.
#[derive(Debug, Clone)]
pub struct StaticDir(pub PathBuf);

/// GET / - Home page
pub async fn home(dir: web::Data<StaticDir>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(dir.0.join("index.html")).await?)
}

/// GET /reader - Reader display page
pub async fn reader(dir: web::Data<StaticDir>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(dir.0.join("reader.html")).await?)
}

/// Mount the pages and, as a catch-all, the rest of the directory.
/// Must be configured after the API routes.
pub fn configure(cfg: &mut web::ServiceConfig, static_dir: &str) {
    cfg.app_data(web::Data::new(StaticDir(PathBuf::from(static_dir))))
        .route("/", web::get().to(home))
        .route("/reader", web::get().to(reader))
        .service(actix_files::Files::new("/", static_dir));
}
