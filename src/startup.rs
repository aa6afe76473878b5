use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::auth::PgRefreshTokenStore;
use crate::configuration::JwtSettings;
use crate::email_client::EmailClient;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    forgot_password, get_current_user, health_check, login, logout, refresh, reset_password,
};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    jwt_config: JwtSettings,
    email_client: EmailClient,
) -> Result<Server, std::io::Error> {
    let token_store = web::Data::new(PgRefreshTokenStore::new(connection.clone()));
    let connection = web::Data::new(connection);
    let jwt_config_data = web::Data::new(jwt_config.clone());
    let email_client = web::Data::new(email_client);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(connection.clone())
            .app_data(token_store.clone())
            .app_data(jwt_config_data.clone())
            .app_data(email_client.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/password/forgot", web::post().to(forgot_password))
            .route("/auth/password/reset", web::post().to(reset_password))

            // Protected routes (require a valid access token)
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/logout", web::post().to(logout)),
            )

            // Static SPA files (must be last to not override API routes)
            .service(fs::Files::new("/", "./public").index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
