//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Lending API",
        version = "0.1.0",
        description = "Book catalog and loan ledger REST API"
    ),
    servers(
        (url = "/api", description = "REST API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::sign_up,
        auth::sign_in,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::patch_book,
        books::delete_book,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::create_loan,
        loans::return_loan,
    ),
    components(
        schemas(
            // Auth
            auth::SignInResponse,
            crate::models::user::SignUp,
            crate::models::user::SignIn,
            crate::models::user::User,
            crate::models::user::Role,
            // Books
            crate::models::book::Book,
            crate::models::book::BookInput,
            crate::models::book::BookPatch,
            // Loans
            loans::LoanRequest,
            crate::models::loan::LoanDetails,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Account endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "loans", description = "Borrowing and returning books")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
