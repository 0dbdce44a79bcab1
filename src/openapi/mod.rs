use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ASBM ERP API",
        version = "1.0.0",
        description = r#"
# ASBM ERP

Orders, products, production planning, sales, purchasing, stock, production,
HR, project tracking and administrative records for a textile manufacturer.

## Authentication

Obtain a token pair from `POST /auth/login` and send the access token on every
`/api/v1` request:

```
Authorization: Bearer <access-token>
```

Access to each module is governed by per-user permissions (`view`, `edit`,
`delete`). Users with the `admin` role bypass permission checks.
"#
    ),
    paths(
        crate::auth::login_handler,
        crate::auth::refresh_token_handler,
        crate::auth::logout_handler,
        crate::health_check,
    ),
    components(
        schemas(
            crate::auth::TokenPair,
            crate::auth::LoginCredentials,
            crate::auth::RefreshTokenRequest,
            crate::errors::ErrorResponse
        )
    ),
    tags(
        (name = "auth", description = "Login, token refresh and logout"),
        (name = "health", description = "Liveness and database checks")
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_auth_paths() {
        let doc = ApiDocV1::openapi();
        assert!(doc.paths.paths.contains_key("/auth/login"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
