use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatehouse API",
        description = "Token-based authentication and role-driven authorization service"
    ),
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::profile,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::reset,
        crate::modules::roles::controller::list_roles,
        crate::modules::roles::controller::create_role,
        crate::modules::roles::controller::update_role,
    ),
    tags(
        (name = "Authentication", description = "Session lifecycle and password reset"),
        (name = "Roles", description = "Principal registry administration")
    )
)]
pub struct ApiDoc;
