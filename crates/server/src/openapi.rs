use models::calc::MultiplyResult;
use models::user::{Message, SavedUser, StoredUser, UserInput, UserList, UserRecord};
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String, pub server: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health_check,
        crate::routes::calc::multiply,
        crate::routes::users::save_user,
        crate::routes::users::get_user,
        crate::routes::users::get_all_users,
        crate::routes::users::delete_user,
    ),
    components(
        schemas(
            HealthResponse,
            UserInput,
            SavedUser,
            StoredUser,
            UserRecord,
            UserList,
            Message,
            MultiplyResult,
        )
    ),
    tags(
        (name = "health"),
        (name = "calc"),
        (name = "users")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_once() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        let mut ops: Vec<String> = paths
            .values()
            .flat_map(|item| item.as_object().unwrap().values())
            .filter_map(|op| op.get("operationId").and_then(|v| v.as_str()).map(str::to_string))
            .collect();
        ops.sort();
        assert_eq!(ops, vec!["delete_user", "get_all_users", "get_user", "health_check", "multiply", "save_user"]);
        assert!(paths.contains_key("/user/{email}"));
    }

    #[test]
    fn user_body_requires_email_and_name() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let required = doc["components"]["schemas"]["UserInput"]["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "email"));
        assert!(required.iter().any(|v| v == "name"));
        assert!(!required.iter().any(|v| v == "phone"));
        let props = doc["components"]["schemas"]["UserInput"]["properties"].as_object().unwrap();
        let mut keys: Vec<&str> = props.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["address", "email", "name", "phone"]);
    }
}
