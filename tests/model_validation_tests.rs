use blog_api::{
    access::Role,
    likes::LikeOutcome,
    models::{
        Category, CategoryDetail, CreatePostRequest, LikeToggleResponse, PostView,
        RegisterUserRequest, UpdatePostRequest, User, UserProfile, UserSummary,
    },
    repository::PostOrdering,
};
use uuid::Uuid;
use validator::Validate;

#[test]
fn test_user_summary_never_exposes_password_hash() {
    let user = User {
        id: Uuid::new_v4(),
        username: "writer".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        role: Some("admin".to_string()),
        ..User::default()
    };

    let json_output = serde_json::to_string(&UserSummary::from(&user)).unwrap();
    assert!(json_output.contains(r#""username":"writer""#));
    assert!(!json_output.contains("argon2"));
    assert!(!json_output.contains("password"));
}

#[test]
fn test_user_profile_flattens_summary() {
    let profile = UserProfile {
        user: UserSummary::from(&User::default()),
        role: Role::Admin,
        is_privileged: true,
    };

    let value = serde_json::to_value(&profile).unwrap();
    assert!(value.get("username").is_some());
    assert!(value.get("user").is_none());
    assert_eq!(value["role"], "admin");
}

#[test]
fn test_category_detail_flattens_category() {
    let detail = CategoryDetail {
        category: Category {
            id: 3,
            name: "Tech".to_string(),
            slug: "tech".to_string(),
        },
        posts: vec![PostView::default()],
    };

    let value = serde_json::to_value(&detail).unwrap();
    assert_eq!(value["slug"], "tech");
    assert_eq!(value["posts"].as_array().unwrap().len(), 1);
}

#[test]
fn test_like_toggle_response_uses_lowercase_message() {
    let json_output = serde_json::to_string(&LikeToggleResponse {
        message: LikeOutcome::Unliked,
    })
    .unwrap();
    assert_eq!(json_output, r#"{"message":"unliked"}"#);
}

#[test]
fn test_update_post_request_optionality() {
    // Missing fields deserialize to None and are omitted again on the way out.
    let partial: UpdatePostRequest = serde_json::from_str(r#"{"title":"New Title Only"}"#).unwrap();
    assert!(partial.content.is_none());
    assert!(partial.validate().is_ok());

    let json_output = serde_json::to_string(&partial).unwrap();
    assert!(json_output.contains(r#""title":"New Title Only""#));
    assert!(!json_output.contains("content"));

    // A slug in the payload is not part of the schema and is ignored.
    let with_slug: UpdatePostRequest = serde_json::from_str(r#"{"slug":"hijack"}"#).unwrap();
    assert!(with_slug.title.is_none());
}

#[test]
fn test_create_post_request_reports_every_missing_field() {
    let empty: CreatePostRequest = serde_json::from_str("{}").unwrap();
    let errors = empty.validate().unwrap_err();
    let fields = errors.field_errors();

    assert!(fields.contains_key("title"));
    assert!(fields.contains_key("content"));
    assert!(fields.contains_key("category_id"));
}

#[test]
fn test_register_request_rules() {
    let valid = RegisterUserRequest {
        username: "writer".to_string(),
        email: "writer@example.com".to_string(),
        password: "long enough".to_string(),
        ..RegisterUserRequest::default()
    };
    assert!(valid.validate().is_ok());

    let too_long = RegisterUserRequest {
        username: "x".repeat(151),
        ..valid.clone()
    };
    assert!(too_long.validate().is_err());
}

#[test]
fn test_post_ordering_accepts_only_known_fields() {
    assert_eq!(PostOrdering::parse("-created_at"), Some(PostOrdering::NewestFirst));
    assert_eq!(PostOrdering::parse("created_at"), Some(PostOrdering::OldestFirst));
    assert_eq!(PostOrdering::parse("-updated_at"), Some(PostOrdering::RecentlyUpdated));
    assert_eq!(PostOrdering::parse("updated_at"), Some(PostOrdering::LeastRecentlyUpdated));
    assert_eq!(PostOrdering::parse("title"), None);
    assert_eq!(PostOrdering::default(), PostOrdering::NewestFirst);
}
