use examtrack::examtrack_auth::{
    create_access_token, create_attendance_token, create_refresh_token, verify_attendance_token,
    verify_refresh_token, verify_token,
};
use examtrack::examtrack_config::JwtConfig;
use examtrack::examtrack_models::UserRole;
use uuid::Uuid;

fn get_test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test_secret_key_for_testing_purposes".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    }
}

#[test]
fn test_access_token_carries_role_permissions() {
    let jwt_config = get_test_jwt_config();
    let user_id = Uuid::new_v4();
    let role = UserRole::Invigilator;

    let token = create_access_token(
        user_id,
        "invigilator@uni.edu",
        role.as_str(),
        role.permission_strings(),
        &jwt_config,
    )
    .unwrap();
    let claims = verify_token(&token, &jwt_config).unwrap();

    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.role, "invigilator");
    assert_eq!(claims.permissions, role.permission_strings());
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[test]
fn test_every_role_signs() {
    let jwt_config = get_test_jwt_config();

    for role in UserRole::ALL {
        let token = create_access_token(
            Uuid::new_v4(),
            "user@uni.edu",
            role.as_str(),
            role.permission_strings(),
            &jwt_config,
        );
        assert!(token.is_ok(), "{} token failed", role.as_str());
    }
}

#[test]
fn test_wrong_secret_rejected() {
    let jwt_config = get_test_jwt_config();
    let token = create_access_token(
        Uuid::new_v4(),
        "user@uni.edu",
        "admin",
        vec![],
        &jwt_config,
    )
    .unwrap();

    let other = JwtConfig {
        secret: "a_completely_different_secret_key".to_string(),
        ..jwt_config
    };

    let err = verify_token(&token, &other).unwrap_err();
    assert_eq!(err.status.as_u16(), 401);
}

#[test]
fn test_refresh_token_round_trip() {
    let jwt_config = get_test_jwt_config();
    let user_id = Uuid::new_v4();

    let first = create_refresh_token(user_id, "user@uni.edu", &jwt_config).unwrap();
    let second = create_refresh_token(user_id, "user@uni.edu", &jwt_config).unwrap();
    assert_ne!(first, second);

    let claims = verify_refresh_token(&first, &jwt_config).unwrap();
    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.email, "user@uni.edu");
}

#[test]
fn test_attendance_token_names_session() {
    let jwt_config = get_test_jwt_config();
    let session_id = Uuid::new_v4();

    let (token, exp) = create_attendance_token(session_id, 300, &jwt_config).unwrap();

    assert_eq!(verify_attendance_token(&token, &jwt_config).unwrap(), session_id);
    assert!(exp > 0);
}

#[test]
fn test_access_token_is_not_an_attendance_token() {
    let jwt_config = get_test_jwt_config();
    let token = create_access_token(
        Uuid::new_v4(),
        "user@uni.edu",
        "lecturer",
        vec![],
        &jwt_config,
    )
    .unwrap();

    let err = verify_attendance_token(&token, &jwt_config).unwrap_err();
    assert_eq!(err.status.as_u16(), 401);
    assert_eq!(err.error.to_string(), "Invalid or expired attendance token");
}
