use supervision_backend::config::{AuthConfig, Config};
use jsonwebtoken::{EncodingKey, Header, encode};
use supervision_backend::middleware::auth::{
    ACCESS_TOKEN_TYPE, Claims, REFRESH_TOKEN_TYPE, TokenService, revocation_ttl, unix_now,
};
use uuid::Uuid;

fn tokens() -> TokenService {
    TokenService::new(&AuthConfig {
        jwt_secret: "unit-test-secret-0123456789".to_string(),
        access_token_expires_in: 1800,
        refresh_token_expires_in: 7200,
        bcrypt_cost: 4,
    })
}

#[test]
fn access_and_refresh_tokens_are_not_interchangeable() {
    let service = tokens();
    let user_id = Uuid::new_v4();

    let access = service.generate_access_token(user_id, "zhangsan").unwrap();
    let refresh = service.generate_refresh_token(user_id, "zhangsan").unwrap();

    let claims = service.verify(&access, ACCESS_TOKEN_TYPE).unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.username, "zhangsan");
    assert!(claims.exp > unix_now());

    assert!(service.verify(&refresh, REFRESH_TOKEN_TYPE).is_ok());
    assert!(service.verify(&refresh, ACCESS_TOKEN_TYPE).is_err());
    assert!(service.verify(&access, REFRESH_TOKEN_TYPE).is_err());
}

#[test]
fn every_token_gets_its_own_jti() {
    let service = tokens();
    let user_id = Uuid::new_v4();
    let a = service.generate_access_token(user_id, "lisi").unwrap();
    let b = service.generate_access_token(user_id, "lisi").unwrap();

    let ja = service.verify(&a, ACCESS_TOKEN_TYPE).unwrap().jti;
    let jb = service.verify(&b, ACCESS_TOKEN_TYPE).unwrap().jti;
    assert_ne!(ja, jb);
}

#[test]
fn token_signed_with_other_secret_is_rejected() {
    let other = TokenService::new(&AuthConfig {
        jwt_secret: "another-secret-abcdefghijkl".to_string(),
        access_token_expires_in: 1800,
        refresh_token_expires_in: 7200,
        bcrypt_cost: 4,
    });
    let token = other.generate_access_token(Uuid::new_v4(), "wangwu").unwrap();
    assert!(tokens().verify(&token, ACCESS_TOKEN_TYPE).is_err());
}

fn base_pairs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("DATABASE_URL", "postgres://localhost/supervision"),
        ("REDIS_URL", "redis://127.0.0.1/"),
        ("JWT_SECRET", "a-very-long-test-secret-value"),
    ]
}

#[test]
fn config_defaults_and_accessors() {
    let config = Config::from_pairs(base_pairs()).unwrap();
    assert_eq!(config.server_address(), "127.0.0.1:8000");
    assert_eq!(config.auth().access_token_expires_in, 1800);
    assert_eq!(config.monitoring().upcoming_days, 3);
    assert_eq!(config.monitoring().workload_threshold, 10);
}

#[test]
fn config_rejects_placeholder_secret() {
    let mut pairs = base_pairs();
    pairs[2] = ("JWT_SECRET", "your-secret-key");
    assert!(Config::from_pairs(pairs).is_err());
}

#[test]
fn config_rejects_refresh_shorter_than_access() {
    let mut pairs = base_pairs();
    pairs.push(("JWT_ACCESS_TOKEN_EXPIRES_IN", "3600"));
    pairs.push(("JWT_REFRESH_TOKEN_EXPIRES_IN", "600"));
    assert!(Config::from_pairs(pairs).is_err());
}

#[test]
fn logout_within_leeway_still_revokes() {
    // exp 刚过 30 秒的令牌仍能通过校验，吊销记录必须覆盖这段时间
    let now = unix_now();
    let claims = Claims {
        sub: Uuid::new_v4(),
        username: "lisi".into(),
        token_type: ACCESS_TOKEN_TYPE.into(),
        exp: now - 30,
        iat: now - 1830,
        jti: Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret("unit-test-secret-0123456789".as_bytes()),
    )
    .unwrap();

    assert!(tokens().verify(&token, ACCESS_TOKEN_TYPE).is_ok());
    assert!(revocation_ttl(claims.exp, now) >= 30);
}
