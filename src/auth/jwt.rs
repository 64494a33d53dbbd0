use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::{JwtConfig, MAX_TTL_DAYS};

/// Signing material for session credentials, built once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> anyhow::Result<Self> {
        if cfg.secret.trim().is_empty() {
            anyhow::bail!("jwt signing secret is empty");
        }
        if !(1..=MAX_TTL_DAYS).contains(&cfg.ttl_days) {
            anyhow::bail!(
                "jwt lifetime must be between 1 and {} days, got {}",
                MAX_TTL_DAYS,
                cfg.ttl_days
            );
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::days(cfg.ttl_days),
        })
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let expires_at = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("jwt expiry out of range"))?;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(secret: &str, issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_days: 7,
        }
    }

    fn make_keys() -> JwtKeys {
        JwtKeys::new(&cfg("dev-secret", "test-issuer", "test-aud")).expect("keys")
    }

    #[test]
    fn issue_and_verify_session_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("issue");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn expiry_follows_configured_days() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let token = keys.issue_at(Uuid::new_v4(), now).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.iat as i64, now.unix_timestamp());
        assert_eq!(claims.exp as i64, (now + Duration::days(7)).unix_timestamp());
    }

    #[test]
    fn tokens_for_same_user_are_distinct() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let a = keys.issue(user_id).unwrap();
        let b = keys.issue(user_id).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys();
        let long_ago = OffsetDateTime::now_utc() - Duration::days(30);
        let stale = keys.issue_at(Uuid::new_v4(), long_ago).unwrap();
        assert!(keys.verify(&stale).is_err());
    }

    #[test]
    fn verify_rejects_other_secret_issuer_or_audience() {
        let good = make_keys();
        let token = good.issue(Uuid::new_v4()).unwrap();

        let other_secret = JwtKeys::new(&cfg("other", "test-issuer", "test-aud")).unwrap();
        assert!(other_secret.verify(&token).is_err());

        let other_aud = JwtKeys::new(&cfg("dev-secret", "bad-iss", "bad-aud")).unwrap();
        assert!(other_aud.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(make_keys().verify("not.a.jwt").is_err());
    }

    #[test]
    fn empty_secret_is_a_startup_error() {
        let err = JwtKeys::new(&cfg("  ", "i", "a")).err().expect("must fail");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn lifetime_outside_range_is_a_startup_error() {
        for days in [0, -3, MAX_TTL_DAYS + 1, 5_000_000] {
            let mut c = cfg("dev-secret", "i", "a");
            c.ttl_days = days;
            assert!(JwtKeys::new(&c).is_err(), "ttl_days = {}", days);
        }
    }
}
