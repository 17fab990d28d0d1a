use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One row per forgot-password request; consumed (or expired) exactly once.
#[derive(Debug, sqlx::FromRow)]
#[allow(dead_code)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration, used: bool) -> PasswordResetToken {
        PasswordResetToken {
            id: Uuid::from_u128(1),
            user_id: Uuid::from_u128(2),
            token: "x".repeat(64),
            expires_at: Utc::now() + expires_in,
            used,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_token_is_usable() {
        assert!(token(Duration::hours(1), false).is_usable(Utc::now()));
    }

    #[test]
    fn used_or_expired_tokens_are_not() {
        assert!(!token(Duration::hours(1), true).is_usable(Utc::now()));
        assert!(!token(Duration::seconds(-1), false).is_usable(Utc::now()));
    }
}
