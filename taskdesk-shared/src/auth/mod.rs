/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the login password rules
/// - [`jwt`]: session token generation and validation
/// - [`middleware`]: bearer-token middleware and the [`middleware::AuthContext`] extractor
/// - [`authorization`]: task ownership checks
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
/// use taskdesk_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("demo123")?;
/// assert!(verify_password("demo123", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "demo@taskmanager.com", Duration::days(7));
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod middleware;
pub mod authorization;
