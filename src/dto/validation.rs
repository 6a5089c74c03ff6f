//! Validation helpers for DTOs.

use validator::ValidationError;

/// Largest player count a session may declare.
pub const MAX_PLAYERS: u32 = 100;

/// Validates a player range: each bound within `1..=MAX_PLAYERS` and `min <= max`.
///
/// ```ignore
/// validate_player_range(Some(2), Some(4)) // Ok
/// validate_player_range(Some(5), Some(4)) // Err - inverted
/// validate_player_range(Some(0), None)    // Err - below 1
/// ```
pub fn validate_player_range(min: Option<u32>, max: Option<u32>) -> Result<(), ValidationError> {
    for bound in [min, max].into_iter().flatten() {
        if !(1..=MAX_PLAYERS).contains(&bound) {
            let mut err = ValidationError::new("player_count_range");
            err.message =
                Some(format!("player counts must be between 1 and {MAX_PLAYERS} (got {bound})").into());
            return Err(err);
        }
    }

    if let (Some(min), Some(max)) = (min, max) {
        if min <= max {
            return Ok(());
        }
        let mut err = ValidationError::new("player_range_order");
        err.message = Some(format!("min_players ({min}) exceeds max_players ({max})").into());
        return Err(err);
    }

    Ok(())
}

/// Canonical form of an email used for lookups and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_range_valid() {
        assert!(validate_player_range(Some(2), Some(4)).is_ok());
        assert!(validate_player_range(Some(3), Some(3)).is_ok());
        assert!(validate_player_range(None, Some(6)).is_ok());
        assert!(validate_player_range(Some(1), None).is_ok());
        assert!(validate_player_range(None, None).is_ok());
    }

    #[test]
    fn test_validate_player_range_out_of_bounds() {
        assert!(validate_player_range(Some(0), Some(4)).is_err());
        assert!(validate_player_range(Some(2), Some(101)).is_err());
    }

    #[test]
    fn test_validate_player_range_inverted() {
        let err = validate_player_range(Some(5), Some(4)).unwrap_err();
        assert_eq!(err.code, "player_range_order");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
