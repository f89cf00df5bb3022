// src/backend/utils/guards.rs
use crate::error::LegacyError;
use crate::storage::settings::get_settings;
use candid::Principal;

/// Rejects the anonymous principal on every authenticated entry point.
pub fn check_not_anonymous(caller: &Principal) -> Result<(), LegacyError> {
    if *caller == Principal::anonymous() {
        return Err(LegacyError::NotAuthorized("anonymous caller".to_string()));
    }
    Ok(())
}

/// Checks if the caller is the configured admin principal.
pub fn check_admin(caller: &Principal) -> Result<(), LegacyError> {
    if *caller == get_settings().admin {
        Ok(())
    } else {
        Err(LegacyError::NotAuthorized("admin only".to_string()))
    }
}

/// Checks if the caller may drive the keeper pipeline: the configured
/// keeper principal or the admin.
pub fn check_keeper(caller: &Principal) -> Result<(), LegacyError> {
    let settings = get_settings();
    if *caller == settings.keeper || *caller == settings.admin {
        Ok(())
    } else {
        Err(LegacyError::NotAuthorized("keeper only".to_string()))
    }
}
