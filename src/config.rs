use std::env;

use crate::errors::BookingError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl AppConfig {
    /// Fails early if the record store is not configured; every flow in this
    /// crate needs it.
    pub fn from_env() -> Result<Self, BookingError> {
        let supabase_url = env::var("SUPABASE_URL")
            .map_err(|_| BookingError::Config("SUPABASE_URL must be set".to_string()))?;
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| BookingError::Config("SUPABASE_ANON_KEY must be set".to_string()))?;

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
        })
    }
}
