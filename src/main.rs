use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use bluewaves::config::AppConfig;
use bluewaves::services::accommodation::{AccommodationEngine, StayRequest};
use bluewaves::store::supabase::SupabaseStore;

/// Availability smoke check against the live store:
/// `bluewaves <accommodation_id> <check_in> <check_out> <party_size>`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        anyhow::bail!("usage: {} <accommodation_id> <check_in> <check_out> <party_size>", args[0]);
    }
    let accommodation_id: i64 = args[1].parse()?;
    let stay = StayRequest {
        check_in: args[2].parse()?,
        check_out: args[3].parse()?,
        party_size: args[4].parse()?,
    };

    let config = AppConfig::from_env()?;
    let store = Arc::new(SupabaseStore::new(&config));
    let engine = AccommodationEngine::new(store);

    let view = engine.availability(accommodation_id).await?;
    tracing::info!(
        accommodation = %view.accommodation.name,
        capacity = view.accommodation.capacity,
        "loaded availability"
    );

    match view.validate(&stay) {
        Ok(()) => {
            println!("available: {} nights for {}", stay.nights(), stay.party_size);
            if let Some(quote) = view.quote(&stay) {
                println!("total: {:.2} EUR", quote.total);
            }
        }
        Err(e) => println!("not available: {e}"),
    }

    Ok(())
}
