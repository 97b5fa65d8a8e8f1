use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::RecordStore;
use crate::config::AppConfig;
use crate::models::{
    Accommodation, Activity, ClassBookingRow, DailyRemaining, NewReservation, Pack, Reservation,
    Timeslot, TimeslotRemaining,
};

/// PostgREST client for the hosted Supabase project. Query-by-equality and
/// ordering go through the REST surface; the availability aggregations are
/// database functions called via `/rpc/`.
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<Vec<T>> {
        let resp = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("failed to query table {table}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("store returned {status} for {table}: {body}");
        }

        resp.json::<Vec<T>>()
            .await
            .with_context(|| format!("failed to parse rows from {table}"))
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        args: serde_json::Value,
    ) -> anyhow::Result<T> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&args)
            .send()
            .await
            .with_context(|| format!("failed to call rpc {function}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("rpc {function} returned {status}: {body}");
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("failed to parse rpc {function} response"))
    }

    async fn insert<T: serde::Serialize>(&self, table: &str, rows: &T) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await
            .with_context(|| format!("failed to insert into {table}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("insert into {table} returned {status}: {body}");
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn accommodation(&self, id: i64) -> anyhow::Result<Option<Accommodation>> {
        let mut rows: Vec<Accommodation> = self
            .select(
                "accommodations",
                &[("id", format!("eq.{id}")), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn reservations_for(&self, accommodation_id: i64) -> anyhow::Result<Vec<Reservation>> {
        self.select(
            "reservations",
            &[
                ("accommodation_id", format!("eq.{accommodation_id}")),
                ("order", "check_in.asc".to_string()),
            ],
        )
        .await
    }

    async fn insert_reservation(&self, row: &NewReservation) -> anyhow::Result<()> {
        tracing::info!(
            accommodation_id = row.accommodation_id,
            check_in = %row.check_in,
            check_out = %row.check_out,
            party_size = row.party_size,
            "inserting reservation"
        );
        self.insert("reservations", row).await
    }

    async fn pack(&self, id: i64) -> anyhow::Result<Option<Pack>> {
        let mut rows: Vec<Pack> = self
            .select(
                "packs",
                &[("id", format!("eq.{id}")), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn activity(&self, id: i64) -> anyhow::Result<Option<Activity>> {
        let mut rows: Vec<Activity> = self
            .select(
                "activities",
                &[("id", format!("eq.{id}")), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn timeslots_for(&self, activity_id: i64) -> anyhow::Result<Vec<Timeslot>> {
        self.select(
            "activity_timeslots",
            &[
                ("activity_id", format!("eq.{activity_id}")),
                ("order", "start_time.asc".to_string()),
            ],
        )
        .await
    }

    async fn slot_availability_for_range(
        &self,
        activity_id: i64,
        timeslot_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyRemaining>> {
        self.rpc(
            "slot_availability_for_range",
            json!({
                "p_activity_id": activity_id,
                "p_timeslot_id": timeslot_id,
                "p_date_from": from,
                "p_date_to": to,
            }),
        )
        .await
    }

    async fn slot_availability_for_date(
        &self,
        activity_id: i64,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<TimeslotRemaining>> {
        self.rpc(
            "slot_availability_for_date",
            json!({
                "p_activity_id": activity_id,
                "p_date": date,
            }),
        )
        .await
    }

    async fn insert_class_bookings(&self, rows: &[ClassBookingRow]) -> anyhow::Result<()> {
        tracing::info!(rows = rows.len(), "inserting pack booking batch");
        self.insert("user_packs", &rows).await
    }
}
