//! Alert thresholds and notification channels.

use super::{degrade, ApiClient, Call};
use crate::error::{ApiError, ApiResult};
use crate::normalize::list_from_value;
use crate::types::{NotificationChannel, Threshold};

fn to_body<T: serde::Serialize>(v: &T) -> ApiResult<serde_json::Value> {
    serde_json::to_value(v).map_err(|e| ApiError::Decode(e.to_string()))
}

impl ApiClient {
    pub async fn thresholds(&self) -> Vec<Threshold> {
        let result = self.fetch(Call::get("thresholds/")).await.map(list_from_value);
        degrade("thresholds", result, Vec::new)
    }

    pub async fn create_threshold(&self, threshold: &Threshold) -> ApiResult<Threshold> {
        threshold.validate()?;
        self.fetch_as(Call::post("thresholds/").json(to_body(threshold)?))
            .await
    }

    pub async fn update_threshold(&self, id: i64, threshold: &Threshold) -> ApiResult<Threshold> {
        threshold.validate()?;
        self.fetch_as(Call::put(format!("thresholds/{id}/")).json(to_body(threshold)?))
            .await
    }

    pub async fn delete_threshold(&self, id: i64) -> ApiResult<()> {
        self.fetch(Call::delete(format!("thresholds/{id}/"))).await?;
        Ok(())
    }

    pub async fn notification_channels(&self) -> Vec<NotificationChannel> {
        let result = self
            .fetch(Call::get("notifications/"))
            .await
            .map(list_from_value);
        degrade("notification channels", result, Vec::new)
    }

    pub async fn create_notification_channel(
        &self,
        channel: &NotificationChannel,
    ) -> ApiResult<NotificationChannel> {
        channel.validate()?;
        self.fetch_as(Call::post("notifications/").json(to_body(channel)?))
            .await
    }

    pub async fn update_notification_channel(
        &self,
        id: i64,
        channel: &NotificationChannel,
    ) -> ApiResult<NotificationChannel> {
        channel.validate()?;
        self.fetch_as(Call::put(format!("notifications/{id}/")).json(to_body(channel)?))
            .await
    }

    pub async fn delete_notification_channel(&self, id: i64) -> ApiResult<()> {
        self.fetch(Call::delete(format!("notifications/{id}/"))).await?;
        Ok(())
    }
}
