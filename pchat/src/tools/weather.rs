//! `getWeather`: current conditions and forecast for a coordinate pair.

use std::sync::Arc;

use pcommon::BoxFuture;
use ptooling::{
    ParameterSchema, ParameterSpec, Tool, ToolExecutionContext, ToolFuture, ToolKind, ToolOutcome,
    required_number,
};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::ChatError;

pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com";

pub trait ForecastSource: Send + Sync {
    /// Raw forecast JSON for the coordinates.
    fn forecast<'a>(&'a self, latitude: f64, longitude: f64)
    -> BoxFuture<'a, Result<Value, ChatError>>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    client: Client,
    base_url: String,
}

impl OpenMeteoForecast {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, OPEN_METEO_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn forecast_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/v1/forecast?latitude={latitude}&longitude={longitude}&current=temperature_2m&hourly=temperature_2m&daily=sunrise,sunset&timezone=auto",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl ForecastSource for OpenMeteoForecast {
    fn forecast<'a>(
        &'a self,
        latitude: f64,
        longitude: f64,
    ) -> BoxFuture<'a, Result<Value, ChatError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.forecast_url(latitude, longitude))
                .send()
                .await
                .map_err(|err| ChatError::tooling(format!("forecast request failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ChatError::tooling(format!(
                    "forecast service returned {status}"
                )));
            }

            response
                .json::<Value>()
                .await
                .map_err(|err| ChatError::tooling(format!("forecast body is not json: {err}")))
        })
    }
}

pub struct WeatherTool {
    source: Arc<dyn ForecastSource>,
    schema: ParameterSchema,
}

impl WeatherTool {
    pub fn new(source: Arc<dyn ForecastSource>) -> Self {
        Self {
            source,
            schema: ParameterSchema::new()
                .with(ParameterSpec::number("latitude", "Latitude of the location"))
                .with(ParameterSpec::number("longitude", "Longitude of the location")),
        }
    }
}

impl Tool for WeatherTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Weather
    }

    fn description(&self) -> &str {
        "Get the current weather at a location"
    }

    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn execute<'a>(
        &'a self,
        args: Map<String, Value>,
        _context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, ToolOutcome> {
        Box::pin(async move {
            let coordinates = required_number(&args, "latitude")
                .and_then(|latitude| Ok((latitude, required_number(&args, "longitude")?)));
            let (latitude, longitude) = match coordinates {
                Ok(coordinates) => coordinates,
                Err(err) => return ToolOutcome::failure(err.message),
            };

            match self.source.forecast(latitude, longitude).await {
                Ok(forecast) => ToolOutcome::success(forecast),
                Err(err) => {
                    tracing::warn!(error = %err, latitude, longitude, "weather lookup failed");
                    ToolOutcome::failure(err.message)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_url_requests_current_hourly_and_daily_fields() {
        let source = OpenMeteoForecast::with_base_url(Client::new(), "http://localhost:9/");
        assert_eq!(
            source.forecast_url(31.5, 74.35),
            "http://localhost:9/v1/forecast?latitude=31.5&longitude=74.35&current=temperature_2m&hourly=temperature_2m&daily=sunrise,sunset&timezone=auto"
        );
    }
}
