use std::fmt::Display;
use std::future::ready;

use chrono::{DateTime, Local, TimeZone, Utc};
use parley_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, JsonSchema)]
pub struct CurrentTimeToolParameters {
    #[serde(default)]
    #[schemars(
        description = "Return the time in UTC instead of the local time zone."
    )]
    utc: bool,
}

/// A tool that tells the model the current time and date.
pub struct CurrentTimeTool {
    parameter_schema: Value,
}

impl CurrentTimeTool {
    /// Creates a new current time tool.
    #[inline]
    pub fn new() -> Self {
        CurrentTimeTool {
            parameter_schema: schema_for!(CurrentTimeToolParameters).to_value(),
        }
    }
}

impl Default for CurrentTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

fn format_time<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.format("Current time and date: %H:%M:%S on %A, %B %-d, %Y (UTC%:z)")
        .to_string()
}

impl Tool for CurrentTimeTool {
    type Input = CurrentTimeToolParameters;

    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Returns the current time and date in a human-readable format."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: CurrentTimeToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let text = if input.utc {
            format_time(&Utc::now())
        } else {
            format_time(&Local::now())
        };
        ready(Ok(text))
    }
}
