use crate::core::BrowserTrait;
use crate::errors::{InspectorError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub struct JavaScriptRunner;

impl JavaScriptRunner {
    pub async fn execute<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        script: &str,
    ) -> Result<Value> {
        browser.execute_script(tab, script).await
    }

    pub async fn execute_with_timeout<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        script: &str,
        timeout_ms: u64,
    ) -> Result<Value> {
        let execution = browser.execute_script(tab, script);

        tokio::time::timeout(tokio::time::Duration::from_millis(timeout_ms), execution)
            .await
            .map_err(|_| InspectorError::JavaScriptTimeout)?
    }

    /// Run a script and decode its result. Scripts may return the value
    /// directly or as a `JSON.stringify` string.
    pub async fn execute_json<B: BrowserTrait, T: DeserializeOwned>(
        browser: &B,
        tab: &B::TabHandle,
        script: &str,
        timeout_ms: u64,
    ) -> Result<T> {
        let value = Self::execute_with_timeout(browser, tab, script, timeout_ms).await?;
        decode_json(value)
    }

    pub async fn wait_for_condition<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        condition: &str,
        timeout_ms: u64,
        poll_interval_ms: u64,
    ) -> Result<bool> {
        let start_time = std::time::Instant::now();
        let timeout = tokio::time::Duration::from_millis(timeout_ms);
        let poll_interval = tokio::time::Duration::from_millis(poll_interval_ms);

        while start_time.elapsed() < timeout {
            let result = browser.execute_script(tab, condition).await?;
            if let Some(true) = result.as_bool() {
                return Ok(true);
            }

            tokio::time::sleep(poll_interval).await;
        }

        Ok(false)
    }
}

pub fn decode_json<T: DeserializeOwned>(value: Value) -> Result<T> {
    match value {
        Value::String(raw) => Ok(serde_json::from_str(&raw)?),
        other => Ok(serde_json::from_value(other)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_accepts_string_and_object() {
        let direct: Vec<u32> = decode_json(json!([1, 2])).unwrap();
        let stringified: Vec<u32> = decode_json(json!("[1,2]")).unwrap();
        assert_eq!(direct, stringified);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result: Result<Vec<u32>> = decode_json(json!("not json"));
        assert!(matches!(result, Err(InspectorError::SerializationError(_))));
    }
}
