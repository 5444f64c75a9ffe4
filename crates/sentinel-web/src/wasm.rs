//! `wasm-bindgen` surface: `ScrollSentinel` and `initLogging`.

use std::rc::Rc;

use js_sys::Function;
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::dom::{DomHost, js_message};
use crate::runner_core::RunnerCore;

/// Infinite-scroll trigger over the page document.
///
/// ```js
/// const sentinel = new ScrollSentinel('{"container_selector":"#feed"}', (id) => loadMore(id));
/// ```
#[wasm_bindgen]
pub struct ScrollSentinel {
    core: RunnerCore<DomHost>,
}

#[wasm_bindgen]
impl ScrollSentinel {
    /// Start watching. `config_json` may be empty for the defaults. The
    /// callback receives the marker id of each sentinel that comes near the
    /// viewport.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, callback: Function) -> Result<ScrollSentinel, JsValue> {
        let host = DomHost::from_window().map_err(|err| JsValue::from_str(&err.to_string()))?;
        let notify = move |id: &str| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(id)) {
                warn!(marker = id, error = %js_message(&err), "visibility callback threw");
            }
        };
        let core = RunnerCore::start(Rc::new(host), config_json, notify)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(Self { core })
    }

    /// Re-query the marker selector now. Returns the number of markers
    /// observed afterwards.
    pub fn rearm(&self) -> Result<u32, JsValue> {
        let count = self
            .core
            .rearm()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    #[wasm_bindgen(js_name = observedCount)]
    pub fn observed_count(&self) -> u32 {
        u32::try_from(self.core.observed_count()).unwrap_or(u32::MAX)
    }

    #[wasm_bindgen(js_name = statsJson)]
    pub fn stats_json(&self) -> String {
        self.core.stats_json()
    }

    #[wasm_bindgen(js_name = configJson)]
    pub fn config_json(&self) -> String {
        self.core.config_json()
    }
}

/// Route `tracing` output to the devtools console and install the panic hook.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    crate::logging::init_logging();
}
