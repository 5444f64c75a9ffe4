//! Browser smoke tests: `wasm-pack test --headless --chrome crates/sentinel-web`.

#![cfg(target_arch = "wasm32")]

use sentinel_web::ScrollSentinel;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn noop() -> js_sys::Function {
    js_sys::Function::new_no_args("")
}

#[wasm_bindgen_test]
fn missing_container_is_reported_to_js() {
    let err = ScrollSentinel::new(r##"{"container_selector":"#no-such-feed"}"##, noop())
        .err()
        .expect("no container on the test page");
    let message = err.as_string().unwrap_or_default();
    assert!(message.contains("content container not found"), "{message}");
}

#[wasm_bindgen_test]
fn starts_over_a_live_container() {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .expect("document");
    let body = document.body().expect("body");
    let feed = document.create_element("div").expect("div");
    feed.set_id("sentinel-test-feed");
    body.append_child(&feed).expect("append feed");
    let marker = document.create_element("div").expect("div");
    marker.set_id("s1");
    marker.set_class_name("sentinel");
    feed.append_child(&marker).expect("append marker");

    let sentinel = ScrollSentinel::new(r##"{"container_selector":"#sentinel-test-feed"}"##, noop())
        .expect("starts");
    assert_eq!(sentinel.observed_count(), 1);
    assert!(sentinel.stats_json().contains("\"installs\":1"));

    body.remove_child(&feed).expect("remove feed");
}

#[wasm_bindgen_test]
fn init_logging_forwards_tracing_to_the_console_logger() {
    sentinel_web::init_logging();
    sentinel_web::init_logging();
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
    tracing::warn!(marker = "s1", "console logging smoke event");
}
