//! JavaScript snippets behind the default [`BrowserDriver`] methods
//!
//! Every snippet takes the target selector as `arguments[0]` (`null` for the
//! page) and returns either a JSON array of numbers, a boolean, or `null`
//! when the selector matches nothing.
//!
//! [`BrowserDriver`]: super::BrowserDriver

use serde_json::Value;

use super::ScrollTarget;
use crate::error::{CaptureError, CaptureResult};

/// Scrolls the page or an element to `(arguments[1], arguments[2])`
pub const SCROLL_TO: &str = r#"
var target = arguments[0] === null ? null : document.querySelector(arguments[0]);
if (arguments[0] !== null && !target) { return false; }
if (target) {
    target.scrollLeft = arguments[1];
    target.scrollTop = arguments[2];
} else {
    window.scrollTo(arguments[1], arguments[2]);
}
return true;
"#;

/// Returns `[scrollX, scrollY]` of the page or an element
pub const CURRENT_SCROLL: &str = r#"
if (arguments[0] === null) {
    return [window.pageXOffset || document.documentElement.scrollLeft,
            window.pageYOffset || document.documentElement.scrollTop];
}
var el = document.querySelector(arguments[0]);
return el ? [el.scrollLeft, el.scrollTop] : null;
"#;

/// Returns `[x, y, width, height]` of the scrolled viewport in viewport
/// coordinates: the document client area for the page, the client box for
/// an element
pub const MEASURE_VIEWPORT: &str = r#"
if (arguments[0] === null) {
    var root = document.documentElement;
    return [0, 0, root.clientWidth || window.innerWidth, root.clientHeight || window.innerHeight];
}
var el = document.querySelector(arguments[0]);
if (!el) { return null; }
var r = el.getBoundingClientRect();
return [r.left + el.clientLeft, r.top + el.clientTop, el.clientWidth, el.clientHeight];
"#;

/// Returns `[scrollWidth, scrollHeight]` of the page or an element
pub const MEASURE_CONTENT: &str = r#"
if (arguments[0] === null) {
    var root = document.documentElement, body = document.body || root;
    return [Math.max(root.scrollWidth, body.scrollWidth, root.clientWidth),
            Math.max(root.scrollHeight, body.scrollHeight, root.clientHeight)];
}
var el = document.querySelector(arguments[0]);
return el ? [el.scrollWidth, el.scrollHeight] : null;
"#;

/// Returns `window.devicePixelRatio`
pub const DEVICE_PIXEL_RATIO: &str = "return window.devicePixelRatio || 1;";

/// Returns `[x, y, width, height]` of an element's border box in page
/// coordinates
pub const LOCATE: &str = r#"
var el = document.querySelector(arguments[0]);
if (!el) { return null; }
var r = el.getBoundingClientRect();
return [r.left + window.pageXOffset, r.top + window.pageYOffset, r.width, r.height];
"#;

/// Scrolls an element into view with `block: arguments[1]`
pub const SCROLL_INTO_VIEW: &str = r#"
var el = document.querySelector(arguments[0]);
if (!el) { return false; }
el.scrollIntoView({block: arguments[1], inline: 'nearest'});
return true;
"#;

/// Wraps a wait-condition expression so it evaluates to a boolean
pub fn wait_condition(expression: &str) -> String {
    format!("return !!({expression});")
}

/// First script argument for a scroll target
pub fn target_arg(target: &ScrollTarget) -> Value {
    match target {
        ScrollTarget::Page => Value::Null,
        ScrollTarget::Element(selector) => Value::String(selector.clone()),
    }
}

/// Reads a JSON array of exactly `N` numbers
///
/// `null` means the selector matched nothing and yields `Ok(None)`.
pub fn numbers<const N: usize>(value: &Value, what: &str) -> CaptureResult<Option<[f64; N]>> {
    if value.is_null() {
        return Ok(None);
    }

    let items = value
        .as_array()
        .filter(|items| items.len() == N)
        .ok_or_else(|| unexpected(what, value))?;

    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or_else(|| unexpected(what, value))?;
    }

    Ok(Some(out))
}

/// Reads a single number
pub fn number(value: &Value, what: &str) -> CaptureResult<f64> {
    value.as_f64().ok_or_else(|| unexpected(what, value))
}

/// JavaScript truthiness of a returned value
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn unexpected(what: &str, value: &Value) -> CaptureError {
    CaptureError::ScriptFailed {
        reason: format!("{what} returned an unexpected value: {value}"),
    }
}
