//! Loose decoding of rules and selectors from JSON values
//!
//! Field names are matched case-insensitively. Durations are milliseconds and
//! may be fractional. Fields that fail to decode are collected per key rather
//! than aborting at the first problem.

use crate::error_set::ErrorSet;
use crate::node::ExprType;
use crate::rules::{Rule, Selector};
use crate::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

fn invalid(msg: impl Into<String>) -> Error {
    Error::Decode(msg.into())
}

/// Decodes the recognized fields of `raw` into `rule`; the rest becomes `extra`
pub(crate) fn decode_rule(rule: &mut Rule, raw: Map<String, Value>) -> Result<(), ErrorSet> {
    let mut errs = ErrorSet::new();

    for (key, value) in raw {
        let outcome = match key.to_ascii_lowercase().as_str() {
            "method" => to_method(&value).map(|m| rule.method = m),
            "url" => to_url(&value).map(|u| rule.url = Some(u)),
            "proxy" => to_url(&value).map(|u| rule.proxy = Some(u)),
            "header" => to_header(&value).map(|h| rule.header = h),
            "timeout" => to_duration(&value).map(|d| rule.timeout = d),
            "cookies" => to_bool(&value).map(|b| rule.cookies = b),
            "ignorerobotstxt" => to_bool(&value).map(|b| rule.ignore_robots_txt = b),
            "delay" => to_duration(&value).map(|d| rule.delay = d),
            "redirects" => to_count(&value).map(|n| rule.redirects = n as usize),
            "responsebodysize" => to_count(&value).map(|n| rule.response_body_size = n),
            "selectors" => match to_selectors(value) {
                Ok(selectors) => {
                    rule.selectors = selectors;
                    Ok(())
                }
                Err(set) => Err(Error::Set(set)),
            },
            _ => {
                rule.extra.insert(key, value);
                continue;
            }
        };

        if let Err(err) = outcome {
            errs.add(key, err);
        }
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}

/// Decodes one selector; a bare string is shorthand for `{"expr": value}`
pub(crate) fn decode_selector(name: &str, value: Value) -> Result<Selector, ErrorSet> {
    let mut selector = Selector {
        name: name.to_string(),
        ..Selector::default()
    };

    let raw = match value {
        Value::String(expr) => {
            selector.expr = expr;
            return Ok(selector);
        }
        Value::Object(raw) => raw,
        _ => {
            let mut errs = ErrorSet::new();
            errs.add(name, invalid("invalid selector"));
            return Err(errs);
        }
    };

    let mut errs = ErrorSet::new();
    for (key, value) in raw {
        let outcome = match key.to_ascii_lowercase().as_str() {
            "name" => to_string(&value).map(|s| selector.name = s),
            "expr" => to_string(&value).map(|s| selector.expr = s),
            "type" => to_expr_type(&value).map(|t| selector.expr_type = t),
            "all" => to_bool(&value).map(|b| selector.all = b),
            "follow" => to_bool(&value).map(|b| selector.follow = b),
            "method" => to_method(&value).map(|m| selector.method = Some(m)),
            "proxy" => to_url(&value).map(|u| selector.proxy = Some(u)),
            "header" => to_header(&value).map(|h| selector.header = Some(h)),
            "timeout" => to_duration(&value).map(|d| selector.timeout = d),
            "selectors" => match to_selectors(value) {
                Ok(selectors) => {
                    selector.selectors = selectors;
                    Ok(())
                }
                Err(set) => Err(Error::Set(set)),
            },
            _ => {
                selector.extra.insert(key, value);
                continue;
            }
        };

        if let Err(err) = outcome {
            errs.add(key, err);
        }
    }

    if errs.is_empty() {
        Ok(selector)
    } else {
        Err(errs)
    }
}

/// Decodes a `name -> selector` object into selectors ordered by name
fn to_selectors(value: Value) -> Result<Vec<Selector>, ErrorSet> {
    let raw = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(raw) => raw,
        _ => {
            let mut errs = ErrorSet::new();
            errs.add("#", invalid("invalid selectors"));
            return Err(errs);
        }
    };

    let mut selectors = Vec::with_capacity(raw.len());
    let mut errs = ErrorSet::new();

    for (name, value) in raw {
        if name.is_empty() || value.is_null() {
            continue;
        }

        match decode_selector(&name, value) {
            Ok(selector) => selectors.push(selector),
            Err(set) => {
                // a single bad shorthand reports under its own name already
                if set.len() == 1 && set.get(&name).is_some() {
                    errs.add(name, invalid("invalid selector"));
                } else {
                    errs.add_set(name, set);
                }
            }
        }
    }

    if errs.is_empty() {
        Ok(selectors)
    } else {
        Err(errs)
    }
}

fn to_string(value: &Value) -> Result<String, Error> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| invalid("must be a string"))
}

fn to_bool(value: &Value) -> Result<bool, Error> {
    value.as_bool().ok_or_else(|| invalid("must be a boolean"))
}

fn to_method(value: &Value) -> Result<Method, Error> {
    let s = to_string(value)?;
    if s.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(s.to_ascii_uppercase().as_bytes())
        .map_err(|_| invalid(format!("invalid method {:?}", s)))
}

fn to_url(value: &Value) -> Result<Url, Error> {
    let s = value.as_str().ok_or_else(|| invalid("must be a string"))?;
    Ok(Url::parse(s)?)
}

fn to_expr_type(value: &Value) -> Result<Option<ExprType>, Error> {
    let s = to_string(value)?;
    if s.is_empty() {
        return Ok(None);
    }
    s.parse().map(Some).map_err(invalid)
}

fn to_count(value: &Value) -> Result<u64, Error> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| invalid("must be a non-negative number")),
        _ => Err(invalid("must be a number")),
    }
}

/// Milliseconds to a duration; non-positive values become zero
fn to_duration(value: &Value) -> Result<Duration, Error> {
    let ms = value.as_f64().ok_or_else(|| invalid("must be a number"))?;
    if ms <= 0.0 || !ms.is_finite() {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_nanos((ms * 1_000_000.0).round() as u64))
}

fn to_header(value: &Value) -> Result<HeaderMap, Error> {
    let mut header = HeaderMap::new();

    let raw = match value {
        Value::Null => return Ok(header),
        Value::Object(raw) => raw,
        _ => return Err(invalid("invalid header")),
    };

    for (name, value) in raw {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| invalid(format!("invalid header name {:?}", name)))?;

        let values: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().ok_or_else(|| invalid("invalid header")))
                .collect::<Result<_, _>>()?,
            _ => return Err(invalid("invalid header")),
        };

        for v in values {
            let v = HeaderValue::from_str(v).map_err(|_| invalid("invalid header value"))?;
            header.append(name.clone(), v);
        }
    }

    Ok(header)
}
