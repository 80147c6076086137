// Conversion between engine values and JSON.
//
// Goes through the engine's own `JSON.stringify`/`JSON.parse`, so
// `undefined` and functions vanish from objects and become `null` in
// arrays, non-finite numbers become `null`, and cycles are a `TypeError`.
// Integral numbers come back as JSON integers.

use rquickjs::{Ctx, Exception, Value};
use serde_json::Number;

use crate::units::integral;

/// Convert an engine value. `None` for values with no JSON form.
pub fn to_json<'js>(
    ctx: &Ctx<'js>,
    value: Value<'js>,
) -> rquickjs::Result<Option<serde_json::Value>> {
    let Some(text) = ctx.json_stringify(value)? else {
        return Ok(None);
    };
    let text = text.to_string()?;
    serde_json::from_str(&text)
        .map(|json| Some(integers(json)))
        .map_err(|e| Exception::throw_type(ctx, &format!("cannot read script value: {e}")))
}

/// Build an engine value from JSON, allocated on the run's heap.
pub fn from_json<'js>(ctx: &Ctx<'js>, json: &serde_json::Value) -> rquickjs::Result<Value<'js>> {
    let text = serde_json::to_string(json)
        .map_err(|e| Exception::throw_internal(ctx, &format!("cannot encode value: {e}")))?;
    ctx.json_parse(text)
}

/// Rewrite floats with no fractional part (e.g. `1e21` notation) as integers.
fn integers(json: serde_json::Value) -> serde_json::Value {
    match json {
        serde_json::Value::Number(n) if n.is_f64() => n
            .as_f64()
            .and_then(integral)
            .map_or(serde_json::Value::Number(n), |i| {
                serde_json::Value::Number(Number::from(i))
            }),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(integers).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter().map(|(k, v)| (k, integers(v))).collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};
    use serde_json::json;

    fn with_ctx(f: impl FnOnce(&Ctx<'_>)) {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| f(&ctx));
    }

    #[test]
    fn stringify_semantics() {
        with_ctx(|ctx| {
            let value: Value = ctx
                .eval("({ a: 1, skip: undefined, f() {}, half: 0.5, inf: Infinity, list: [undefined, 'x'] })")
                .unwrap();
            assert_eq!(
                to_json(ctx, value).unwrap().unwrap(),
                json!({ "a": 1, "half": 0.5, "inf": null, "list": [null, "x"] })
            );

            let nothing: Value = ctx.eval("undefined").unwrap();
            assert_eq!(to_json(ctx, nothing).unwrap(), None);
        });
    }

    #[test]
    fn shared_references_are_allowed_cycles_are_not() {
        with_ctx(|ctx| {
            let shared: Value = ctx.eval("const s = [1]; [s, s]").unwrap();
            assert_eq!(to_json(ctx, shared).unwrap().unwrap(), json!([[1], [1]]));

            let cyclic: Value = ctx.eval("const c = {}; c.self = c; c").unwrap();
            assert!(to_json(ctx, cyclic).is_err());
        });
    }

    #[test]
    fn round_trip_through_engine() {
        with_ctx(|ctx| {
            let doc = json!({ "name": "n0", "level": 2, "mounts": [{ "source": "/a", "point": "/b" }] });
            let value = from_json(ctx, &doc).unwrap();
            assert_eq!(to_json(ctx, value).unwrap().unwrap(), doc);
        });
    }

    #[test]
    fn integral_floats_become_integers() {
        assert_eq!(integers(json!([4.0, 0.5, { "n": 2.0 }])), json!([4, 0.5, { "n": 2 }]));
    }
}
