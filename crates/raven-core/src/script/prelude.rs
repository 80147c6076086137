// ── Script prelude ──
//
// The modeling primitives as script globals. Each builder receives its
// arguments as JSON, delegates to `crate::primitives` or `crate::units`,
// and hands the serialized result back to the script as a plain object.
// Every binding except `env` is an ordinary global, so a model may
// redefine `Node` and friends; each run installs a fresh copy.

use std::collections::BTreeMap;

use rquickjs::function::Rest;
use rquickjs::{Ctx, Exception, Function, Object, Value};
use serde::Serialize;
use serde_json::{Map, Value as Json};

use super::fault::{INVALID_ARGUMENT_ERROR, RESOURCE_LIMIT_ERROR};
use super::json::{from_json, to_json};
use crate::error::{CoreError, EvaluationError, EvaluationErrorKind as Kind};
use crate::model::Mount;
use crate::primitives::{self, Port};
use crate::units::{self, Size, integral};

type Eval<T> = Result<T, EvaluationError>;

/// A builder sees its arguments (`None` for `undefined`) and the run's
/// heap budget in bytes.
type Builder = fn(&[Option<Json>], usize) -> Eval<Json>;

/// Rough per-element cost of builder output once it lives on the heap.
const RANGE_ITEM_BYTES: usize = 16;
const NIC_ITEM_BYTES: usize = 96;

const BUILDERS: &[(&str, Builder)] = &[
    ("Range", range),
    ("range", range),
    ("mod", modulo),
    ("Node", node),
    ("node", node),
    ("Switch", switch),
    ("switch", switch),
    ("Link", link),
    ("link", link),
    ("Image", image),
    ("image", image),
    ("Topo", topo),
    ("Nic", nic),
    ("B", bytes),
    ("bytes", bytes),
    ("KB", kibibytes),
    ("kibibytes", kibibytes),
    ("MB", mebibytes),
    ("mebibytes", mebibytes),
    ("GB", gibibytes),
    ("gibibytes", gibibytes),
    ("TB", tebibytes),
    ("tebibytes", tebibytes),
];

/// Runs after the builders are in place: the `flatmap` spelling older
/// models use, a frozen read-only `env`, frozen namespaces, and no clock
/// or randomness so a run depends only on its script and `env`.
const SETUP: &str = r"
Object.defineProperty(Array.prototype, 'flatmap', {
  value: Array.prototype.flatMap, writable: true, configurable: true,
});
Object.freeze(env);
Object.defineProperty(globalThis, 'env', {
  value: env, writable: false, enumerable: false, configurable: false,
});
delete Math.random;
delete globalThis.Date;
Object.freeze(Math);
Object.freeze(JSON);
Object.freeze(Object);
";

/// Install the builders and `env` into a fresh context.
pub fn install<'js>(
    ctx: &Ctx<'js>,
    env: &BTreeMap<String, String>,
    heap_budget: usize,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    for &(name, build) in BUILDERS {
        let function = Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
                call(&ctx, build, heap_budget, &args.0)
            },
        )?;
        globals.set(name, function)?;
    }

    let vars = Object::new(ctx.clone())?;
    for (key, value) in env {
        vars.set(key.as_str(), value.as_str())?;
    }
    globals.set("env", vars)?;
    ctx.eval::<(), _>(SETUP)
}

fn call<'js>(
    ctx: &Ctx<'js>,
    build: Builder,
    heap_budget: usize,
    args: &[Value<'js>],
) -> rquickjs::Result<Value<'js>> {
    let mut converted = Vec::with_capacity(args.len());
    for arg in args {
        converted.push(to_json(ctx, arg.clone())?);
    }
    match build(&converted, heap_budget) {
        Ok(out) => from_json(ctx, &out),
        Err(err) => Err(throw(ctx, &err)),
    }
}

/// Raise `err` as a script exception whose `name` records its kind.
fn throw(ctx: &Ctx<'_>, err: &EvaluationError) -> rquickjs::Error {
    let name = match err.kind {
        Kind::ResourceLimit => RESOURCE_LIMIT_ERROR,
        _ => INVALID_ARGUMENT_ERROR,
    };
    let exception = match Exception::from_message(ctx.clone(), &err.message) {
        Ok(exception) => exception,
        Err(e) => return e,
    };
    let object = exception.as_object();
    if let Err(e) = object.set("name", name) {
        return e;
    }
    ctx.throw(object.clone().into_value())
}

// ── Argument conversion ──────────────────────────────────────────────

fn invalid(message: impl Into<String>) -> EvaluationError {
    EvaluationError::new(Kind::InvalidArgument, message)
}

#[allow(clippy::needless_pass_by_value)]
fn from_core(err: CoreError) -> EvaluationError {
    match err {
        CoreError::InvalidArgument { message } => invalid(message),
        other => invalid(other.to_string()),
    }
}

/// Refuse to build `count` items that could not fit in the heap budget.
fn within_budget(what: &str, count: i64, item_bytes: usize, heap_budget: usize) -> Eval<()> {
    let fits = usize::try_from(count)
        .ok()
        .is_none_or(|n| n.saturating_mul(item_bytes) <= heap_budget);
    if fits {
        Ok(())
    } else {
        Err(EvaluationError::new(
            Kind::ResourceLimit,
            format!("{what} of {count} would exceed the {heap_budget} byte memory limit"),
        ))
    }
}

fn arg(args: &[Option<Json>], i: usize) -> Option<&Json> {
    args.get(i).and_then(Option::as_ref)
}

fn type_name(value: Option<&Json>) -> &'static str {
    match value {
        None => "undefined",
        Some(Json::Null) => "null",
        Some(Json::Bool(_)) => "boolean",
        Some(Json::Number(_)) => "number",
        Some(Json::String(_)) => "string",
        Some(Json::Array(_)) => "array",
        Some(Json::Object(_)) => "object",
    }
}

fn number(value: Option<&Json>) -> f64 {
    match value {
        Some(Json::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Json::Bool(b)) => f64::from(u8::from(*b)),
        Some(Json::Null) => 0.0,
        Some(Json::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn name_arg(args: &[Option<Json>], i: usize, what: &str) -> Eval<String> {
    match arg(args, i) {
        Some(v @ (Json::String(_) | Json::Number(_))) => Ok(text(v)),
        other => Err(invalid(format!(
            "{what} must be a string, got {}",
            type_name(other)
        ))),
    }
}

fn optional_text(args: &[Option<Json>], i: usize) -> Option<String> {
    match arg(args, i) {
        None | Some(Json::Null) => None,
        Some(v) => Some(text(v)),
    }
}

fn int_arg(args: &[Option<Json>], i: usize, what: &str) -> Eval<i64> {
    let n = number(arg(args, i));
    integral(n).ok_or_else(|| invalid(format!("{what} must be an integer, got {n}")))
}

fn level_arg(args: &[Option<Json>], i: usize) -> Eval<Option<i64>> {
    match arg(args, i) {
        None | Some(Json::Null) => Ok(None),
        Some(_) => int_arg(args, i, "level").map(Some),
    }
}

fn mounts_arg(args: &[Option<Json>], i: usize) -> Eval<Option<Vec<Mount>>> {
    match arg(args, i) {
        None | Some(Json::Null) => Ok(None),
        Some(json) => serde_json::from_value(json.clone())
            .map(Some)
            .map_err(|e| invalid(format!("mounts: {e}"))),
    }
}

fn port_arg(args: &[Option<Json>], i: usize) -> Port {
    match arg(args, i) {
        Some(Json::Number(n)) => Port::Number(n.as_f64().unwrap_or(f64::NAN)),
        Some(other) => Port::Name(text(other)),
        None => Port::Name("undefined".into()),
    }
}

fn output(value: &impl Serialize) -> Eval<Json> {
    serde_json::to_value(value)
        .map_err(|e| EvaluationError::new(Kind::Type, format!("cannot convert value: {e}")))
}

// ── Builders ─────────────────────────────────────────────────────────

fn range(args: &[Option<Json>], heap_budget: usize) -> Eval<Json> {
    let n = int_arg(args, 0, "range length")?;
    within_budget("a range", n, RANGE_ITEM_BYTES, heap_budget)?;
    output(&primitives::range(n).map_err(from_core)?)
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn modulo(args: &[Option<Json>], _: usize) -> Eval<Json> {
    let (n, m) = (number(arg(args, 0)), number(arg(args, 1)));
    match (integral(n), integral(m)) {
        (Some(n), Some(m)) => output(&primitives::modulo(n, m).map_err(from_core)?),
        _ if m == 0.0 => Err(invalid("modulus must be non-zero")),
        _ => output(&(((n % m) + m) % m)),
    }
}

fn node(args: &[Option<Json>], _: usize) -> Eval<Json> {
    let name = name_arg(args, 0, "node name")?;
    let level = level_arg(args, 1)?;
    let mounts = mounts_arg(args, 2)?;
    let (image, os) = (optional_text(args, 3), optional_text(args, 4));
    let mut node = primitives::node(
        name,
        level,
        mounts.clone().unwrap_or_default(),
        image.as_deref(),
        os.as_deref(),
    );
    node.mounts = mounts;
    output(&node)
}

fn switch(args: &[Option<Json>], _: usize) -> Eval<Json> {
    let name = name_arg(args, 0, "switch name")?;
    let level = level_arg(args, 1)?;
    let mounts = mounts_arg(args, 2)?;
    let mut switch = primitives::switch(name, level, mounts.clone().unwrap_or_default());
    switch.mounts = mounts;
    output(&switch)
}

fn link(args: &[Option<Json>], _: usize) -> Eval<Json> {
    let a = name_arg(args, 0, "link endpoint")?;
    let b = name_arg(args, 2, "link endpoint")?;
    let props = match arg(args, 4) {
        None | Some(Json::Null) => None,
        Some(Json::Object(map)) => Some(map.clone()),
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".into(), other.clone());
            Some(map)
        }
    };
    let link = primitives::link(&a, port_arg(args, 1), &b, port_arg(args, 3), props);
    output(&link)
}

fn image(args: &[Option<Json>], _: usize) -> Eval<Json> {
    let name = name_arg(args, 0, "image name")?;
    let (arch, version) = (optional_text(args, 1), optional_text(args, 2));
    output(&primitives::image(name, arch.as_deref(), version.as_deref()))
}

/// Entries stay as authored: they are checked by the validator, not here.
fn topo(args: &[Option<Json>], _: usize) -> Eval<Json> {
    let mut doc = Map::new();
    for (i, key) in ["nodes", "images", "links", "switches"].into_iter().enumerate() {
        if let Some(value) = arg(args, i) {
            doc.insert(key.into(), value.clone());
        }
    }
    Ok(Json::Object(doc))
}

fn nic(args: &[Option<Json>], heap_budget: usize) -> Eval<Json> {
    let n = int_arg(args, 0, "nic count")?;
    within_budget("a nic list", n, NIC_ITEM_BYTES, heap_budget)?;
    let speed = arg(args, 1).cloned().unwrap_or_default();
    let kind = arg(args, 2).cloned().unwrap_or_default();
    output(&primitives::nic(n, speed, kind).map_err(from_core)?)
}

fn size(args: &[Option<Json>], build: fn(f64) -> Result<Size, CoreError>) -> Eval<Json> {
    output(&build(number(arg(args, 0))).map_err(from_core)?)
}

fn bytes(args: &[Option<Json>], _: usize) -> Eval<Json> {
    size(args, units::bytes)
}

fn kibibytes(args: &[Option<Json>], _: usize) -> Eval<Json> {
    size(args, units::kibibytes)
}

fn mebibytes(args: &[Option<Json>], _: usize) -> Eval<Json> {
    size(args, units::mebibytes)
}

fn gibibytes(args: &[Option<Json>], _: usize) -> Eval<Json> {
    size(args, units::gibibytes)
}

fn tebibytes(args: &[Option<Json>], _: usize) -> Eval<Json> {
    size(args, units::tebibytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(values: &[Json]) -> Vec<Option<Json>> {
        values.iter().cloned().map(Some).collect()
    }

    #[test]
    fn node_keeps_absent_mounts_absent() {
        let out = node(&args(&[json!("n0"), json!(1)]), 1024).unwrap();
        assert_eq!(out, json!({ "name": "n0", "level": 1 }));
    }

    #[test]
    fn link_normalizes_numeric_ports() {
        let out = link(&args(&[json!("a"), json!(1), json!("sw"), json!("swp1")]), 1024).unwrap();
        assert_eq!(out["name"], json!("a_1-sw_swp1"));
        assert_eq!(out["props"], json!({}));
    }

    #[test]
    fn oversized_counts_hit_the_budget() {
        let err = range(&args(&[json!(1_000_000)]), 1024).unwrap_err();
        assert_eq!(err.kind, Kind::ResourceLimit);
        let err = nic(&args(&[json!(1_000_000), json!(1), json!(0)]), 1024).unwrap_err();
        assert_eq!(err.kind, Kind::ResourceLimit);
    }

    #[test]
    fn negative_range_is_invalid() {
        let err = range(&args(&[json!(-1)]), 1024).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidArgument);
    }
}
