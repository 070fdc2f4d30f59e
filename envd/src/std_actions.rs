//! Demo action set served by the `envd` binary.
//!
//! A mock robot-cell environment: a capture action returning an image
//! payload, three motion actions, and the conveyor constants. Real
//! deployments build their own registry and serve it the same way.

use std::collections::BTreeMap;

use wire_types::Value;

use crate::registry::{ActionDef, ActionRegistry};

/// Smallest valid PNG (1x1, transparent). Stands in for a camera frame.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Resolve one named parameter: positional first, keyword fallback.
fn param<'a>(
    args: &'a [Value],
    kwargs: &'a BTreeMap<String, Value>,
    index: usize,
    name: &str,
) -> Option<&'a Value> {
    args.get(index).or_else(|| kwargs.get(name))
}

fn float_param(
    args: &[Value],
    kwargs: &BTreeMap<String, Value>,
    index: usize,
    name: &str,
) -> anyhow::Result<f64> {
    param(args, kwargs, index, name)
        .and_then(Value::as_float)
        .ok_or_else(|| anyhow::anyhow!("missing or non-numeric parameter '{name}'"))
}

/// Build the demo registry.
pub fn demo_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    registry.register_const(
        "conveyor_belt_bbox",
        Value::List(vec![
            Value::Int(0),
            Value::Int(0),
            Value::Int(20),
            Value::Int(100),
        ]),
        "The bounding box coordinates of the conveyor belt as (x_0, y_0, x_1, y_1).",
    );
    registry.register_const(
        "conveyor_belt_height",
        Value::Int(10),
        "The height the conveyor belt is placed at.",
    );

    // Registration order is the advertised discovery order.
    let result: anyhow::Result<()> = (|| {
        registry.register_action(
            ActionDef::new(
                "capture_image",
                "Captures an image from the webcam and returns it as an image payload.",
                "(brightness: float = 1.5, contrast: float = 1.5) -> image",
            ),
            |_args, _kwargs| Ok(Value::Image(PLACEHOLDER_PNG.to_vec())),
        )?;

        registry.register_action(
            ActionDef::new(
                "grab_object",
                "Commands the robot to grab the object at its current position.",
                "() -> bool",
            ),
            |_args, _kwargs| Ok(Value::Bool(true)),
        )?;

        registry.register_action(
            ActionDef::new(
                "release_object",
                "Commands the robot to release a currently held object.",
                "() -> bool",
            ),
            |_args, _kwargs| Ok(Value::Bool(true)),
        )?;

        registry.register_action(
            ActionDef::new(
                "move_to",
                "Commands the robot to move to a specified (x, y) position in world space.",
                "(x: float, y: float) -> bool",
            ),
            |args, kwargs| {
                let x = float_param(&args, &kwargs, 0, "x")?;
                let y = float_param(&args, &kwargs, 1, "y")?;
                tracing::info!(x, y, "move_to requested");
                Ok(Value::Bool(true))
            },
        )?;
        Ok(())
    })();

    if let Err(e) = result {
        // Names above are statically distinct; this cannot happen.
        tracing::error!(error = %e, "Demo registry setup failed");
    }

    registry
}
