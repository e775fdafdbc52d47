//! Per-tick snapshot handed to visualization consumers. Read-only; nothing flows back.

use crate::ids::{EdgeId, JointId};
use serde::{Deserialize, Serialize};

/// One bar as a renderer needs it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar<P> {
    pub edge: EdgeId,
    pub a: JointId,
    pub b: JointId,
    pub start: P,
    pub end: P,
    /// Frozen rest length.
    pub length: f64,
    /// Centre of the bar, where renderers place the bar body.
    pub midpoint: P,
    /// Distance between `start` and `end` this tick.
    pub span: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame<P> {
    pub tick: u64,
    /// Indexed by joint id.
    pub positions: Vec<P>,
    pub bars: Vec<Bar<P>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn json_shape() {
        let bar = Bar {
            edge: EdgeId(0),
            a: JointId(0),
            b: JointId(1),
            start: Vector2::new(0.0, 0.0),
            end: Vector2::new(2.0, 4.0),
            length: 20f64.sqrt(),
            midpoint: Vector2::new(1.0, 2.0),
            span: 20f64.sqrt(),
        };

        let json = serde_json::to_value(&bar).unwrap();
        assert_eq!(json["start"], serde_json::json!([0.0, 0.0]));
        assert_eq!(json["end"], serde_json::json!([2.0, 4.0]));
        assert_eq!(json["midpoint"], serde_json::json!([1.0, 2.0]));
    }
}
