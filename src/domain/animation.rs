//! Keyframe animations
//!
//! A controller holds key frames of a tagged variant type, so it is the one
//! collection in the graph whose element type is not fixed by the compiler.
//! [`ControllerKind::accepts`] is the rule the mapper and the encoder both
//! enforce.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `animation ( frame_count frame_rate anim_nodes ( N ... ) )`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Animation {
    pub frame_count: i32,
    pub frame_rate: i32,
    pub anim_nodes: Vec<AnimNode>,
}

/// `anim_node NAME ( controllers ( N ... ) )`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimNode {
    pub name: String,
    pub controllers: Vec<Controller>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub kind: ControllerKind,
    pub keys: Vec<KeyPosition>,
}

impl Controller {
    pub fn new(kind: ControllerKind) -> Self {
        Self {
            kind,
            keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    TcbRot,
    LinearPos,
    TcbPos,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 3] = [
        ControllerKind::TcbRot,
        ControllerKind::LinearPos,
        ControllerKind::TcbPos,
    ];

    pub fn block_name(&self) -> &'static str {
        match self {
            ControllerKind::TcbRot => "tcb_rot",
            ControllerKind::LinearPos => "linear_pos",
            ControllerKind::TcbPos => "tcb_pos",
        }
    }

    pub fn from_block_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.block_name() == name)
    }

    /// Returns true if key frames of type `key` may appear under this controller
    pub fn accepts(&self, key: &KeyPosition) -> bool {
        matches!(
            (self, key),
            (ControllerKind::TcbRot, KeyPosition::SlerpRot { .. })
                | (ControllerKind::TcbRot, KeyPosition::TcbKey { .. })
                | (ControllerKind::LinearPos, KeyPosition::LinearKey { .. })
                | (ControllerKind::TcbPos, KeyPosition::TcbKey { .. })
        )
    }

    /// Human readable list of accepted key block names
    pub fn expected_keys(&self) -> &'static str {
        match self {
            ControllerKind::TcbRot => "slerp_rot or tcb_key",
            ControllerKind::LinearPos => "linear_key",
            ControllerKind::TcbPos => "tcb_key",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_name())
    }
}

/// One key frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum KeyPosition {
    SlerpRot {
        frame: i32,
        x: f64,
        y: f64,
        z: f64,
        w: f64,
    },
    LinearKey {
        frame: i32,
        x: f64,
        y: f64,
        z: f64,
    },
    TcbKey {
        frame: i32,
        x: f64,
        y: f64,
        z: f64,
        w: f64,
        tension: f64,
        continuity: f64,
        bias: f64,
        in_: f64,
        out: f64,
    },
}

impl KeyPosition {
    pub fn block_name(&self) -> &'static str {
        match self {
            KeyPosition::SlerpRot { .. } => "slerp_rot",
            KeyPosition::LinearKey { .. } => "linear_key",
            KeyPosition::TcbKey { .. } => "tcb_key",
        }
    }

    pub fn frame(&self) -> i32 {
        match *self {
            KeyPosition::SlerpRot { frame, .. }
            | KeyPosition::LinearKey { frame, .. }
            | KeyPosition::TcbKey { frame, .. } => frame,
        }
    }

    /// Float fields following the frame number, in file order
    pub fn values(&self) -> Vec<(&'static str, f64)> {
        match *self {
            KeyPosition::SlerpRot { x, y, z, w, .. } => {
                vec![("x", x), ("y", y), ("z", z), ("w", w)]
            }
            KeyPosition::LinearKey { x, y, z, .. } => vec![("x", x), ("y", y), ("z", z)],
            KeyPosition::TcbKey {
                x,
                y,
                z,
                w,
                tension,
                continuity,
                bias,
                in_,
                out,
                ..
            } => vec![
                ("x", x),
                ("y", y),
                ("z", z),
                ("w", w),
                ("tension", tension),
                ("continuity", continuity),
                ("bias", bias),
                ("in", in_),
                ("out", out),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> KeyPosition {
        KeyPosition::LinearKey {
            frame: 0,
            x: 1.0,
            y: 2.0,
            z: 3.0,
        }
    }

    fn slerp() -> KeyPosition {
        KeyPosition::SlerpRot {
            frame: 0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    #[test]
    fn accepts_matrix() {
        assert!(ControllerKind::LinearPos.accepts(&linear()));
        assert!(!ControllerKind::LinearPos.accepts(&slerp()));
        assert!(ControllerKind::TcbRot.accepts(&slerp()));
        assert!(!ControllerKind::TcbRot.accepts(&linear()));
        assert!(!ControllerKind::TcbPos.accepts(&slerp()));
    }

    #[test]
    fn kind_from_block_name() {
        assert_eq!(
            ControllerKind::from_block_name("tcb_pos"),
            Some(ControllerKind::TcbPos)
        );
        assert_eq!(ControllerKind::from_block_name("tcb_key"), None);
    }

    #[test]
    fn key_values_in_file_order() {
        let names: Vec<_> = linear().values().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(slerp().frame(), 0);
    }
}
