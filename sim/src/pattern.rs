//! Motion pattern tags.
//!
//! Pattern tags arrive from the config collaborator as raw `u8` values and are
//! stored raw in the entity buffers. Both passes decode them on the fly; a tag
//! that decodes to nothing behaves like [`MotionPattern::Static`].

use crate::error::MotionError;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Closed-form trajectory family evaluated by the movement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionPattern {
    LinearRight = 0,
    LinearLeft = 1,
    LinearUp = 2,
    LinearDown = 3,
    WavyRight = 4,
    WavyLeft = 5,
    JerkyRight = 6,
    JerkyLeft = 7,
    Static = 8,
    RotateInPlace = 9,
}

/// Horizontal travel direction, used by placement to pick which side of the
/// player an entity re-enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Right,
    Left,
    None,
}

impl MotionPattern {
    pub const ALL: [MotionPattern; 10] = [
        MotionPattern::LinearRight,
        MotionPattern::LinearLeft,
        MotionPattern::LinearUp,
        MotionPattern::LinearDown,
        MotionPattern::WavyRight,
        MotionPattern::WavyLeft,
        MotionPattern::JerkyRight,
        MotionPattern::JerkyLeft,
        MotionPattern::Static,
        MotionPattern::RotateInPlace,
    ];

    /// Unit direction of travel, zero for patterns that hold position.
    pub fn direction(self) -> Vec2 {
        match self {
            MotionPattern::LinearRight | MotionPattern::WavyRight | MotionPattern::JerkyRight => {
                Vec2::X
            }
            MotionPattern::LinearLeft | MotionPattern::WavyLeft | MotionPattern::JerkyLeft => {
                Vec2::NEG_X
            }
            MotionPattern::LinearUp => Vec2::Y,
            MotionPattern::LinearDown => Vec2::NEG_Y,
            MotionPattern::Static | MotionPattern::RotateInPlace => Vec2::ZERO,
        }
    }

    pub fn heading(self) -> Heading {
        let dir = self.direction();
        if dir.x > 0.0 {
            Heading::Right
        } else if dir.x < 0.0 {
            Heading::Left
        } else {
            Heading::None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MotionPattern::LinearRight => "LinearRight",
            MotionPattern::LinearLeft => "LinearLeft",
            MotionPattern::LinearUp => "LinearUp",
            MotionPattern::LinearDown => "LinearDown",
            MotionPattern::WavyRight => "WavyRight",
            MotionPattern::WavyLeft => "WavyLeft",
            MotionPattern::JerkyRight => "JerkyRight",
            MotionPattern::JerkyLeft => "JerkyLeft",
            MotionPattern::Static => "Static",
            MotionPattern::RotateInPlace => "RotateInPlace",
        }
    }
}

impl TryFrom<u8> for MotionPattern {
    type Error = MotionError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        MotionPattern::ALL
            .get(tag as usize)
            .copied()
            .ok_or(MotionError::UnknownPatternTag(tag))
    }
}

/// Raw pattern tag as stored in the entity buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternTag(pub u8);

impl PatternTag {
    /// Decoded pattern, `None` for malformed tags.
    #[inline]
    pub fn pattern(self) -> Option<MotionPattern> {
        MotionPattern::try_from(self.0).ok()
    }

    #[inline]
    pub fn heading(self) -> Heading {
        self.pattern().map_or(Heading::None, MotionPattern::heading)
    }
}

impl From<MotionPattern> for PatternTag {
    fn from(pattern: MotionPattern) -> Self {
        PatternTag(pattern as u8)
    }
}
