//! Machine state tracker
//!
//! Follows the modal state of the controller across the instruction stream:
//! position, feed rate, spindle, distance mode, units and the active motion
//! mode. Positions and feeds are kept in millimetres regardless of the
//! program's units so every safety check compares like with like.

use crate::parser::Instruction;
use gcodeguard_core::Units;
use serde::{Deserialize, Serialize};

/// Linear axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All linear axes in output order
    pub fn all() -> [Axis; 3] {
        [Axis::X, Axis::Y, Axis::Z]
    }

    /// Address letter
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }

    /// Word value for this axis on an instruction
    pub fn word(self, instruction: &Instruction) -> Option<f64> {
        match self {
            Axis::X => instruction.x,
            Axis::Y => instruction.y,
            Axis::Z => instruction.z,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Position in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Planar distance to another position
    pub fn distance_xy(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Modal motion mode (group 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionMode {
    /// G0
    Rapid,
    /// G1
    Linear,
    /// G2
    ArcCw,
    /// G3
    ArcCcw,
}

impl MotionMode {
    pub fn from_gcode(code: f64) -> Option<Self> {
        match code {
            c if c == 0.0 => Some(Self::Rapid),
            c if c == 1.0 => Some(Self::Linear),
            c if c == 2.0 => Some(Self::ArcCw),
            c if c == 3.0 => Some(Self::ArcCcw),
            _ => None,
        }
    }

    /// Whether the move is fed (G1/G2/G3)
    pub fn is_feed_move(self) -> bool {
        !matches!(self, Self::Rapid)
    }

    pub fn is_arc(self) -> bool {
        matches!(self, Self::ArcCw | Self::ArcCcw)
    }

    pub fn gcode(self) -> &'static str {
        match self {
            Self::Rapid => "G0",
            Self::Linear => "G1",
            Self::ArcCw => "G2",
            Self::ArcCcw => "G3",
        }
    }
}

/// Distance mode (group 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMode {
    /// G90
    #[default]
    Absolute,
    /// G91
    Relative,
}

/// G codes whose axis words do not describe a normal move
const NON_MOTION_AXIS_CODES: [f64; 5] = [4.0, 10.0, 28.0, 30.0, 53.0];

/// Modal machine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// Current position (mm)
    pub position: Position,
    /// Modal feed rate in mm/min; 0 means never set
    pub feed: f64,
    pub spindle_on: bool,
    pub spindle_rpm: f64,
    pub distance_mode: DistanceMode,
    pub units: Units,
    /// Last motion mode selected by a G0..G3 word
    pub motion_mode: Option<MotionMode>,
    /// Tool selected by the last T word
    pub active_tool: Option<u32>,
    /// Highest-recent positive Z, the height to return to
    pub last_positive_z: f64,
}

impl MachineState {
    /// Create a state at the origin with Z at `safe_z`
    pub fn new(safe_z: f64) -> Self {
        Self {
            position: Position::new(0.0, 0.0, safe_z),
            feed: 0.0,
            spindle_on: false,
            spindle_rpm: 0.0,
            distance_mode: DistanceMode::Absolute,
            units: Units::Millimeters,
            motion_mode: None,
            active_tool: None,
            last_positive_z: safe_z.max(0.0),
        }
    }

    /// Return to the initial state for a new job
    pub fn reset(&mut self, safe_z: f64) {
        *self = Self::new(safe_z);
    }

    /// Motion mode that applies to `instruction`
    ///
    /// An explicit G0..G3 word wins; otherwise a line carrying axis words
    /// continues the modal motion mode.
    pub fn motion_for(&self, instruction: &Instruction) -> Option<MotionMode> {
        if let Some(g) = instruction.g {
            if let Some(mode) = MotionMode::from_gcode(g) {
                return Some(mode);
            }
            if NON_MOTION_AXIS_CODES.contains(&g) || g == 92.0 {
                return None;
            }
        }
        if instruction.has_axis() {
            self.motion_mode
        } else {
            None
        }
    }

    /// Whether the line's axis words move the machine
    ///
    /// False for coordinate assignment (G92) and for codes whose axis words
    /// mean something else (dwell, offsets, homing).
    pub fn is_positioning(&self, instruction: &Instruction) -> bool {
        instruction.has_axis()
            && !instruction
                .g
                .is_some_and(|g| g == 92.0 || NON_MOTION_AXIS_CODES.contains(&g))
    }

    /// Units in force for `instruction` (a G20/G21 on the line applies to it)
    pub fn units_for(&self, instruction: &Instruction) -> Units {
        instruction
            .g
            .and_then(Units::from_gcode)
            .unwrap_or(self.units)
    }

    /// Distance mode in force for `instruction`
    pub fn distance_mode_for(&self, instruction: &Instruction) -> DistanceMode {
        match instruction.g {
            Some(g) if g == 90.0 => DistanceMode::Absolute,
            Some(g) if g == 91.0 => DistanceMode::Relative,
            _ => self.distance_mode,
        }
    }

    /// Resolve an axis word to an absolute millimetre coordinate
    pub fn resolve_axis(&self, instruction: &Instruction, axis: Axis) -> Option<f64> {
        let value = axis.word(instruction)?;
        let mm = self.units_for(instruction).to_mm(value);
        Some(match self.distance_mode_for(instruction) {
            DistanceMode::Absolute => mm,
            DistanceMode::Relative => self.position.get(axis) + mm,
        })
    }

    /// Endpoint of `instruction` in millimetres; absent axes keep their value
    pub fn target(&self, instruction: &Instruction) -> Position {
        let mut target = self.position;
        for axis in Axis::all() {
            if let Some(value) = self.resolve_axis(instruction, axis) {
                target.set(axis, value);
            }
        }
        target
    }

    /// Feed rate the line would run at in mm/min, `None` when never set
    pub fn resolved_feed(&self, instruction: &Instruction) -> Option<f64> {
        match instruction.f {
            Some(f) => Some(self.units_for(instruction).to_mm(f)),
            None if self.feed > 0.0 => Some(self.feed),
            None => None,
        }
    }

    /// Express an absolute millimetre coordinate as a word value for `instruction`
    ///
    /// Honours the line's units and distance mode, so relative programs get a
    /// delta and inch programs get inches.
    pub fn to_program_axis(&self, instruction: &Instruction, axis: Axis, target_mm: f64) -> f64 {
        let units = self.units_for(instruction);
        match self.distance_mode_for(instruction) {
            DistanceMode::Absolute => units.from_mm(target_mm),
            DistanceMode::Relative => units.from_mm(target_mm - self.position.get(axis)),
        }
    }

    /// Express a millimetre feed as a word value for `instruction`
    pub fn to_program_feed(&self, instruction: &Instruction, feed_mm: f64) -> f64 {
        self.units_for(instruction).from_mm(feed_mm)
    }

    /// Advance the state past `instruction`
    pub fn update(&mut self, instruction: &Instruction) {
        if instruction.is_empty() {
            return;
        }

        let target = self.target(instruction);

        if let Some(g) = instruction.g {
            if let Some(units) = Units::from_gcode(g) {
                self.units = units;
            }
            if let Some(mode) = MotionMode::from_gcode(g) {
                self.motion_mode = Some(mode);
            }
            if g == 90.0 {
                self.distance_mode = DistanceMode::Absolute;
            } else if g == 91.0 {
                self.distance_mode = DistanceMode::Relative;
            }
        }

        if let Some(f) = instruction.f {
            if f >= 0.0 {
                self.feed = self.units.to_mm(f);
            }
        }

        if let Some(m) = instruction.m {
            if m == 3.0 || m == 4.0 {
                self.spindle_on = true;
            } else if m == 5.0 || m == 2.0 || m == 30.0 {
                self.spindle_on = false;
            }
        }
        if let Some(s) = instruction.s {
            if s >= 0.0 {
                self.spindle_rpm = s;
            }
        }

        if let Some(t) = instruction.t {
            if t >= 0.0 {
                self.active_tool = Some(t as u32);
            }
        }

        if instruction.g == Some(92.0) {
            // Coordinate assignment: words name the current position directly
            for axis in Axis::all() {
                if let Some(value) = axis.word(instruction) {
                    self.position.set(axis, self.units.to_mm(value));
                }
            }
        } else if self.is_positioning(instruction) {
            self.position = target;
        }

        if self.position.z > 0.0 && instruction.z.is_some() {
            self.last_positive_z = self.position.z;
        }
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new(0.0)
    }
}
