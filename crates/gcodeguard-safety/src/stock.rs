//! Stock model
//!
//! CAM post-processors usually describe the workpiece in header comments
//! (`(Stock: 300 x 200 x 18)`, `; material thickness = 12`,
//! `(stock z min: -18)`, `; Material: Hard Wood`). The scan is best effort: it
//! takes the first hint for each bound and the last hint for thickness, and
//! falls back to a stock whose top surface is Z0.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const NUM: &str = r"([+-]?(?:\d+\.?\d*|\.\d+))";

/// Workpiece bounds used to decide whether a Z height is in material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockModel {
    pub min_x: Option<f64>,
    pub max_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_y: Option<f64>,
    /// Top surface (mm)
    pub top_z: f64,
    /// Bottom surface, when known
    pub bottom_z: Option<f64>,
    pub thickness: Option<f64>,
    /// Material named in the program, if any
    pub material: Option<String>,
    /// Whether any hint was found
    pub defined: bool,
}

impl Default for StockModel {
    fn default() -> Self {
        Self {
            min_x: None,
            max_x: None,
            min_y: None,
            max_y: None,
            top_z: 0.0,
            bottom_z: None,
            thickness: None,
            material: None,
            defined: false,
        }
    }
}

#[derive(Default)]
struct Hints {
    min_x: Option<f64>,
    max_x: Option<f64>,
    min_y: Option<f64>,
    max_y: Option<f64>,
    top_z: Option<f64>,
    bottom_z: Option<f64>,
    thickness: Option<f64>,
    material: Option<String>,
}

fn first(slot: &mut Option<f64>, value: Option<f64>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl StockModel {
    /// Scan program text for stock hints
    pub fn scan(text: &str) -> Self {
        static SIZE: OnceLock<Regex> = OnceLock::new();
        static THICKNESS: OnceLock<Regex> = OnceLock::new();
        static BOUND: OnceLock<Regex> = OnceLock::new();
        static TOP: OnceLock<Regex> = OnceLock::new();
        static MATERIAL: OnceLock<Regex> = OnceLock::new();

        let size = SIZE.get_or_init(|| {
            Regex::new(&format!(
                r"(?i)stock(?:\s+size)?\s*[:=]?\s*{NUM}\s*[x*]\s*{NUM}\s*[x*]\s*{NUM}"
            ))
            .expect("invalid regex pattern")
        });
        let thickness = THICKNESS.get_or_init(|| {
            Regex::new(&format!(r"(?i)(?:stock|material)\s+thickness\s*[:=]?\s*{NUM}"))
                .expect("invalid regex pattern")
        });
        let bound = BOUND.get_or_init(|| {
            Regex::new(&format!(r"(?i)stock[\s_]*([xyz])[\s_]*(min|max)\s*[:=]?\s*{NUM}"))
                .expect("invalid regex pattern")
        });
        let top = TOP.get_or_init(|| {
            Regex::new(&format!(r"(?i)stock\s+top\s*[:=]?\s*{NUM}")).expect("invalid regex pattern")
        });
        let material = MATERIAL.get_or_init(|| {
            Regex::new(r"(?i)\bmaterial\s*[:=]\s*([A-Za-z][A-Za-z0-9 _\-]*)")
                .expect("invalid regex pattern")
        });

        let mut hints = Hints::default();

        for caps in size.captures_iter(text) {
            if let (Some(w), Some(h), Some(t)) =
                (number(&caps[1]), number(&caps[2]), number(&caps[3]))
            {
                first(&mut hints.min_x, Some(0.0));
                first(&mut hints.max_x, Some(w));
                first(&mut hints.min_y, Some(0.0));
                first(&mut hints.max_y, Some(h));
                hints.thickness = Some(t);
            }
        }

        for caps in thickness.captures_iter(text) {
            if let Some(t) = number(&caps[1]) {
                hints.thickness = Some(t);
            }
        }

        for caps in bound.captures_iter(text) {
            let value = number(&caps[3]);
            let is_min = caps[2].eq_ignore_ascii_case("min");
            match (caps[1].to_ascii_lowercase().as_str(), is_min) {
                ("x", true) => first(&mut hints.min_x, value),
                ("x", false) => first(&mut hints.max_x, value),
                ("y", true) => first(&mut hints.min_y, value),
                ("y", false) => first(&mut hints.max_y, value),
                ("z", true) => first(&mut hints.bottom_z, value),
                _ => first(&mut hints.top_z, value),
            }
        }

        if let Some(caps) = top.captures(text) {
            first(&mut hints.top_z, number(&caps[1]));
        }

        if let Some(caps) = material.captures(text) {
            let name = caps[1].trim();
            if !name.is_empty() {
                hints.material = Some(name.to_string());
            }
        }

        Self::from_hints(hints)
    }

    fn from_hints(hints: Hints) -> Self {
        let defined = hints.min_x.is_some()
            || hints.max_x.is_some()
            || hints.min_y.is_some()
            || hints.max_y.is_some()
            || hints.top_z.is_some()
            || hints.bottom_z.is_some()
            || hints.thickness.is_some()
            || hints.material.is_some();

        let top_z = hints.top_z.unwrap_or(0.0);
        let thickness = hints.thickness.filter(|t| *t > 0.0);
        let bottom_z = hints.bottom_z.or(thickness.map(|t| top_z - t));
        let thickness = thickness.or(bottom_z.map(|b| top_z - b));

        Self {
            min_x: hints.min_x,
            max_x: hints.max_x,
            min_y: hints.min_y,
            max_y: hints.max_y,
            top_z,
            bottom_z,
            thickness,
            material: hints.material,
            defined,
        }
    }

    /// Whether `z` (mm) lies below the top surface
    pub fn is_in_material(&self, z: f64) -> bool {
        z < self.top_z
    }

    /// Depth of cut below the top surface for a tool at `z` (mm), never negative
    pub fn depth_at(&self, z: f64) -> f64 {
        (self.top_z - z).max(0.0)
    }
}
