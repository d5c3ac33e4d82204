use std::collections::HashMap;


/// Stacks labels of transmitters that share (almost) the same location.
///
/// Locations are compared after rounding lon/lat to `precision` decimals. Every distinct label at
/// a location gets its own slot, each slot is lifted by `tolerance` above the previous one. One
/// instance is meant to live for a single layer build.
#[derive(Debug)]
pub struct LabelOffsets {
    precision: usize,
    tolerance: f64,
    slots: HashMap<String, Vec<String>>,
}

impl Default for LabelOffsets {
    fn default() -> Self {
        LabelOffsets::new(4, 0.0001)
    }
}

impl LabelOffsets {
    pub fn new(precision: usize, tolerance: f64) -> Self {
        LabelOffsets {
            precision,
            tolerance,
            slots: HashMap::new(),
        }
    }

    fn key(&self, lon: f64, lat: f64) -> String {
        format!("{:.*}:{:.*}", self.precision, lon, self.precision, lat)
    }

    /// Return the vertical offset for `label` at the given location.
    pub fn offset(&mut self, lon: f64, lat: f64, label: &str) -> f64 {
        let key = self.key(lon, lat);
        let labels = self.slots.entry(key).or_insert_with(Vec::new);
        let slot = match labels.iter().position(|l| l == label) {
            Some(slot) => slot,
            None => {
                labels.push(label.to_string());
                labels.len() - 1
            },
        };
        slot as f64 * self.tolerance
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1.0e-12
    }

    #[test]
    fn test_stacking() {
        let mut offsets = LabelOffsets::default();
        assert!(approx_eq(offsets.offset(-74.00001, 43.0, "WAAA"), 0.0));
        // same rounded location, new label
        assert!(approx_eq(offsets.offset(-74.00002, 43.0, "WBBB"), 0.0001));
        assert!(approx_eq(offsets.offset(-74.0, 43.00001, "WCCC"), 0.0002));
        // a repeated label keeps its slot
        assert!(approx_eq(offsets.offset(-74.0, 43.0, "WBBB"), 0.0001));
        // somewhere else
        assert!(approx_eq(offsets.offset(-73.0, 43.0, "WBBB"), 0.0));
    }

    #[test]
    fn test_precision() {
        let mut offsets = LabelOffsets::new(2, 0.5);
        offsets.offset(1.001, 1.0, "a");
        assert!(approx_eq(offsets.offset(1.004, 1.0, "b"), 0.5));
        assert!(approx_eq(offsets.offset(1.02, 1.0, "b"), 0.0));
    }
}
