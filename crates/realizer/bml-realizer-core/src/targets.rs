//! Named 3D points that gaze and pointing behaviors can refer to.

use hashbrown::HashMap;

use crate::error::RealizerError;

#[derive(Clone, Debug, Default)]
pub struct TargetRegistry {
    points: HashMap<String, [f32; 3]>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or move a target.
    pub fn set(&mut self, name: &str, position: [f32; 3]) {
        self.points.insert(name.to_string(), position);
    }

    pub fn get(&self, name: &str) -> Result<[f32; 3], RealizerError> {
        self.points
            .get(name)
            .copied()
            .ok_or_else(|| RealizerError::unknown("target", name))
    }

    pub fn remove(&mut self, name: &str) -> Option<[f32; 3]> {
        self.points.remove(name)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_move_remove() {
        let mut reg = TargetRegistry::new();
        reg.set("user", [0.0, 1.6, 1.0]);
        reg.set("user", [0.5, 1.6, 1.0]);
        assert_eq!(reg.get("user").unwrap(), [0.5, 1.6, 1.0]);
        assert_eq!(reg.len(), 1);
        assert!(reg.remove("user").is_some());
        assert!(reg.get("user").is_err());
    }
}
