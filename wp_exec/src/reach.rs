//! # Reach Radius Cache
//!
//! Holds the latest set of reach radii published by the reach-threshold process. The radii carry
//! no waypoint identity, they are matched to waypoints by position at export time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::marker::MarkerArray;
use log::info;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cache of the most recently received reach radii, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ReachRadiusCache {
    radii_m: Option<Vec<f64>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReachRadiusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached radii wholesale.
    ///
    /// `count_hint` is the number of radii the producer reported, it is only logged.
    pub fn replace(&mut self, radii_m: Vec<f64>, count_hint: usize) {
        info!("Reach radii updated: {} markers", count_hint);
        self.radii_m = Some(radii_m);
    }

    /// Replace the cached radii from a reach-threshold marker array.
    ///
    /// Each marker's X scale is its radius.
    pub fn replace_from_markers(&mut self, markers: &MarkerArray) {
        let radii_m = markers.markers
            .iter()
            .map(|m| m.scale.x)
            .collect();

        self.replace(radii_m, markers.markers.len());
    }

    /// The cached radii, empty if none have been received.
    pub fn radii(&self) -> &[f64] {
        self.radii_m.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.radii().len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii().is_empty()
    }

    /// True once any update has been received, even one with no radii.
    pub fn is_received(&self) -> bool {
        self.radii_m.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::{
        geom::{Header, PoseMsg, Vector3},
        marker::{Color, Marker, MarkerType},
    };

    fn reach_marker(radius: f64) -> Marker {
        Marker {
            header: Header::now("map"),
            ns: "reach".into(),
            id: 0,
            marker_type: MarkerType::Cylinder,
            pose: PoseMsg::default(),
            scale: Vector3 { x: radius, y: radius, z: 0.1 },
            color: Color::default(),
        }
    }

    #[test]
    fn test_replace() {
        let mut cache = ReachRadiusCache::new();
        assert!(!cache.is_received());
        assert!(cache.radii().is_empty());

        cache.replace(vec![1.0, 2.0, 3.0], 3);
        assert_eq!(cache.radii(), &[1.0, 2.0, 3.0]);

        // Last writer wins, even if shorter
        cache.replace(vec![0.5], 1);
        assert_eq!(cache.radii(), &[0.5]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_empty_update_counts_as_received() {
        let mut cache = ReachRadiusCache::new();
        cache.replace_from_markers(&MarkerArray { markers: vec![] });

        assert!(cache.is_received());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_from_markers_uses_x_scale_in_order() {
        let mut cache = ReachRadiusCache::new();
        cache.replace_from_markers(&MarkerArray {
            markers: vec![reach_marker(2.5), reach_marker(0.75), reach_marker(1.0)],
        });

        assert_eq!(cache.radii(), &[2.5, 0.75, 1.0]);
    }
}
